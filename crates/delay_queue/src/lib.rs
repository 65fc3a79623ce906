//! # Delay Queue
//!
//! TTL-deduplicating priority queue driving realtime notification.
//!
//! Responsibilities:
//! - Min-heap of pending items ordered by due-time (`now + ttl` at push)
//! - Membership dedup by `Identify::identity`: a resident identity makes
//!   further pushes no-ops until the item leaves the queue
//! - Lazy draining of due items for the broadcast loop
//!
//! ## Usage Example
//!
//! ```
//! use std::time::Duration;
//! use contracts::Notification;
//! use delay_queue::DelayQueue;
//!
//! let queue = DelayQueue::new();
//! assert!(queue.push(Notification::new("u1", "b1"), Duration::ZERO));
//! assert!(!queue.push(Notification::new("u1", "b1"), Duration::ZERO));
//!
//! let due: Vec<_> = queue.drain_ready().collect();
//! assert_eq!(due.len(), 1);
//! assert!(queue.is_empty());
//! ```

mod queue;

pub use contracts::Identify;
pub use queue::{DelayQueue, DrainReady, QueueItem};
