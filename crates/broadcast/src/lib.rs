//! # Broadcast
//!
//! Realtime refresh delivery.
//!
//! Responsibilities:
//! - `BroadcastLoop`: wake on an interval, drain due notifications from the
//!   delay queue and push a refresh signal to every live client subscribed to
//!   the notification topic as its user
//! - `RealtimeHub`: in-process client registry implementing `Broadcaster`
//!
//! The loop stops within one interval of its `CancellationToken` firing.

mod hub;
mod stats;
mod worker;

pub use contracts::{Broadcaster, RealtimeClient, RealtimeMessage, REFRESH_SIGNAL};
pub use hub::{ClientHandle, RealtimeHub};
pub use stats::{BroadcastStats, StatsSnapshot};
pub use worker::BroadcastLoop;
