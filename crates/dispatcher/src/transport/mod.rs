//! Transport implementations

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockBehavior, MockTransport};
