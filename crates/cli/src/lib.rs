//! # Splay service library
//!
//! HTTP surface and service assembly behind the `splay` binary.

pub mod app;
pub mod error;
pub mod server;

pub use app::{AppDispatcher, AppHandler, Services};
pub use error::{CliError, Result};
