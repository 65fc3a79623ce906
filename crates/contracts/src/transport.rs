//! Transport trait - forward delivery interface
//!
//! Defines how one outbound request reaches one destination.

use bytes::Bytes;

use crate::{ContractError, Headers};

/// Request relayed to one forward target
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
}

/// Response of a delivery that reached the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
}

impl DeliveryResponse {
    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivery transport
///
/// Any HTTP status counts as a response; only failures to obtain one are errors.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging)
    fn name(&self) -> &str;

    /// POST the request to its destination
    ///
    /// # Errors
    /// `InvalidUrl`, `TransportTimeout` or `Transport` when no response arrived
    async fn deliver(&self, request: &OutboundRequest) -> Result<DeliveryResponse, ContractError>;
}
