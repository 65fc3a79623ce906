//! Inbound body parsing

use serde_json::{Map, Value};

use crate::error::{IngestError, Result};

/// Parse `body` as a JSON object and return its canonical serialized form
pub fn parse_object(body: &[u8]) -> Result<String> {
    let object: Map<String, Value> = serde_json::from_slice(body).map_err(|e| {
        if e.is_data() {
            IngestError::bad_request("body must be a JSON object")
        } else {
            IngestError::bad_request(format!("malformed JSON: {e}"))
        }
    })?;
    serde_json::to_string(&object).map_err(|e| IngestError::internal(e.to_string()))
}
