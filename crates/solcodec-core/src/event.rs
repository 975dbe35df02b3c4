//! Decoded program event type.

use crate::types::NormalizedValue;
use serde::Serialize;

/// An event emitted by a registered program, recovered from `Program data:`
/// log frames or from a self-CPI event instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedEvent {
    /// Program the event was attributed to
    pub program_address: String,
    /// Event name as declared in the IDL
    pub name: String,
    /// Decoded event fields in declaration order
    pub data: NormalizedValue,
}

impl DecodedEvent {
    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&NormalizedValue> {
        self.data.get(name)
    }
}
