//! Text codec for checkpoint payloads
//!
//! Records store structured values (accumulator, cursor) as serialized text.
//! [`TextCodec`] is the one place that decides the text format.

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Encode and decode structured payloads to stored text
pub trait TextCodec: Send + Sync {
    /// Serialize a value to its stored text form
    fn encode<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Parse a stored text form back into a value
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T>;

    /// Decode an optional field, keeping `None` as `None`
    fn decode_opt<T: DeserializeOwned>(&self, text: Option<&str>) -> Result<Option<T>> {
        text.map(|t| self.decode(t)).transpose()
    }
}

/// JSON text codec (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl TextCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        Ok(serde_json::from_str(text)?)
    }
}
