use std::collections::HashMap;

use crate::model::RecordId;

/// A column value as the relational layer hands it over.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RawValue {
    #[default]
    Null,
    Bytes(Vec<u8>),
    /// Text-encoded payload; normalized to its UTF-8 bytes.
    Text(String),
}

impl RawValue {
    /// Payload bytes, or `None` when the value is null or empty.
    pub fn payload(&self) -> Option<&[u8]> {
        let bytes = match self {
            Self::Null => return None,
            Self::Bytes(bytes) => bytes.as_slice(),
            Self::Text(text) => text.as_bytes(),
        };
        (!bytes.is_empty()).then_some(bytes)
    }

    /// Representation written to an inline column. Empty payloads are kept.
    pub fn sql_format(&self) -> Option<Vec<u8>> {
        match self {
            Self::Null => None,
            Self::Bytes(bytes) => Some(bytes.clone()),
            Self::Text(text) => Some(text.clone().into_bytes()),
        }
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for RawValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Materialized field value returned by a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobValue {
    Null,
    Bytes(Vec<u8>),
    /// Byte length, returned in size mode.
    Size(u64),
}

/// Rows already read by the caller: id -> column name -> raw value.
pub type LoadedValues = HashMap<RecordId, HashMap<String, RawValue>>;
