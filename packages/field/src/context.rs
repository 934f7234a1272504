use std::collections::HashMap;

use common::storage::Namespace;

use crate::error::FieldResult;

/// Flag value selecting size mode for a `"<model>.<field>"` key.
pub const SIZE_FORMAT: &str = "size";

/// What a read returns for each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// The payload itself; records without data read as null.
    Value,
    /// Only the payload's byte length; records without data read as 0.
    Size,
}

/// Per-call execution context: the active namespace plus request flags.
#[derive(Debug, Clone)]
pub struct FieldContext {
    namespace: Namespace,
    flags: HashMap<String, String>,
}

impl FieldContext {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            flags: HashMap::new(),
        }
    }

    /// Context for the database called `name`.
    pub fn for_database(name: &str) -> FieldResult<Self> {
        Ok(Self::new(Namespace::new(name)?))
    }

    pub fn with_flag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(key.into(), value.into());
        self
    }

    /// Request byte lengths instead of payloads for `field` on `model`.
    pub fn with_size_mode(self, model: &str, field: &str) -> Self {
        self.with_flag(format!("{model}.{field}"), SIZE_FORMAT)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub fn read_mode(&self, key: &str) -> ReadMode {
        match self.flag(key) {
            Some(SIZE_FORMAT) => ReadMode::Size,
            _ => ReadMode::Value,
        }
    }
}
