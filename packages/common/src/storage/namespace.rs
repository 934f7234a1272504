use std::fmt;

use super::error::StorageError;

/// Partition of the blob store, usually one per database.
///
/// Namespaces become directory names in the filesystem layout, so they may
/// not contain path separators or be `.`/`..`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Result<Self, StorageError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StorageError::InvalidNamespace("empty namespace".into()));
        }
        if name == "." || name == ".." || name.starts_with(".tmp") {
            return Err(StorageError::InvalidNamespace(format!("reserved name {name:?}")));
        }
        if name.chars().any(|c| matches!(c, '/' | '\\' | '\0')) {
            return Err(StorageError::InvalidNamespace(format!(
                "{name:?} contains a path separator"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
