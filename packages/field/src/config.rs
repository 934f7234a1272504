use serde::Deserialize;

/// Declaration of a binary field, as written next to its model.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BlobFieldConfig {
    /// Column holding the inline value; also the field name.
    pub name: String,
    /// Column holding the content key. Enables external storage.
    #[serde(default, alias = "file_id")]
    pub external_key_column: Option<String>,
    /// Store namespace overriding the active database name.
    #[serde(default)]
    pub store_prefix: Option<String>,
    /// Column holding the original file name, if any.
    #[serde(default)]
    pub filename: Option<String>,
}

impl BlobFieldConfig {
    pub fn inline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_key_column: None,
            store_prefix: None,
            filename: None,
        }
    }

    pub fn external(name: impl Into<String>, key_column: impl Into<String>) -> Self {
        Self {
            external_key_column: Some(key_column.into()),
            ..Self::inline(name)
        }
    }

    pub fn with_store_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.store_prefix = Some(prefix.into());
        self
    }

    pub fn with_filename(mut self, column: impl Into<String>) -> Self {
        self.filename = Some(column.into());
        self
    }
}
