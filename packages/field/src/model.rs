use crate::error::{FieldError, FieldResult};

/// Integer identity of a record.
pub type RecordId = i64;

/// Primary key column shared by every record table.
pub const ID_COLUMN: &str = "id";

/// Check that `ident` can be used as a bare SQL identifier.
pub fn validate_identifier(what: &str, ident: &str) -> FieldResult<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FieldError::InvalidConfig(format!(
            "{what} {ident:?} is not a valid identifier"
        )))
    }
}

/// Handle on a record type: its dotted name and the table backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    name: String,
    table: String,
}

impl ModelDescriptor {
    /// Derive the table from the model name, `ir.attachment` -> `ir_attachment`.
    pub fn new(name: impl Into<String>) -> FieldResult<Self> {
        let name = name.into();
        let table = name.replace('.', "_");
        Self::with_table(name, table)
    }

    pub fn with_table(name: impl Into<String>, table: impl Into<String>) -> FieldResult<Self> {
        let name = name.into();
        let table = table.into();
        if name.is_empty() || name.split('.').any(|part| part.is_empty()) {
            return Err(FieldError::InvalidConfig(format!(
                "model name {name:?} is malformed"
            )));
        }
        validate_identifier("table", &table)?;
        Ok(Self { name, table })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}
