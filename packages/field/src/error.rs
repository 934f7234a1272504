use common::storage::StorageError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The relational layer returned something that breaks its contract.
    #[error("Integrity fault: {0}")]
    Integrity(String),

    #[error("Invalid field configuration: {0}")]
    InvalidConfig(String),
}

pub type FieldResult<T> = Result<T, FieldError>;
