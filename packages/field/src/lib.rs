pub mod blob;
pub mod config;
pub mod context;
pub mod cursor;
pub mod database;
pub mod error;
pub mod model;
pub mod value;

pub use blob::{BlobField, StorageMode};
pub use config::BlobFieldConfig;
pub use context::{FieldContext, ReadMode};
pub use cursor::{ColumnValue, RecordCursor, SqlCursor};
pub use error::{FieldError, FieldResult};
pub use model::{ModelDescriptor, RecordId};
pub use value::{BlobValue, LoadedValues, RawValue};
