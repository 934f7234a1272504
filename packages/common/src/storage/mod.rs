mod error;
mod hash;
mod namespace;
mod traits;

pub mod filesystem;
pub mod memory;

pub use error::StorageError;
pub use hash::{ContentHash, KEY_HEX_LEN};
pub use namespace::Namespace;
pub use traits::{BlobStore, BoxReader};

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;
