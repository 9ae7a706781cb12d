pub mod blob;
pub mod convert;
pub mod sqlite;

pub use blob::LocalBlobStore;
pub use sqlite::SqliteStore;
