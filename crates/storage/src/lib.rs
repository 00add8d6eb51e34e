pub mod blob;
pub mod db;
pub mod keyvalue;
pub mod local;
pub mod service;
pub mod sqlite;

pub use blob::DiskImageStore;
pub use keyvalue::{FileKeyValue, KeyValueStore, MemoryKeyValue};
pub use local::LocalProvider;
pub use sqlite::SqliteProvider;
