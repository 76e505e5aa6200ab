// Local persistence for the marketplace - JSON blobs behind a key-value interface
// Keeps listings and favorites around between sessions without a server round-trip

pub mod store;

pub use store::{get_json, put_json, BlobStore, MemoryStore, SqliteStore, StoreError};
