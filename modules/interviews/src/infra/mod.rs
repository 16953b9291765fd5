pub mod local_session;
pub mod memory_blob;
pub mod memory_store;

pub use local_session::LocalSession;
pub use memory_blob::MemoryBlobStore;
pub use memory_store::{MemoryRecordStore, OwnerRule};
