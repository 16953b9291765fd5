pub mod blob;
pub mod session;
pub mod store;

pub use blob::{Blob, BlobError, BlobStore};
pub use session::{AuthSession, SessionUser};
pub use store::{
    Delivery, Direction, Document, Fields, OrderBy, Query, RecordStore, StoreError, StoreListener,
};
