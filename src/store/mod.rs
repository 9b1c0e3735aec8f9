//! Record storage.
//!
//! The engine persists evaluation state through the [`RecordStore`]
//! trait; [`InMemoryRecordStore`] is the bundled thread-safe reference
//! implementation for embedded use and tests.

mod memory;
mod traits;

pub use memory::InMemoryRecordStore;
pub use traits::{FieldPatch, RecordPatch, RecordStore, StoreError};
