//! Draft store implementations.
//!
//! Two implementations of the [`DraftStore`](crate::draft::DraftStore) seam:
//! an in-memory map (tests, and the degradation target of the file store)
//! and a file-backed store persisting one JSON document per key.

mod file;
mod memory;

pub use file::FileDraftStore;
pub use memory::MemoryDraftStore;
