pub mod snapshot;
pub mod store;

pub use snapshot::SnapshotIndex;
pub use store::{cosine_similarity, StoredChunk, VectorStore, MAX_TOP_K};
