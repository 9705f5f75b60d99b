//! Vector indexes and the multi-vector store.
//!
//! `MemoryIndex`/`MemoryDocStore` keep everything in process; `LanceIndex`/
//! `LanceDocStore` persist to an embedded LanceDB directory. Both pairs sit
//! behind the `VectorIndex`/`DocStore` traits and are combined by
//! `MultiVectorStore`, which keeps summary embeddings and original content
//! in lockstep.

pub mod distance;
pub mod docstore;
pub mod lance;
pub mod memory;
pub mod multi_vector;
pub mod schema;

pub use docstore::MemoryDocStore;
pub use lance::{LanceDocStore, LanceIndex};
pub use memory::MemoryIndex;
pub use multi_vector::MultiVectorStore;

/// Returns `base` if unused, otherwise the first free `base-1`, `base-2`, ...
pub fn disambiguate<F>(base: &str, mut taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = if base.trim().is_empty() { "doc" } else { base };
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
