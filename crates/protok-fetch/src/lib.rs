//! Resource materialization for the protok build integration.
//!
//! Three pieces: the per-execution [`ScratchSpace`](scratch::ScratchSpace)
//! that owns every file this crate writes, the [`UriFetcher`](uri::UriFetcher)
//! that turns remote or archive-nested URIs into local files, and the
//! archive extractor that unpacks dependency archives into proto trees.

pub mod extract;
pub mod scratch;
pub mod uri;

pub use scratch::ScratchSpace;
pub use uri::UriFetcher;
