use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The `.proto` files found under one source root, sorted by path string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceListing {
    pub source_root: PathBuf,
    pub files: Vec<PathBuf>,
}

impl SourceListing {
    pub fn new(source_root: impl Into<PathBuf>, mut files: Vec<PathBuf>) -> Self {
        files.sort();
        files.dedup();
        Self {
            source_root: source_root.into(),
            files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// All inputs of one goal execution: the listings whose files are handed
/// to protoc for generation, and the listings that only contribute
/// importable definitions.
#[derive(Debug, Clone, Default)]
pub struct ProjectInputs {
    pub compilable_sources: Vec<SourceListing>,
    pub dependency_sources: Vec<SourceListing>,
}

impl ProjectInputs {
    /// Every file to compile, deduplicated and sorted. Overlap between
    /// listings is tolerated; duplicates collapse here.
    pub fn compilable_files(&self) -> Vec<PathBuf> {
        dedup_files(&self.compilable_sources)
    }

    /// Every import-only file, deduplicated and sorted.
    pub fn dependency_files(&self) -> Vec<PathBuf> {
        dedup_files(&self.dependency_sources)
    }

    /// Roots of the compilable listings, in declaration order without
    /// duplicates.
    pub fn source_roots(&self) -> Vec<PathBuf> {
        dedup_roots(self.compilable_sources.iter().map(|l| l.source_root.as_path()))
    }

    /// Roots of the import-only listings, in declaration order without
    /// duplicates.
    pub fn import_roots(&self) -> Vec<PathBuf> {
        dedup_roots(self.dependency_sources.iter().map(|l| l.source_root.as_path()))
    }
}

fn dedup_files(listings: &[SourceListing]) -> Vec<PathBuf> {
    let set: BTreeSet<&PathBuf> = listings.iter().flat_map(|l| l.files.iter()).collect();
    set.into_iter().cloned().collect()
}

fn dedup_roots<'a>(roots: impl Iterator<Item = &'a Path>) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for root in roots {
        if seen.insert(root.to_path_buf()) {
            out.push(root.to_path_buf());
        }
    }
    out
}
