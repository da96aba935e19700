//! Proto source discovery: recursive tree walks filtered by globs.
//!
//! Scans are deterministic: results come back sorted by path string so
//! the protoc argument file is reproducible across runs and machines.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use protok_core::SourceListing;
use protok_util::errors::{ProtokError, ProtokResult};

/// Include/exclude glob filter, matched against paths relative to the
/// scan root.
///
/// A file is excluded when any exclude pattern matches; it is included
/// when the include list is empty or any include pattern matches. The
/// result is `included && !excluded`.
pub struct GlobFilter {
    includes: GlobSet,
    include_count: usize,
    excludes: GlobSet,
}

impl GlobFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> ProtokResult<Self> {
        Ok(Self {
            includes: compile(includes)?,
            include_count: includes.len(),
            excludes: compile(excludes)?,
        })
    }

    /// A filter that accepts everything.
    pub fn allow_all() -> Self {
        Self {
            includes: GlobSet::empty(),
            include_count: 0,
            excludes: GlobSet::empty(),
        }
    }

    pub fn matches(&self, relative: &Path) -> bool {
        if self.excludes.is_match(relative) {
            return false;
        }
        self.include_count == 0 || self.includes.is_match(relative)
    }

    /// String-path matching for tests and configuration checks: the
    /// slash-delimited input becomes a synthetic relative path and runs
    /// through the same predicate as a scanned file.
    pub fn matches_str(&self, relative: &str) -> bool {
        self.matches(Path::new(relative))
    }
}

fn compile(patterns: &[String]) -> ProtokResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            // `*` stays within one path segment; `**` crosses directories.
            .literal_separator(true)
            .build()
            .map_err(|e| ProtokError::Configuration {
                message: format!("invalid glob `{pattern}`: {e}"),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| {
        ProtokError::Configuration {
            message: format!("cannot compile glob set: {e}"),
        }
        .into()
    })
}

/// Walk `root` and collect the regular `.proto` files accepted by the
/// filter. A missing root yields an empty listing; IO failures while
/// walking are fatal.
pub fn scan(root: &Path, filter: &GlobFilter) -> ProtokResult<SourceListing> {
    let mut files = Vec::new();
    if root.is_dir() {
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| ProtokError::Scan {
                message: format!("walking {}: {e}", root.display()),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !has_proto_extension(path) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            if filter.matches(relative) {
                files.push(path.to_path_buf());
            }
        }
    }
    Ok(SourceListing::new(root, files))
}

/// Scan several roots, keeping the root order.
pub fn scan_all(roots: &[PathBuf], filter: &GlobFilter) -> ProtokResult<Vec<SourceListing>> {
    roots.iter().map(|root| scan(root, filter)).collect()
}

fn has_proto_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("proto"))
}
