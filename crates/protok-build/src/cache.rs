//! Incremental change detection over SHA-512 content digests.
//!
//! One snapshot per build: every dependency and compilable proto is
//! digested (in parallel) into `next.json`. Comparing against the
//! committed `previous.json` decides the compilation scope. The policy
//! is deliberately coarse: any dependency change or any source change
//! regenerates everything, because protoc cannot regenerate a subset
//! without risking stale cross-references.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use protok_core::ProjectInputs;
use protok_digest::{Digest, DigestAlgorithm};
use protok_fetch::ScratchSpace;
use protok_util::errors::{ProtokError, ProtokResult};

/// Bumped whenever the on-disk snapshot format changes; snapshots with
/// any other version are treated as absent.
pub const SCHEMA_VERSION: &str = "1";

const PREVIOUS_FILE: &str = "previous.json";
const NEXT_FILE: &str = "next.json";

/// Persisted digests of one build's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    schema_version: String,
    dependencies: BTreeMap<String, String>,
    sources: BTreeMap<String, String>,
}

/// The incremental cache of one goal execution.
pub struct IncrementalCache {
    dir: PathBuf,
}

impl IncrementalCache {
    pub fn new(scratch: &ScratchSpace) -> miette::Result<Self> {
        let dir = scratch.dir(&["incremental-build-cache", SCHEMA_VERSION])?;
        Ok(Self { dir })
    }

    /// Digest the inputs, persist `next.json`, and decide what to hand
    /// to protoc.
    ///
    /// - no usable previous snapshot: everything;
    /// - any dependency digest changed: everything, so import-level
    ///   breakage surfaces immediately;
    /// - any compilable digest changed: everything;
    /// - otherwise: nothing, and the caller skips protoc entirely.
    pub fn determine_sources_to_compile(
        &self,
        inputs: &ProjectInputs,
    ) -> ProtokResult<Vec<PathBuf>> {
        let next = snapshot_of(inputs)?;
        self.write(&self.next_path(), &next)?;

        let all = inputs.compilable_files();

        let Some(previous) = self.load_previous() else {
            tracing::debug!("no previous snapshot, compiling all {} file(s)", all.len());
            return Ok(all);
        };
        if previous.schema_version != SCHEMA_VERSION {
            tracing::debug!("snapshot schema changed, compiling everything");
            return Ok(all);
        }
        if previous.dependencies != next.dependencies {
            tracing::info!("dependency protos changed, compiling everything");
            return Ok(all);
        }
        if previous.sources != next.sources {
            tracing::info!("source protos changed, compiling everything");
            return Ok(all);
        }
        tracing::info!("all {} proto file(s) are up to date", all.len());
        Ok(Vec::new())
    }

    /// Promote `next.json` to `previous.json` after a successful build.
    pub fn commit(&self) -> ProtokResult<()> {
        std::fs::rename(self.next_path(), self.previous_path()).map_err(|e| {
            ProtokError::Cache {
                message: format!("cannot commit snapshot in {}: {e}", self.dir.display()),
            }
        })?;
        Ok(())
    }

    fn load_previous(&self) -> Option<CacheSnapshot> {
        let path = self.previous_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!("no usable snapshot at {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("discarding unreadable snapshot {}: {e}", path.display());
                None
            }
        }
    }

    fn write(&self, path: &Path, snapshot: &CacheSnapshot) -> ProtokResult<()> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| ProtokError::Cache {
            message: format!("cannot serialize snapshot: {e}"),
        })?;
        protok_util::fs::atomic_write(path, json.as_bytes()).map_err(|e| {
            ProtokError::Cache {
                message: format!("cannot write {}: {e}", path.display()),
            }
            .into()
        })
    }

    fn previous_path(&self) -> PathBuf {
        self.dir.join(PREVIOUS_FILE)
    }

    fn next_path(&self) -> PathBuf {
        self.dir.join(NEXT_FILE)
    }
}

fn snapshot_of(inputs: &ProjectInputs) -> ProtokResult<CacheSnapshot> {
    Ok(CacheSnapshot {
        schema_version: SCHEMA_VERSION.to_string(),
        dependencies: digest_map(inputs.dependency_files())?,
        sources: digest_map(inputs.compilable_files())?,
    })
}

/// SHA-512 every file in a worker pool; the first failure aborts the
/// whole stage.
fn digest_map(files: Vec<PathBuf>) -> ProtokResult<BTreeMap<String, String>> {
    files
        .par_iter()
        .map(|path| {
            let digest = Digest::compute_file(DigestAlgorithm::Sha512, path).map_err(|e| {
                ProtokError::Scan {
                    message: format!("digesting {}: {e}", path.display()),
                }
            })?;
            Ok((path.to_string_lossy().into_owned(), digest.to_hex()))
        })
        .collect()
}
