//! Per-execution content-addressed temporary directories.
//!
//! Directory names are a SHA-256 over the goal, the execution id, and the
//! requested fragments, which keeps paths short enough for Windows
//! MAX_PATH while staying deterministic. Directories persist for the
//! whole build and are never deleted here.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use protok_util::errors::ProtokError;

const DEFAULT_GOAL: &str = "generate";
const DEFAULT_EXECUTION_ID: &str = "default";

/// Scratch-directory manager keyed by `(goal, execution id)`.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    build_dir: PathBuf,
    goal: String,
    execution_id: String,
}

impl ScratchSpace {
    /// Create a scratch space under `build_dir`. Absent goal or execution
    /// id fall back to the sentinels `generate` / `default`.
    pub fn new(
        build_dir: impl Into<PathBuf>,
        goal: Option<&str>,
        execution_id: Option<&str>,
    ) -> Self {
        Self {
            build_dir: build_dir.into(),
            goal: goal.unwrap_or(DEFAULT_GOAL).to_string(),
            execution_id: execution_id.unwrap_or(DEFAULT_EXECUTION_ID).to_string(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// The directory for a fragment sequence, created on demand.
    ///
    /// Layout: `<build_dir>/<fragments joined by "-">/<sha256 hex>` where
    /// the digest covers goal, execution id, and every fragment, each
    /// separated by a NUL byte. Concurrent callers racing on the same
    /// fragments both succeed.
    pub fn dir(&self, fragments: &[&str]) -> miette::Result<PathBuf> {
        let mut hasher = Sha256::new();
        hasher.update(self.goal.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.execution_id.as_bytes());
        for fragment in fragments {
            hasher.update([0u8]);
            hasher.update(fragment.as_bytes());
        }
        let digest = format!("{:x}", hasher.finalize());

        let tag = fragments.join("-");
        let dir = if tag.is_empty() {
            self.build_dir.join(&digest)
        } else {
            self.build_dir.join(tag).join(&digest)
        };
        protok_util::fs::ensure_dir(&dir).map_err(ProtokError::Io)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_maps_to_same_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(tmp.path(), Some("generate"), Some("default"));
        let a = space.dir(&["archives"]).unwrap();
        let b = space.dir(&["archives"]).unwrap();
        assert_eq!(a, b);
        assert!(a.is_dir());
    }

    #[test]
    fn different_executions_map_to_different_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let a = ScratchSpace::new(tmp.path(), Some("generate"), Some("one"))
            .dir(&["archives"])
            .unwrap();
        let b = ScratchSpace::new(tmp.path(), Some("generate"), Some("two"))
            .dir(&["archives"])
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn fragments_form_the_readable_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let space = ScratchSpace::new(tmp.path(), None, None);
        let dir = space.dir(&["java-apps", "abc123"]).unwrap();
        assert!(dir.starts_with(tmp.path().join("java-apps-abc123")));
    }

    #[test]
    fn defaults_apply_when_keys_are_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let defaulted = ScratchSpace::new(tmp.path(), None, None).dir(&["x"]).unwrap();
        let explicit = ScratchSpace::new(tmp.path(), Some("generate"), Some("default"))
            .dir(&["x"])
            .unwrap();
        assert_eq!(defaulted, explicit);
    }
}
