//! Resolution of the protoc compiler executable.

use std::path::PathBuf;

use protok_core::descriptor::ProtocDistribution;
use protok_digest::Digest;
use protok_fetch::UriFetcher;
use protok_platform::classifier::platform_classifier;
use protok_platform::HostSystem;
use protok_util::errors::{ProtokError, ProtokResult};

use crate::graph::{ArtifactResolver, DependencyGraph, ResolutionDepth};

/// Resolves a [`ProtocDistribution`] to an executable on disk.
///
/// Executables from the host path are borrowed; anything fetched or
/// resolved from a repository lands in scratch-owned storage and gets
/// its executable bit set on POSIX.
pub struct ProtocResolver<'a> {
    host: &'a HostSystem,
    fetcher: &'a UriFetcher,
    artifacts: ArtifactResolver<'a>,
}

impl<'a> ProtocResolver<'a> {
    pub fn new(
        host: &'a HostSystem,
        fetcher: &'a UriFetcher,
        graph: &'a dyn DependencyGraph,
    ) -> Self {
        Self {
            host,
            fetcher,
            artifacts: ArtifactResolver::new(graph),
        }
    }

    pub fn resolve(&self, distribution: &ProtocDistribution) -> ProtokResult<PathBuf> {
        match distribution {
            ProtocDistribution::Path { name } => {
                let path =
                    self.host
                        .search_executable(name)
                        .ok_or_else(|| ProtokError::Resolution {
                            message: format!("`{name}` was not found on the host search path"),
                        })?;
                tracing::info!("using {} from the host path", path.display());
                Ok(path)
            }
            ProtocDistribution::Uri { uri, digest } => {
                let path = self.fetcher.fetch(uri, ".exe")?.ok_or_else(|| {
                    ProtokError::Resolution {
                        message: format!("protoc not found at {uri}"),
                    }
                })?;
                if let Some(expected) = digest {
                    Digest::parse(expected)?.verify_file(&path)?;
                }
                protok_util::fs::make_executable(&path)?;
                Ok(path)
            }
            ProtocDistribution::Coordinate { coordinate } => {
                let mut coordinate = coordinate.clone();
                if coordinate.r#type.is_none() {
                    coordinate = coordinate.with_type("exe");
                }
                if coordinate.classifier.is_none() {
                    let classifier =
                        platform_classifier(self.host, &coordinate.artifact_id)?;
                    coordinate = coordinate.with_classifier(classifier);
                }
                let paths = self
                    .artifacts
                    .resolve_one(&coordinate, ResolutionDepth::Direct)?;
                let path = paths.into_iter().next().ok_or_else(|| {
                    ProtokError::Resolution {
                        message: format!("no artifact found for {coordinate}"),
                    }
                })?;
                protok_util::fs::make_executable(&path)?;
                Ok(path)
            }
        }
    }
}
