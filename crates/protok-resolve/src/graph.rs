//! Contract with the external dependency-resolution machinery.
//!
//! The surrounding build owns repository access, version mediation, and
//! artifact caching. This crate only states what it needs: give me the
//! files for a coordinate, direct or transitive, filtered by scope.

use std::path::PathBuf;

use protok_core::MavenCoordinate;
use protok_util::errors::{ProtokError, ProtokResult};

/// How far to follow the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionDepth {
    /// Only the named artifact.
    Direct,
    /// The artifact plus its transitive dependencies.
    Transitive,
}

/// Maven-compatible dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyScope {
    Compile,
    Runtime,
    Provided,
    System,
    Test,
}

/// The scopes a JVM plugin needs on its runtime classpath.
pub const JVM_PLUGIN_SCOPES: &[DependencyScope] = &[
    DependencyScope::Compile,
    DependencyScope::Runtime,
    DependencyScope::System,
];

/// External dependency graph provided by the surrounding build.
///
/// `resolve` returns the artifact files for a coordinate, entrypoint
/// first for JVM plugins. An artifact that does not exist resolves to an
/// empty list; infrastructure failures are errors. An empty `scopes`
/// slice means "no scope filtering".
pub trait DependencyGraph: Send + Sync {
    fn resolve(
        &self,
        coordinate: &MavenCoordinate,
        depth: ResolutionDepth,
        scopes: &[DependencyScope],
        include_optional: bool,
    ) -> ProtokResult<Vec<PathBuf>>;
}

/// Thin adapter over the external graph: validates coordinates up front
/// and attaches the coordinate to every failure.
pub struct ArtifactResolver<'a> {
    graph: &'a dyn DependencyGraph,
}

impl<'a> ArtifactResolver<'a> {
    pub fn new(graph: &'a dyn DependencyGraph) -> Self {
        Self { graph }
    }

    /// Resolve a single coordinate, unfiltered by scope.
    pub fn resolve_one(
        &self,
        coordinate: &MavenCoordinate,
        depth: ResolutionDepth,
    ) -> ProtokResult<Vec<PathBuf>> {
        self.resolve_dependencies(std::slice::from_ref(coordinate), depth, &[], false)
    }

    /// Resolve several coordinates with a scope filter. Results keep the
    /// per-coordinate ordering the graph returns.
    pub fn resolve_dependencies(
        &self,
        coordinates: &[MavenCoordinate],
        depth: ResolutionDepth,
        scopes: &[DependencyScope],
        include_optional: bool,
    ) -> ProtokResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for coordinate in coordinates {
            validate(coordinate)?;
            let resolved = self
                .graph
                .resolve(coordinate, depth, scopes, include_optional)
                .map_err(|e| ProtokError::Resolution {
                    message: format!("resolving {coordinate}: {e}"),
                })?;
            tracing::debug!("{coordinate} resolved to {} file(s)", resolved.len());
            paths.extend(resolved);
        }
        Ok(paths)
    }
}

fn validate(coordinate: &MavenCoordinate) -> ProtokResult<()> {
    if !coordinate.is_well_formed() {
        return Err(ProtokError::Configuration {
            message: format!("coordinate `{coordinate}` is missing its group or artifact id"),
        }
        .into());
    }
    if coordinate.version.as_deref().unwrap_or("").is_empty() {
        return Err(ProtokError::Configuration {
            message: format!("coordinate `{coordinate}` has no version to resolve"),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoGraph;

    impl DependencyGraph for EchoGraph {
        fn resolve(
            &self,
            coordinate: &MavenCoordinate,
            _depth: ResolutionDepth,
            _scopes: &[DependencyScope],
            _include_optional: bool,
        ) -> ProtokResult<Vec<PathBuf>> {
            Ok(vec![PathBuf::from(format!(
                "/repo/{}.{}",
                coordinate.artifact_id,
                coordinate.type_or_jar()
            ))])
        }
    }

    #[test]
    fn versionless_coordinate_is_rejected_before_the_graph_sees_it() {
        let resolver = ArtifactResolver::new(&EchoGraph);
        let mut coord = MavenCoordinate::new("g", "a", "1");
        coord.version = None;
        assert!(resolver.resolve_one(&coord, ResolutionDepth::Direct).is_err());
    }

    #[test]
    fn results_concatenate_in_coordinate_order() {
        let resolver = ArtifactResolver::new(&EchoGraph);
        let coords = vec![
            MavenCoordinate::new("g", "first", "1"),
            MavenCoordinate::new("g", "second", "1"),
        ];
        let paths = resolver
            .resolve_dependencies(&coords, ResolutionDepth::Direct, &[], false)
            .unwrap();
        assert_eq!(
            paths,
            vec![PathBuf::from("/repo/first.jar"), PathBuf::from("/repo/second.jar")]
        );
    }
}
