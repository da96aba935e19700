//! Executable resolution for the protok build integration.
//!
//! Turns descriptors into executables on disk: the protoc compiler
//! itself, native code-generator plugins, and JVM plugins wrapped in
//! OS-native launcher scripts. Package-repository access goes through the
//! [`DependencyGraph`](graph::DependencyGraph) contract; this crate never
//! talks to a repository itself.

pub mod graph;
pub mod launcher;
pub mod plugin;
pub mod protoc;

pub use graph::{ArtifactResolver, DependencyGraph, DependencyScope, ResolutionDepth};
pub use plugin::{PluginResolver, ResolvedPlugin};
pub use protoc::ProtocResolver;
