//! Core data types for the protok build integration.
//!
//! Everything here is a plain value: coordinates, descriptor variants as
//! parsed from the build configuration, and the source listings produced
//! by the scanner. Resolution and execution live in the downstream crates.

pub mod coordinate;
pub mod descriptor;
pub mod inputs;

pub use coordinate::MavenCoordinate;
pub use descriptor::{PluginDescriptor, PluginSource, ProtocDistribution};
pub use inputs::{ProjectInputs, SourceListing};
