//! Host platform model for the protok build integration.
//!
//! Detected once per process from the environment and immutable after
//! that. Everything downstream (resolution, launcher scripts, argument
//! joining) asks this crate instead of touching `cfg!` or `std::env`.

pub mod classifier;
pub mod host;

pub use host::{CpuArch, HostSystem, OperatingSystem};
