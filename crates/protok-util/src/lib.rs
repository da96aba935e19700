//! Shared utilities for the protok build integration.
//!
//! This crate provides cross-cutting concerns used by all other protok
//! crates: error types, filesystem helpers, process spawning, and the
//! argument-file writers consumed by `java` and `protoc`.

pub mod argfile;
pub mod errors;
pub mod fs;
pub mod process;
