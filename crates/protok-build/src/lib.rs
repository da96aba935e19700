//! Goal execution for the protok build integration.
//!
//! Ties the other crates into the generate pipeline: scan proto trees,
//! decide what changed, build the protoc argument file, run the compiler
//! once, and report generated output directories back to the surrounding
//! build.

pub mod cache;
pub mod exec;
pub mod generate;
pub mod plan;
pub mod scanner;

pub use cache::IncrementalCache;
pub use generate::{run_goal, GenerationGoal, GenerationOutcome, SourceRootKind, SourceRootSink};
pub use plan::{BuiltinOutput, InvocationPlan};
pub use scanner::GlobFilter;
