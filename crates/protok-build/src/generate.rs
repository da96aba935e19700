//! Top-level goal orchestration.
//!
//! One call runs one configured goal execution end to end:
//! validate → resolve → extract → scan → diff → plan → execute → report.
//! The component graph (scratch space, fetcher, resolvers, cache) is
//! built fresh for every execution; nothing is shared across goals.

use std::path::{Path, PathBuf};

use protok_core::descriptor::{PluginDescriptor, PluginSource, ProtocDistribution};
use protok_core::ProjectInputs;
use protok_digest::Digest;
use protok_fetch::{extract, ScratchSpace, UriFetcher};
use protok_platform::HostSystem;
use protok_resolve::{DependencyGraph, PluginResolver, ProtocResolver};
use protok_util::errors::{ProtokError, ProtokResult};

use crate::cache::IncrementalCache;
use crate::plan::{self, BuiltinOutput};
use crate::scanner::{self, GlobFilter};
use crate::{exec, InvocationPlan};

/// Where a generated output directory belongs in the downstream build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRootKind {
    Main,
    Test,
}

/// Receives generated output directories so the surrounding build can
/// compile and package them.
pub trait SourceRootSink {
    fn register(&mut self, dir: &Path, kind: SourceRootKind);
}

/// Configuration of one goal execution, assembled by the surrounding
/// build from its project model.
#[derive(Debug, Clone)]
pub struct GenerationGoal {
    pub goal: String,
    pub execution_id: String,
    /// Root for scratch storage; typically the build's target directory.
    pub build_dir: PathBuf,
    /// Default output directory for plugins without their own.
    pub output_dir: PathBuf,
    /// Directories whose protos are compiled.
    pub source_dirs: Vec<PathBuf>,
    /// Directories that only contribute importable definitions.
    pub import_dirs: Vec<PathBuf>,
    /// Dependency archives whose protos are compiled after extraction.
    pub compilable_archives: Vec<PathBuf>,
    /// Dependency archives that only contribute imports.
    pub import_archives: Vec<PathBuf>,
    pub protoc: ProtocDistribution,
    pub plugins: Vec<PluginDescriptor>,
    pub builtins: Vec<BuiltinOutput>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub output_kind: SourceRootKind,
    pub offline: bool,
}

impl GenerationGoal {
    pub fn new(
        build_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        protoc: ProtocDistribution,
    ) -> Self {
        Self {
            goal: "generate".to_string(),
            execution_id: "default".to_string(),
            build_dir: build_dir.into(),
            output_dir: output_dir.into(),
            source_dirs: Vec::new(),
            import_dirs: Vec::new(),
            compilable_archives: Vec::new(),
            import_archives: Vec::new(),
            protoc,
            plugins: Vec::new(),
            builtins: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            output_kind: SourceRootKind::Main,
            offline: false,
        }
    }
}

/// What a goal execution produced.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub output_dirs: Vec<PathBuf>,
    pub compiled_sources: usize,
    /// True when the incremental cache proved there was nothing to do.
    pub skipped: bool,
}

/// Run one goal execution against the external collaborators.
pub fn run_goal(
    goal: &GenerationGoal,
    graph: &dyn DependencyGraph,
    sink: &mut dyn SourceRootSink,
) -> ProtokResult<GenerationOutcome> {
    validate(goal)?;

    let host = HostSystem::detect();
    let scratch = ScratchSpace::new(
        &goal.build_dir,
        Some(&goal.goal),
        Some(&goal.execution_id),
    );
    let fetcher = UriFetcher::new(scratch.clone(), goal.offline)?;

    // Resolve executables before touching sources so configuration
    // problems surface fast.
    let protoc_path = ProtocResolver::new(&host, &fetcher, graph).resolve(&goal.protoc)?;
    let plugins = PluginResolver::new(&host, &fetcher, &scratch, graph)
        .resolve_all(&goal.plugins, &goal.output_dir)?;

    let inputs = gather_inputs(goal, &scratch)?;

    let cache = IncrementalCache::new(&scratch)?;
    let sources_to_compile = cache.determine_sources_to_compile(&inputs)?;

    let invocation = plan::plan(
        &scratch,
        protoc_path,
        &inputs.import_roots(),
        &inputs.source_roots(),
        &plugins,
        &goal.builtins,
        &sources_to_compile,
    )?;

    ensure_output_dirs(&invocation)?;
    let skipped = sources_to_compile.is_empty();
    if !skipped {
        exec::execute(&invocation)?;
    }

    for dir in &invocation.output_dirs {
        sink.register(dir, goal.output_kind);
    }

    cache.commit()?;

    Ok(GenerationOutcome {
        output_dirs: invocation.output_dirs,
        compiled_sources: sources_to_compile.len(),
        skipped,
    })
}

/// Surface configuration errors before any resolution starts.
fn validate(goal: &GenerationGoal) -> ProtokResult<()> {
    if let ProtocDistribution::Uri {
        digest: Some(digest),
        ..
    } = &goal.protoc
    {
        Digest::parse(digest)?;
    }
    for descriptor in &goal.plugins {
        match &descriptor.source {
            PluginSource::Coordinate { coordinate } | PluginSource::Jvm { coordinate, .. } => {
                if !coordinate.is_well_formed() {
                    return Err(ProtokError::Configuration {
                        message: format!("plugin coordinate `{coordinate}` is incomplete"),
                    }
                    .into());
                }
            }
            PluginSource::Uri {
                digest: Some(digest),
                ..
            } => {
                Digest::parse(digest)?;
            }
            PluginSource::Uri { .. } => {}
            PluginSource::Path { name } => {
                if name.is_empty() {
                    return Err(ProtokError::Configuration {
                        message: "plugin path descriptor has an empty name".to_string(),
                    }
                    .into());
                }
            }
        }
    }
    GlobFilter::new(&goal.includes, &goal.excludes)?;
    Ok(())
}

/// Merge scanned source directories with extracted dependency archives
/// into the execution's inputs.
fn gather_inputs(goal: &GenerationGoal, scratch: &ScratchSpace) -> ProtokResult<ProjectInputs> {
    let filter = GlobFilter::new(&goal.includes, &goal.excludes)?;

    let mut compilable_roots = goal.source_dirs.clone();
    if !goal.compilable_archives.is_empty() {
        let target = scratch.dir(&["archives", "compilable"])?;
        compilable_roots.extend(extract::extract_archives(&goal.compilable_archives, &target)?);
    }

    let mut import_roots = goal.import_dirs.clone();
    if !goal.import_archives.is_empty() {
        let target = scratch.dir(&["archives", "imports"])?;
        import_roots.extend(extract::extract_archives(&goal.import_archives, &target)?);
    }

    let inputs = ProjectInputs {
        compilable_sources: scanner::scan_all(&compilable_roots, &filter)?,
        dependency_sources: scanner::scan_all(&import_roots, &filter)?,
    };
    tracing::debug!(
        "{} compilable and {} dependency proto file(s)",
        inputs.compilable_files().len(),
        inputs.dependency_files().len()
    );
    Ok(inputs)
}

fn ensure_output_dirs(invocation: &InvocationPlan) -> ProtokResult<()> {
    for dir in &invocation.output_dirs {
        protok_util::fs::ensure_dir(dir).map_err(ProtokError::Io)?;
    }
    Ok(())
}
