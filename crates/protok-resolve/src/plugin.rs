//! Resolution of code-generator plugins.
//!
//! Native plugins resolve the same three ways protoc does (coordinate,
//! URI, host path). JVM plugins resolve their full runtime classpath and
//! are wrapped in a launcher script so protoc can exec them like any
//! other binary.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha1::{Digest as _, Sha1};

use protok_core::descriptor::{PluginDescriptor, PluginSource};
use protok_core::MavenCoordinate;
use protok_digest::Digest;
use protok_fetch::{ScratchSpace, UriFetcher};
use protok_platform::classifier::platform_classifier;
use protok_platform::HostSystem;
use protok_util::errors::{ProtokError, ProtokResult};

use crate::graph::{
    ArtifactResolver, DependencyGraph, ResolutionDepth, JVM_PLUGIN_SCOPES,
};
use crate::launcher::JvmLauncherFactory;

/// A plugin ready to hand to protoc: a unique id, an executable path,
/// and the pass-through settings from its descriptor.
#[derive(Debug, Clone)]
pub struct ResolvedPlugin {
    pub id: String,
    pub path: PathBuf,
    pub order: i32,
    pub options: Option<String>,
    pub output_dir: PathBuf,
}

/// Resolves configured plugin descriptors in declaration order.
pub struct PluginResolver<'a> {
    host: &'a HostSystem,
    fetcher: &'a UriFetcher,
    scratch: &'a ScratchSpace,
    artifacts: ArtifactResolver<'a>,
}

impl<'a> PluginResolver<'a> {
    pub fn new(
        host: &'a HostSystem,
        fetcher: &'a UriFetcher,
        scratch: &'a ScratchSpace,
        graph: &'a dyn DependencyGraph,
    ) -> Self {
        Self {
            host,
            fetcher,
            scratch,
            artifacts: ArtifactResolver::new(graph),
        }
    }

    /// Resolve every descriptor. Skipped descriptors vanish silently;
    /// optional descriptors whose resource is absent vanish with a
    /// warning. Integrity failures are never suppressed.
    ///
    /// The result is ordered by `(order, declaration index)`.
    pub fn resolve_all(
        &self,
        descriptors: &[PluginDescriptor],
        default_output_dir: &Path,
    ) -> ProtokResult<Vec<ResolvedPlugin>> {
        let mut resolved = Vec::new();
        let mut jvm_index = 0usize;

        // The java lookup only has to succeed when a JVM plugin is
        // actually configured.
        let needs_jvm = descriptors
            .iter()
            .any(|d| !d.skip && matches!(d.source, PluginSource::Jvm { .. }));
        let launchers = if needs_jvm {
            Some(JvmLauncherFactory::new(self.host, self.scratch)?)
        } else {
            None
        };

        for descriptor in descriptors {
            if descriptor.skip {
                tracing::debug!("skipping disabled plugin {}", descriptor.identity());
                continue;
            }

            let entry = match &descriptor.source {
                PluginSource::Jvm {
                    coordinate,
                    main_class,
                    jvm_args,
                    jvm_config_args,
                } => {
                    let id = format!("{}-{jvm_index}", sha1_hex(&descriptor.identity()));
                    jvm_index += 1;
                    let factory =
                        launchers.as_ref().ok_or_else(|| ProtokError::Resolution {
                            message: "JVM launcher factory unavailable".to_string(),
                        })?;
                    self.resolve_jvm(
                        factory,
                        &id,
                        coordinate,
                        main_class.as_deref(),
                        jvm_args,
                        jvm_config_args,
                    )?
                    .map(|path| (id, path))
                }
                native => self
                    .resolve_native(native)?
                    .map(|path| (sha1_hex(&path.to_string_lossy()), path)),
            };

            match entry {
                Some((id, path)) => resolved.push(ResolvedPlugin {
                    id,
                    path,
                    order: descriptor.order,
                    options: descriptor.options.clone(),
                    output_dir: descriptor
                        .output_dir
                        .clone()
                        .unwrap_or_else(|| default_output_dir.to_path_buf()),
                }),
                None if descriptor.optional => {
                    tracing::warn!(
                        "optional plugin {} is not available, continuing without it",
                        describe(&descriptor.source)
                    );
                }
                None => {
                    return Err(ProtokError::Resolution {
                        message: format!("plugin {} could not be resolved", describe(&descriptor.source)),
                    }
                    .into())
                }
            }
        }

        resolved.sort_by_key(|p| p.order);
        Ok(resolved)
    }

    /// Resolve a native plugin. `Ok(None)` means the resource is merely
    /// absent, which is only tolerated for optional descriptors.
    fn resolve_native(&self, source: &PluginSource) -> ProtokResult<Option<PathBuf>> {
        match source {
            PluginSource::Path { name } => Ok(self.host.search_executable(name)),
            PluginSource::Uri { uri, digest } => {
                let Some(path) = self.fetcher.fetch(uri, ".exe")? else {
                    return Ok(None);
                };
                if let Some(expected) = digest {
                    Digest::parse(expected)?.verify_file(&path)?;
                }
                protok_util::fs::make_executable(&path)?;
                Ok(Some(path))
            }
            PluginSource::Coordinate { coordinate } => {
                let mut coordinate = coordinate.clone();
                if coordinate.r#type.is_none() {
                    coordinate = coordinate.with_type("exe");
                }
                if coordinate.classifier.is_none() {
                    let classifier = platform_classifier(self.host, &coordinate.artifact_id)?;
                    coordinate = coordinate.with_classifier(classifier);
                }
                let paths = self
                    .artifacts
                    .resolve_one(&coordinate, ResolutionDepth::Direct)?;
                match paths.into_iter().next() {
                    Some(path) => {
                        protok_util::fs::make_executable(&path)?;
                        Ok(Some(path))
                    }
                    None => Ok(None),
                }
            }
            PluginSource::Jvm { .. } => unreachable!("JVM plugins resolve separately"),
        }
    }

    fn resolve_jvm(
        &self,
        factory: &JvmLauncherFactory<'_>,
        id: &str,
        coordinate: &MavenCoordinate,
        configured_main_class: Option<&str>,
        jvm_args: &[String],
        jvm_config_args: &[String],
    ) -> ProtokResult<Option<PathBuf>> {
        let classpath = self.artifacts.resolve_dependencies(
            std::slice::from_ref(coordinate),
            ResolutionDepth::Transitive,
            JVM_PLUGIN_SCOPES,
            false,
        )?;
        let Some(entrypoint) = classpath.first() else {
            return Ok(None);
        };

        let main_class = match configured_main_class {
            Some(explicit) => explicit.to_string(),
            None => main_class_of(entrypoint)?,
        };

        let launcher =
            factory.write_launcher(id, &classpath, &main_class, jvm_config_args, jvm_args)?;
        tracing::debug!(
            "JVM plugin {coordinate} wrapped as {} (main class {main_class})",
            launcher.display()
        );
        Ok(Some(launcher))
    }
}

/// Determine the main class of a JVM plugin entrypoint from its JAR
/// manifest.
fn main_class_of(entrypoint: &Path) -> ProtokResult<String> {
    if entrypoint.is_dir() {
        return Err(ProtokError::Resolution {
            message: format!(
                "JVM plugin entrypoint {} is a directory; configure main_class explicitly",
                entrypoint.display()
            ),
        }
        .into());
    }
    let manifest = read_manifest(entrypoint)?;
    manifest
        .as_deref()
        .and_then(manifest_main_class)
        .ok_or_else(|| {
            ProtokError::Resolution {
                message: format!(
                    "JVM plugin entrypoint {} declares no Main-Class; configure main_class explicitly",
                    entrypoint.display()
                ),
            }
            .into()
        })
}

fn read_manifest(jar: &Path) -> ProtokResult<Option<String>> {
    let file = std::fs::File::open(jar).map_err(ProtokError::Io)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ProtokError::Resolution {
        message: format!("cannot open {} as a JAR: {e}", jar.display()),
    })?;
    let mut entry = match archive.by_name("META-INF/MANIFEST.MF") {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ProtokError::Resolution {
                message: format!("cannot read manifest of {}: {e}", jar.display()),
            }
            .into())
        }
    };
    let mut buf = String::new();
    entry.read_to_string(&mut buf).map_err(ProtokError::Io)?;
    Ok(Some(buf))
}

/// Extract `Main-Class` from manifest text, honoring the 72-byte line
/// wrapping of the JAR spec (continuation lines start with a space).
fn manifest_main_class(manifest: &str) -> Option<String> {
    let mut unfolded: Vec<String> = Vec::new();
    for line in manifest.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some(last) = unfolded.last_mut() {
                last.push_str(continuation);
                continue;
            }
        }
        unfolded.push(line.to_string());
    }
    for line in unfolded {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("Main-Class") {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn describe(source: &PluginSource) -> String {
    match source {
        PluginSource::Coordinate { coordinate } => coordinate.to_string(),
        PluginSource::Path { name } => format!("`{name}` (host path)"),
        PluginSource::Uri { uri, .. } => uri.clone(),
        PluginSource::Jvm { coordinate, .. } => format!("{coordinate} (JVM)"),
    }
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
