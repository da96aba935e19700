use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use protok_core::descriptor::{PluginDescriptor, PluginSource};
use protok_core::MavenCoordinate;
use protok_fetch::{ScratchSpace, UriFetcher};
use protok_platform::{CpuArch, HostSystem, OperatingSystem};
use protok_resolve::{DependencyGraph, DependencyScope, PluginResolver, ResolutionDepth};
use protok_util::errors::ProtokResult;

struct StaticGraph {
    paths: Vec<PathBuf>,
}

impl DependencyGraph for StaticGraph {
    fn resolve(
        &self,
        _coordinate: &MavenCoordinate,
        _depth: ResolutionDepth,
        _scopes: &[DependencyScope],
        _include_optional: bool,
    ) -> ProtokResult<Vec<PathBuf>> {
        Ok(self.paths.clone())
    }
}

#[cfg(unix)]
fn make_executable_file(dir: &Path, name: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn make_jar(path: &Path, manifest: Option<&str>) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    if let Some(manifest) = manifest {
        writer
            .start_file("META-INF/MANIFEST.MF".to_string(), options)
            .unwrap();
        writer.write_all(manifest.as_bytes()).unwrap();
    }
    writer
        .start_file("com/example/Placeholder.class".to_string(), options)
        .unwrap();
    writer.write_all(b"\xca\xfe\xba\xbe").unwrap();
    writer.finish().unwrap();
}

struct Fixture {
    _tmp: tempfile::TempDir,
    build_dir: PathBuf,
    host: HostSystem,
    scratch: ScratchSpace,
    fetcher: UriFetcher,
    output_dir: PathBuf,
}

fn fixture(search_dirs: Vec<PathBuf>) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let build_dir = tmp.path().join("build");
    let scratch = ScratchSpace::new(&build_dir, None, None);
    let fetcher = UriFetcher::with_handlers(scratch.clone(), true, HashMap::new());
    let host = HostSystem::with_values(
        OperatingSystem::Linux,
        CpuArch::X86_64,
        search_dirs,
        Vec::new(),
    );
    let output_dir = tmp.path().join("generated");
    Fixture {
        _tmp: tmp,
        build_dir,
        host,
        scratch,
        fetcher,
        output_dir,
    }
}

#[test]
fn optional_missing_uri_plugin_is_omitted() {
    let fx = fixture(Vec::new());
    let graph = StaticGraph { paths: Vec::new() };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptors = vec![PluginDescriptor::new(PluginSource::Uri {
        uri: "file:///does/not/exist".to_string(),
        digest: None,
    })
    .optional()];

    let resolved = resolver.resolve_all(&descriptors, &fx.output_dir).unwrap();
    assert!(resolved.is_empty());
}

#[test]
fn required_missing_plugin_is_fatal() {
    let fx = fixture(Vec::new());
    let graph = StaticGraph { paths: Vec::new() };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptors = vec![PluginDescriptor::new(PluginSource::Uri {
        uri: "file:///does/not/exist".to_string(),
        digest: None,
    })];

    assert!(resolver.resolve_all(&descriptors, &fx.output_dir).is_err());
}

#[test]
fn skipped_plugins_are_silently_dropped() {
    let fx = fixture(Vec::new());
    let graph = StaticGraph { paths: Vec::new() };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptors = vec![PluginDescriptor::new(PluginSource::Path {
        name: "protoc-gen-missing".to_string(),
    })
    .skipped()];

    let resolved = resolver.resolve_all(&descriptors, &fx.output_dir).unwrap();
    assert!(resolved.is_empty());
}

#[test]
#[cfg(unix)]
fn path_plugin_gets_a_stable_sha1_id() {
    let bin_dir = tempfile::tempdir().unwrap();
    let bin = make_executable_file(bin_dir.path(), "protoc-gen-doc");

    let fx = fixture(vec![bin_dir.path().to_path_buf()]);
    let graph = StaticGraph { paths: Vec::new() };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptors = vec![PluginDescriptor::new(PluginSource::Path {
        name: "protoc-gen-doc".to_string(),
    })
    .with_options("annotate_code")];

    let resolved = resolver.resolve_all(&descriptors, &fx.output_dir).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].path, bin);
    assert_eq!(resolved[0].id.len(), 40);
    assert!(resolved[0].id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(resolved[0].options.as_deref(), Some("annotate_code"));
    assert_eq!(resolved[0].output_dir, fx.output_dir);
}

#[test]
#[cfg(unix)]
fn plugins_sort_by_order_with_stable_ties() {
    let bin_dir = tempfile::tempdir().unwrap();
    for name in ["gen-a", "gen-b", "gen-c"] {
        make_executable_file(bin_dir.path(), name);
    }

    let fx = fixture(vec![bin_dir.path().to_path_buf()]);
    let graph = StaticGraph { paths: Vec::new() };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptors = vec![
        PluginDescriptor::new(PluginSource::Path { name: "gen-a".into() }).with_order(5),
        PluginDescriptor::new(PluginSource::Path { name: "gen-b".into() }).with_order(1),
        PluginDescriptor::new(PluginSource::Path { name: "gen-c".into() }).with_order(5),
    ];

    let resolved = resolver.resolve_all(&descriptors, &fx.output_dir).unwrap();
    let names: Vec<String> = resolved
        .iter()
        .map(|p| p.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["gen-b", "gen-a", "gen-c"]);
}

#[test]
#[cfg(unix)]
fn jvm_plugin_is_wrapped_in_a_launcher() {
    use std::os::unix::fs::PermissionsExt;

    let java_dir = tempfile::tempdir().unwrap();
    make_executable_file(java_dir.path(), "java");

    let deps_dir = tempfile::tempdir().unwrap();
    let entrypoint = deps_dir.path().join("generator-1.0.jar");
    make_jar(
        &entrypoint,
        Some("Manifest-Version: 1.0\r\nMain-Class: com.example.GeneratorMain\r\n\r\n"),
    );
    let dep = deps_dir.path().join("support-2.0.jar");
    make_jar(&dep, None);

    let fx = fixture(vec![java_dir.path().to_path_buf()]);
    let graph = StaticGraph {
        paths: vec![entrypoint.clone(), dep.clone()],
    };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptors = vec![PluginDescriptor::new(PluginSource::Jvm {
        coordinate: MavenCoordinate::new("com.example", "generator", "1.0"),
        main_class: None,
        jvm_args: vec!["--strict".to_string()],
        jvm_config_args: Vec::new(),
    })];

    let resolved = resolver.resolve_all(&descriptors, &fx.output_dir).unwrap();
    assert_eq!(resolved.len(), 1);
    let plugin = &resolved[0];

    // Identity is the descriptor hash plus the JVM ordinal.
    assert!(plugin.id.ends_with("-0"));

    // The launcher exists, is executable, and invokes java with @argfile.
    assert!(plugin.path.is_file());
    let mode = std::fs::metadata(&plugin.path).unwrap().permissions().mode();
    assert_ne!(mode & 0o111, 0);
    let script = std::fs::read_to_string(&plugin.path).unwrap();
    assert!(script.contains("set -o errexit"));
    assert!(script.contains("@"));

    // The argument file carries the classpath, the manifest main class,
    // and the application arguments.
    let argfile = plugin.path.parent().unwrap().join("args.txt");
    let args = std::fs::read_to_string(&argfile).unwrap();
    let lines: Vec<&str> = args.lines().collect();
    assert_eq!(lines[0], "-classpath");
    assert!(lines[1].contains("generator-1.0.jar"));
    assert!(lines[1].contains(&format!(":{}", dep.display())));
    assert!(lines.contains(&"com.example.GeneratorMain"));
    assert_eq!(lines.last().unwrap(), &"--strict");
    assert!(args.ends_with('\n'));

    // Everything landed inside this goal's scratch space.
    assert!(plugin.path.starts_with(&fx.build_dir));
}

#[test]
#[cfg(unix)]
fn jvm_plugin_without_main_class_names_the_entrypoint() {
    let java_dir = tempfile::tempdir().unwrap();
    make_executable_file(java_dir.path(), "java");

    let deps_dir = tempfile::tempdir().unwrap();
    let entrypoint = deps_dir.path().join("no-main.jar");
    make_jar(&entrypoint, Some("Manifest-Version: 1.0\r\n\r\n"));

    let fx = fixture(vec![java_dir.path().to_path_buf()]);
    let graph = StaticGraph {
        paths: vec![entrypoint.clone()],
    };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptors = vec![PluginDescriptor::new(PluginSource::Jvm {
        coordinate: MavenCoordinate::new("com.example", "no-main", "1.0"),
        main_class: None,
        jvm_args: Vec::new(),
        jvm_config_args: Vec::new(),
    })];

    let err = resolver.resolve_all(&descriptors, &fx.output_dir).unwrap_err();
    assert!(err.to_string().contains("no-main.jar"));
}

#[test]
#[cfg(unix)]
fn identical_jvm_descriptors_get_distinct_ids() {
    let java_dir = tempfile::tempdir().unwrap();
    make_executable_file(java_dir.path(), "java");

    let deps_dir = tempfile::tempdir().unwrap();
    let entrypoint = deps_dir.path().join("gen.jar");
    make_jar(
        &entrypoint,
        Some("Manifest-Version: 1.0\r\nMain-Class: com.example.Main\r\n\r\n"),
    );

    let fx = fixture(vec![java_dir.path().to_path_buf()]);
    let graph = StaticGraph {
        paths: vec![entrypoint.clone()],
    };
    let resolver = PluginResolver::new(&fx.host, &fx.fetcher, &fx.scratch, &graph);

    let descriptor = PluginDescriptor::new(PluginSource::Jvm {
        coordinate: MavenCoordinate::new("com.example", "gen", "1.0"),
        main_class: None,
        jvm_args: Vec::new(),
        jvm_config_args: Vec::new(),
    });
    let descriptors = vec![descriptor.clone(), descriptor];

    let resolved = resolver.resolve_all(&descriptors, &fx.output_dir).unwrap();
    assert_eq!(resolved.len(), 2);
    assert_ne!(resolved[0].id, resolved[1].id);
    assert_ne!(resolved[0].path, resolved[1].path);
}
