//! Construction of the protoc argument file.
//!
//! Token order is fixed so identical inputs always produce identical
//! argument files: proto paths (imports before sources), plugin pairs in
//! `(order, declaration index)` order, builtin outputs, then the sorted
//! source files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use protok_fetch::ScratchSpace;
use protok_resolve::ResolvedPlugin;
use protok_util::argfile;
use protok_util::errors::ProtokResult;

/// A built-in protoc generator (`java`, `kotlin`, `cpp`, ...) and where
/// its output goes.
#[derive(Debug, Clone)]
pub struct BuiltinOutput {
    pub lang: String,
    pub options: Option<String>,
    pub output_dir: PathBuf,
}

impl BuiltinOutput {
    pub fn new(lang: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            lang: lang.into(),
            options: None,
            output_dir: output_dir.into(),
        }
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }
}

/// Everything needed to run protoc once, or to report outputs without
/// running it.
#[derive(Debug)]
pub struct InvocationPlan {
    pub protoc: PathBuf,
    pub argfile_path: PathBuf,
    pub tokens: Vec<String>,
    pub output_dirs: Vec<PathBuf>,
    pub sources_to_compile: Vec<PathBuf>,
}

/// Build the argument file and the plan around it. The argument file is
/// written into scratch space even when there is nothing to compile, so
/// a failed run leaves its arguments on disk for inspection.
pub fn plan(
    scratch: &ScratchSpace,
    protoc: PathBuf,
    import_roots: &[PathBuf],
    source_roots: &[PathBuf],
    plugins: &[ResolvedPlugin],
    builtins: &[BuiltinOutput],
    sources_to_compile: &[PathBuf],
) -> ProtokResult<InvocationPlan> {
    let tokens = build_tokens(import_roots, source_roots, plugins, builtins, sources_to_compile);

    let argfile_path = scratch.dir(&["protoc-args"])?.join("args.txt");
    protok_util::fs::atomic_write(&argfile_path, argfile::protoc_argfile(&tokens).as_bytes())?;

    let mut output_dirs = Vec::new();
    let mut seen = BTreeSet::new();
    for dir in plugins
        .iter()
        .map(|p| p.output_dir.as_path())
        .chain(builtins.iter().map(|b| b.output_dir.as_path()))
    {
        if seen.insert(dir.to_path_buf()) {
            output_dirs.push(dir.to_path_buf());
        }
    }

    let mut sources = sources_to_compile.to_vec();
    sources.sort();

    Ok(InvocationPlan {
        protoc,
        argfile_path,
        tokens,
        output_dirs,
        sources_to_compile: sources,
    })
}

fn build_tokens(
    import_roots: &[PathBuf],
    source_roots: &[PathBuf],
    plugins: &[ResolvedPlugin],
    builtins: &[BuiltinOutput],
    sources_to_compile: &[PathBuf],
) -> Vec<String> {
    let mut tokens = Vec::new();

    let mut seen_roots = BTreeSet::new();
    for root in import_roots.iter().chain(source_roots) {
        if seen_roots.insert(root.clone()) {
            tokens.push(format!("--proto_path={}", root.display()));
        }
    }

    let mut ordered: Vec<&ResolvedPlugin> = plugins.iter().collect();
    ordered.sort_by_key(|p| p.order);
    for plugin in ordered {
        tokens.push(format!(
            "--plugin=protoc-gen-{}={}",
            plugin.id,
            plugin.path.display()
        ));
        tokens.push(out_flag(&plugin.id, plugin.options.as_deref(), &plugin.output_dir));
    }

    for builtin in builtins {
        tokens.push(out_flag(
            &builtin.lang,
            builtin.options.as_deref(),
            &builtin.output_dir,
        ));
    }

    let mut sources = sources_to_compile.to_vec();
    sources.sort();
    for source in sources {
        tokens.push(source.display().to_string());
    }

    tokens
}

fn out_flag(name: &str, options: Option<&str>, dir: &Path) -> String {
    match options {
        Some(options) => format!("--{name}_out={options}:{}", dir.display()),
        None => format!("--{name}_out={}", dir.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(id: &str, order: i32, out: &str) -> ResolvedPlugin {
        ResolvedPlugin {
            id: id.to_string(),
            path: PathBuf::from(format!("/bin/{id}")),
            order,
            options: None,
            output_dir: PathBuf::from(out),
        }
    }

    #[test]
    fn token_order_is_paths_plugins_builtins_sources() {
        let tokens = build_tokens(
            &[PathBuf::from("/imports")],
            &[PathBuf::from("/src")],
            &[plugin("grpc", 0, "/out/grpc")],
            &[BuiltinOutput::new("java", "/out/java")],
            &[PathBuf::from("/src/b.proto"), PathBuf::from("/src/a.proto")],
        );
        assert_eq!(
            tokens,
            vec![
                "--proto_path=/imports",
                "--proto_path=/src",
                "--plugin=protoc-gen-grpc=/bin/grpc",
                "--grpc_out=/out/grpc",
                "--java_out=/out/java",
                "/src/a.proto",
                "/src/b.proto",
            ]
        );
    }

    #[test]
    fn duplicate_roots_keep_their_first_position() {
        let tokens = build_tokens(
            &[PathBuf::from("/a"), PathBuf::from("/b")],
            &[PathBuf::from("/a")],
            &[],
            &[],
            &[],
        );
        assert_eq!(tokens, vec!["--proto_path=/a", "--proto_path=/b"]);
    }

    #[test]
    fn plugin_options_join_the_out_flag() {
        let mut p = plugin("doc", 0, "/out");
        p.options = Some("markdown,docs.md".to_string());
        let tokens = build_tokens(&[], &[], &[p], &[], &[]);
        assert_eq!(tokens[1], "--doc_out=markdown,docs.md:/out");
    }

    #[test]
    fn plugins_order_by_declared_order() {
        let tokens = build_tokens(
            &[],
            &[],
            &[plugin("late", 9, "/out"), plugin("early", 1, "/out")],
            &[],
            &[],
        );
        assert!(tokens[0].contains("early"));
        assert!(tokens[2].contains("late"));
    }

    #[test]
    fn builtin_options_format_matches_plugins() {
        let tokens = build_tokens(
            &[],
            &[],
            &[],
            &[BuiltinOutput::new("java", "/gen").with_options("lite")],
            &[],
        );
        assert_eq!(tokens, vec!["--java_out=lite:/gen"]);
    }
}
