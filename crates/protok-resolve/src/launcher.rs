//! Native launcher scripts for JVM code-generator plugins.
//!
//! protoc executes plugins as plain binaries, so a JVM plugin is
//! represented on disk as a launcher script plus a java argument file.
//! The script invokes the java executable with the single argument
//! `@<argfile>`; everything else (classpath, module path, JVM flags,
//! main class, application arguments) lives in the argument file.

use std::path::{Path, PathBuf};

use protok_fetch::ScratchSpace;
use protok_platform::{HostSystem, OperatingSystem};
use protok_util::errors::ProtokResult;
use protok_util::{argfile, fs};

/// JVM flags applied when the descriptor configures none. Tuned for
/// short-lived generator processes: skip tiered warmup and shared-archive
/// validation.
pub const DEFAULT_JVM_CONFIG_ARGS: &[&str] = &[
    "-Xshare:auto",
    "-XX:+TieredCompilation",
    "-XX:TieredStopAtLevel=1",
];

/// Writes launcher scripts under `<scratch>/java-apps/<id>/`.
pub struct JvmLauncherFactory<'a> {
    host: &'a HostSystem,
    scratch: &'a ScratchSpace,
    java: PathBuf,
}

impl<'a> JvmLauncherFactory<'a> {
    /// Locate the java executable up front; JVM plugins cannot work
    /// without one.
    pub fn new(host: &'a HostSystem, scratch: &'a ScratchSpace) -> ProtokResult<Self> {
        let java = host.java_executable()?;
        Ok(Self {
            host,
            scratch,
            java,
        })
    }

    /// Write the argument file and the OS-specific launcher for one
    /// plugin; returns the launcher path.
    pub fn write_launcher(
        &self,
        id: &str,
        classpath: &[PathBuf],
        main_class: &str,
        jvm_config_args: &[String],
        jvm_args: &[String],
    ) -> ProtokResult<PathBuf> {
        let tokens = self.build_arguments(classpath, main_class, jvm_config_args, jvm_args);
        let dir = self.scratch.dir(&["java-apps", id])?;

        let argfile_path = dir.join("args.txt");
        let argfile_contents = argfile::java_argfile(&tokens);
        self.write_text(&argfile_path, &argfile_contents)?;

        match self.host.os() {
            OperatingSystem::Windows => self.write_batch_launcher(&dir, &argfile_path),
            _ => self.write_sh_launcher(&dir, &argfile_path),
        }
    }

    /// Argument order: classpath, module path (when any dependency is a
    /// Java module), JVM configuration flags, main class, application
    /// arguments.
    fn build_arguments(
        &self,
        classpath: &[PathBuf],
        main_class: &str,
        jvm_config_args: &[String],
        jvm_args: &[String],
    ) -> Vec<String> {
        let separator = self.host.path_separator().to_string();

        let mut tokens = Vec::new();
        tokens.push("-classpath".to_string());
        tokens.push(join_paths(classpath, &separator));

        let mut modules: Vec<String> = classpath
            .iter()
            .filter(|p| is_java_module(p))
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        if !modules.is_empty() {
            modules.sort();
            tokens.push("--module-path".to_string());
            tokens.push(modules.join(&separator));
        }

        let configured: Vec<&str> = if jvm_config_args.is_empty() {
            DEFAULT_JVM_CONFIG_ARGS.to_vec()
        } else {
            jvm_config_args.iter().map(String::as_str).collect()
        };
        for flag in configured {
            if flag.len() > 1 && flag.starts_with('-') {
                tokens.push(flag.to_string());
            } else {
                tracing::warn!("dropping malformed JVM flag `{flag}`");
            }
        }

        tokens.push(main_class.to_string());
        tokens.extend(jvm_args.iter().cloned());
        tokens
    }

    fn write_sh_launcher(&self, dir: &Path, argfile_path: &Path) -> ProtokResult<PathBuf> {
        let script_path = dir.join("invoke.sh");
        let script = format!(
            "#!/usr/bin/env sh\nset -o errexit\nexec {} {}\n",
            argfile::quote_posix(&self.java.to_string_lossy()),
            argfile::quote_posix(&format!("@{}", argfile_path.display())),
        );
        fs::atomic_write(&script_path, script.as_bytes())?;
        fs::make_executable(&script_path)?;
        Ok(script_path)
    }

    fn write_batch_launcher(&self, dir: &Path, argfile_path: &Path) -> ProtokResult<PathBuf> {
        let script_path = dir.join("invoke.bat");
        let script = [
            "@echo off".to_string(),
            format!(
                "{} {}",
                argfile::quote_batch(&self.java.to_string_lossy()),
                argfile::quote_batch(&format!("@{}", argfile_path.display())),
            ),
        ]
        .join("\r\n")
            + "\r\n";
        fs::atomic_write(&script_path, &latin1_bytes(&script))?;
        Ok(script_path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> ProtokResult<()> {
        match self.host.os() {
            OperatingSystem::Windows => fs::atomic_write(path, &latin1_bytes(contents)),
            _ => fs::atomic_write(path, contents.as_bytes()),
        }
    }
}

fn join_paths(paths: &[PathBuf], separator: &str) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(separator)
}

/// A classpath entry is a Java module when it carries a top-level module
/// descriptor, either as an archive entry or as a file in a directory.
pub fn is_java_module(path: &Path) -> bool {
    if path.is_dir() {
        return path.join("module-info.class").is_file();
    }
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let Ok(mut archive) = zip::ZipArchive::new(file) else {
        return false;
    };
    let found = archive.by_name("module-info.class").is_ok();
    found
}

/// ISO-8859-1 encoding for Windows batch files and argument files.
/// Characters outside the code page are replaced with `?`.
fn latin1_bytes(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        let code = c as u32;
        if code <= 0xFF {
            out.push(code as u8);
        } else {
            tracing::warn!("character `{c}` is not representable in ISO-8859-1");
            out.push(b'?');
        }
    }
    out
}
