use std::env;
use std::path::{Path, PathBuf};

use protok_util::errors::{ProtokError, ProtokResult};

/// Operating-system family, as far as protoc distributions care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingSystem {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl OperatingSystem {
    fn detect() -> Self {
        match env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }
}

/// CPU architecture, normalized to the names protoc releases use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuArch {
    X86_32,
    X86_64,
    Aarch64,
    S390x,
    Ppc64le,
    Other,
}

impl CpuArch {
    fn detect() -> Self {
        match env::consts::ARCH {
            "x86" => Self::X86_32,
            "x86_64" => Self::X86_64,
            "aarch64" => Self::Aarch64,
            "s390x" => Self::S390x,
            "powerpc64" => Self::Ppc64le,
            _ => Self::Other,
        }
    }
}

/// Immutable view of the host: OS, architecture, search path, and the
/// executable-extension rules that apply when looking up binaries.
#[derive(Debug, Clone)]
pub struct HostSystem {
    os: OperatingSystem,
    arch: CpuArch,
    search_path: Vec<PathBuf>,
    executable_extensions: Vec<String>,
    java_home: Option<PathBuf>,
}

impl HostSystem {
    /// Detect the host from the process environment.
    pub fn detect() -> Self {
        let os = OperatingSystem::detect();
        Self {
            os,
            arch: CpuArch::detect(),
            search_path: split_search_path(env::var_os("PATH")),
            executable_extensions: executable_extensions_for(os, env::var("PATHEXT").ok()),
            java_home: env::var_os("JAVA_HOME").map(PathBuf::from),
        }
    }

    /// Construct an explicit host. Tests use this to pin any (os, arch)
    /// pair and an arbitrary search path.
    pub fn with_values(
        os: OperatingSystem,
        arch: CpuArch,
        search_path: Vec<PathBuf>,
        executable_extensions: Vec<String>,
    ) -> Self {
        Self {
            os,
            arch,
            search_path,
            executable_extensions,
            java_home: None,
        }
    }

    pub fn os(&self) -> OperatingSystem {
        self.os
    }

    pub fn cpu_arch(&self) -> CpuArch {
        self.arch
    }

    /// Separator for joined path lists (`-classpath`, `--module-path`).
    pub fn path_separator(&self) -> char {
        match self.os {
            OperatingSystem::Windows => ';',
            _ => ':',
        }
    }

    /// Ordered, case-insensitively unique executable extensions. Empty on
    /// POSIX hosts.
    pub fn executable_extensions(&self) -> &[String] {
        &self.executable_extensions
    }

    /// Find `name` on the search path.
    ///
    /// Each directory is tried in order: first the raw name, then the
    /// name with each executable extension appended. The first candidate
    /// that exists and is executable wins; symlinks are followed.
    pub fn search_executable(&self, name: &str) -> Option<PathBuf> {
        for dir in &self.search_path {
            let raw = dir.join(name);
            if is_executable_file(&raw) {
                return Some(raw);
            }
            for ext in &self.executable_extensions {
                let candidate = dir.join(format!("{name}{ext}"));
                if is_executable_file(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Locate the `java` executable: `JAVA_HOME/bin` first, then the
    /// search path.
    pub fn java_executable(&self) -> ProtokResult<PathBuf> {
        if let Some(home) = &self.java_home {
            let bin = home.join("bin");
            let raw = bin.join("java");
            if is_executable_file(&raw) {
                return Ok(raw);
            }
            for ext in &self.executable_extensions {
                let candidate = bin.join(format!("java{ext}"));
                if is_executable_file(&candidate) {
                    return Ok(candidate);
                }
            }
            tracing::warn!("JAVA_HOME is set but {} has no java", bin.display());
        }
        self.search_executable("java").ok_or_else(|| {
            ProtokError::Resolution {
                message: "no java executable on JAVA_HOME or the search path".to_string(),
            }
            .into()
        })
    }
}

fn split_search_path(raw: Option<std::ffi::OsString>) -> Vec<PathBuf> {
    raw.map(|p| env::split_paths(&p).collect()).unwrap_or_default()
}

/// Windows executable extensions from `PATHEXT`, lowercased and
/// case-insensitively deduplicated, preserving order. POSIX hosts get an
/// empty list.
fn executable_extensions_for(os: OperatingSystem, pathext: Option<String>) -> Vec<String> {
    if os != OperatingSystem::Windows {
        return Vec::new();
    }
    let raw = pathext.unwrap_or_else(|| ".EXE;.BAT;.CMD;.COM".to_string());
    let mut out: Vec<String> = Vec::new();
    for ext in raw.split(';') {
        let ext = ext.trim();
        if ext.is_empty() {
            continue;
        }
        let lowered = ext.to_ascii_lowercase();
        if !out.contains(&lowered) {
            out.push(lowered);
        }
    }
    out
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
