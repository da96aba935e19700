use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::ProtokError;

/// Ensure a directory exists, creating it and any parents if needed.
///
/// Concurrent callers racing on the same path both observe success.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if path.is_dir() => {
            tracing::trace!("ignoring mkdir race on {}: {e}", path.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Write `contents` to `path` atomically: write a temp file in the same
/// directory, then rename it into place.
pub fn atomic_write(path: &Path, contents: &[u8]) -> miette::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(dir).map_err(ProtokError::Io)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(ProtokError::Io)?;
    tmp.write_all(contents).map_err(ProtokError::Io)?;
    tmp.flush().map_err(ProtokError::Io)?;
    tmp.persist(path)
        .map_err(|e| ProtokError::Io(e.error))?;
    Ok(())
}

/// Mark a file executable for owner, group, and other.
///
/// Idempotent, and tolerates filesystems without POSIX permissions: a
/// failing chmod is logged and swallowed. No-op on non-Unix hosts.
pub fn make_executable(path: &Path) -> miette::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = fs::metadata(path).map_err(ProtokError::Io)?;
        let mut perms = meta.permissions();
        let mode = perms.mode() | 0o111;
        if mode != perms.mode() {
            perms.set_mode(mode);
            if let Err(e) = fs::set_permissions(path, perms) {
                tracing::warn!("cannot set executable bit on {}: {e}", path.display());
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, creating directories as needed.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> miette::Result<()> {
    ensure_dir(dst).map_err(ProtokError::Io)?;
    let entries = fs::read_dir(src).map_err(ProtokError::Io)?;
    for entry in entries.flatten() {
        let path = entry.path();
        let dest = dst.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive(&path, &dest)?;
        } else {
            fs::copy(&path, &dest).map_err(ProtokError::Io)?;
        }
    }
    Ok(())
}

/// The file name of `path` with its final extension removed.
///
/// `protobuf-java-3.25.0.jar` becomes `protobuf-java-3.25.0`; names
/// without an extension are returned unchanged.
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string())
}

/// Collect all regular files under `dir`, depth-first. Used by callers
/// that need a quick non-filtered listing (e.g. extraction verification).
pub fn list_files_recursive(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    collect(dir, &mut out);
    out.sort();
    out
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}
