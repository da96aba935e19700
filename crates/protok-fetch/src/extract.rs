//! Archive extraction into per-archive directory trees.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use protok_util::errors::{ProtokError, ProtokResult};

/// Extract every archive into `target_dir/<archive-stem>/` and return the
/// extraction roots in input order.
pub fn extract_archives(archives: &[PathBuf], target_dir: &Path) -> ProtokResult<Vec<PathBuf>> {
    let mut roots = Vec::with_capacity(archives.len());
    for archive in archives {
        let root = target_dir.join(protok_util::fs::file_stem_string(archive));
        extract_one(archive, &root)?;
        tracing::debug!("extracted {} to {}", archive.display(), root.display());
        roots.push(root);
    }
    Ok(roots)
}

/// Extract a single zip/jar archive to `dest`.
fn extract_one(archive_path: &Path, dest: &Path) -> ProtokResult<()> {
    let file = fs::File::open(archive_path).map_err(|e| ProtokError::Extraction {
        message: format!("cannot open {}: {e}", archive_path.display()),
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ProtokError::Extraction {
        message: format!("cannot read {} as an archive: {e}", archive_path.display()),
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| ProtokError::Extraction {
            message: format!("entry {i} of {}: {e}", archive_path.display()),
        })?;

        // enclosed_name refuses entries that would escape dest.
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(
                "skipping unsafe entry `{}` in {}",
                entry.name(),
                archive_path.display()
            );
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(ProtokError::Io)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(ProtokError::Io)?;
        }
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| ProtokError::Extraction {
                message: format!(
                    "cannot read `{}` from {}: {e}",
                    entry.name(),
                    archive_path.display()
                ),
            })?;
        fs::write(&out_path, &buf).map_err(ProtokError::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&out_path, fs::Permissions::from_mode(mode));
            }
        }
    }
    Ok(())
}
