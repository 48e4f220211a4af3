//! Directory copy and swap primitives used for package staging.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Recursively copy `src` into `dst`, creating `dst` if needed.
///
/// Symlinks are copied as the files they point to. Returns the number of
/// files copied.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<usize> {
    if !src.is_dir() {
        return Err(Error::NotADirectory {
            path: src.to_path_buf(),
        });
    }
    fs::create_dir_all(dst).map_err(|e| Error::io(dst, e))?;

    let mut copied = 0;
    for entry in fs::read_dir(src).map_err(|e| Error::io(src, e))? {
        let entry = entry.map_err(|e| Error::io(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copied += copy_dir_all(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| Error::io(&from, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Remove a directory tree if it exists.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Replace `target` with the fully prepared directory `staged`.
///
/// The previous `target` (if any) is moved aside first and only deleted once
/// `staged` has been renamed into place; if that rename fails the previous
/// directory is moved back. Both paths must be on the same filesystem.
pub fn swap_dir(staged: &Path, target: &Path) -> Result<()> {
    if !staged.is_dir() {
        return Err(Error::NotADirectory {
            path: staged.to_path_buf(),
        });
    }

    let backup = if target.exists() {
        let backup = backup_path_for(target);
        remove_dir_if_exists(&backup)?;
        fs::rename(target, &backup).map_err(|e| Error::io(target, e))?;
        Some(backup)
    } else {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        None
    };

    if let Err(e) = fs::rename(staged, target) {
        if let Some(backup) = &backup {
            if let Err(restore) = fs::rename(backup, target) {
                tracing::error!(
                    target = %target.display(),
                    error = %restore,
                    "failed to restore previous directory after swap failure"
                );
            }
        }
        return Err(Error::io(target, e));
    }

    if let Some(backup) = backup {
        if let Err(e) = remove_dir_if_exists(&backup) {
            tracing::warn!(backup = %backup.display(), error = %e, "failed to remove old directory");
        }
    }
    Ok(())
}

fn backup_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}.old", name, std::process::id()))
}
