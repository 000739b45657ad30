//! Shared-library symlink inside each package tree.
//!
//! Plugins import a library the runtime ships. Rather than letting every
//! tree install its own copy, `<id>/node_modules/<lib>` is a symlink to the
//! configured shared library. Package managers prune or trip over such
//! links, so it is removed before every package command and restored after.

use crate::error::{HubError, Result};
use crate::utils::paths::StoragePaths;
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the link for one instance, or `None` when no library is configured
pub fn link_path(paths: &StoragePaths, id: &str, library: Option<&Path>) -> Option<PathBuf> {
    let library = library?;
    let name = library.file_name()?;
    Some(paths.modules_dir(id).join(name))
}

/// Remove the link if it is a symlink. A real directory is left alone.
pub fn unlink_shared_library(paths: &StoragePaths, id: &str, library: Option<&Path>) -> Result<()> {
    let Some(link) = link_path(paths, id, library) else {
        return Ok(());
    };

    match fs::symlink_metadata(&link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(&link).map_err(|e| HubError::io(&link, e))?;
            tracing::debug!(link = %link.display(), "shared library unlinked");
        }
        Ok(_) => tracing::debug!(link = %link.display(), "not a symlink, leaving in place"),
        Err(_) => {}
    }
    Ok(())
}

/// (Re)create the link. Returns whether a link is now in place.
pub fn link_shared_library(paths: &StoragePaths, id: &str, library: Option<&Path>) -> Result<bool> {
    let (Some(library), Some(link)) = (library, link_path(paths, id, library)) else {
        return Ok(false);
    };

    if !library.exists() {
        tracing::warn!(library = %library.display(), "shared library not found, skipping link");
        return Ok(false);
    }

    unlink_shared_library(paths, id, Some(library))?;
    if link.exists() {
        return Ok(false);
    }

    let modules = paths.modules_dir(id);
    fs::create_dir_all(&modules).map_err(|e| HubError::io(&modules, e))?;
    symlink(library, &link)?;
    tracing::debug!(link = %link.display(), target = %library.display(), "shared library linked");
    Ok(true)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| HubError::io(link, e))
}

#[cfg(not(unix))]
fn symlink(_target: &Path, link: &Path) -> Result<()> {
    Err(HubError::PathError(format!(
        "cannot link {} on this platform",
        link.display()
    )))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn link_then_unlink() {
        let dir = tempdir().expect("tempdir");
        let library = dir.path().join("lib/hub-lib");
        fs::create_dir_all(&library).expect("library");
        let paths = StoragePaths::new(dir.path().join("root"));

        assert!(link_shared_library(&paths, "kitchen", Some(&library)).expect("link"));
        let link = paths.modules_dir("kitchen").join("hub-lib");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());

        // relinking replaces the existing link
        assert!(link_shared_library(&paths, "kitchen", Some(&library)).expect("relink"));

        unlink_shared_library(&paths, "kitchen", Some(&library)).expect("unlink");
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(library.exists());
    }

    #[test]
    fn real_directory_is_never_removed() {
        let dir = tempdir().expect("tempdir");
        let library = dir.path().join("hub-lib");
        fs::create_dir_all(&library).expect("library");
        let paths = StoragePaths::new(dir.path().join("root"));
        let installed = paths.modules_dir("kitchen").join("hub-lib");
        fs::create_dir_all(&installed).expect("installed copy");

        unlink_shared_library(&paths, "kitchen", Some(&library)).expect("unlink");
        assert!(installed.is_dir());
        assert!(!link_shared_library(&paths, "kitchen", Some(&library)).expect("link"));
    }

    #[test]
    fn nothing_configured_is_a_no_op() {
        let dir = tempdir().expect("tempdir");
        let paths = StoragePaths::new(dir.path());
        assert!(!link_shared_library(&paths, "kitchen", None).expect("link"));
        unlink_shared_library(&paths, "kitchen", None).expect("unlink");
    }
}
