use crate::error::{HubError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Write `content` to a sibling temp file, sync it, then rename over `path`
pub fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        HubError::PathError(format!(
            "Invalid path (no parent directory): {}",
            path.display()
        ))
    })?;
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| HubError::io(dir, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "write".to_string());
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    let mut tmp_file = fs::File::create(&tmp_path).map_err(|e| HubError::io(&tmp_path, e))?;
    tmp_file.write_all(content)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path).map_err(|e| HubError::io(path, e))?;
    Ok(())
}

/// Remove a file or directory tree; a missing path is not an error
pub fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(HubError::io(path, e)),
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| HubError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("file.json");
        write_atomically(&path, b"one").expect("first");
        write_atomically(&path, b"two").expect("second");
        assert_eq!(fs::read_to_string(&path).expect("read"), "two");
        assert!(!dir.path().join("nested").join(".file.json.tmp").exists());
    }

    #[test]
    fn remove_path_handles_missing_and_dirs() {
        let dir = tempdir().expect("tempdir");
        remove_path(&dir.path().join("absent")).expect("missing ok");

        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("a/b")).expect("mkdir");
        fs::write(tree.join("a/b/c"), "x").expect("write");
        remove_path(&tree).expect("remove tree");
        assert!(!tree.exists());
    }
}
