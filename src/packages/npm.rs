//! npm package tool
//!
//! Operates on a local package tree; never touches the global prefix.

use super::{run_in_tree, validate_spec};
use crate::error::Result;
use crate::traits::PackageTool;
use crate::utils::sanitize;
use std::path::Path;

const PROGRAM: &str = "npm";

#[derive(Debug, Default)]
pub struct NpmTool;

impl NpmTool {
    pub fn new() -> Self {
        Self
    }
}

impl PackageTool for NpmTool {
    fn name(&self) -> &'static str {
        PROGRAM
    }

    fn is_available(&self) -> bool {
        which::which(PROGRAM).is_ok()
    }

    fn add(&self, dir: &Path, spec: &str) -> Result<()> {
        validate_spec(spec)?;
        let args = vec![
            "install".to_string(),
            "--save".to_string(),
            "--no-audit".to_string(),
            "--no-fund".to_string(),
            spec.to_string(),
        ];
        run_in_tree(PROGRAM, dir, &args)
    }

    fn remove(&self, dir: &Path, name: &str) -> Result<()> {
        sanitize::validate_package_name(name)?;
        let args = vec![
            "uninstall".to_string(),
            "--save".to_string(),
            name.to_string(),
        ];
        run_in_tree(PROGRAM, dir, &args)
    }

    fn upgrade(&self, dir: &Path, specs: &[String]) -> Result<()> {
        for spec in specs {
            validate_spec(spec)?;
        }

        if specs.is_empty() {
            return run_in_tree(PROGRAM, dir, &["update".to_string(), "--save".to_string()]);
        }

        // `npm update` ignores tags, so pinned upgrades go through install
        let mut args = vec!["install".to_string(), "--save".to_string()];
        args.extend(specs.iter().cloned());
        run_in_tree(PROGRAM, dir, &args)
    }

    fn install_all(&self, dir: &Path) -> Result<()> {
        run_in_tree(
            PROGRAM,
            dir,
            &["install".to_string(), "--no-audit".to_string(), "--no-fund".to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HubError;
    use tempfile::tempdir;

    #[test]
    fn unsafe_spec_is_rejected_before_spawning() {
        let dir = tempdir().expect("tempdir");
        let err = NpmTool::new().add(dir.path(), "lamp; rm -rf /").unwrap_err();
        assert!(matches!(err, HubError::Validation(_)));
    }

    #[test]
    fn missing_tree_is_a_path_error() {
        let dir = tempdir().expect("tempdir");
        let err = NpmTool::new()
            .install_all(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, HubError::PathError(_)));
    }
}
