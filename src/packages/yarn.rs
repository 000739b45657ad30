//! yarn package tool

use super::{run_in_tree, validate_spec};
use crate::error::Result;
use crate::traits::PackageTool;
use crate::utils::sanitize;
use std::path::Path;

const PROGRAM: &str = "yarn";

#[derive(Debug, Default)]
pub struct YarnTool;

impl YarnTool {
    pub fn new() -> Self {
        Self
    }
}

impl PackageTool for YarnTool {
    fn name(&self) -> &'static str {
        PROGRAM
    }

    fn is_available(&self) -> bool {
        which::which(PROGRAM).is_ok()
    }

    fn add(&self, dir: &Path, spec: &str) -> Result<()> {
        validate_spec(spec)?;
        run_in_tree(
            PROGRAM,
            dir,
            &["add".to_string(), "--non-interactive".to_string(), spec.to_string()],
        )
    }

    fn remove(&self, dir: &Path, name: &str) -> Result<()> {
        sanitize::validate_package_name(name)?;
        run_in_tree(
            PROGRAM,
            dir,
            &["remove".to_string(), "--non-interactive".to_string(), name.to_string()],
        )
    }

    fn upgrade(&self, dir: &Path, specs: &[String]) -> Result<()> {
        for spec in specs {
            validate_spec(spec)?;
        }
        let mut args = vec!["upgrade".to_string(), "--non-interactive".to_string()];
        args.extend(specs.iter().cloned());
        run_in_tree(PROGRAM, dir, &args)
    }

    fn install_all(&self, dir: &Path) -> Result<()> {
        run_in_tree(
            PROGRAM,
            dir,
            &["install".to_string(), "--non-interactive".to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HubError;
    use tempfile::tempdir;

    #[test]
    fn bad_tag_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let err = YarnTool::new()
            .upgrade(dir.path(), &["lamp@$(whoami)".to_string()])
            .unwrap_err();
        assert!(matches!(err, HubError::Validation(_)));
    }
}
