use crate::error::Result;
use crate::utils::sanitize;
use std::process::Command;

/// Build a direct program invocation in a platform-aware way.
///
/// - Unix: `program args...` or `sudo program args...`
/// - Elsewhere: `program args...` (elevation unsupported)
pub fn build_program_command(program: &str, args: &[String], elevated: bool) -> Result<Command> {
    #[cfg(unix)]
    {
        let cmd = if elevated && !running_as_root() {
            let mut c = Command::new("sudo");
            c.arg(program);
            c.args(args);
            c
        } else {
            let mut c = Command::new(program);
            c.args(args);
            c
        };

        return Ok(cmd);
    }

    #[cfg(not(unix))]
    {
        if elevated {
            return Err(crate::error::HubError::Other(
                "Elevated execution is not implemented on this platform".to_string(),
            ));
        }

        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}

/// Render a command line for logs and error messages
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(
        args.iter()
            .map(|a| shlex::try_quote(a).map(|q| q.into_owned()).unwrap_or_else(|_| a.clone())),
    );
    sanitize::sanitize_for_display(&parts.join(" "))
}

#[cfg(unix)]
fn running_as_root() -> bool {
    std::env::var("USER").map(|u| u == "root").unwrap_or(false)
        || std::env::var("SUDO_UID").is_ok()
}
