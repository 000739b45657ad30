use crate::archive::{self, ArchiveScope};
use crate::error::{HubError, Result};
use crate::instances::lifecycle;
use crate::traits::AppContext;
use crate::ui as output;
use colored::Colorize;
use std::path::Path;

pub fn backup_full(ctx: &AppContext) -> Result<()> {
    let name = archive::backup_full(ctx)?;
    output::success(&format!("Backup written: {}", name));
    output::keyval("Location", &ctx.paths.backups_dir().display().to_string());
    Ok(())
}

pub fn backup_instance(ctx: &AppContext, name: &str) -> Result<()> {
    let file = archive::backup_instance(ctx, name)?;
    output::success(&format!("Instance backup written: {}", file));
    Ok(())
}

pub fn export(ctx: &AppContext, name: &str, output_path: Option<&Path>) -> Result<()> {
    let dest = match output_path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let path = archive::export(ctx, name, &dest)?;
    output::success(&format!("Exported '{}' to {}", name, path.display()));
    Ok(())
}

pub fn list(ctx: &AppContext, json: bool) -> Result<()> {
    let backups = archive::list_backups(&ctx.paths)?;

    if json {
        let rows: Vec<_> = backups
            .iter()
            .map(|b| {
                serde_json::json!({
                    "fileName": b.file_name,
                    "path": b.path,
                    "size": b.size,
                    "scope": b.scope,
                    "createdAt": b.created_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if backups.is_empty() {
        output::info("No backups yet.");
        return Ok(());
    }

    output::header(&format!("Backups ({})", backups.len()));
    for backup in &backups {
        let when = backup
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        let scope = match backup.scope {
            ArchiveScope::Full => "full",
            ArchiveScope::SingleInstance => "instance",
        };
        println!(
            "  {}  {}  {}  {}",
            backup.file_name.cyan(),
            when,
            scope.dimmed(),
            format_size(backup.size).dimmed()
        );
    }
    Ok(())
}

pub fn restore(ctx: &AppContext, path: &Path, remove_source: bool, yes: bool) -> Result<()> {
    let metadata = archive::read_metadata(path)?;

    if metadata.scope == ArchiveScope::Full
        && !yes
        && !output::prompt_yes_no(&format!(
            "Replace everything under {} with this backup?",
            ctx.paths.root().display()
        ))
    {
        output::info("Aborted.");
        return Ok(());
    }

    let report = archive::restore(ctx, path, remove_source)?;
    output::success(&format!(
        "Restored {} instance(s) from {} (created on {})",
        report.instances.len(),
        path.display(),
        if report.metadata.host.is_empty() { "unknown host" } else { report.metadata.host.as_str() }
    ));
    for id in &report.units_created {
        output::indent(&format!("service unit created for '{}'", id), 1);
    }

    if report.is_clean() {
        return Ok(());
    }
    for failure in &report.failures {
        output::warning(failure);
    }
    Err(HubError::Other(
        "restore finished with errors; re-run it to converge".to_string(),
    ))
}

pub fn reset(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes
        && !output::prompt_yes_no(&format!(
            "Delete every instance under {} (a backup is taken first)?",
            ctx.paths.root().display()
        ))
    {
        output::info("Aborted.");
        return Ok(());
    }

    let backup = lifecycle::reset(ctx)?;
    output::success("All instances removed");
    output::keyval("Backup", &backup);
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
