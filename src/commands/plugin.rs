use crate::error::{HubError, Result};
use crate::instances::registry::InstanceRegistry;
use crate::packages::provisioner::PackageProvisioner;
use crate::traits::AppContext;
use crate::ui as output;
use colored::Colorize;

/// Canonical id of an existing instance
fn resolve(ctx: &AppContext, name: &str) -> Result<String> {
    Ok(InstanceRegistry::load(&ctx.paths)?.resolve(name)?.id.clone())
}

fn require_tool(ctx: &AppContext) -> Result<()> {
    if ctx.packages.is_available() {
        Ok(())
    } else {
        Err(HubError::PackageManagerError(format!(
            "'{}' is not installed on this host",
            ctx.packages.name()
        )))
    }
}

pub fn list(ctx: &mut AppContext, instance: &str, json: bool) -> Result<()> {
    let id = resolve(ctx, instance)?;
    let plugins = PackageProvisioner::new(ctx).plugins(&id)?;

    if json {
        let rows: Vec<_> = plugins
            .iter()
            .map(|plugin| {
                serde_json::json!({
                    "plugin": plugin,
                    "capabilities": ctx.inspector.discover(plugin),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if plugins.is_empty() {
        output::info(&format!("No plugins installed in '{}'.", id));
        return Ok(());
    }

    output::header(&format!("Plugins of {} ({})", id, plugins.len()));
    for plugin in &plugins {
        let capabilities = ctx.inspector.discover(plugin);
        let aliases = if capabilities.is_empty() {
            "no capabilities found".dimmed().to_string()
        } else {
            capabilities
                .iter()
                .map(|c| format!("{} ({})", c.alias, c.kind))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {} {}  {}",
            plugin.name.cyan().bold(),
            plugin.version.dimmed(),
            aliases
        );
    }
    Ok(())
}

pub fn install(ctx: &mut AppContext, instance: &str, plugin: &str, tag: Option<&str>) -> Result<()> {
    let id = resolve(ctx, instance)?;
    require_tool(ctx)?;

    let outcome = PackageProvisioner::new(ctx).install(&id, plugin, tag)?;
    output::success(&format!(
        "Installed {}@{} into '{}'",
        outcome.plugin.name.cyan(),
        outcome.plugin.version,
        id
    ));
    for (section, alias) in &outcome.linked {
        output::indent(&format!("{} entry '{}' linked", section, alias), 1);
    }
    if outcome.capabilities.is_empty() && outcome.linked.is_empty() {
        output::verbose("Plugin declared no platform or accessory; config left as is.");
    }
    output::info("Restart the instance to load the plugin.");
    Ok(())
}

pub fn uninstall(ctx: &mut AppContext, instance: &str, plugin: &str) -> Result<()> {
    let id = resolve(ctx, instance)?;
    require_tool(ctx)?;

    let removed = PackageProvisioner::new(ctx).uninstall(&id, plugin)?;
    output::success(&format!("Uninstalled {} from '{}'", plugin.cyan(), id));
    if removed > 0 {
        output::indent(&format!("{} config entr{} removed", removed, if removed == 1 { "y" } else { "ies" }), 1);
    }
    Ok(())
}

pub fn upgrade(
    ctx: &mut AppContext,
    instance: &str,
    plugin: Option<&str>,
    tag: Option<&str>,
) -> Result<()> {
    let id = resolve(ctx, instance)?;
    require_tool(ctx)?;
    if plugin.is_none() && tag.is_some() {
        return Err(HubError::Validation(
            "--tag needs a plugin to apply to".to_string(),
        ));
    }

    let upgraded = PackageProvisioner::new(ctx).upgrade(&id, plugin, tag)?;
    if upgraded.is_empty() {
        output::info(&format!("Nothing to upgrade in '{}'.", id));
    } else {
        output::success(&format!("Upgraded {} in '{}'", upgraded.join(", "), id));
    }
    Ok(())
}
