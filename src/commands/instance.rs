use crate::error::{HubError, Result};
use crate::instances::lifecycle::{self, CreateRequest};
use crate::instances::registry::InstanceRegistry;
use crate::instances::types::{InstanceKind, InstanceSummary};
use crate::traits::AppContext;
use crate::ui as output;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug)]
pub struct CreateOptions {
    pub name: Option<String>,
    pub kind: InstanceKind,
    pub port: Option<u16>,
    pub display_name: Option<String>,
    pub pin: Option<String>,
    pub autostart_delay_seconds: u32,
    pub advertiser: Option<String>,
    pub dev_project_path: Option<PathBuf>,
}

pub fn list(ctx: &AppContext, json: bool) -> Result<()> {
    let instances = lifecycle::list(ctx)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&instances)?);
        return Ok(());
    }

    if instances.is_empty() {
        output::info("No instances yet.");
        return Ok(());
    }

    output::header(&format!("Instances ({})", instances.len()));
    output::separator();
    for summary in &instances {
        print_summary(summary);
    }
    Ok(())
}

fn print_summary(summary: &InstanceSummary) {
    let record = &summary.record;
    let endpoint = match &summary.address {
        Some(address) => format!("{}:{}", address, record.port),
        None => record.port.to_string(),
    };
    println!(
        "  {} {} {} {}",
        record.id.cyan().bold(),
        format!("[{}]", record.kind).dimmed(),
        record.display_name,
        endpoint.dimmed()
    );
    match &summary.service_unit {
        Some(unit) => output::indent(&format!("unit: {}", unit), 2),
        None if record.kind.is_serviced() => output::indent(&"unit: missing".yellow().to_string(), 2),
        None => {}
    }
}

pub fn create(ctx: &AppContext, options: CreateOptions) -> Result<()> {
    let registry = InstanceRegistry::load(&ctx.paths)?;
    let interactive = atty::is(atty::Stream::Stdin);

    let name = match (options.kind, options.name) {
        (InstanceKind::Hub, name) => name.unwrap_or_default(),
        (_, Some(name)) => name,
        (kind, None) if interactive => elicit_name(&registry, kind)?,
        (_, None) => return Err(HubError::Validation("instance name is required".to_string())),
    };

    let port = match options.port {
        Some(port) => Some(port),
        None if interactive => Some(elicit_port(ctx, &registry)?),
        None => None,
    };

    let request = CreateRequest {
        name,
        kind: options.kind,
        port,
        display_name: options.display_name,
        pin: options.pin,
        autostart_delay_seconds: options.autostart_delay_seconds,
        advertiser: options.advertiser,
        dev_project_path: options.dev_project_path,
    };

    let record = lifecycle::create(ctx, request)?;
    output::success(&format!(
        "Created {} instance '{}' on port {}",
        record.kind,
        record.id.cyan(),
        record.port
    ));
    match &record.service_unit_ref {
        Some(unit) => output::keyval("Service unit", unit),
        None if record.kind.is_serviced() => output::info(&format!(
            "No init system detected ({}); start the instance manually",
            ctx.services.backend_name()
        )),
        None => {}
    }
    Ok(())
}

fn elicit_name(registry: &InstanceRegistry, kind: InstanceKind) -> Result<String> {
    loop {
        let Some(answer) = output::prompt_input("Instance name:", None) else {
            return Err(HubError::Validation("instance name is required".to_string()));
        };
        match registry.validate_name(&answer, kind) {
            Ok(_) => return Ok(answer),
            Err(e) => output::warning(&e.to_string()),
        }
    }
}

fn elicit_port(ctx: &AppContext, registry: &InstanceRegistry) -> Result<u16> {
    let suggested = lifecycle::default_port(ctx, registry)?.to_string();
    loop {
        let Some(answer) = output::prompt_input("Port:", Some(&suggested)) else {
            return Err(HubError::Validation("port is required".to_string()));
        };
        let parsed = answer
            .parse::<u16>()
            .map_err(|_| HubError::Validation("invalid port number".to_string()))
            .and_then(|port| registry.validate_port(port));
        match parsed {
            Ok(port) => return Ok(port),
            Err(e) => output::warning(&e.to_string()),
        }
    }
}

pub fn remove(ctx: &AppContext, name: &str, yes: bool) -> Result<()> {
    if !yes && !output::prompt_yes_no(&format!("Remove instance '{}' and all of its data?", name)) {
        output::info("Aborted.");
        return Ok(());
    }

    let record = lifecycle::remove(ctx, name)?;
    output::success(&format!("Removed instance '{}'", record.id));
    Ok(())
}

pub fn rename(ctx: &AppContext, name: &str, display_name: &str) -> Result<()> {
    let record = lifecycle::rename(ctx, name, display_name)?;
    output::success(&format!(
        "Instance '{}' is now called '{}'",
        record.id, record.display_name
    ));
    Ok(())
}

pub fn purge(ctx: &AppContext, name: &str, yes: bool) -> Result<()> {
    if !yes
        && !output::prompt_yes_no(&format!(
            "Clear cached accessories and connections of '{}'?",
            name
        ))
    {
        output::info("Aborted.");
        return Ok(());
    }

    let record = lifecycle::purge(ctx, name)?;
    output::success(&format!("Purged caches of '{}'", record.id));
    output::info("Restart the instance so it re-publishes its accessories.");
    Ok(())
}

pub fn link(ctx: &AppContext, name: &str) -> Result<()> {
    if lifecycle::link_service(ctx, name)? {
        output::success(&format!("Service unit for '{}' is in place", name));
    } else {
        output::warning(&format!(
            "No service unit for '{}' ({} backend)",
            name,
            ctx.services.backend_name()
        ));
    }
    Ok(())
}
