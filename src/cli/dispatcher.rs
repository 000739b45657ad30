//! Command dispatcher
//!
//! Builds the application context once and routes each command to its handler.

use crate::cli::args::{BackupCommand, Cli, Command, ConfigCommand, InstanceCommand, PluginCommand};
use crate::commands;
use crate::config::settings::Settings;
use crate::error::Result;
use crate::project_identity;
use crate::traits::AppContext;
use crate::ui as output;
use crate::utils::paths::StoragePaths;

/// Dispatch the parsed CLI command to the appropriate handler
pub fn dispatch(args: &Cli) -> Result<()> {
    let Some(command) = &args.command else {
        print_quick_start();
        return Ok(());
    };

    if let Command::Completions { shell } = command {
        return commands::completions::run(*shell);
    }

    let mut ctx = build_context(args)?;
    let yes = args.global.yes;

    match command {
        Command::Instance { command } => match command {
            InstanceCommand::List { json } => commands::instance::list(&ctx, *json),
            InstanceCommand::Create {
                name,
                kind,
                port,
                display_name,
                pin,
                autostart_delay,
                advertiser,
                dev_path,
            } => commands::instance::create(
                &ctx,
                commands::instance::CreateOptions {
                    name: name.clone(),
                    kind: (*kind).into(),
                    port: *port,
                    display_name: display_name.clone(),
                    pin: pin.clone(),
                    autostart_delay_seconds: *autostart_delay,
                    advertiser: advertiser.clone(),
                    dev_project_path: dev_path.clone(),
                },
            ),
            InstanceCommand::Remove { name } => commands::instance::remove(&ctx, name, yes),
            InstanceCommand::Rename { name, display_name } => {
                commands::instance::rename(&ctx, name, display_name)
            }
            InstanceCommand::Purge { name } => commands::instance::purge(&ctx, name, yes),
            InstanceCommand::Link { name } => commands::instance::link(&ctx, name),
        },

        Command::Reset => commands::archive::reset(&ctx, yes),

        Command::Plugin { command } => match command {
            PluginCommand::List { instance, json } => {
                commands::plugin::list(&mut ctx, instance, *json)
            }
            PluginCommand::Install {
                instance,
                plugin,
                tag,
            } => commands::plugin::install(&mut ctx, instance, plugin, tag.as_deref()),
            PluginCommand::Uninstall { instance, plugin } => {
                commands::plugin::uninstall(&mut ctx, instance, plugin)
            }
            PluginCommand::Upgrade {
                instance,
                plugin,
                tag,
            } => commands::plugin::upgrade(&mut ctx, instance, plugin.as_deref(), tag.as_deref()),
        },

        Command::Config { command } => match command {
            ConfigCommand::Show { instance } => commands::config::show(&ctx, instance),
            ConfigCommand::Touch { instance } => commands::config::touch(&ctx, instance),
        },

        Command::Backup { command } => match command {
            BackupCommand::Full => commands::archive::backup_full(&ctx),
            BackupCommand::Instance { name } => commands::archive::backup_instance(&ctx, name),
            BackupCommand::List { json } => commands::archive::list(&ctx, *json),
        },

        Command::Export { name, output } => {
            commands::archive::export(&ctx, name, output.as_deref())
        }

        Command::Restore {
            archive,
            remove_source,
        } => commands::archive::restore(&ctx, archive, *remove_source, yes),

        Command::Completions { .. } => Ok(()),
    }
}

fn build_context(args: &Cli) -> Result<AppContext> {
    let settings = Settings::load()?;
    let root = settings.resolve_storage(args.global.storage.as_deref())?;
    tracing::debug!(storage = %root.display(), "storage root resolved");
    Ok(AppContext::for_host(StoragePaths::new(root), settings))
}

fn print_quick_start() {
    let bin = project_identity::BINARY_NAME;
    output::info("No command provided.");
    output::info("Quick start:");
    output::indent(&format!("{} instance create kitchen", bin), 2);
    output::indent(&format!("{} plugin install kitchen @acme/lamp", bin), 2);
    output::indent(&format!("{} instance list", bin), 2);
    output::indent(&format!("{} backup full", bin), 2);
    output::info(&format!("Use `{} --help` for full command list.", bin));
}
