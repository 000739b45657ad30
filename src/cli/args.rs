use crate::instances::types::InstanceKind;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hubctl",
    about = "Provision and maintain home-automation bridge instances",
    long_about = "Create, remove and back up isolated bridge instances on this host, \
                  and manage the plugins each of them runs",
    version,
    next_line_help = false,
    term_width = 80
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct GlobalFlags {
    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Storage root (overrides HUBCTL_STORAGE and settings)
    #[arg(long, value_name = "DIR", global = true)]
    pub storage: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage instances
    Instance {
        #[command(subcommand)]
        command: InstanceCommand,
    },

    /// Back up everything, then delete all instances and their service units
    Reset,

    /// Manage the plugins of an instance
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },

    /// Inspect or rewrite an instance's config document
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Create or list backups
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },

    /// Export one instance as a portable archive
    Export {
        name: String,

        /// Target file or directory (default: current directory)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Restore a full backup or import an exported instance
    Restore {
        archive: PathBuf,

        /// Delete the archive after a successful restore
        #[arg(long)]
        remove_source: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommand {
    /// List instances
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Create an instance; missing values are asked for interactively
    Create {
        name: Option<String>,

        #[arg(long, value_enum, default_value_t = KindArg::Bridge)]
        kind: KindArg,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long, value_name = "NAME")]
        display_name: Option<String>,

        /// Pairing code, e.g. 031-45-154
        #[arg(long)]
        pin: Option<String>,

        /// Seconds the service waits before starting the instance
        #[arg(long, default_value_t = 0, value_name = "SECS")]
        autostart_delay: u32,

        /// Discovery advertiser the runtime should use
        #[arg(long)]
        advertiser: Option<String>,

        /// Project checkout a dev instance runs from
        #[arg(long, value_name = "DIR")]
        dev_path: Option<PathBuf>,
    },

    /// Remove an instance with its storage and service unit
    Remove { name: String },

    /// Change an instance's display name
    Rename { name: String, display_name: String },

    /// Clear the accessory and connection caches of an instance
    Purge { name: String },

    /// Recreate a missing service unit
    Link { name: String },
}

#[derive(Subcommand, Debug)]
pub enum PluginCommand {
    /// List installed plugins
    List {
        instance: String,

        #[arg(long)]
        json: bool,
    },

    /// Install a plugin (name[@tag])
    Install {
        instance: String,
        plugin: String,

        /// Version or dist-tag (overrides one given in the identifier)
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Uninstall a plugin and drop its config entries
    Uninstall { instance: String, plugin: String },

    /// Upgrade one plugin, or all when none is named
    Upgrade {
        instance: String,
        plugin: Option<String>,

        #[arg(short, long)]
        tag: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the decoded config document
    Show { instance: String },

    /// Re-encode the on-disk document after an external edit
    Touch { instance: String },
}

#[derive(Subcommand, Debug)]
pub enum BackupCommand {
    /// Archive the whole storage root
    Full,

    /// Archive one instance into the backups directory
    Instance { name: String },

    /// List archives in the backups directory
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Hub,
    Bridge,
    Dev,
}

impl From<KindArg> for InstanceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Hub => InstanceKind::Hub,
            KindArg::Bridge => InstanceKind::Bridge,
            KindArg::Dev => InstanceKind::Dev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_accepts_kind_and_port() {
        let cli = Cli::try_parse_from([
            "hubctl", "instance", "create", "kitchen", "--kind", "dev", "--port", "50826",
        ])
        .expect("parse");
        match cli.command {
            Some(Command::Instance {
                command: InstanceCommand::Create { name, kind, port, .. },
            }) => {
                assert_eq!(name.as_deref(), Some("kitchen"));
                assert_eq!(kind, KindArg::Dev);
                assert_eq!(port, Some(50826));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn storage_flag_is_global() {
        let cli = Cli::try_parse_from(["hubctl", "backup", "list", "--storage", "/tmp/x"])
            .expect("parse");
        assert_eq!(cli.global.storage, Some(PathBuf::from("/tmp/x")));
    }
}
