pub mod args;
pub mod dispatcher;

pub use args::{BackupCommand, Cli, Command, ConfigCommand, GlobalFlags, InstanceCommand, PluginCommand};
