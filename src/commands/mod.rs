pub mod archive;
pub mod completions;
pub mod config;
pub mod instance;
pub mod plugin;
