pub mod command_exec;
pub mod fsio;
pub mod logging;
pub mod net;
pub mod paths;
pub mod platform;
pub mod sanitize;
