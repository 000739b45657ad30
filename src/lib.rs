pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod inspector;
pub mod instances;
pub mod packages;
pub mod project_identity;
pub mod services;
pub mod socket;
pub mod traits;
pub mod ui;
pub mod utils;

use clap::Parser;
use std::process::exit;

/// Run hubctl CLI entrypoint.
pub fn run_cli() {
    // 0. Initialize color settings (must be first)
    ui::init_colors();

    // 1. Signal handling: no rollback, re-running converges partial state
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        ui::mark_interrupted();
        ui::warning("Operation cancelled. Re-run the command to converge any partial changes.");
    }) {
        ui::warning(&format!("Could not install Ctrl-C handler: {}", e));
    }

    // 2. Parse & Run
    let args = cli::args::Cli::parse();
    ui::set_quiet(args.global.quiet);
    ui::set_verbose(args.global.verbose);
    utils::logging::init(args.global.verbose);

    if let Err(e) = cli::dispatcher::dispatch(&args) {
        ui::error(&format!("{}", e));
        exit(1);
    }
}
