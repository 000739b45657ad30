use colored::Colorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);
static VERBOSE: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Disable colors when stdout is not a terminal or `NO_COLOR` is set
pub fn init_colors() {
    if std::env::var_os("NO_COLOR").is_some() || !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn mark_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

pub fn header(title: &str) {
    if is_quiet() {
        return;
    }
    println!("\n{}", title.bold().underline());
}

pub fn success(msg: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn info(msg: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", "ℹ".blue().bold(), msg);
}

pub fn verbose(msg: &str) {
    if is_verbose() && !is_quiet() {
        println!("  {}", msg.dimmed());
    }
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

pub fn separator() {
    let width = terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w).min(80))
        .unwrap_or(60);
    println!("{}", "─".repeat(width).bright_black());
}

pub fn keyval(key: &str, val: &str) {
    println!("{}: {}", key.bold(), val);
}

pub fn indent(msg: &str, level: usize) {
    let spaces = " ".repeat(level * 2);
    println!("{}{}", spaces, msg);
}

pub fn prompt_yes_no(question: &str) -> bool {
    print!("{} {} [Y/n] ", "?".yellow().bold(), question);

    if let Err(e) = io::stdout().flush() {
        eprintln!("\nWarning: Failed to flush terminal: {}", e);
        return true;
    }

    let mut input = String::new();

    match io::stdin().read_line(&mut input) {
        Ok(_) => {
            let input = input.trim().to_lowercase();

            if input.is_empty() {
                return true;
            }

            input == "y" || input == "yes"
        }
        Err(e) => {
            eprintln!("\nWarning: Failed to read input: {}", e);
            true
        }
    }
}

/// Ask for a line of input. Empty input yields `default`; a closed stdin yields `None`.
pub fn prompt_input(question: &str, default: Option<&str>) -> Option<String> {
    match default {
        Some(d) => print!("{} {} [{}] ", "?".yellow().bold(), question, d.dimmed()),
        None => print!("{} {} ", "?".yellow().bold(), question),
    }

    if io::stdout().flush().is_err() {
        return None;
    }

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => None,
        Ok(_) => {
            let input = input.trim();
            if input.is_empty() {
                default.map(str::to_string)
            } else {
                Some(input.to_string())
            }
        }
        Err(_) => None,
    }
}
