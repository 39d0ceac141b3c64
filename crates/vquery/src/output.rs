//! Terminal output for interactive commands.
//!
//! Progress and results go to stdout; failures go to stderr so they stay
//! visible when stdout is redirected.

use colored::Colorize;

const LABEL_WIDTH: usize = 8;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a `label: value` line with labels aligned.
pub fn field(label: &str, value: &str) {
    let label = format!("{label}:");
    println!("  {} {}", format!("{label:<LABEL_WIDTH$}").dimmed(), value);
}
