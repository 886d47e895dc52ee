//! Output formatting utilities

use colored::*;
use serde_json::Value;

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a hint on stderr
pub fn print_hint(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message);
}

/// Print a command result: `text` normally, `structured` as pretty JSON
/// with `--json`
pub fn print_result(text: impl std::fmt::Display, structured: Value, json: bool) {
    if !json {
        println!("{}", text);
        return;
    }
    match serde_json::to_string_pretty(&structured) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", structured),
    }
}
