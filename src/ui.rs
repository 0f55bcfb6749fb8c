// Terminal UI utilities
// Operator-facing output; diagnostics go through tracing instead.

use colored::Colorize;
use serde_json::Value;

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// Resolved option echoed before any prompt
pub fn print_option(name: &str, value: &str) {
    println!("{}: {}", name.dimmed(), value);
}

/// Blank line closing one environment's echoed options and prompts
pub fn print_separator() {
    println!();
}

/// `---------- env/app ----------` banner opening one app's requests
pub fn print_target(environment: &str, app_name: &str) {
    println!("{}", format!("----------{}/{}----------", environment, app_name).bold());
}

/// `[SKIP] <command>` notice, with an optional reason
pub fn print_skip(command: &str, reason: Option<&str>) {
    let line = match reason {
        Some(reason) => format!("[SKIP] {} ({})", command, reason),
        None => format!("[SKIP] {}", command),
    };
    println!("{}", line.yellow());
}

/// Written or pushed file path
pub fn print_path(path: &std::path::Path) {
    println!("{}", path.display());
}

/// Structured remote error on stderr
pub fn print_json(value: &Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    eprintln!("{}", text.red());
}
