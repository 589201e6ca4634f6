//! CLI output formatting utilities

use colored::Colorize;

use crate::auth::UserInfo;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Print a user's public profile
pub fn print_user_detail(user: &UserInfo) {
    println!("{}", "User Details".bold().underline());
    println!();
    println!("  {} {}", "ID:".bold(), user.id);
    println!("  {} {}", "Username:".bold(), user.username);
    println!("  {} {}", "Role:".bold(), user.role.to_string().cyan());

    if !user.email.is_empty() {
        println!("  {} {}", "Email:".bold(), user.email);
    }

    let full_name = format!("{} {}", user.first_name, user.last_name);
    if !full_name.trim().is_empty() {
        println!("  {} {}", "Name:".bold(), full_name.trim());
    }
}
