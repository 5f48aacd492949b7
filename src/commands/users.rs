use std::path::Path;

use colored::Colorize;
use taskdeck::db::UserSummary;

use super::{open_existing, print_json};

pub fn run(db_path: &Path, json: bool) -> Result<(), String> {
    let db = open_existing(db_path)?;
    let users = db.list_users()?;

    if json {
        return print_json(&users);
    }

    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!(
        "{:<38} {:<24} {:<32} {:>6} {:>6}",
        "ID", "NAME", "EMAIL", "TASKS", "DONE"
    );
    println!("{}", "-".repeat(110));
    for s in &users {
        println!("{}", user_row(s));
    }
    Ok(())
}

/// One table row. Columns are padded before colouring so escape codes do not count toward widths.
fn user_row(s: &UserSummary) -> String {
    let name = if s.user.name.chars().count() > 22 {
        format!("{}...", s.user.name.chars().take(19).collect::<String>())
    } else {
        s.user.name.clone()
    };
    format!(
        "{} {:<24} {:<32} {:>6} {}",
        format!("{:<38}", s.user.id).bright_black(),
        name,
        s.user.email,
        s.task_count,
        format!("{:>6}", s.completed_count).green(),
    )
}
