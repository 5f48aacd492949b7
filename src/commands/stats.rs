use std::path::Path;

use chrono::Utc;
use colored::Colorize;
use taskdeck::models::Priority;
use taskdeck::query::task_stats;

use super::{format_priority, open_existing, print_json};

pub fn run(db_path: &Path, email: &str, oneline: bool, json: bool) -> Result<(), String> {
    let db = open_existing(db_path)?;
    let user = db
        .find_user_by_email(email)?
        .ok_or_else(|| format!("user not found: {email}"))?;
    let tasks = db.list_tasks(&user.id)?;
    let stats = task_stats(&tasks, Utc::now());

    if json {
        return print_json(&stats);
    }

    if oneline {
        println!(
            "{} total, {} completed, {} pending, {} overdue",
            stats.total, stats.completed, stats.pending, stats.overdue
        );
        return Ok(());
    }

    if stats.total == 0 {
        println!("No tasks found for {}.", user.email);
        return Ok(());
    }

    println!("Tasks for {} <{}>", user.name, user.email);
    println!("{}", "-".repeat(32));
    println!("  {:<14} {}", "total", stats.total);
    println!("  {:<14} {}", "completed", stats.completed.to_string().green());
    println!("  {:<14} {}", "pending", stats.pending);
    println!("  {:<14} {}", "overdue", stats.overdue.to_string().red());
    println!("  {:<14} {}", "due today", stats.due_today);
    println!("  {:<14} {}%", "completion", stats.completion_rate);

    println!();
    println!("By Priority");
    println!("{}", "-".repeat(32));
    for p in Priority::ALL.iter().rev() {
        let count = stats.by_priority.get(p.as_str()).copied().unwrap_or(0);
        println!("  {:<14} {}", format_priority(*p), count);
    }

    println!();
    println!("By Category");
    println!("{}", "-".repeat(32));
    for (category, count) in stats.by_category.iter().filter(|(_, n)| **n > 0) {
        println!("  {:<14} {}", category, count);
    }

    Ok(())
}
