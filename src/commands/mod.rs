pub mod init;
pub mod serve;
pub mod stats;
pub mod users;

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use taskdeck::db::Database;
use taskdeck::models::Priority;

/// Open a database created by `taskdeck init`, applying any pending migrations.
pub fn open_existing(db_path: &Path) -> Result<Database, String> {
    if !db_path.is_file() {
        return Err(format!(
            "no database at {}; run `taskdeck init` first",
            db_path.display()
        ));
    }
    let db = Database::open(db_path)?;
    db.migrate()?;
    Ok(db)
}

/// Format a priority as a colored label.
pub fn format_priority(p: Priority) -> String {
    match p {
        Priority::Urgent => "urgent".red().bold().to_string(),
        Priority::High => "high".yellow().bold().to_string(),
        Priority::Medium => "medium".white().to_string(),
        Priority::Low => "low".bright_black().to_string(),
    }
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let j = serde_json::to_string_pretty(value).map_err(|e| format!("json error: {e}"))?;
    println!("{j}");
    Ok(())
}
