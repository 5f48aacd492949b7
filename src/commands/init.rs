use std::path::Path;

use taskdeck::db::Database;

pub fn run(db_path: &Path) -> Result<(), String> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("failed to create directory: {e}"))?;
    }

    let db = Database::open(db_path)?;
    db.migrate()?;
    db.set_config("version", env!("CARGO_PKG_VERSION"))?;

    println!("Initialized taskdeck database at {}", db_path.display());
    println!("Schema version: {}", db.schema_version()?);
    Ok(())
}
