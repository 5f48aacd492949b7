#![allow(deprecated)]
use cucumber::given;

use crate::TaskdeckWorld;

/// Run `taskdeck` with the given args against the world's database,
/// recording stdout, stderr and the exit code.
pub fn run_taskdeck(world: &mut TaskdeckWorld, args: &[&str]) {
    let db_path = world
        .db_path
        .as_ref()
        .expect("db_path not set — did you forget 'Given a taskdeck database is initialized'?");

    let output = assert_cmd::Command::cargo_bin("taskdeck")
        .expect("taskdeck binary not found")
        .env("TASKDECK_DB", db_path)
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("failed to run taskdeck");

    world.last_stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    world.last_stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    world.last_exit_code = output.status.code().unwrap_or(-1);
}

/// Initialize a fresh taskdeck database into the world's temp dir.
#[given("a taskdeck database is initialized")]
async fn a_taskdeck_database_is_initialized(world: &mut TaskdeckWorld) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("taskdeck.db");

    world.db_path = Some(db_path);
    // Keep the TempDir alive for the lifetime of the scenario.
    world.db_dir = Some(dir);

    run_taskdeck(world, &["init"]);
    assert_eq!(
        world.last_exit_code, 0,
        "taskdeck init failed: {}",
        world.last_stderr
    );
}

/// Remove the scenario's database file, leaving its directory in place.
#[given("the database file is missing")]
async fn the_database_file_is_missing(world: &mut TaskdeckWorld) {
    let db_path = world.db_path.clone().expect("db_path not set");
    for suffix in ["", "-wal", "-shm"] {
        let path = std::path::PathBuf::from(format!("{}{suffix}", db_path.display()));
        if path.exists() {
            std::fs::remove_file(&path).expect("failed to remove database file");
        }
    }
}
