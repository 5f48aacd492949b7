use cucumber::{then, when};
use reqwest::Method;
use serde_json::Value;

use crate::TaskdeckWorld;
use crate::steps::web_steps::{http_send, last_json};

fn listed_titles(world: &TaskdeckWorld) -> Vec<String> {
    let json = last_json(world);
    json.as_array()
        .unwrap_or_else(|| panic!("expected a JSON array of tasks, got {json}"))
        .iter()
        .map(|t| t["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("I list my tasks")]
async fn i_list_my_tasks(world: &mut TaskdeckWorld) {
    http_send(world, Method::GET, "/api/tasks", None).await;
}

/// `query` is the raw query string, e.g. `status=pending&sortBy=title`.
#[when(expr = "I list my tasks with {string}")]
async fn i_list_my_tasks_with(world: &mut TaskdeckWorld, query: String) {
    http_send(world, Method::GET, &format!("/api/tasks?{query}"), None).await;
}

#[when(expr = "I list my {string} tasks")]
async fn i_list_my_category_tasks(world: &mut TaskdeckWorld, category: String) {
    http_send(
        world,
        Method::GET,
        &format!("/api/tasks/category/{category}"),
        None,
    )
    .await;
}

#[when("I list my overdue tasks")]
async fn i_list_my_overdue_tasks(world: &mut TaskdeckWorld) {
    http_send(world, Method::GET, "/api/tasks/overdue", None).await;
}

#[when("I request my task stats")]
async fn i_request_my_task_stats(world: &mut TaskdeckWorld) {
    http_send(world, Method::GET, "/api/tasks/stats", None).await;
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

/// Exact titles, in order, comma-separated. An empty string means no tasks.
#[then(expr = "the listed tasks are {string}")]
async fn the_listed_tasks_are(world: &mut TaskdeckWorld, expected: String) {
    assert_eq!(
        world.last_response_status,
        Some(200),
        "list failed: {:?}",
        world.last_response_body
    );
    let expected: Vec<String> = expected
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    assert_eq!(listed_titles(world), expected);
}

#[then(expr = "the listed tasks include {string}")]
async fn the_listed_tasks_include(world: &mut TaskdeckWorld, title: String) {
    let titles = listed_titles(world);
    assert!(
        titles.contains(&title),
        "expected to find '{title}' in {titles:?}"
    );
}

#[then(expr = "the listed tasks exclude {string}")]
async fn the_listed_tasks_exclude(world: &mut TaskdeckWorld, title: String) {
    let titles = listed_titles(world);
    assert!(
        !titles.contains(&title),
        "expected '{title}' to be absent from {titles:?}"
    );
}

#[then(expr = "the stats show {int} total, {int} completed and {int} overdue")]
async fn the_stats_show(world: &mut TaskdeckWorld, total: u64, completed: u64, overdue: u64) {
    let json = last_json(world);
    assert_eq!(json["total"], Value::from(total), "stats: {json}");
    assert_eq!(json["completed"], Value::from(completed), "stats: {json}");
    assert_eq!(json["overdue"], Value::from(overdue), "stats: {json}");
    assert_eq!(
        json["pending"],
        Value::from(total - completed),
        "stats: {json}"
    );
}
