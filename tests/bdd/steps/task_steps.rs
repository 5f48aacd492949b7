use cucumber::{given, then, when};
use reqwest::Method;
use serde_json::{Value, json};

use crate::TaskdeckWorld;
use crate::steps::web_steps::{http_send, last_json, parse_json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn task_id(world: &TaskdeckWorld, title: &str) -> String {
    world
        .task_ids
        .get(title)
        .unwrap_or_else(|| panic!("no task created with title '{title}'"))
        .clone()
}

/// Create a task via the API and remember its id under its title.
async fn api_create_task(world: &mut TaskdeckWorld, body: Value) {
    let (status, body_text) = http_send(world, Method::POST, "/api/tasks", Some(body)).await;
    assert_eq!(
        status, 201,
        "expected 201 from POST /api/tasks but got {status}: {body_text}"
    );
    let json = last_json(world);
    let id = json["id"]
        .as_str()
        .unwrap_or_else(|| panic!("POST /api/tasks response has no 'id' field: {json}"))
        .to_string();
    let title = json["title"].as_str().unwrap_or_default().to_string();
    world.task_ids.insert(title, id);
}

/// Fetch a task by title and return its JSON.
pub async fn fetch_task(world: &mut TaskdeckWorld, title: &str) -> Value {
    let id = task_id(world, title);
    let (status, body) = http_send(world, Method::GET, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, 200, "failed to fetch task '{title}': {body}");
    last_json(world)
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given(expr = "I created a task {string}")]
async fn i_created_a_task(world: &mut TaskdeckWorld, title: String) {
    api_create_task(world, json!({"title": title})).await;
}

/// Create a task with extra fields, e.g. `'{"priority":"urgent"}'`.
#[given(expr = "I created a task {string} with {string}")]
async fn i_created_a_task_with(world: &mut TaskdeckWorld, title: String, raw_fields: String) {
    let mut body = parse_json(&raw_fields);
    body["title"] = Value::String(title);
    api_create_task(world, body).await;
}

#[given(expr = "I completed the task {string}")]
async fn i_completed_the_task(world: &mut TaskdeckWorld, title: String) {
    let id = task_id(world, &title);
    let (status, body) =
        http_send(world, Method::PATCH, &format!("/api/tasks/{id}/toggle"), None).await;
    assert_eq!(status, 200, "failed to complete '{title}': {body}");
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when(expr = "I create a task with body {string}")]
async fn i_create_a_task_with_body(world: &mut TaskdeckWorld, raw_body: String) {
    let (status, _) =
        http_send(world, Method::POST, "/api/tasks", Some(parse_json(&raw_body))).await;
    if status == 201 {
        let json = last_json(world);
        if let (Some(id), Some(title)) = (json["id"].as_str(), json["title"].as_str()) {
            world.task_ids.insert(title.to_string(), id.to_string());
        }
    }
}

#[when(expr = "I fetch the task {string}")]
async fn i_fetch_the_task(world: &mut TaskdeckWorld, title: String) {
    let id = task_id(world, &title);
    http_send(world, Method::GET, &format!("/api/tasks/{id}"), None).await;
}

#[when(expr = "I patch the task {string} with {string}")]
async fn i_patch_the_task(world: &mut TaskdeckWorld, title: String, raw_body: String) {
    let id = task_id(world, &title);
    http_send(
        world,
        Method::PATCH,
        &format!("/api/tasks/{id}"),
        Some(parse_json(&raw_body)),
    )
    .await;
}

#[when(expr = "I put the task {string} with {string}")]
async fn i_put_the_task(world: &mut TaskdeckWorld, title: String, raw_body: String) {
    let id = task_id(world, &title);
    http_send(
        world,
        Method::PUT,
        &format!("/api/tasks/{id}"),
        Some(parse_json(&raw_body)),
    )
    .await;
}

#[when(expr = "I delete the task {string}")]
async fn i_delete_the_task(world: &mut TaskdeckWorld, title: String) {
    let id = task_id(world, &title);
    http_send(world, Method::DELETE, &format!("/api/tasks/{id}"), None).await;
}

#[when(expr = "I toggle the task {string}")]
async fn i_toggle_the_task(world: &mut TaskdeckWorld, title: String) {
    let id = task_id(world, &title);
    http_send(world, Method::PATCH, &format!("/api/tasks/{id}/toggle"), None).await;
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then(expr = "the task {string} is completed")]
async fn the_task_is_completed(world: &mut TaskdeckWorld, title: String) {
    let task = fetch_task(world, &title).await;
    assert_eq!(task["completed"], Value::Bool(true), "task: {task}");
    assert!(task["completedAt"].is_string(), "completedAt missing: {task}");
}

#[then(expr = "the task {string} is not completed")]
async fn the_task_is_not_completed(world: &mut TaskdeckWorld, title: String) {
    let task = fetch_task(world, &title).await;
    assert_eq!(task["completed"], Value::Bool(false), "task: {task}");
    assert!(task["completedAt"].is_null(), "completedAt set: {task}");
}

#[then(expr = "the task {string} no longer exists")]
async fn the_task_no_longer_exists(world: &mut TaskdeckWorld, title: String) {
    let id = task_id(world, &title);
    let (status, _) = http_send(world, Method::GET, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, 404, "task '{title}' still exists");
}

#[then(expr = "the task {string} has tags {string}")]
async fn the_task_has_tags(world: &mut TaskdeckWorld, title: String, expected: String) {
    let task = fetch_task(world, &title).await;
    let tags: Vec<&str> = task["tags"]
        .as_array()
        .expect("tags is not an array")
        .iter()
        .filter_map(|t| t.as_str())
        .collect();
    assert_eq!(tags.join(","), expected, "task: {task}");
}
