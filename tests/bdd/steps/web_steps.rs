use cucumber::{given, then, when};
use reqwest::Method;
use serde_json::Value;

use crate::{TEST_JWT_SECRET, TaskdeckWorld};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Start an in-process axum test server using the world's temp database.
/// Binds to a random free port (port 0), stores the port and task handle
/// in the world for later use and cleanup.
pub async fn start_test_server(world: &mut TaskdeckWorld) -> u16 {
    let db_path = world
        .db_path
        .as_ref()
        .expect("db_path not set — did you forget 'Given a taskdeck database is initialized'?")
        .clone();

    let db = taskdeck::db::Database::open(&db_path).expect("failed to open database for web server");
    let tokens = taskdeck::auth::TokenManager::new(TEST_JWT_SECRET, chrono::Duration::hours(1));
    let state = taskdeck::web::AppState::new(db, tokens);
    let app = taskdeck::web::create_router(state, None);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind to ephemeral port");
    let port = listener
        .local_addr()
        .expect("failed to get local addr")
        .port();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("web server error in test");
    });

    world.server_port = Some(port);
    world.server_handle = Some(handle);

    // Poll the health endpoint until the server accepts connections.
    for _ in 0..20 {
        if world
            .http_client
            .get(format!("http://127.0.0.1:{port}/api/health"))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }

    port
}

/// Send a request to the test server, attaching the current bearer token,
/// and record the status code and body on the world.
pub async fn http_send(
    world: &mut TaskdeckWorld,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (u16, String) {
    let port = world
        .server_port
        .expect("server not started — add 'Given the web server is running'");
    let url = format!("http://127.0.0.1:{port}{path}");
    let mut req = world.http_client.request(method.clone(), &url);
    if let Some(token) = &world.current_token {
        req = req.bearer_auth(token);
    }
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req
        .send()
        .await
        .unwrap_or_else(|e| panic!("{method} {url} failed: {e}"));
    let status = resp.status().as_u16();
    let body_text = resp
        .text()
        .await
        .unwrap_or_else(|e| panic!("failed to read response body: {e}"));
    world.last_response_status = Some(status);
    world.last_response_body = Some(body_text.clone());
    (status, body_text)
}

pub fn parse_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| panic!("step body {raw:?} is not valid JSON: {e}"))
}

/// Parse the last response body as JSON, panicking with a descriptive message
/// if it is not valid JSON.
pub fn last_json(world: &TaskdeckWorld) -> Value {
    let body = world
        .last_response_body
        .as_deref()
        .expect("no HTTP response body recorded — did you make a request?");
    serde_json::from_str(body)
        .unwrap_or_else(|e| panic!("response body is not valid JSON: {e}\nbody: {body}"))
}

/// Look up a dotted path such as `user.email` or `subtasks.0.title`.
pub fn json_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    value.pointer(&format!("/{}", path.replace('.', "/")))
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

/// Start the in-process web server backed by the world's temp database.
#[given("the web server is running")]
async fn the_web_server_is_running(world: &mut TaskdeckWorld) {
    start_test_server(world).await;
}

// ---------------------------------------------------------------------------
// When steps — raw HTTP verbs
// ---------------------------------------------------------------------------

#[when(expr = "I GET {string}")]
async fn i_get_path(world: &mut TaskdeckWorld, path: String) {
    http_send(world, Method::GET, &path, None).await;
}

#[when(expr = "I POST {string} with body {string}")]
async fn i_post_path_with_body(world: &mut TaskdeckWorld, path: String, raw_body: String) {
    http_send(world, Method::POST, &path, Some(parse_json(&raw_body))).await;
}

#[when(expr = "I PUT {string} with body {string}")]
async fn i_put_path_with_body(world: &mut TaskdeckWorld, path: String, raw_body: String) {
    http_send(world, Method::PUT, &path, Some(parse_json(&raw_body))).await;
}

#[when(expr = "I DELETE {string}")]
async fn i_delete_path(world: &mut TaskdeckWorld, path: String) {
    http_send(world, Method::DELETE, &path, None).await;
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

/// Assert that the most recent HTTP response had the given status code.
#[then(expr = "the response status is {int}")]
async fn the_response_status_is(world: &mut TaskdeckWorld, expected: u16) {
    let actual = world
        .last_response_status
        .expect("no HTTP response recorded — did you make a request?");
    assert_eq!(
        actual,
        expected,
        "expected HTTP status {expected} but got {actual}: {}",
        world.last_response_body.as_deref().unwrap_or_default()
    );
}

/// Assert that the most recent HTTP response body contains the given substring.
#[then(expr = "the response body contains {string}")]
async fn the_response_body_contains(world: &mut TaskdeckWorld, expected: String) {
    let body = world
        .last_response_body
        .as_deref()
        .expect("no HTTP response body recorded — did you make a request?");
    assert!(
        body.contains(&expected),
        "expected response body to contain {expected:?}, but body was:\n{body}"
    );
}

#[then(expr = "the response body does not contain {string}")]
async fn the_response_body_does_not_contain(world: &mut TaskdeckWorld, unexpected: String) {
    let body = world
        .last_response_body
        .as_deref()
        .expect("no HTTP response body recorded — did you make a request?");
    assert!(
        !body.contains(&unexpected),
        "expected response body not to contain {unexpected:?}, but body was:\n{body}"
    );
}

/// Compare a JSON field with the expected text. Non-string values are compared
/// by their JSON rendering, so numbers and booleans read naturally.
#[then(expr = "the response field {string} is {string}")]
async fn the_response_field_is(world: &mut TaskdeckWorld, path: String, expected: String) {
    let json = last_json(world);
    let value = json_field(&json, &path)
        .unwrap_or_else(|| panic!("response has no field {path:?}: {json}"));
    let actual = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    assert_eq!(actual, expected, "field {path:?} mismatch in {json}");
}

#[then(expr = "the response field {string} is null")]
async fn the_response_field_is_null(world: &mut TaskdeckWorld, path: String) {
    let json = last_json(world);
    let value = json_field(&json, &path).unwrap_or(&Value::Null);
    assert!(value.is_null(), "expected {path:?} to be null in {json}");
}

#[then(expr = "the error message contains {string}")]
async fn the_error_message_contains(world: &mut TaskdeckWorld, expected: String) {
    let json = last_json(world);
    let message = json["error"]
        .as_str()
        .unwrap_or_else(|| panic!("response has no error message: {json}"));
    assert!(
        message.contains(&expected),
        "expected error to contain {expected:?}, got {message:?}"
    );
}
