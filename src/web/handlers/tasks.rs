use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::models::{
    Category, Priority, Subtask, Task, validate_description, validate_subtask_title,
    validate_tags, validate_title,
};
use crate::query::{
    SortKey, SortOrder, StatusFilter, TaskFilter, TaskStats, filter_tasks, overdue_tasks,
    sort_tasks, task_stats,
};
use crate::web::AppState;
use crate::web::errors::AppError;
use crate::web::extract::{ApiJson, AuthUser};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskInput {
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<SubtaskInput>,
}

/// Partial update. For `description` and `dueDate`, an explicit `null` clears the field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub category: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub subtasks: Option<Vec<SubtaskInput>>,
}

#[derive(Debug, Deserialize)]
pub struct NewSubtaskRequest {
    #[serde(default)]
    pub title: String,
}

/// Query string for the task list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListQuery {
    fn parse(self) -> Result<(TaskFilter, SortKey, SortOrder), String> {
        let filter = TaskFilter {
            status: self
                .status
                .as_deref()
                .map(StatusFilter::from_str)
                .transpose()?
                .unwrap_or_default(),
            category: non_all(self.category.as_deref())
                .map(Category::from_str)
                .transpose()?,
            priority: non_all(self.priority.as_deref())
                .map(Priority::from_str)
                .transpose()?,
            search: self.search,
        };
        let key = self
            .sort_by
            .as_deref()
            .map(SortKey::from_str)
            .transpose()?
            .unwrap_or_default();
        let order = self
            .order
            .as_deref()
            .map(SortOrder::from_str)
            .transpose()?
            .unwrap_or_default();
        Ok((filter, key, order))
    }
}

fn non_all(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Accept an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
/// A blank string means "no due date".
pub fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| format!("invalid due date: {raw}. use YYYY-MM-DD or RFC 3339"))
}

/// Build the subtask list from client input, keeping ids (and creation times)
/// of subtasks that already exist on the task.
fn build_subtasks(
    inputs: Vec<SubtaskInput>,
    existing: &[Subtask],
    now: DateTime<Utc>,
) -> Result<Vec<Subtask>, String> {
    let mut out: Vec<Subtask> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let title = validate_subtask_title(&input.title)?;
        let kept = input
            .id
            .as_deref()
            .and_then(|id| existing.iter().find(|s| s.id == id))
            .filter(|s| !out.iter().any(|o| o.id == s.id));
        out.push(Subtask {
            id: kept.map_or_else(|| uuid::Uuid::new_v4().to_string(), |s| s.id.clone()),
            title,
            completed: input.completed,
            created_at: kept.map_or(now, |s| s.created_at),
        });
    }
    Ok(out)
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("task not found: {id}"))
}

fn load_task(state: &AppState, user_id: &str, id: &str) -> Result<Task, AppError> {
    state.db()?.get_task(user_id, id)?.ok_or_else(|| not_found(id))
}

/// Load, change and save a task under a single database lock.
fn edit_task<F>(state: &AppState, user_id: &str, id: &str, change: F) -> Result<Task, AppError>
where
    F: FnOnce(&mut Task) -> Result<(), AppError>,
{
    let db = state.db()?;
    let mut task = db.get_task(user_id, id)?.ok_or_else(|| not_found(id))?;
    change(&mut task)?;
    if !db.save_task(&task)? {
        return Err(not_found(id));
    }
    Ok(task)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/tasks
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let (filter, key, order) = query.parse().map_err(AppError::Validation)?;
    let tasks = state.db()?.list_tasks(&user.id)?;
    let mut tasks = filter_tasks(tasks, &filter, Utc::now());
    sort_tasks(&mut tasks, key, order);
    Ok(Json(tasks))
}

/// GET /api/tasks/{id}
pub async fn get_one(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    Ok(Json(load_task(&state, &user.id, &id)?))
}

/// POST /api/tasks
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let now = Utc::now();
    let task = build_new_task(req, &user.id, now).map_err(AppError::Validation)?;
    state.db()?.insert_task(&task)?;
    info!(task_id = %task.id, user_id = %user.id, "created task");
    Ok((StatusCode::CREATED, Json(task)))
}

fn build_new_task(req: CreateTaskRequest, user_id: &str, now: DateTime<Utc>) -> Result<Task, String> {
    let mut task = Task {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: validate_title(&req.title)?,
        description: match req.description.as_deref() {
            Some(d) => validate_description(d)?,
            None => None,
        },
        completed: false,
        category: req
            .category
            .as_deref()
            .map(Category::from_str)
            .transpose()?
            .unwrap_or_default(),
        priority: req
            .priority
            .as_deref()
            .map(Priority::from_str)
            .transpose()?
            .unwrap_or_default(),
        due_date: match req.due_date.as_deref() {
            Some(raw) => parse_due_date(raw)?,
            None => None,
        },
        tags: validate_tags(&req.tags)?,
        subtasks: build_subtasks(req.subtasks, &[], now)?,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    task.set_completed(req.completed, now);
    Ok(task)
}

/// PUT/PATCH /api/tasks/{id}
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let task = edit_task(&state, &user.id, &id, |task| {
        let now = Utc::now();
        apply_update(task, req, now).map_err(AppError::Validation)?;
        task.updated_at = now;
        Ok(())
    })?;
    info!(task_id = %task.id, "updated task");
    Ok(Json(task))
}

fn apply_update(task: &mut Task, req: UpdateTaskRequest, now: DateTime<Utc>) -> Result<(), String> {
    if let Some(title) = req.title {
        task.title = validate_title(&title)?;
    }
    if let Some(description) = req.description {
        task.description = match description {
            Some(d) => validate_description(&d)?,
            None => None,
        };
    }
    if let Some(category) = req.category {
        task.category = Category::from_str(&category)?;
    }
    if let Some(priority) = req.priority {
        task.priority = Priority::from_str(&priority)?;
    }
    if let Some(due) = req.due_date {
        task.due_date = match due {
            Some(raw) => parse_due_date(&raw)?,
            None => None,
        };
    }
    if let Some(tags) = req.tags {
        task.tags = validate_tags(&tags)?;
    }
    if let Some(subtasks) = req.subtasks {
        task.subtasks = build_subtasks(subtasks, &task.subtasks, now)?;
    }
    if let Some(completed) = req.completed {
        task.set_completed(completed, now);
    }
    Ok(())
}

/// DELETE /api/tasks/{id}
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.db()?.delete_task(&user.id, &id)? {
        return Err(not_found(&id));
    }
    info!(task_id = %id, "deleted task");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/tasks/{id}/toggle
pub async fn toggle(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let task = edit_task(&state, &user.id, &id, |task| {
        let now = Utc::now();
        let completed = !task.completed;
        task.set_completed(completed, now);
        task.updated_at = now;
        Ok(())
    })?;
    Ok(Json(task))
}

/// POST /api/tasks/{id}/subtasks
pub async fn add_subtask(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<NewSubtaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let title = validate_subtask_title(&req.title).map_err(AppError::Validation)?;
    let task = edit_task(&state, &user.id, &id, |task| {
        push_subtask(task, title, Utc::now());
        Ok(())
    })?;
    Ok((StatusCode::CREATED, Json(task)))
}

fn push_subtask(task: &mut Task, title: String, now: DateTime<Utc>) {
    task.subtasks.push(Subtask {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        completed: false,
        created_at: now,
    });
    task.updated_at = now;
}

/// PATCH /api/tasks/{id}/subtasks/{subtask_id}/toggle
pub async fn toggle_subtask(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, subtask_id)): Path<(String, String)>,
) -> Result<Json<Task>, AppError> {
    let task = edit_task(&state, &user.id, &id, |task| {
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| AppError::NotFound(format!("subtask not found: {subtask_id}")))?;
        subtask.completed = !subtask.completed;
        task.updated_at = Utc::now();
        Ok(())
    })?;
    Ok(Json(task))
}

/// DELETE /api/tasks/{id}/subtasks/{subtask_id}
pub async fn remove_subtask(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((id, subtask_id)): Path<(String, String)>,
) -> Result<Json<Task>, AppError> {
    let task = edit_task(&state, &user.id, &id, |task| {
        let before = task.subtasks.len();
        task.subtasks.retain(|s| s.id != subtask_id);
        if task.subtasks.len() == before {
            return Err(AppError::NotFound(format!(
                "subtask not found: {subtask_id}"
            )));
        }
        task.updated_at = Utc::now();
        Ok(())
    })?;
    Ok(Json(task))
}

/// GET /api/tasks/category/{category}
pub async fn by_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(category): Path<String>,
) -> Result<Json<Vec<Task>>, AppError> {
    let category = Category::from_str(&category).map_err(AppError::Validation)?;
    let tasks = state.db()?.list_tasks_by_category(&user.id, category)?;
    Ok(Json(tasks))
}

/// GET /api/tasks/overdue
pub async fn overdue(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.db()?.list_tasks(&user.id)?;
    Ok(Json(overdue_tasks(tasks, Utc::now())))
}

/// GET /api/tasks/stats
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<TaskStats>, AppError> {
    let tasks = state.db()?.list_tasks(&user.id)?;
    Ok(Json(task_stats(&tasks, Utc::now())))
}
