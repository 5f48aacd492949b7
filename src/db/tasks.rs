use std::collections::HashMap;

use rusqlite::{Connection, params};

use super::{Database, parse_optional_timestamp, parse_timestamp};
use crate::models::{Category, Priority, Subtask, Task};

const TASK_COLUMNS: &str = "id, user_id, title, description, completed, category, priority, \
                            due_date, tags, completed_at, created_at, updated_at";

impl Database {
    // -- Tasks --

    /// Insert a task and its subtasks atomically.
    pub fn insert_task(&self, task: &Task) -> Result<(), String> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to begin transaction: {e}"))?;
        tx.execute(
            "INSERT INTO tasks (id, user_id, title, description, completed, category, priority,
                                due_date, tags, completed_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                task.id,
                task.user_id,
                task.title,
                task.description,
                task.completed,
                task.category.as_str(),
                task.priority.as_str(),
                task.due_date.map(|d| d.to_rfc3339()),
                task.tags.join(","),
                task.completed_at.map(|d| d.to_rfc3339()),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("failed to insert task: {e}"))?;
        write_subtasks(&tx, &task.id, &task.subtasks)?;
        tx.commit()
            .map_err(|e| format!("failed to commit task: {e}"))
    }

    /// Overwrite a stored task (matched by id and owner), replacing its subtasks.
    /// Returns `false` if no such task exists for that user.
    pub fn save_task(&self, task: &Task) -> Result<bool, String> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to begin transaction: {e}"))?;
        let rows_changed = tx
            .execute(
                "UPDATE tasks SET title = ?1, description = ?2, completed = ?3, category = ?4,
                                  priority = ?5, due_date = ?6, tags = ?7, completed_at = ?8,
                                  updated_at = ?9
                 WHERE id = ?10 AND user_id = ?11",
                params![
                    task.title,
                    task.description,
                    task.completed,
                    task.category.as_str(),
                    task.priority.as_str(),
                    task.due_date.map(|d| d.to_rfc3339()),
                    task.tags.join(","),
                    task.completed_at.map(|d| d.to_rfc3339()),
                    task.updated_at.to_rfc3339(),
                    task.id,
                    task.user_id,
                ],
            )
            .map_err(|e| format!("update failed: {e}"))?;

        if rows_changed == 0 {
            return Ok(false);
        }

        tx.execute("DELETE FROM subtasks WHERE task_id = ?1", params![task.id])
            .map_err(|e| format!("failed to clear subtasks: {e}"))?;
        write_subtasks(&tx, &task.id, &task.subtasks)?;
        tx.commit()
            .map_err(|e| format!("failed to commit task: {e}"))?;
        Ok(true)
    }

    /// Fetch one of the user's tasks. Tasks owned by someone else read as absent.
    pub fn get_task(&self, user_id: &str, id: &str) -> Result<Option<Task>, String> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"
            ))
            .map_err(|e| format!("query error: {e}"))?;

        let mut rows = stmt
            .query_map(params![id, user_id], row_to_task)
            .map_err(|e| format!("query error: {e}"))?;

        let mut task = match rows.next() {
            Some(Ok(task)) => task,
            Some(Err(e)) => return Err(format!("query error: {e}")),
            None => return Ok(None),
        };
        task.subtasks = self.get_subtasks(id)?;
        Ok(Some(task))
    }

    /// All of a user's tasks, newest first.
    pub fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, String> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at DESC"
            ),
            params![user_id],
            user_id,
        )
    }

    /// A user's tasks in one category, newest first.
    pub fn list_tasks_by_category(
        &self,
        user_id: &str,
        category: Category,
    ) -> Result<Vec<Task>, String> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 AND category = ?2
                 ORDER BY created_at DESC"
            ),
            params![user_id, category.as_str()],
            user_id,
        )
    }

    /// Delete a task (subtasks cascade). Returns `false` if it did not exist.
    pub fn delete_task(&self, user_id: &str, id: &str) -> Result<bool, String> {
        let rows_changed = self
            .conn
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(|e| format!("failed to delete task: {e}"))?;
        Ok(rows_changed > 0)
    }

    pub fn get_subtasks(&self, task_id: &str) -> Result<Vec<Subtask>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, completed, created_at FROM subtasks
                 WHERE task_id = ?1 ORDER BY position ASC",
            )
            .map_err(|e| format!("query error: {e}"))?;

        let rows = stmt
            .query_map(params![task_id], row_to_subtask)
            .map_err(|e| format!("query error: {e}"))?;

        let mut subtasks = Vec::new();
        for row in rows {
            subtasks.push(row.map_err(|e| format!("row error: {e}"))?);
        }
        Ok(subtasks)
    }

    /// Run a task query and attach every matching task's subtasks with one extra query.
    fn query_tasks(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::types::ToSql],
        user_id: &str,
    ) -> Result<Vec<Task>, String> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| format!("query error: {e}"))?;

        let rows = stmt
            .query_map(params, row_to_task)
            .map_err(|e| format!("query error: {e}"))?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_err(|e| format!("row error: {e}"))?);
        }

        let mut by_task = self.subtasks_for_user(user_id)?;
        for task in &mut tasks {
            task.subtasks = by_task.remove(&task.id).unwrap_or_default();
        }
        Ok(tasks)
    }

    fn subtasks_for_user(&self, user_id: &str) -> Result<HashMap<String, Vec<Subtask>>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT s.task_id, s.id, s.title, s.completed, s.created_at
                 FROM subtasks s
                 JOIN tasks t ON t.id = s.task_id
                 WHERE t.user_id = ?1
                 ORDER BY s.task_id, s.position ASC",
            )
            .map_err(|e| format!("query error: {e}"))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                let task_id: String = row.get(0)?;
                let created_str: String = row.get(4)?;
                Ok((
                    task_id,
                    Subtask {
                        id: row.get(1)?,
                        title: row.get(2)?,
                        completed: row.get(3)?,
                        created_at: parse_timestamp(&created_str),
                    },
                ))
            })
            .map_err(|e| format!("query error: {e}"))?;

        let mut map: HashMap<String, Vec<Subtask>> = HashMap::new();
        for row in rows {
            let (task_id, subtask) = row.map_err(|e| format!("row error: {e}"))?;
            map.entry(task_id).or_default().push(subtask);
        }
        Ok(map)
    }
}

fn write_subtasks(conn: &Connection, task_id: &str, subtasks: &[Subtask]) -> Result<(), String> {
    let mut stmt = conn
        .prepare(
            "INSERT INTO subtasks (id, task_id, title, completed, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(|e| format!("query error: {e}"))?;
    for (position, subtask) in subtasks.iter().enumerate() {
        stmt.execute(params![
            subtask.id,
            task_id,
            subtask.title,
            subtask.completed,
            position as i64,
            subtask.created_at.to_rfc3339(),
        ])
        .map_err(|e| format!("failed to insert subtask: {e}"))?;
    }
    Ok(())
}

fn row_to_subtask(row: &rusqlite::Row) -> rusqlite::Result<Subtask> {
    let created_str: String = row.get(3)?;
    Ok(Subtask {
        id: row.get(0)?,
        title: row.get(1)?,
        completed: row.get(2)?,
        created_at: parse_timestamp(&created_str),
    })
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let category_str: String = row.get(5)?;
    let priority_str: String = row.get(6)?;
    let tags_str: String = row.get(8)?;
    let created_str: String = row.get(10)?;
    let updated_str: String = row.get(11)?;

    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get::<_, Option<String>>(3)?.filter(|d| !d.is_empty()),
        completed: row.get(4)?,
        category: Category::from_str(&category_str).unwrap_or_default(),
        priority: Priority::from_str(&priority_str).unwrap_or_default(),
        due_date: parse_optional_timestamp(row.get(7)?),
        tags: if tags_str.is_empty() {
            Vec::new()
        } else {
            tags_str.split(',').map(|s| s.trim().to_string()).collect()
        },
        subtasks: Vec::new(),
        completed_at: parse_optional_timestamp(row.get(9)?),
        created_at: parse_timestamp(&created_str),
        updated_at: parse_timestamp(&updated_str),
    })
}
