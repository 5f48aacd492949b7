use rusqlite::{ErrorCode, params};
use serde::Serialize;

use super::{Database, parse_timestamp};
use crate::models::User;

/// A user together with task counts, for the admin listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub task_count: i64,
    pub completed_count: i64,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";

impl Database {
    /// Insert a new user. Returns `false` if the email is already taken.
    pub fn insert_user(&self, user: &User) -> Result<bool, String> {
        let result = self.conn.execute(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.name,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Ok(false)
            }
            Err(e) => Err(format!("failed to insert user: {e}")),
        }
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>, String> {
        self.query_one_user(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"), id)
    }

    /// Look up a user by email (case-insensitive).
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, String> {
        self.query_one_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            &email.trim().to_lowercase(),
        )
    }

    pub fn list_users(&self) -> Result<Vec<UserSummary>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT u.id, u.name, u.email, u.password_hash, u.created_at,
                        COUNT(t.id), COALESCE(SUM(t.completed), 0)
                 FROM users u
                 LEFT JOIN tasks t ON t.user_id = u.id
                 GROUP BY u.id
                 ORDER BY u.created_at ASC",
            )
            .map_err(|e| format!("query error: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(UserSummary {
                    user: row_to_user(row)?,
                    task_count: row.get(5)?,
                    completed_count: row.get(6)?,
                })
            })
            .map_err(|e| format!("query error: {e}"))?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(|e| format!("row error: {e}"))?);
        }
        Ok(users)
    }

    fn query_one_user(&self, sql: &str, key: &str) -> Result<Option<User>, String> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| format!("query error: {e}"))?;
        let mut rows = stmt
            .query_map(params![key], row_to_user)
            .map_err(|e| format!("query error: {e}"))?;
        match rows.next() {
            Some(Ok(user)) => Ok(Some(user)),
            Some(Err(e)) => Err(format!("query error: {e}")),
            None => Ok(None),
        }
    }
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created_str: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_timestamp(&created_str),
    })
}
