/// Password hashing and JWT issuance/verification.
pub mod auth;
/// Server settings.
pub mod config;
/// Database layer: open, migrate, users, tasks, subtasks.
pub mod db;
/// Data types and field validation: User, Task, Subtask, Priority, Category.
pub mod models;
/// Task filtering, sorting and statistics.
pub mod query;
/// Axum-based REST API.
pub mod web;
