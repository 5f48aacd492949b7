//! Filtering, sorting and summary statistics over a user's task list.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Category, Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
    Overdue,
}

impl StatusFilter {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "pending" | "active" => Ok(StatusFilter::Pending),
            "overdue" => Ok(StatusFilter::Overdue),
            _ => Err(format!(
                "unknown status filter: {s}. valid filters: all, completed, pending, overdue"
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Completed => task.completed,
            StatusFilter::Pending => !task.completed,
            StatusFilter::Overdue => task.is_overdue(now),
        };
        status_ok
            && self.category.is_none_or(|c| task.category == c)
            && self.priority.is_none_or(|p| task.priority == p)
            && self.matches_search(task)
    }

    fn matches_search(&self, task: &Task) -> bool {
        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
            || task.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Priority,
    DueDate,
    Category,
}

impl SortKey {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().replace('_', "").as_str() {
            "createdat" | "created" => Ok(SortKey::CreatedAt),
            "updatedat" | "updated" => Ok(SortKey::UpdatedAt),
            "title" => Ok(SortKey::Title),
            "priority" => Ok(SortKey::Priority),
            "duedate" | "due" => Ok(SortKey::DueDate),
            "category" => Ok(SortKey::Category),
            _ => Err(format!(
                "unknown sort key: {s}. valid keys: createdAt, updatedAt, title, priority, dueDate, category"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(format!("unknown sort order: {s}. valid orders: asc, desc")),
        }
    }
}

/// Keep the tasks that satisfy every predicate in `filter`, preserving order.
pub fn filter_tasks(tasks: Vec<Task>, filter: &TaskFilter, now: DateTime<Utc>) -> Vec<Task> {
    tasks.into_iter().filter(|t| filter.matches(t, now)).collect()
}

/// Stable sort by `key` in `order`. Undated tasks always go last when sorting by due date.
pub fn sort_tasks(tasks: &mut [Task], key: SortKey, order: SortOrder) {
    let directed = |ord: Ordering| match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    };
    tasks.sort_by(|a, b| match key {
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
        SortKey::UpdatedAt => directed(a.updated_at.cmp(&b.updated_at)),
        SortKey::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
        SortKey::Priority => directed(a.priority.rank().cmp(&b.priority.rank())),
        SortKey::Category => directed(a.category.as_str().cmp(b.category.as_str())),
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => directed(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    });
}

/// Incomplete tasks past their due date, earliest due first.
pub fn overdue_tasks(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
    let filter = TaskFilter {
        status: StatusFilter::Overdue,
        ..TaskFilter::default()
    };
    let mut overdue = filter_tasks(tasks, &filter, now);
    sort_tasks(&mut overdue, SortKey::DueDate, SortOrder::Asc);
    overdue
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub due_today: usize,
    /// Percentage of completed tasks, rounded; 0 when there are no tasks.
    pub completion_rate: u32,
    pub by_priority: BTreeMap<&'static str, usize>,
    pub by_category: BTreeMap<&'static str, usize>,
}

pub fn task_stats(tasks: &[Task], now: DateTime<Utc>) -> TaskStats {
    let mut by_priority: BTreeMap<&'static str, usize> =
        Priority::ALL.iter().map(|p| (p.as_str(), 0)).collect();
    let mut by_category: BTreeMap<&'static str, usize> =
        Category::ALL.iter().map(|c| (c.as_str(), 0)).collect();

    let today = now.date_naive();
    let mut completed = 0;
    let mut overdue = 0;
    let mut due_today = 0;

    for task in tasks {
        if task.completed {
            completed += 1;
        } else if task.due_date.is_some_and(|d| d.date_naive() == today) {
            due_today += 1;
        }
        if task.is_overdue(now) {
            overdue += 1;
        }
        *by_priority.entry(task.priority.as_str()).or_insert(0) += 1;
        *by_category.entry(task.category.as_str()).or_insert(0) += 1;
    }

    let total = tasks.len();
    let completion_rate = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    };

    TaskStats {
        total,
        completed,
        pending: total - completed,
        overdue,
        due_today,
        completion_rate,
        by_priority,
        by_category,
    }
}
