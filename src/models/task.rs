use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Category;

/// Represents a task row as stored in the database.
#[derive(Debug, Serialize, FromRow)]
pub struct Task {
    pub id: i32,
    pub title: String,
}

/// Input structure for creating a task.
///
/// `category_ids` is required and must be an array; a body where it is
/// missing or of another JSON type fails deserialization and is rejected
/// with a 400 before the handler runs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    pub category_ids: Vec<i32>,
}

/// A task together with its associated categories, as returned by the API.
#[derive(Debug, Serialize)]
pub struct TaskWithCategories {
    pub id: i32,
    pub title: String,
    pub categories: Vec<Category>,
}

impl TaskWithCategories {
    pub fn new(task: Task, categories: Vec<Category>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            categories,
        }
    }
}
