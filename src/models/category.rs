use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents a category as stored in the database and returned by the API.
///
/// Categories are shared labels: users and tasks both associate with them
/// through join tables, and a category name is unique store-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

/// Input structure for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}
