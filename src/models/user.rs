use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::Category;

/// Safe projection of a user row: the password hash is never part of this
/// type, so it cannot leak into a serialized response.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A user together with their associated categories, as returned by the
/// listing and profile endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub categories: Vec<Category>,
}

impl UserProfile {
    pub fn new(user: User, categories: Vec<Category>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            categories,
        }
    }
}
