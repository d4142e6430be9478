use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{Category, User, UserProfile},
    routes::categories::ensure_categories_exist,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};

/// Request body for replacing the authenticated user's category set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCategoriesRequest {
    pub category_ids: Vec<i32>,
}

async fn categories_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<Category>, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT c.id, c.name FROM categories c
         JOIN user_categories uc ON uc.category_id = c.id
         WHERE uc.user_id = $1
         ORDER BY c.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

async fn load_profile(pool: &PgPool, user_id: i32) -> Result<Option<UserProfile>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT id, email, created_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match user {
        Some(user) => {
            let categories = categories_for_user(pool, user.id).await?;
            Ok(Some(UserProfile::new(user, categories)))
        }
        None => Ok(None),
    }
}

/// Retrieves all users with their associated categories.
///
/// Only the safe projection of each user is serialized; password hashes never
/// leave the store.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of users with their categories.
/// - `500 Internal Server Error`: For database errors.
#[get("")]
pub async fn list_users(pool: web::Data<PgPool>) -> Result<impl Responder, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT id, email, created_at FROM users ORDER BY id")
        .fetch_all(&**pool)
        .await?;

    let rows: Vec<(i32, i32, String)> = sqlx::query_as(
        "SELECT uc.user_id, c.id, c.name FROM user_categories uc
         JOIN categories c ON c.id = uc.category_id
         ORDER BY uc.user_id, c.id",
    )
    .fetch_all(&**pool)
    .await?;

    let mut by_user: HashMap<i32, Vec<Category>> = HashMap::new();
    for (user_id, id, name) in rows {
        by_user.entry(user_id).or_default().push(Category { id, name });
    }

    let profiles: Vec<UserProfile> = users
        .into_iter()
        .map(|user| {
            let categories = by_user.remove(&user.id).unwrap_or_default();
            UserProfile::new(user, categories)
        })
        .collect();

    Ok(HttpResponse::Ok().json(profiles))
}

/// Retrieves the authenticated user's profile.
///
/// The user id comes from the verified token claims attached by
/// `AuthMiddleware`.
///
/// ## Responses:
/// - `200 OK`: Returns the user with their categories.
/// - `400 Bad Request`: If no user id could be resolved from the token.
/// - `404 Not Found`: If the user row no longer exists (valid token, deleted entity).
/// - `500 Internal Server Error`: For database errors.
#[get("")]
pub async fn get_profile(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    match load_profile(&pool, user_id.0).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile)),
        None => Err(AppError::NotFound("User not found".into())),
    }
}

/// Replaces the authenticated user's category associations.
///
/// Wholesale set semantics: after this call the user is associated with
/// exactly the given categories. The current join rows are diffed against the
/// requested set and removals and insertions are applied in one transaction,
/// so a failure leaves the previous associations intact.
///
/// ## Request Body:
/// - `categoryIds`: Array of category ids (required; a non-array body is
///   rejected with 400 by deserialization).
///
/// ## Responses:
/// - `200 OK`: Returns the updated user with the new category list.
/// - `400 Bad Request`: Missing id in token, malformed body, or unknown category ids.
/// - `404 Not Found`: If the user row no longer exists.
/// - `500 Internal Server Error`: For database errors.
#[post("/categories")]
pub async fn set_profile_categories(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    body: web::Json<SetCategoriesRequest>,
) -> Result<impl Responder, AppError> {
    let user_id = user_id.0;

    let user_exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&**pool)
        .await?;
    if user_exists.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }

    ensure_categories_exist(&pool, &body.category_ids).await?;

    let requested: HashSet<i32> = body.category_ids.iter().copied().collect();

    let mut tx = pool.begin().await?;

    let current: Vec<(i32,)> =
        sqlx::query_as("SELECT category_id FROM user_categories WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
    let current: HashSet<i32> = current.into_iter().map(|(id,)| id).collect();

    let removed: Vec<i32> = current.difference(&requested).copied().collect();
    let added: Vec<i32> = requested.difference(&current).copied().collect();

    if !removed.is_empty() {
        sqlx::query("DELETE FROM user_categories WHERE user_id = $1 AND category_id = ANY($2)")
            .bind(user_id)
            .bind(&removed)
            .execute(&mut *tx)
            .await?;
    }
    for category_id in &added {
        sqlx::query("INSERT INTO user_categories (user_id, category_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    match load_profile(&pool, user_id).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile)),
        None => Err(AppError::NotFound("User not found".into())),
    }
}
