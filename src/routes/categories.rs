use crate::{
    error::AppError,
    models::{Category, CategoryInput},
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use std::collections::HashSet;

/// Checks that every id in `ids` names an existing category.
///
/// Used by every operation that connects something to categories; failing the
/// check up front keeps those operations all-or-nothing.
pub(crate) async fn ensure_categories_exist(pool: &PgPool, ids: &[i32]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }

    let found: Vec<(i32,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;
    let found: HashSet<i32> = found.into_iter().map(|(id,)| id).collect();

    if ids.iter().any(|id| !found.contains(id)) {
        return Err(AppError::BadRequest(
            "One or more categories do not exist".into(),
        ));
    }

    Ok(())
}

/// Retrieves all categories.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Category` objects.
/// - `500 Internal Server Error`: For database errors.
#[get("")]
pub async fn list_categories(pool: web::Data<PgPool>) -> Result<impl Responder, AppError> {
    let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(categories))
}

/// Creates a new category.
///
/// ## Request Body:
/// - `name`: The category name (required, unique store-wide).
///
/// ## Responses:
/// - `201 Created`: Returns the new `Category` object as JSON.
/// - `400 Bad Request`: If a category with the same name already exists.
/// - `500 Internal Server Error`: For database errors.
#[post("")]
pub async fn create_category(
    pool: web::Data<PgPool>,
    category_data: web::Json<CategoryInput>,
) -> Result<impl Responder, AppError> {
    // Check if the name is already taken
    let existing: Option<(i32,)> = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
        .bind(&category_data.name)
        .fetch_optional(&**pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::BadRequest("Category name already exists".into()));
    }

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&category_data.name)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(category))
}

/// Deletes a category by its ID.
///
/// A category that is still referenced by any user or task association cannot
/// be deleted; the restrictive foreign keys in the schema enforce the same
/// rule at the store level.
///
/// ## Path Parameters:
/// - `id`: The ID of the category to delete.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: If the category does not exist or is still in use.
/// - `500 Internal Server Error`: For database errors.
#[delete("/{id}")]
pub async fn delete_category(
    pool: web::Data<PgPool>,
    category_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let category_id = category_id.into_inner();

    let (references,): (i64,) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM user_categories WHERE category_id = $1)
              + (SELECT COUNT(*) FROM task_categories WHERE category_id = $1)",
    )
    .bind(category_id)
    .fetch_one(&**pool)
    .await?;

    if references > 0 {
        return Err(AppError::NotFound("Category is in use".into()));
    }

    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Category not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
