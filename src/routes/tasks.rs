use crate::{
    error::AppError,
    models::{Category, Task, TaskInput, TaskWithCategories},
    routes::categories::ensure_categories_exist,
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use std::collections::HashMap;

/// Retrieves all tasks with their associated categories.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of tasks, each with a `categories` array.
/// - `500 Internal Server Error`: For database errors.
#[get("")]
pub async fn list_tasks(pool: web::Data<PgPool>) -> Result<impl Responder, AppError> {
    let tasks = sqlx::query_as::<_, Task>("SELECT id, title FROM tasks ORDER BY id")
        .fetch_all(&**pool)
        .await?;

    let rows: Vec<(i32, i32, String)> = sqlx::query_as(
        "SELECT tc.task_id, c.id, c.name FROM task_categories tc
         JOIN categories c ON c.id = tc.category_id
         ORDER BY tc.task_id, c.id",
    )
    .fetch_all(&**pool)
    .await?;

    let mut by_task: HashMap<i32, Vec<Category>> = HashMap::new();
    for (task_id, id, name) in rows {
        by_task.entry(task_id).or_default().push(Category { id, name });
    }

    let tasks: Vec<TaskWithCategories> = tasks
        .into_iter()
        .map(|task| {
            let categories = by_task.remove(&task.id).unwrap_or_default();
            TaskWithCategories::new(task, categories)
        })
        .collect();

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task connected to the given categories.
///
/// Every category id is checked before anything is written; the insert of the
/// task and its join rows runs in one transaction, so an invalid id never
/// leaves a partial task behind.
///
/// ## Request Body:
/// - `title`: The task title (required).
/// - `categoryIds`: Array of category ids (required; a non-array body is
///   rejected with 400 by deserialization).
///
/// ## Responses:
/// - `201 Created`: Returns the new task with its categories.
/// - `400 Bad Request`: If any category id does not exist.
/// - `500 Internal Server Error`: For database errors.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    ensure_categories_exist(&pool, &task_data.category_ids).await?;

    let mut tx = pool.begin().await?;

    let task =
        sqlx::query_as::<_, Task>("INSERT INTO tasks (title) VALUES ($1) RETURNING id, title")
            .bind(&task_data.title)
            .fetch_one(&mut *tx)
            .await?;

    for category_id in &task_data.category_ids {
        // ON CONFLICT absorbs a repeated id in the request; the pair stays unique
        sqlx::query(
            "INSERT INTO task_categories (task_id, category_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(task.id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let categories = sqlx::query_as::<_, Category>(
        "SELECT c.id, c.name FROM categories c
         JOIN task_categories tc ON tc.category_id = c.id
         WHERE tc.task_id = $1
         ORDER BY c.id",
    )
    .bind(task.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(TaskWithCategories::new(task, categories)))
}

/// Deletes a task by its ID.
///
/// Join rows referencing the task cascade away with it.
///
/// ## Path Parameters:
/// - `id`: The ID of the task to delete.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: If the task does not exist.
/// - `500 Internal Server Error`: For database errors.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id.into_inner())
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
