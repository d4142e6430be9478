use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, LoginRequest,
        RegisterRequest, RegisterResponse,
    },
    error::AppError,
    routes::categories::ensure_categories_exist,
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Register a new user
///
/// Creates a new user account, optionally connecting it to existing
/// categories, and returns the new user's id. An already registered email or
/// an unknown category id fails the whole operation; nothing is written.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    // Check if email already exists
    let existing_user: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&register_data.email)
        .fetch_optional(&**pool)
        .await?;

    if existing_user.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let category_ids = register_data.category_ids.clone().unwrap_or_default();
    ensure_categories_exist(&pool, &category_ids).await?;

    // Hash password
    let password_hash = hash_password(&register_data.password)?;

    // Insert the user and its category associations atomically
    let mut tx = pool.begin().await?;

    let (user_id,): (i32,) =
        sqlx::query_as("INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id")
            .bind(&register_data.email)
            .bind(&password_hash)
            .fetch_one(&mut *tx)
            .await?;

    for category_id in &category_ids {
        // ON CONFLICT absorbs a repeated id in the request; the pair stays unique
        sqlx::query(
            "INSERT INTO user_categories (user_id, category_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".into(),
        user_id,
    }))
}

/// Login user
///
/// Authenticates a user and returns an authentication token. An unknown email
/// and a wrong password produce the identical generic failure, so a caller
/// cannot tell which field was wrong.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Get user from database
    let user: Option<(i32, String)> =
        sqlx::query_as("SELECT id, password_hash FROM users WHERE email = $1")
            .bind(&login_data.email)
            .fetch_optional(&**pool)
            .await?;

    match user {
        Some((user_id, password_hash)) => {
            // Verify password
            if verify_password(&login_data.password, &password_hash)? {
                // Generate token
                let token = generate_token(user_id)?;
                Ok(HttpResponse::Ok().json(AuthResponse {
                    token,
                    user_id,
                    message: "Login successful".into(),
                }))
            } else {
                Err(AppError::Unauthorized("Invalid credentials".into()))
            }
        }
        None => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}
