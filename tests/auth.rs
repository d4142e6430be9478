use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{rt, test, web, App, HttpServer};
use dotenv::dotenv;
use serde_json::json;
use sqlx::PgPool;
use std::net::TcpListener;
use taskhive::routes;

async fn setup_pool() -> PgPool {
    dotenv().ok(); // Load .env file
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    }
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

async fn cleanup_category(pool: &PgPool, name: &str) {
    let _ = sqlx::query("DELETE FROM categories WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await;
}

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let pool = setup_pool().await;
    cleanup_user(&pool, "integration@example.com").await;

    // Inline App setup
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::index)
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    // Register a new user
    let register_payload = json!({
        "email": "integration@example.com",
        "password": "Password123!"
    });
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body_bytes = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Registration failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes)
    );
    let register_response: taskhive::auth::RegisterResponse =
        serde_json::from_slice(&body_bytes).expect("Failed to parse registration response JSON");
    assert!(!register_response.message.is_empty());

    // Try to register the same user again (should fail)
    let req_conflict = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&register_payload)
        .to_request();
    let resp_conflict = test::call_service(&app, req_conflict).await;
    let status_conflict = resp_conflict.status();
    let body_bytes_conflict = test::read_body(resp_conflict).await;
    assert_eq!(
        status_conflict,
        actix_web::http::StatusCode::BAD_REQUEST,
        "Duplicate registration did not fail as expected. Body: {:?}",
        String::from_utf8_lossy(&body_bytes_conflict)
    );

    // Login with the registered user
    let login_payload = json!({
        "email": "integration@example.com",
        "password": "Password123!"
    });
    let req_login = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&login_payload)
        .to_request();
    let resp_login = test::call_service(&app, req_login).await;
    let status_login = resp_login.status();
    let body_bytes_login = test::read_body(resp_login).await;

    assert_eq!(
        status_login,
        actix_web::http::StatusCode::OK,
        "Login failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes_login)
    );

    let login_response: taskhive::auth::AuthResponse =
        serde_json::from_slice(&body_bytes_login).expect("Failed to parse login response JSON");

    let token = login_response.token.clone();
    assert!(!token.is_empty(), "Token should be a non-empty string");
    assert_eq!(login_response.user_id, register_response.user_id);

    // Use the token to access the protected profile route
    let req_profile = test::TestRequest::get()
        .uri("/api/profile")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp_profile = test::call_service(&app, req_profile).await;
    let status_profile = resp_profile.status();
    let body_bytes_profile = test::read_body(resp_profile).await;
    assert_eq!(
        status_profile,
        actix_web::http::StatusCode::OK,
        "Profile fetch with token failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes_profile)
    );

    let profile: serde_json::Value =
        serde_json::from_slice(&body_bytes_profile).expect("Failed to parse profile JSON");
    assert_eq!(
        profile.get("email").and_then(|e| e.as_str()),
        Some("integration@example.com")
    );
    assert_eq!(
        profile.get("id").and_then(|id| id.as_i64()),
        Some(register_response.user_id as i64)
    );
    // The password hash must never be serialized
    assert!(profile.get("password").is_none());
    assert!(profile.get("passwordHash").is_none());

    cleanup_user(&pool, "integration@example.com").await;
}

#[actix_rt::test]
async fn test_register_with_categories() {
    let pool = setup_pool().await;
    cleanup_user(&pool, "reg_with_cats@example.com").await;
    cleanup_user(&pool, "reg_bad_cats@example.com").await;
    cleanup_category(&pool, "reg_cat_a").await;
    cleanup_category(&pool, "reg_cat_b").await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    // Create two categories to connect the new user to
    let mut category_ids = Vec::new();
    for name in ["reg_cat_a", "reg_cat_b"] {
        let req = test::TestRequest::post()
            .uri("/api/categories")
            .set_json(&json!({ "name": name }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
        let category: serde_json::Value = test::read_body_json(resp).await;
        category_ids.push(category["id"].as_i64().unwrap());
    }

    // Register with the categories attached
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "email": "reg_with_cats@example.com",
            "password": "Password123!",
            "categoryIds": category_ids
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body_bytes = test::read_body(resp).await;
    assert_eq!(
        status,
        actix_web::http::StatusCode::CREATED,
        "Registration with categories failed. Body: {:?}",
        String::from_utf8_lossy(&body_bytes)
    );

    // The listing must show the user with exactly those categories
    let req = test::TestRequest::get().uri("/api/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let users: serde_json::Value = test::read_body_json(resp).await;
    let user = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "reg_with_cats@example.com")
        .expect("Registered user missing from listing");
    let names: Vec<&str> = user["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["reg_cat_a", "reg_cat_b"]);

    // Registration with an unknown category id fails entirely
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "email": "reg_bad_cats@example.com",
            "password": "Password123!",
            "categoryIds": [999_999]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind("reg_bad_cats@example.com")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "No user row may exist after a failed registration");

    cleanup_user(&pool, "reg_with_cats@example.com").await;
    cleanup_category(&pool, "reg_cat_a").await;
    cleanup_category(&pool, "reg_cat_b").await;
}

#[actix_rt::test]
async fn test_login_failures_are_generic() {
    let pool = setup_pool().await;
    let email = "login_generic@example.com";
    cleanup_user(&pool, email).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    // Register a known user
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({ "email": email, "password": "Password123!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "Setup: registration failed");

    // Wrong password for a known user
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": email, "password": "WrongPassword123!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    let wrong_password_body = test::read_body(resp).await;

    // Unknown email
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(&json!({ "email": "nobody@example.com", "password": "Password123!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    let unknown_email_body = test::read_body(resp).await;

    // The two failures must be indistinguishable
    assert_eq!(wrong_password_body, unknown_email_body);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_missing_and_invalid_token_rejections() {
    let pool = setup_pool().await;

    // Middleware rejections surface as transport-level error responses, so
    // exercise them against a real server like a client would.
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server_pool = pool.clone();
    let _server_handle = rt::spawn(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(server_pool.clone()))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(Logger::default())
                .service(routes::health::index)
                .service(web::scope("/api").configure(routes::config))
        })
        .bind(("127.0.0.1", port))
        .unwrap_or_else(|_| panic!("Failed to bind to port {}", port))
        .run()
        .await
    });

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let request_url = format!("http://127.0.0.1:{}/api/profile", port);

    // No Authorization header at all
    let resp = client
        .get(&request_url)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body = resp.text().await.unwrap();
    assert!(body.is_empty(), "Missing-token rejection must have no body");

    // A token that cannot be verified
    let resp = client
        .get(&request_url)
        .header("Authorization", "Bearer not-a-real-token")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    let body = resp.text().await.unwrap();
    assert!(body.is_empty(), "Invalid-token rejection must have no body");
}
