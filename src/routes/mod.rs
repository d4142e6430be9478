pub mod auth;
pub mod categories;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

use crate::auth::AuthMiddleware;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login),
    )
    .service(
        // Only the profile scope requires a bearer token.
        web::scope("/profile")
            .wrap(AuthMiddleware)
            .service(users::get_profile)
            .service(users::set_profile_categories),
    )
    .service(web::scope("/users").service(users::list_users))
    .service(
        web::scope("/categories")
            .service(categories::list_categories)
            .service(categories::create_category)
            .service(categories::delete_category),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::list_tasks)
            .service(tasks::create_task)
            .service(tasks::delete_task),
    );
}
