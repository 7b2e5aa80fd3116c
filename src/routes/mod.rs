pub mod auth;
pub mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Sessions
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/token", get(auth::csrf_token))
        // Users
        .route("/api/v1/auth/find", get(users::find_by_name))
        .route("/api/v1/auth/all", get(users::list))
        .route(
            "/api/v1/auth/{user_id}",
            get(users::get).put(users::update).delete(users::delete),
        )
}
