use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::SessionUser;
use crate::auth::{csrf, password, session};
use crate::db;
use crate::error::{AppError, UserError};
use crate::models::User;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

async fn sign_in(state: &SharedState, user: &User) -> Result<CookieJar, AppError> {
    let token = session::start(&state.pool, &state.config.session, user.user_id).await?;
    let cookie = session::session_cookie(&state.config.session, &token)?;
    Ok(CookieJar::new().add(cookie))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<User>), AppError> {
    let mut user = User::new(req.name, req.email, req.password);
    user.prepare_create()?;

    let created = state.users.register(&user).await?;
    tracing::info!(user_id = %created.user_id, "user registered");

    // The account exists either way; without a session the client logs in next.
    let jar = match sign_in(&state, &created).await {
        Ok(jar) => jar,
        Err(e) => {
            tracing::error!(
                user_id = %created.user_id,
                "session not started after registration: {e}"
            );
            CookieJar::new()
        }
    };

    Ok((StatusCode::CREATED, jar, Json(created)))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<User>), AppError> {
    // Unknown email and wrong password must look the same to the client.
    let mut user = state
        .users
        .find_by_email(&req.email)
        .await
        .map_err(|e| match e {
            UserError::NotFound => password::reject_unknown(req.password.trim()),
            other => other,
        })?;

    if let Err(e) = user.compare_password(req.password.trim()) {
        if matches!(e, UserError::InvalidCredentials) {
            tracing::info!(user_id = %user.user_id, "login rejected: wrong password");
        }
        return Err(e.into());
    }
    user.redact();

    user.login_date = Some(state.users.touch_login_date(user.user_id).await?);
    let jar = sign_in(&state, &user).await?;

    tracing::info!(user_id = %user.user_id, "user logged in");
    Ok((jar, Json(user)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get(&state.config.session.cookie_name) {
        let token_hash = session::hash_token(cookie.value());
        let removed = db::sessions::delete_by_hash(&state.pool, &token_hash).await?;
        if removed > 0 {
            tracing::info!("session closed");
        }
    }

    let cleared = CookieJar::new().add(session::clear_session_cookie(&state.config.session));
    let body = MessageResponse {
        message: "Logged out successfully".to_string(),
    };
    Ok((cleared, Json(body)))
}

pub async fn me(
    State(state): State<SharedState>,
    current: SessionUser,
) -> Result<Json<User>, AppError> {
    let user = state.users.get_by_id(current.user_id).await?;
    Ok(Json(user))
}

pub async fn csrf_token(
    State(state): State<SharedState>,
    current: SessionUser,
) -> Result<([(&'static str, String); 1], Json<CsrfTokenResponse>), AppError> {
    let token = csrf::make_token(&state.config.csrf_secret, &current.session_token)?;
    Ok((
        [(csrf::CSRF_HEADER, token.clone())],
        Json(CsrfTokenResponse { csrf_token: token }),
    ))
}
