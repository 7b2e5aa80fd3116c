use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::CsrfGuard;
use crate::auth::session;
use crate::error::{AppError, UserError};
use crate::models::{User, UserUpdate, UsersList};
use crate::pagination::{PaginationParams, PaginationQuery};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct FindParams {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn find_by_name(
    State(state): State<SharedState>,
    Query(find): Query<FindParams>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<UsersList>, AppError> {
    if find.name.trim().is_empty() {
        return Err(UserError::Validation("name query parameter is required".to_string()).into());
    }
    let query = PaginationQuery::from_params(&params)?;

    let list = state.users.find_by_name(&find.name, &query).await?;
    Ok(Json(list))
}

pub async fn list(
    State(state): State<SharedState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<UsersList>, AppError> {
    let query = PaginationQuery::from_params(&params)?;

    let list = state.users.get_users(&query).await?;
    Ok(Json(list))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state.users.get_by_id(user_id).await?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<SharedState>,
    CsrfGuard(current): CsrfGuard,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<User>, AppError> {
    let mut update = UserUpdate {
        user_id,
        name: req.name,
        email: req.email,
        password: req.password,
    };
    update.prepare()?;

    let user = state.users.update(&update).await?;

    tracing::info!(%user_id, updated_by = %current.user_id, "user updated");
    Ok(Json(user))
}

pub async fn delete(
    State(state): State<SharedState>,
    CsrfGuard(current): CsrfGuard,
    Path(user_id): Path<Uuid>,
) -> Result<(StatusCode, CookieJar), AppError> {
    state.users.delete(user_id).await?;

    tracing::info!(%user_id, deleted_by = %current.user_id, "user deleted");

    // Sessions cascade with the user, so a self-delete also signs out.
    let jar = if current.user_id == user_id {
        CookieJar::new().add(session::clear_session_cookie(&state.config.session))
    } else {
        CookieJar::new()
    };
    Ok((StatusCode::NO_CONTENT, jar))
}
