use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ChangePasswordRequest, UpdateProfileRequest},
    services,
};
use crate::{
    auth::{dto::UserProfile, extractors::AuthUser, services::load_profile},
    error::{AppResult, MessageResponse},
    extract::ValidJson,
    state::AppState,
};

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/student/profile", get(get_profile).put(update_profile))
        .route("/student/change-password", put(change_password))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(load_profile(&state, user).await?))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(services::update_profile(&state, user, payload).await?))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::change_password(&state, user, &payload.old_password, &payload.new_password).await?;
    Ok(Json(MessageResponse::new("Password updated successfully")))
}
