use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateCourseRequest, EnrollmentRequest},
    repo_types::Course,
    services,
};
use crate::{
    auth::{
        dto::UserProfile,
        extractors::{AdminUser, AuthUser},
    },
    error::AppResult,
    extract::ValidJson,
    state::AppState,
};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/enroll", post(enroll))
        .route("/courses/disenroll", post(disenroll))
}

#[instrument(skip(state))]
pub async fn list_courses(State(state): State<AppState>) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(services::list_courses(&state).await?))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidJson(payload): ValidJson<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<Course>)> {
    let course = services::create_course(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn enroll(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<EnrollmentRequest>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(services::enroll(&state, user, &payload.course_id).await?))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn disenroll(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<EnrollmentRequest>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(
        services::disenroll(&state, user, &payload.course_id).await?,
    ))
}
