use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateStudentRequest, Pagination, StudentsPage, UpdateStudentRequest},
    services,
};
use crate::{
    auth::{dto::UserProfile, extractors::AdminUser},
    error::{AppError, AppResult, MessageResponse},
    extract::ValidJson,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/students", get(list_students))
        .route("/admin/student", post(create_student))
        .route(
            "/admin/student/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
}

fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request("Invalid id"))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list_students(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<StudentsPage>> {
    Ok(Json(services::list_students(&state, &p).await?))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_student(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidJson(payload): ValidJson<CreateStudentRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = services::create_student(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[instrument(skip_all, fields(admin_id = %admin.id, %id))]
pub async fn get_student(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    let id = parse_id(&id)?;
    Ok(Json(services::get_student(&state, id).await?))
}

#[instrument(skip_all, fields(admin_id = %admin.id, %id))]
pub async fn update_student(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateStudentRequest>,
) -> AppResult<Json<Option<UserProfile>>> {
    let id = parse_id(&id)?;
    Ok(Json(services::update_student(&state, id, payload).await?))
}

#[instrument(skip_all, fields(admin_id = %admin.id, %id))]
pub async fn delete_student(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    services::delete_student(&state, &admin, id).await?;
    Ok(Json(MessageResponse::new("Student deleted")))
}
