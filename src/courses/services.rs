use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::CreateCourseRequest,
    repo_types::{Course, DEFAULT_THUMBNAIL},
};
use crate::{
    auth::{dto::UserProfile, repo_types::User, services::load_profile},
    error::{AppError, AppResult},
    state::AppState,
};

pub async fn list_courses(st: &AppState) -> AppResult<Vec<Course>> {
    Ok(st.store.list_courses().await?)
}

#[instrument(skip(st, req), fields(title = %req.title))]
pub async fn create_course(st: &AppState, req: CreateCourseRequest) -> AppResult<Course> {
    let now = OffsetDateTime::now_utc();
    let thumbnail = req
        .thumbnail
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_THUMBNAIL.to_string());
    let course = Course {
        id: Uuid::new_v4(),
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        instructor: req.instructor.trim().to_string(),
        duration: req.duration.trim().to_string(),
        thumbnail,
        created_at: now,
        updated_at: now,
    };
    let course = st.store.insert_course(&course).await?;
    info!(course_id = %course.id, "course created");
    Ok(course)
}

fn parse_course_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request("Invalid course id"))
}

#[instrument(skip(st, user), fields(user_id = %user.id))]
pub async fn enroll(st: &AppState, user: User, course_id: &str) -> AppResult<UserProfile> {
    let course_id = parse_course_id(course_id)?;
    if st.store.find_course(course_id).await?.is_none() {
        return Err(AppError::not_found("Course not found"));
    }

    let added = st
        .store
        .add_enrollment(user.id, course_id, OffsetDateTime::now_utc())
        .await?;
    if !added {
        warn!(%course_id, "already enrolled");
        return Err(AppError::bad_request("You are already enrolled in this course"));
    }
    info!(%course_id, "enrolled");
    load_profile(st, user).await
}

/// Idempotent: removing an enrollment that does not exist is not an error.
#[instrument(skip(st, user), fields(user_id = %user.id))]
pub async fn disenroll(st: &AppState, user: User, course_id: &str) -> AppResult<UserProfile> {
    let course_id = parse_course_id(course_id)?;
    st.store.remove_enrollment(user.id, course_id).await?;
    info!(%course_id, "disenrolled");
    load_profile(st, user).await
}
