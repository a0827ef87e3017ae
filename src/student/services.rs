use tracing::{info, instrument, warn};

use super::dto::UpdateProfileRequest;
use crate::{
    auth::{dto::UserProfile, repo_types::User, services::load_profile},
    error::{AppError, AppResult},
    state::AppState,
};

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[instrument(skip(st, user, req), fields(user_id = %user.id))]
pub async fn update_profile(
    st: &AppState,
    mut user: User,
    req: UpdateProfileRequest,
) -> AppResult<UserProfile> {
    if let Some(name) = non_blank(req.name) {
        user.name = name;
    }
    if let Some(email) = non_blank(req.email) {
        user.email = email;
    }
    if let Some(course) = non_blank(req.course) {
        user.course = course;
    }

    let user = st
        .store
        .save_user(&user)
        .await
        .map_err(AppError::conflict_as("Email already in use"))?;
    info!("profile updated");
    load_profile(st, user).await
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    st: &AppState,
    mut user: User,
    old_password: &str,
    new_password: &str,
) -> AppResult<()> {
    if !user.check_password(old_password)? {
        warn!("incorrect old password");
        return Err(AppError::bad_request("Incorrect old password"));
    }
    user.set_password(new_password)?;
    st.store.save_user(&user).await?;
    info!("password changed");
    Ok(())
}
