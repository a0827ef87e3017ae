use serde::Deserialize;

use crate::error::AppError;
use crate::extract::{require, require_email, require_password, Validate};

/// Self-service profile edit. Missing or blank fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub course: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => require_email(email),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), AppError> {
        require("oldPassword", &self.old_password)?;
        require_password("newPassword", &self.new_password)
    }
}
