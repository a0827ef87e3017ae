use serde::{Deserialize, Serialize};

use crate::auth::{dto::UserProfile, repo_types::Role};
use crate::error::AppError;
use crate::extract::{require, require_email, require_password, Validate};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 5;

/// `?page=&limit=`. Parsed leniently: anything missing, unparseable or non-positive falls back
/// to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl Pagination {
    pub fn page(&self) -> i64 {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    pub fn limit(&self) -> i64 {
        positive_or(self.limit.as_deref(), DEFAULT_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentsPage {
    pub students: Vec<UserProfile>,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStudentRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub course: Option<String>,
}

impl Validate for CreateStudentRequest {
    fn validate(&self) -> Result<(), AppError> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require_password("password", &self.password)
    }
}

/// Admin edit. Every field is optional; present fields overwrite the stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Blank means "keep the current password".
    pub password: Option<String>,
    pub role: Option<Role>,
    pub course: Option<String>,
    pub is_verified: Option<bool>,
}

impl Validate for UpdateStudentRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        match self.password.as_deref() {
            Some(p) if !p.is_empty() => require_password("password", p),
            _ => Ok(()),
        }
    }
}
