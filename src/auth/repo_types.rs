use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::password::{hash_password, verify_password};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    Admin,
    #[default]
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("Admin"),
            Role::Student => f.write_str("Student"),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never rendered
    pub role: Role,
    pub course: String, // free-text label, unrelated to enrollments
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<OffsetDateTime>,
    pub enrollment_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Build a new, unsaved user with a hashed password.
    pub fn new(
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        course: &str,
    ) -> anyhow::Result<Self> {
        let now = OffsetDateTime::now_utc();
        let mut user = Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            role,
            course: course.to_string(),
            is_verified: false,
            verification_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            enrollment_date: now,
            created_at: now,
            updated_at: now,
        };
        user.set_password(password)?;
        Ok(user)
    }

    /// The only way the stored secret changes. Always re-hashes.
    pub fn set_password(&mut self, plain: &str) -> anyhow::Result<()> {
        self.password_hash = hash_password(plain)?;
        Ok(())
    }

    pub fn check_password(&self, plain: &str) -> anyhow::Result<bool> {
        verify_password(plain, &self.password_hash)
    }

    pub fn reset_token_valid(&self, token: &str, now: OffsetDateTime) -> bool {
        match (&self.reset_password_token, self.reset_password_expires) {
            (Some(t), Some(expires)) => t == token && expires > now,
            _ => false,
        }
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expires = None;
    }
}
