use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::courses::repo_types::{Course, EnrolledCourse};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users, courses and enrollments.
///
/// Writes are single statements; callers rely on the backend's per-row atomicity.
/// `insert_user` and `save_user` fail with `Conflict` when the email is taken.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>>;
    /// Matches only while the reset token has not expired at `now`.
    async fn find_user_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: &User) -> StoreResult<User>;
    /// Persist every mutable field of `user`. `NotFound` if the row is gone.
    async fn save_user(&self, user: &User) -> StoreResult<User>;
    /// Returns false when nothing was deleted.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_students(&self, offset: i64, limit: i64) -> StoreResult<Vec<User>>;
    async fn count_students(&self) -> StoreResult<i64>;

    async fn list_courses(&self) -> StoreResult<Vec<Course>>;
    async fn find_course(&self, id: Uuid) -> StoreResult<Option<Course>>;
    async fn insert_course(&self, course: &Course) -> StoreResult<Course>;

    async fn enrollments_for(&self, user_id: Uuid) -> StoreResult<Vec<EnrolledCourse>>;
    /// Returns false when the user is already enrolled in the course.
    async fn add_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool>;
    async fn remove_enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
