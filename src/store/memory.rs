//! In-memory implementation of [`Store`].
//!
//! Used by tests and when no `DATABASE_URL` is configured. Nothing is durable; all state is
//! lost on restart. Every operation takes the single lock once, so each call is atomic with
//! respect to the others, which mirrors the per-row atomicity of the Postgres backend.
use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::auth::repo_types::{Role, User};
use crate::courses::repo_types::{Course, EnrolledCourse};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    courses: HashMap<Uuid, Course>,
    /// (user_id, course_id) -> enrolled_at
    enrollments: HashMap<(Uuid, Uuid), OffsetDateTime>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_user_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.reset_token_valid(token, now))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, None) {
            return Err(StoreError::Conflict("email".into()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(StoreError::NotFound("User".into()));
        }
        if inner.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::Conflict("email".into()));
        }
        let mut saved = user.clone();
        saved.updated_at = OffsetDateTime::now_utc();
        inner.users.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.users.remove(&id).is_some();
        if removed {
            inner.enrollments.retain(|(user_id, _), _| *user_id != id);
        }
        Ok(removed)
    }

    async fn list_students(&self, offset: i64, limit: i64) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut students: Vec<&User> = inner
            .users
            .values()
            .filter(|u| u.role == Role::Student)
            .collect();
        students.sort_by_key(|u| (u.created_at, u.id));
        Ok(students
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_students(&self) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| u.role == Role::Student)
            .count() as i64)
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        let inner = self.inner.read().await;
        let mut courses: Vec<Course> = inner.courses.values().cloned().collect();
        courses.sort_by_key(|c| (c.created_at, c.id));
        Ok(courses)
    }

    async fn find_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        Ok(self.inner.read().await.courses.get(&id).cloned())
    }

    async fn insert_course(&self, course: &Course) -> StoreResult<Course> {
        let mut inner = self.inner.write().await;
        inner.courses.insert(course.id, course.clone());
        Ok(course.clone())
    }

    async fn enrollments_for(&self, user_id: Uuid) -> StoreResult<Vec<EnrolledCourse>> {
        let inner = self.inner.read().await;
        let mut out: Vec<EnrolledCourse> = inner
            .enrollments
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .filter_map(|((_, cid), at)| {
                inner.courses.get(cid).map(|c| EnrolledCourse {
                    course_id: c.clone(),
                    enrolled_at: *at,
                })
            })
            .collect();
        out.sort_by_key(|e| (e.enrolled_at, e.course_id.id));
        Ok(out)
    }

    async fn add_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("User".into()));
        }
        if !inner.courses.contains_key(&course_id) {
            return Err(StoreError::NotFound("Course".into()));
        }
        if inner.enrollments.contains_key(&(user_id, course_id)) {
            return Ok(false);
        }
        inner.enrollments.insert((user_id, course_id), at);
        Ok(true)
    }

    async fn remove_enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .enrollments
            .remove(&(user_id, course_id));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
