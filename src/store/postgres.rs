use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::auth::repo_types::User;
use crate::courses::repo_types::{Course, EnrolledCourse, EnrollmentRow};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, course, is_verified, \
     verification_token, reset_password_token, reset_password_expires, \
     enrollment_date, created_at, updated_at";

const COURSE_COLUMNS: &str =
    "id, title, description, instructor, duration, thumbnail, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        Ok(Self { db })
    }
}

fn map_write_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict("email".into())
        }
        other => StoreError::Unexpected(other.into()),
    }
}

/// A foreign-key failure on `enrollments` means the user or course vanished after the caller
/// looked it up. Reported the same way the memory store reports it.
fn map_enrollment_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            missing_parent(db_err.constraint())
        }
        other => unexpected("insert enrollment")(other),
    }
}

fn missing_parent(constraint: Option<&str>) -> StoreError {
    match constraint {
        Some(c) if c.contains("course_id") => StoreError::NotFound("Course".into()),
        _ => StoreError::NotFound("User".into()),
    }
}

fn unexpected(what: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| StoreError::Unexpected(anyhow::Error::new(e).context(what))
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(unexpected("find user by id"))?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(unexpected("find user by email"))?;
        Ok(user)
    }

    async fn find_user_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(unexpected("find user by verification token"))?;
        Ok(user)
    }

    async fn find_user_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_password_token = $1 AND reset_password_expires > $2"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .map_err(unexpected("find user by reset token"))?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<User> {
        let saved = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.course)
        .bind(user.is_verified)
        .bind(&user.verification_token)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expires)
        .bind(user.enrollment_date)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_err)?;
        Ok(saved)
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        let saved = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name = $2, email = $3, password_hash = $4, role = $5, course = $6,
                   is_verified = $7, verification_token = $8, reset_password_token = $9,
                   reset_password_expires = $10, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.course)
        .bind(user.is_verified)
        .bind(&user.verification_token)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expires)
        .fetch_optional(&self.db)
        .await
        .map_err(map_write_err)?;
        saved.ok_or_else(|| StoreError::NotFound("User".into()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(unexpected("delete user"))?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_students(&self, offset: i64, limit: i64) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE role = 'Student'
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .map_err(unexpected("list students"))?;
        Ok(rows)
    }

    async fn count_students(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'Student'")
            .fetch_one(&self.db)
            .await
            .map_err(unexpected("count students"))?;
        Ok(count)
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(unexpected("list courses"))?;
        Ok(rows)
    }

    async fn find_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        let row = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(unexpected("find course"))?;
        Ok(row)
    }

    async fn insert_course(&self, course: &Course) -> StoreResult<Course> {
        let saved = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses ({COURSE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.instructor)
        .bind(&course.duration)
        .bind(&course.thumbnail)
        .bind(course.created_at)
        .bind(course.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(unexpected("insert course"))?;
        Ok(saved)
    }

    async fn enrollments_for(&self, user_id: Uuid) -> StoreResult<Vec<EnrolledCourse>> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT c.id, c.title, c.description, c.instructor, c.duration, c.thumbnail,
                   c.created_at, c.updated_at, e.enrolled_at
              FROM enrollments e
              JOIN courses c ON c.id = e.course_id
             WHERE e.user_id = $1
             ORDER BY e.enrolled_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(unexpected("list enrollments"))?;
        Ok(rows.into_iter().map(EnrolledCourse::from).collect())
    }

    async fn add_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        // The (user_id, course_id) primary key makes concurrent duplicates a no-op.
        let res = sqlx::query(
            r#"
            INSERT INTO enrollments (user_id, course_id, enrolled_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(at)
        .execute(&self.db)
        .await
        .map_err(map_enrollment_err)?;
        Ok(res.rows_affected() == 1)
    }

    async fn remove_enrollment(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&self.db)
            .await
            .map_err(unexpected("delete enrollment"))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
