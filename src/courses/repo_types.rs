use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_THUMBNAIL: &str = "https://images.unsplash.com/photo-1498050108023-c5249f4df085";

/// Catalog entry. Referenced, never owned, by enrollments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub duration: String,
    pub thumbnail: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row shape of `enrollments JOIN courses`.
#[derive(Debug, FromRow)]
pub struct EnrollmentRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub duration: String,
    pub thumbnail: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub enrolled_at: OffsetDateTime,
}

/// An enrollment with its course reference resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    pub course_id: Course,
    #[serde(with = "time::serde::rfc3339")]
    pub enrolled_at: OffsetDateTime,
}

impl From<EnrollmentRow> for EnrolledCourse {
    fn from(r: EnrollmentRow) -> Self {
        Self {
            course_id: Course {
                id: r.id,
                title: r.title,
                description: r.description,
                instructor: r.instructor,
                duration: r.duration,
                thumbnail: r.thumbnail,
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
            enrolled_at: r.enrolled_at,
        }
    }
}
