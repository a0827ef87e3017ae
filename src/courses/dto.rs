use serde::Deserialize;

use crate::error::AppError;
use crate::extract::{require, Validate};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub duration: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Validate for CreateCourseRequest {
    fn validate(&self) -> Result<(), AppError> {
        require("title", &self.title)?;
        require("description", &self.description)?;
        require("instructor", &self.instructor)?;
        require("duration", &self.duration)
    }
}

/// Body of `/courses/enroll` and `/courses/disenroll`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub course_id: String,
}

impl Validate for EnrollmentRequest {
    fn validate(&self) -> Result<(), AppError> {
        require("courseId", &self.course_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_course_requires_all_text_fields() {
        let req: CreateCourseRequest = serde_json::from_str(
            r#"{"title":"Rust","description":"","instructor":"Ferris","duration":"6 weeks"}"#,
        )
        .unwrap();
        assert_eq!(req.validate().unwrap_err().to_string(), "description is required");
    }

    #[test]
    fn create_course_missing_field_fails_to_parse() {
        let res = serde_json::from_str::<CreateCourseRequest>(r#"{"title":"Rust"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn enrollment_request_uses_camel_case() {
        let req: EnrollmentRequest = serde_json::from_str(r#"{"courseId":"abc"}"#).unwrap();
        assert_eq!(req.course_id, "abc");
        assert!(serde_json::from_str::<EnrollmentRequest>(r#"{"course_id":"abc"}"#).is_err());
    }
}
