use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateStudentRequest, Pagination, StudentsPage, UpdateStudentRequest};
use crate::{
    auth::{
        dto::UserProfile,
        repo_types::{Role, User},
        services::{create_verified_user, load_profile},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub const DEFAULT_ADMIN_COURSE: &str = "Not Assigned";

/// Ceiling division that cannot overflow for any positive `limit`.
fn page_count(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total - 1) / limit + 1
    }
}

#[instrument(skip(st))]
pub async fn list_students(st: &AppState, p: &Pagination) -> AppResult<StudentsPage> {
    let (page, limit) = (p.page(), p.limit());
    let total = st.store.count_students().await?;
    let offset = (page - 1).saturating_mul(limit);
    let users = st.store.list_students(offset, limit).await?;

    let mut students = Vec::with_capacity(users.len());
    for user in users {
        students.push(load_profile(st, user).await?);
    }
    let pages = page_count(total, limit);
    Ok(StudentsPage {
        students,
        total,
        pages,
    })
}

#[instrument(skip(st, req), fields(email = %req.email))]
pub async fn create_student(st: &AppState, req: CreateStudentRequest) -> AppResult<UserProfile> {
    let email = req.email.trim();
    if st.store.find_user_by_email(email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }
    let course = req
        .course
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_ADMIN_COURSE);
    let user =
        create_verified_user(st, req.name.trim(), email, &req.password, Role::Student, course)
            .await?;
    info!(user_id = %user.id, "student created by admin");
    load_profile(st, user).await
}

/// Returns `None` when no user has `id`.
#[instrument(skip(st, req))]
pub async fn update_student(
    st: &AppState,
    id: Uuid,
    req: UpdateStudentRequest,
) -> AppResult<Option<UserProfile>> {
    let Some(mut user) = st.store.find_user_by_id(id).await? else {
        warn!(user_id = %id, "update of unknown user");
        return Ok(None);
    };

    if let Some(name) = req.name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = req.email {
        user.email = email.trim().to_string();
    }
    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        user.set_password(&password)?;
    }
    if let Some(role) = req.role {
        user.role = role;
    }
    if let Some(course) = req.course {
        user.course = course;
    }
    if let Some(is_verified) = req.is_verified {
        user.is_verified = is_verified;
    }

    let user = st
        .store
        .save_user(&user)
        .await
        .map_err(AppError::conflict_as("Email already in use"))?;
    info!(user_id = %user.id, "user updated by admin");
    Ok(Some(load_profile(st, user).await?))
}

#[instrument(skip(st, acting), fields(admin_id = %acting.id))]
pub async fn delete_student(st: &AppState, acting: &User, target_id: Uuid) -> AppResult<()> {
    let target = st
        .store
        .find_user_by_id(target_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if target.id == acting.id {
        warn!("admin tried to delete own account");
        return Err(AppError::forbidden("You cannot delete your own account."));
    }
    if target.role == Role::Admin {
        warn!(target_id = %target.id, "admin tried to delete another admin");
        return Err(AppError::forbidden("Admin accounts cannot be deleted here."));
    }

    if !st.store.delete_user(target.id).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(target_id = %target.id, "student deleted");
    Ok(())
}

#[instrument(skip(st))]
pub async fn get_student(st: &AppState, id: Uuid) -> AppResult<UserProfile> {
    let user = st
        .store
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;
    load_profile(st, user).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn admin(st: &AppState, email: &str) -> User {
        create_verified_user(st, "Admin", email, "secret1", Role::Admin, "")
            .await
            .unwrap()
    }

    fn new_student(email: &str) -> CreateStudentRequest {
        CreateStudentRequest {
            name: "Stu".into(),
            email: email.into(),
            password: "secret1".into(),
            course: None,
        }
    }

    #[tokio::test]
    async fn created_students_are_verified_students() {
        let st = AppState::fake();
        let profile = create_student(&st, new_student("s@x.com")).await.unwrap();
        assert_eq!(profile.role, Role::Student);
        assert!(profile.is_verified);
        assert_eq!(profile.course, DEFAULT_ADMIN_COURSE);

        let err = create_student(&st, new_student("s@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "User with this email already exists"));
    }

    #[tokio::test]
    async fn list_students_paginates() {
        let st = AppState::fake();
        admin(&st, "admin@x.com").await;
        for i in 0..7 {
            create_student(&st, new_student(&format!("s{i}@x.com")))
                .await
                .unwrap();
        }

        let first = list_students(&st, &Pagination::default()).await.unwrap();
        assert_eq!((first.students.len(), first.total, first.pages), (5, 7, 2));

        let second = list_students(
            &st,
            &Pagination {
                page: Some("2".into()),
                limit: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(second.students.len(), 2);

        let beyond = list_students(
            &st,
            &Pagination {
                page: Some("9".into()),
                limit: None,
            },
        )
        .await
        .unwrap();
        assert!(beyond.students.is_empty());
        assert_eq!(beyond.total, 7);
    }

    #[tokio::test]
    async fn huge_limit_returns_one_page() {
        let st = AppState::fake();
        for i in 0..2 {
            create_student(&st, new_student(&format!("s{i}@x.com")))
                .await
                .unwrap();
        }

        let all = list_students(
            &st,
            &Pagination {
                page: None,
                limit: Some(i64::MAX.to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!((all.students.len(), all.total, all.pages), (2, 2, 1));

        let far = list_students(
            &st,
            &Pagination {
                page: Some(i64::MAX.to_string()),
                limit: Some(i64::MAX.to_string()),
            },
        )
        .await
        .unwrap();
        assert!(far.students.is_empty());
        assert_eq!(far.pages, 1);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 5), 0);
        assert_eq!(page_count(5, 5), 1);
        assert_eq!(page_count(6, 5), 2);
        assert_eq!(page_count(i64::MAX, 1), i64::MAX);
    }

    #[tokio::test]
    async fn empty_catalog_has_zero_pages() {
        let st = AppState::fake();
        let page = list_students(&st, &Pagination::default()).await.unwrap();
        assert_eq!((page.total, page.pages), (0, 0));
    }

    #[tokio::test]
    async fn admin_cannot_delete_self_or_other_admins() {
        let st = AppState::fake();
        let me = admin(&st, "me@x.com").await;
        let other = admin(&st, "other@x.com").await;

        let err = delete_student(&st, &me, me.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "You cannot delete your own account."));

        let err = delete_student(&st, &me, other.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "Admin accounts cannot be deleted here."));

        assert!(st.store.find_user_by_id(me.id).await.unwrap().is_some());
        assert!(st.store.find_user_by_id(other.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_student_and_missing_target() {
        let st = AppState::fake();
        let me = admin(&st, "me@x.com").await;
        let stu = create_student(&st, new_student("s@x.com")).await.unwrap();

        delete_student(&st, &me, stu.id).await.unwrap();
        assert!(st.store.find_user_by_id(stu.id).await.unwrap().is_none());

        let err = delete_student(&st, &me, stu.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_merges_fields_and_hashes_password() {
        let st = AppState::fake();
        let stu = create_student(&st, new_student("s@x.com")).await.unwrap();

        let updated = update_student(
            &st,
            stu.id,
            UpdateStudentRequest {
                name: Some("Renamed".into()),
                password: Some("brand-new".into()),
                course: Some("Rust 101".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.course, "Rust 101");
        assert_eq!(updated.email, "s@x.com");

        let stored = st.store.find_user_by_id(stu.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "brand-new");
        assert!(stored.check_password("brand-new").unwrap());
    }

    #[tokio::test]
    async fn update_blank_password_keeps_old_one() {
        let st = AppState::fake();
        let stu = create_student(&st, new_student("s@x.com")).await.unwrap();
        update_student(
            &st,
            stu.id,
            UpdateStudentRequest {
                password: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let stored = st.store.find_user_by_id(stu.id).await.unwrap().unwrap();
        assert!(stored.check_password("secret1").unwrap());
    }

    #[tokio::test]
    async fn update_unknown_id_returns_none_and_email_conflict_fails() {
        let st = AppState::fake();
        assert!(update_student(&st, Uuid::new_v4(), UpdateStudentRequest::default())
            .await
            .unwrap()
            .is_none());

        create_student(&st, new_student("a@x.com")).await.unwrap();
        let b = create_student(&st, new_student("b@x.com")).await.unwrap();
        let err = update_student(
            &st,
            b.id,
            UpdateStudentRequest {
                email: Some("a@x.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Email already in use"));
    }

    #[tokio::test]
    async fn get_student_not_found() {
        let st = AppState::fake();
        let err = get_student(&st, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Student not found"));
    }
}
