use axum::extract::FromRef;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{LoginResponse, RegisterRequest, UserProfile},
    jwt::JwtKeys,
    password::random_token,
    repo_types::{Role, User},
};
use crate::{
    error::{AppError, AppResult},
    mailer::{password_reset_email, verification_email},
    state::AppState,
};

pub const DEFAULT_REGISTER_COURSE: &str = "MERN Bootcamp";
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

pub const REGISTERED: &str = "Registration successful! Please check your email to verify.";
pub const REGISTERED_MAIL_FAILED: &str = "User created, but verification email failed to send.";

/// Resolve the user's enrollments and build the public profile.
pub async fn load_profile(st: &AppState, user: User) -> AppResult<UserProfile> {
    let enrolled = st.store.enrollments_for(user.id).await?;
    Ok(UserProfile::new(user, enrolled))
}

/// Creates an unverified user and sends the verification link. Mail failure does not undo
/// the registration; the returned message tells the caller which case happened.
#[instrument(skip(st, req), fields(email = %req.email))]
pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<&'static str> {
    let email = req.email.trim();

    if st.store.find_user_by_email(email).await?.is_some() {
        warn!("email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let course = req
        .course
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_REGISTER_COURSE);
    let mut user = User::new(
        req.name.trim(),
        email,
        &req.password,
        req.role.unwrap_or_default(),
        course,
    )?;
    let token = random_token();
    user.verification_token = Some(token.clone());

    let user = st
        .store
        .insert_user(&user)
        .await
        .map_err(AppError::conflict_as("User already exists"))?;
    info!(user_id = %user.id, "user registered");

    let email = verification_email(&user.email, &st.config.frontend_url, &token);
    match st.mailer.send(email).await {
        Ok(()) => Ok(REGISTERED),
        Err(e) => {
            error!(error = %e, user_id = %user.id, "verification email failed");
            Ok(REGISTERED_MAIL_FAILED)
        }
    }
}

#[instrument(skip(st, password))]
pub async fn login(st: &AppState, email: &str, password: &str) -> AppResult<LoginResponse> {
    let invalid = || AppError::unauthorized("Invalid email or password");

    let Some(user) = st.store.find_user_by_email(email.trim()).await? else {
        warn!("login unknown email");
        return Err(invalid());
    };

    if !user.check_password(password)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    if !user.is_verified {
        warn!(user_id = %user.id, "login before email verification");
        return Err(AppError::unauthorized("Please verify your email first"));
    }

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    let profile = load_profile(st, user).await?;
    info!(user_id = %profile.id, "user logged in");

    Ok(LoginResponse {
        id: profile.id,
        name: profile.name,
        email: profile.email,
        role: profile.role,
        course: profile.course,
        enrolled_courses: profile.enrolled_courses,
        token,
    })
}

#[instrument(skip(st, token))]
pub async fn verify_email(st: &AppState, token: &str) -> AppResult<()> {
    let mut user = st
        .store
        .find_user_by_verification_token(token)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid or expired token"))?;

    user.is_verified = true;
    user.verification_token = None;
    st.store.save_user(&user).await?;
    info!(user_id = %user.id, "email verified");
    Ok(())
}

/// Stores a one-hour reset token and mails it. If the mail cannot be sent the token is
/// cleared again so that no undelivered token stays valid.
#[instrument(skip(st))]
pub async fn forgot_password(st: &AppState, email: &str) -> AppResult<()> {
    let mut user = st
        .store
        .find_user_by_email(email.trim())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let token = random_token();
    user.reset_password_token = Some(token.clone());
    user.reset_password_expires = Some(OffsetDateTime::now_utc() + RESET_TOKEN_TTL);
    let mut user = st.store.save_user(&user).await?;

    let mail = password_reset_email(&user.email, &st.config.frontend_url, &token);
    if let Err(e) = st.mailer.send(mail).await {
        error!(error = %e, user_id = %user.id, "reset email failed; rolling back token");
        user.clear_reset_token();
        st.store.save_user(&user).await?;
        return Err(AppError::Internal(anyhow::anyhow!("Email could not be sent")));
    }

    info!(user_id = %user.id, "reset link sent");
    Ok(())
}

#[instrument(skip(st, token, password))]
pub async fn reset_password(st: &AppState, token: &str, password: &str) -> AppResult<()> {
    let mut user = st
        .store
        .find_user_by_reset_token(token, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid or expired token"))?;

    user.set_password(password)?;
    user.clear_reset_token();
    st.store.save_user(&user).await?;
    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Creates an already-verified account, bypassing the email round trip.
pub async fn create_verified_user(
    st: &AppState,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    course: &str,
) -> AppResult<User> {
    let mut user = User::new(name, email, password, role, course)?;
    user.is_verified = true;
    let user = st
        .store
        .insert_user(&user)
        .await
        .map_err(AppError::conflict_as("User with this email already exists"))?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::FakeMailer;
    use std::sync::Arc;

    fn register_req(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: None,
            course: None,
        }
    }

    async fn verification_token(st: &AppState, email: &str) -> String {
        st.store
            .find_user_by_email(email)
            .await
            .unwrap()
            .unwrap()
            .verification_token
            .expect("token")
    }

    #[tokio::test]
    async fn register_sends_verification_link_and_sets_defaults() {
        let mailer = Arc::new(FakeMailer::default());
        let st = AppState::fake_with_mailer(mailer.clone());

        let msg = register(&st, register_req("Alice", "a@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(msg, REGISTERED);

        let user = st.store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert!(!user.is_verified);
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.course, DEFAULT_REGISTER_COURSE);
        let token = user.verification_token.clone().unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert!(sent[0]
            .html
            .contains(&format!("http://frontend.test/verify/{token}")));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_and_creates_nothing() {
        let st = AppState::fake();
        register(&st, register_req("Alice", "a@x.com", "secret1"))
            .await
            .unwrap();
        let err = register(&st, register_req("Alice 2", "a@x.com", "other-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "User already exists"));
        assert_eq!(st.store.count_students().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn register_survives_mail_failure() {
        let st = AppState::fake_with_mailer(Arc::new(FakeMailer::failing()));
        let msg = register(&st, register_req("Alice", "a@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(msg, REGISTERED_MAIL_FAILED);
        assert!(st.store.find_user_by_email("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn login_requires_verification_then_succeeds() {
        let st = AppState::fake();
        register(&st, register_req("Alice", "a@x.com", "secret1"))
            .await
            .unwrap();

        let err = login(&st, "a@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Please verify your email first"));

        let token = verification_token(&st, "a@x.com").await;
        verify_email(&st, &token).await.unwrap();

        let res = login(&st, "a@x.com", "secret1").await.unwrap();
        assert_eq!(res.email, "a@x.com");
        assert!(res.enrolled_courses.is_empty());
        let claims = JwtKeys::from_ref(&st).verify(&res.token).unwrap();
        assert_eq!(claims.sub, res.id);
    }

    #[tokio::test]
    async fn login_rejects_unknown_email_and_wrong_password() {
        let st = AppState::fake();
        create_verified_user(&st, "Bob", "b@x.com", "secret1", Role::Student, "X")
            .await
            .unwrap();

        for (email, password) in [("nobody@x.com", "secret1"), ("b@x.com", "wrong-pass")] {
            let err = login(&st, email, password).await.unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid email or password"));
        }
    }

    #[tokio::test]
    async fn verification_token_is_single_use() {
        let st = AppState::fake();
        register(&st, register_req("Alice", "a@x.com", "secret1"))
            .await
            .unwrap();
        let token = verification_token(&st, "a@x.com").await;

        verify_email(&st, &token).await.unwrap();
        let err = verify_email(&st, &token).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid or expired token"));

        let user = st.store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert!(user.is_verified);
        assert!(user.verification_token.is_none());
    }

    #[tokio::test]
    async fn forgot_password_unknown_email_is_not_found() {
        let st = AppState::fake();
        let err = forgot_password(&st, "ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn forgot_password_rolls_back_token_when_mail_fails() {
        let st = AppState::fake_with_mailer(Arc::new(FakeMailer::failing()));
        create_verified_user(&st, "Bob", "b@x.com", "secret1", Role::Student, "X")
            .await
            .unwrap();

        let err = forgot_password(&st, "b@x.com").await.unwrap_err();
        assert_eq!(err.to_string(), "Email could not be sent");

        let user = st.store.find_user_by_email("b@x.com").await.unwrap().unwrap();
        assert!(user.reset_password_token.is_none());
        assert!(user.reset_password_expires.is_none());
    }

    #[tokio::test]
    async fn reset_token_works_once_and_changes_password() {
        let mailer = Arc::new(FakeMailer::default());
        let st = AppState::fake_with_mailer(mailer.clone());
        create_verified_user(&st, "Bob", "b@x.com", "secret1", Role::Student, "X")
            .await
            .unwrap();

        forgot_password(&st, "b@x.com").await.unwrap();
        let user = st.store.find_user_by_email("b@x.com").await.unwrap().unwrap();
        let token = user.reset_password_token.clone().unwrap();
        assert!(mailer.sent()[0]
            .html
            .contains(&format!("http://frontend.test/reset-password/{token}")));

        reset_password(&st, &token, "new-secret").await.unwrap();
        assert!(login(&st, "b@x.com", "new-secret").await.is_ok());
        assert!(login(&st, "b@x.com", "secret1").await.is_err());

        let err = reset_password(&st, &token, "another-one").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let st = AppState::fake();
        let mut user = create_verified_user(&st, "Bob", "b@x.com", "secret1", Role::Student, "X")
            .await
            .unwrap();
        user.reset_password_token = Some("stale".into());
        user.reset_password_expires = Some(OffsetDateTime::now_utc() - Duration::minutes(1));
        st.store.save_user(&user).await.unwrap();

        let err = reset_password(&st, "stale", "new-secret").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(login(&st, "b@x.com", "secret1").await.is_ok());
    }
}
