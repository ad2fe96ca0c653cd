use std::time::Duration;

use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{
    FileUpload, LoginRequest, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
};
use crate::auth::jwt::JwtKeys;
use crate::auth::otp;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{AccountStatus, NewUser, ProfilePatch, User};
use crate::error::AuthError;
use crate::state::AppState;

const AVATAR_FOLDER: &str = "user_profile_pictures";
const RESUME_FOLDER: &str = "user_resumes";
const RESET_TOKEN_LEN: usize = 32;
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn require(field: &str, name: &str) -> Result<(), AuthError> {
    if field.trim().is_empty() {
        return Err(AuthError::Validation(format!("Missing required field: {name}")));
    }
    Ok(())
}

/// Comma-separated list into an ordered sequence, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.and_then(|v| {
        let trimmed = v.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

async fn upload_file(
    state: &AppState,
    folder: &str,
    file: FileUpload,
) -> Result<crate::storage::StoredObject, AuthError> {
    let content_type = file
        .content_type
        .unwrap_or_else(|| "application/octet-stream".into());
    tokio::time::timeout(
        UPLOAD_TIMEOUT,
        state.storage.upload(
            folder,
            &file.filename,
            Bytes::from(file.data.into_vec()),
            &content_type,
        ),
    )
    .await
    .map_err(|_| AuthError::Upload("storage timed out".into()))?
    .map_err(|e| AuthError::Upload(e.to_string()))
}

/// Create an account: hash first, persist second. The store's unique email
/// constraint backs up the pre-check, so a concurrent duplicate cannot slip
/// through the race window.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, AuthError> {
    require(&req.fname, "fname")?;
    require(&req.lname, "lname")?;
    require(&req.email, "email")?;
    require(&req.password, "password")?;

    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AuthError::Validation("Invalid email".into()));
    }

    if state.store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already exists");
        return Err(AuthError::Conflict("Email already exists".into()));
    }

    let profile_photo = match req.profilephoto {
        Some(file) => upload_file(state, AVATAR_FOLDER, file).await?.url,
        None => String::new(),
    };

    let password_hash = hash_password(&req.password, &state.config.hash)?;
    let user = state
        .store
        .insert(NewUser {
            fname: req.fname.trim().to_string(),
            lname: req.lname.trim().to_string(),
            email,
            password_hash,
            role: req.role,
            profile_photo,
        })
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Authenticate and mint the token pair. The refresh token is written to
/// the account's single session slot, invalidating any previous session.
pub async fn login(
    state: &AppState,
    req: LoginRequest,
) -> Result<(String, String, User), AuthError> {
    require(&req.email, "email")?;
    require(&req.password, "password")?;

    let email = req.email.trim().to_lowercase();
    let mut user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found".into()))?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(email = %email, "incorrect password");
        return Err(AuthError::Unauthorized("Incorrect password".into()));
    }

    if user.role != req.role {
        warn!(email = %email, "incorrect role");
        return Err(AuthError::Forbidden("Incorrect role".into()));
    }

    if user.status != AccountStatus::Active {
        warn!(email = %email, status = ?user.status, "account not active");
        return Err(AuthError::Unauthorized("User account is inactive".into()));
    }

    let keys = JwtKeys::from_config(&state.config.jwt);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    let now = OffsetDateTime::now_utc();
    state.store.record_login(user.id, &refresh_token, now).await?;
    user.refresh_token = Some(refresh_token.clone());
    user.last_login_at = Some(now);

    info!(user_id = %user.id, "user logged in");
    Ok((access_token, refresh_token, user))
}

/// Partial overwrite: only supplied, non-empty fields change. A resume is
/// uploaded iff a file was actually provided.
pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<User, AuthError> {
    if state.store.find_by_id(user_id).await?.is_none() {
        return Err(AuthError::NotFound("User not found".into()));
    }

    let mut patch = ProfilePatch {
        fname: non_empty(req.fname),
        lname: non_empty(req.lname),
        email: non_empty(req.email).map(|e| e.to_lowercase()),
        phone: non_empty(req.phone),
        bio: non_empty(req.bio),
        skills: non_empty(req.skills).map(|s| split_list(&s)),
        education: non_empty(req.education).map(|s| split_list(&s)),
        projects: non_empty(req.projects).map(|s| split_list(&s)),
        ..ProfilePatch::default()
    };

    if let Some(email) = &patch.email {
        if !is_valid_email(email) {
            return Err(AuthError::Validation("Invalid email".into()));
        }
    }

    if let Some(file) = req.resume {
        let stored = upload_file(state, RESUME_FOLDER, file).await?;
        patch.resume = Some(stored.url);
        patch.resume_original_name = Some(stored.original_filename);
    }

    let user = state.store.update_profile(user_id, patch).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// Persist an OTP with a five-minute window, then dispatch it by mail.
/// Dispatch failure is surfaced to the caller but leaves the stored OTP
/// intact and usable.
pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), AuthError> {
    require(email, "email")?;

    let email = email.trim().to_lowercase();
    let user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found".into()))?;

    let code = otp::generate(state.config.otp.length);
    let expires_at =
        OffsetDateTime::now_utc() + TimeDuration::minutes(state.config.otp.ttl_minutes);
    state.store.set_otp(user.id, &code, expires_at).await?;

    let body = format!(
        "Your OTP is {}. This OTP will expire in {} minutes.",
        code, state.config.otp.ttl_minutes
    );
    if let Err(e) = state
        .mailer
        .send(&user.email, "Reset Password OTP", &body)
        .await
    {
        warn!(user_id = %user.id, error = %e, "OTP mail dispatch failed; code remains valid");
        return Err(AuthError::Mail(e.to_string()));
    }

    info!(user_id = %user.id, "OTP sent");
    Ok(())
}

/// Single-use OTP check. On success the code is cleared and a short-lived
/// reset token is issued; `reset_password` consumes it.
pub async fn verify_otp(state: &AppState, email: &str, code: &str) -> Result<String, AuthError> {
    require(email, "email")?;
    require(code, "otp")?;

    let email = email.trim().to_lowercase();
    let user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found".into()))?;

    let now = OffsetDateTime::now_utc();
    match user.otp_expires_at {
        Some(expiry) if now <= expiry => {}
        _ => {
            warn!(user_id = %user.id, "OTP missing or expired");
            return Err(AuthError::Forbidden("OTP expired".into()));
        }
    }

    if user.otp.as_deref() != Some(code) {
        warn!(user_id = %user.id, "incorrect OTP");
        return Err(AuthError::Forbidden("Incorrect OTP".into()));
    }

    state.store.clear_otp(user.id).await?;

    let token = otp::generate_token(RESET_TOKEN_LEN);
    let expires_at =
        now + TimeDuration::minutes(state.config.otp.reset_token_ttl_minutes);
    state.store.set_reset_token(user.id, &token, expires_at).await?;

    info!(user_id = %user.id, "OTP verified, reset token issued");
    Ok(token)
}

/// Replace the password. Requires the reset token minted by `verify_otp`,
/// so knowing an email alone is not enough to take over the account.
pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> Result<(), AuthError> {
    require(&req.email, "email")?;
    require(&req.password, "password")?;
    require(&req.confirm_password, "confirmPassword")?;

    let email = req.email.trim().to_lowercase();
    let user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found".into()))?;

    if req.password != req.confirm_password {
        warn!(user_id = %user.id, "password confirmation mismatch");
        return Err(AuthError::Forbidden("Passwords do not match".into()));
    }

    let now = OffsetDateTime::now_utc();
    match user.reset_token_expires_at {
        Some(expiry) if now <= expiry => {}
        _ => {
            warn!(user_id = %user.id, "reset token missing or expired");
            return Err(AuthError::Forbidden("Password reset not verified".into()));
        }
    }
    if user.reset_token.as_deref() != Some(req.reset_token.as_str()) {
        warn!(user_id = %user.id, "reset token mismatch");
        return Err(AuthError::Forbidden("Password reset not verified".into()));
    }

    let password_hash = hash_password(&req.password, &state.config.hash)?;
    state.store.set_password_hash(user.id, &password_hash).await?;
    state.store.clear_reset_token(user.id).await?;

    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Server-side revocation: drop the stored refresh token so the old session
/// cannot be refreshed, then let the handler clear client state.
pub async fn logout(state: &AppState, user_id: Uuid) -> Result<(), AuthError> {
    if state.store.find_by_id(user_id).await?.is_none() {
        return Err(AuthError::Unauthorized("User not found".into()));
    }
    state.store.set_refresh_token(user_id, None).await?;
    info!(user_id = %user_id, "user logged out");
    Ok(())
}

/// Rotate the token pair. The presented refresh token must match the
/// account's stored slot exactly; logout or a newer login invalidates it.
pub async fn refresh_session(
    state: &AppState,
    refresh_token: &str,
) -> Result<(String, String, User), AuthError> {
    let keys = JwtKeys::from_config(&state.config.jwt);
    let claims = keys
        .verify_refresh(refresh_token)
        .map_err(|_| AuthError::Unauthorized("Invalid refresh token".into()))?;

    let mut user = state
        .store
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found".into()))?;

    if user.refresh_token.as_deref() != Some(refresh_token) {
        warn!(user_id = %user.id, "refresh token does not match stored session");
        return Err(AuthError::Unauthorized("Session revoked".into()));
    }

    if user.status != AccountStatus::Active {
        return Err(AuthError::Unauthorized("User account is inactive".into()));
    }

    let access_token = keys.sign_access(user.id)?;
    let new_refresh = keys.sign_refresh(user.id)?;
    state
        .store
        .set_refresh_token(user.id, Some(&new_refresh))
        .await?;
    user.refresh_token = Some(new_refresh.clone());

    info!(user_id = %user.id, "session refreshed");
    Ok((access_token, new_refresh, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::{LoginRequest, RegisterRequest, UpdateProfileRequest};
    use crate::auth::repo::{MemStore, UserStore};
    use crate::auth::repo_types::Role;
    use std::sync::Arc;

    fn fake_state_with_store() -> (AppState, Arc<MemStore>) {
        let mut state = AppState::fake();
        let mem = Arc::new(MemStore::new());
        state.store = mem.clone();
        (state, mem)
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            fname: "Ada".into(),
            lname: "Lovelace".into(),
            email: email.into(),
            password: "secret1".into(),
            role: Role::User,
            profilephoto: None,
        }
    }

    fn login_req(email: &str, password: &str, role: Role) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
            role,
        }
    }

    #[tokio::test]
    async fn register_hashes_password_and_rejects_duplicates() {
        let (state, _) = fake_state_with_store();

        let user = register(&state, register_req("a@x.com")).await.expect("register");
        assert_ne!(user.password_hash, "secret1");
        assert_eq!(user.status, AccountStatus::Active);
        assert_eq!(user.profile_photo, "");

        let err = register(&state, register_req("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_and_bad_email() {
        let (state, _) = fake_state_with_store();

        let mut req = register_req("a@x.com");
        req.fname = "  ".into();
        assert!(matches!(
            register(&state, req).await.unwrap_err(),
            AuthError::Validation(_)
        ));

        assert!(matches!(
            register(&state, register_req("not-an-email")).await.unwrap_err(),
            AuthError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn register_uploads_avatar_when_supplied() {
        let (state, _) = fake_state_with_store();
        let mut req = register_req("pic@x.com");
        req.profilephoto = Some(crate::auth::dto::FileUpload {
            data: serde_bytes::ByteBuf::from(vec![1u8, 2, 3]),
            filename: "me.png".into(),
            content_type: Some("image/png".into()),
        });
        let user = register(&state, req).await.expect("register");
        assert!(user.profile_photo.contains("user_profile_pictures"));
    }

    #[tokio::test]
    async fn login_succeeds_only_when_all_conditions_hold() {
        let (state, mem) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        let (access, refresh, logged_in) = login(&state, login_req("a@x.com", "secret1", Role::User))
            .await
            .expect("login");
        assert!(!access.is_empty());
        assert!(!refresh.is_empty());
        assert!(logged_in.last_login_at.is_some());

        assert!(matches!(
            login(&state, login_req("missing@x.com", "secret1", Role::User))
                .await
                .unwrap_err(),
            AuthError::Unauthorized(_)
        ));
        assert!(matches!(
            login(&state, login_req("a@x.com", "wrong", Role::User))
                .await
                .unwrap_err(),
            AuthError::Unauthorized(_)
        ));
        assert!(matches!(
            login(&state, login_req("a@x.com", "secret1", Role::Admin))
                .await
                .unwrap_err(),
            AuthError::Forbidden(_)
        ));

        mem.set_status(user.id, AccountStatus::Suspended);
        assert!(matches!(
            login(&state, login_req("a@x.com", "secret1", Role::User))
                .await
                .unwrap_err(),
            AuthError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn sequential_logins_keep_exactly_one_refresh_token() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        let mut last_refresh = String::new();
        for _ in 0..3 {
            let (_, refresh, _) = login(&state, login_req("a@x.com", "secret1", Role::User))
                .await
                .unwrap();
            last_refresh = refresh;
        }

        let stored = state.store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(last_refresh.as_str()));
    }

    #[tokio::test]
    async fn otp_is_single_use() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        forgot_password(&state, "a@x.com").await.expect("forgot");
        let stored = state.store.find_by_id(user.id).await.unwrap().unwrap();
        let code = stored.otp.expect("otp persisted");
        assert!(stored.otp_expires_at.is_some());

        let reset_token = verify_otp(&state, "a@x.com", &code).await.expect("verify");
        assert!(!reset_token.is_empty());

        // Already cleared: the same code must not work twice.
        assert!(matches!(
            verify_otp(&state, "a@x.com", &code).await.unwrap_err(),
            AuthError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn expired_otp_is_rejected_even_when_correct() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        let past = OffsetDateTime::now_utc() - TimeDuration::minutes(1);
        state.store.set_otp(user.id, "123456", past).await.unwrap();

        assert!(matches!(
            verify_otp(&state, "a@x.com", "123456").await.unwrap_err(),
            AuthError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn wrong_otp_is_rejected() {
        let (state, _) = fake_state_with_store();
        register(&state, register_req("a@x.com")).await.unwrap();
        forgot_password(&state, "a@x.com").await.unwrap();

        assert!(matches!(
            verify_otp(&state, "a@x.com", "000000").await.unwrap_err(),
            AuthError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn mail_failure_leaves_persisted_otp_usable() {
        struct FailingMailer;
        #[async_trait::async_trait]
        impl crate::mail::MailSender for FailingMailer {
            async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
                anyhow::bail!("relay unreachable")
            }
        }

        let (mut state, _) = fake_state_with_store();
        state.mailer = Arc::new(FailingMailer);
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        let err = forgot_password(&state, "a@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::Mail(_)));

        // Dispatch failure must not roll back the persisted code.
        let stored = state.store.find_by_id(user.id).await.unwrap().unwrap();
        let code = stored.otp.expect("otp persisted despite mail failure");
        assert!(stored.otp_expires_at.is_some());

        verify_otp(&state, "a@x.com", &code)
            .await
            .expect("persisted code remains usable");
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();
        let before = state
            .store
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .password_hash;

        let past = OffsetDateTime::now_utc() - TimeDuration::minutes(1);
        state
            .store
            .set_reset_token(user.id, "stale-token", past)
            .await
            .unwrap();

        let err = reset_password(
            &state,
            ResetPasswordRequest {
                email: "a@x.com".into(),
                password: "newpass1".into(),
                confirm_password: "newpass1".into(),
                reset_token: "stale-token".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));

        let after = state
            .store
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .password_hash;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn update_profile_rejects_email_taken_by_another_account() {
        let (state, _) = fake_state_with_store();
        register(&state, register_req("first@x.com")).await.unwrap();
        let second = register(&state, register_req("second@x.com")).await.unwrap();

        let err = update_profile(
            &state,
            second.id,
            UpdateProfileRequest {
                email: Some("first@x.com".into()),
                ..UpdateProfileRequest::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_sends_nothing() {
        let (state, _) = fake_state_with_store();
        assert!(matches!(
            forgot_password(&state, "missing@x.com").await.unwrap_err(),
            AuthError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn reset_password_requires_matching_confirmation() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();
        let before = state
            .store
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .password_hash;

        let err = reset_password(
            &state,
            ResetPasswordRequest {
                email: "a@x.com".into(),
                password: "new1".into(),
                confirm_password: "new2".into(),
                reset_token: "whatever".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));

        let after = state
            .store
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .password_hash;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn reset_password_requires_verified_reset_token() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        // No verify_otp happened: email alone must not be enough.
        assert!(matches!(
            reset_password(
                &state,
                ResetPasswordRequest {
                    email: "a@x.com".into(),
                    password: "newpass1".into(),
                    confirm_password: "newpass1".into(),
                    reset_token: "forged".into(),
                },
            )
            .await
            .unwrap_err(),
            AuthError::Forbidden(_)
        ));

        forgot_password(&state, "a@x.com").await.unwrap();
        let code = state
            .store
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .otp
            .unwrap();
        let token = verify_otp(&state, "a@x.com", &code).await.unwrap();

        reset_password(
            &state,
            ResetPasswordRequest {
                email: "a@x.com".into(),
                password: "newpass1".into(),
                confirm_password: "newpass1".into(),
                reset_token: token.clone(),
            },
        )
        .await
        .expect("reset with valid token");

        // Consumed: the token is single-use.
        assert!(matches!(
            reset_password(
                &state,
                ResetPasswordRequest {
                    email: "a@x.com".into(),
                    password: "other1".into(),
                    confirm_password: "other1".into(),
                    reset_token: token,
                },
            )
            .await
            .unwrap_err(),
            AuthError::Forbidden(_)
        ));

        // New password works.
        login(&state, login_req("a@x.com", "newpass1", Role::User))
            .await
            .expect("login with new password");
    }

    #[tokio::test]
    async fn update_profile_touches_only_supplied_fields() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        let updated = update_profile(
            &state,
            user.id,
            UpdateProfileRequest {
                skills: Some("rust, sql ,tokio".into()),
                ..UpdateProfileRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.skills, vec!["rust", "sql", "tokio"]);

        let updated = update_profile(
            &state,
            user.id,
            UpdateProfileRequest {
                bio: Some("systems engineer".into()),
                ..UpdateProfileRequest::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.bio, "systems engineer");
        // Everything else untouched.
        assert_eq!(updated.skills, vec!["rust", "sql", "tokio"]);
        assert_eq!(updated.fname, "Ada");
        assert_eq!(updated.profile_photo, "");
        assert_eq!(updated.resume, "");
    }

    #[tokio::test]
    async fn update_profile_uploads_resume_only_when_supplied() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();

        let updated = update_profile(&state, user.id, UpdateProfileRequest::default())
            .await
            .unwrap();
        assert_eq!(updated.resume, "");

        let updated = update_profile(
            &state,
            user.id,
            UpdateProfileRequest {
                resume: Some(crate::auth::dto::FileUpload {
                    data: serde_bytes::ByteBuf::from(vec![1u8]),
                    filename: "cv.pdf".into(),
                    content_type: Some("application/pdf".into()),
                }),
                ..UpdateProfileRequest::default()
            },
        )
        .await
        .unwrap();
        assert!(updated.resume.contains("user_resumes"));
        assert_eq!(updated.resume_original_name, "cv.pdf");
    }

    #[tokio::test]
    async fn update_profile_unknown_user_is_not_found() {
        let (state, _) = fake_state_with_store();
        assert!(matches!(
            update_profile(&state, Uuid::new_v4(), UpdateProfileRequest::default())
                .await
                .unwrap_err(),
            AuthError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn logout_clears_stored_refresh_token() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();
        login(&state, login_req("a@x.com", "secret1", Role::User))
            .await
            .unwrap();

        logout(&state, user.id).await.expect("logout");
        let stored = state.store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());

        assert!(matches!(
            logout(&state, Uuid::new_v4()).await.unwrap_err(),
            AuthError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn refresh_rotates_and_revokes_old_token() {
        let (state, _) = fake_state_with_store();
        register(&state, register_req("a@x.com")).await.unwrap();
        let (_, refresh, _) = login(&state, login_req("a@x.com", "secret1", Role::User))
            .await
            .unwrap();

        let (access2, refresh2, _) = refresh_session(&state, &refresh).await.expect("refresh");
        assert!(!access2.is_empty());
        assert_ne!(refresh2, refresh);

        // The old token no longer matches the stored slot.
        assert!(matches!(
            refresh_session(&state, &refresh).await.unwrap_err(),
            AuthError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn refresh_rejects_logged_out_session() {
        let (state, _) = fake_state_with_store();
        let user = register(&state, register_req("a@x.com")).await.unwrap();
        let (_, refresh, _) = login(&state, login_req("a@x.com", "secret1", Role::User))
            .await
            .unwrap();

        logout(&state, user.id).await.unwrap();
        assert!(matches!(
            refresh_session(&state, &refresh).await.unwrap_err(),
            AuthError::Unauthorized(_)
        ));
    }

    #[test]
    fn split_list_preserves_order_and_drops_blanks() {
        assert_eq!(split_list("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("not an email"));
    }
}
