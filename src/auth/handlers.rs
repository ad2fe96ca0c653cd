use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    AckResponse, AuthResponse, ForgotPasswordRequest, LoginRequest, PublicUser, RefreshRequest,
    RegisterRequest, RegisterResponse, ResetPasswordRequest, UpdateProfileRequest, UpdateResponse,
    VerifyOtpRequest, VerifyResponse,
};
use crate::auth::extractors::AuthUser;
use crate::auth::repo::UserStore;
use crate::auth::services;
use crate::error::AuthError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/update", post(update_profile))
        .route("/forgotpassword", post(forgot_password))
        .route("/verifypassword", post(verify_password))
        .route("/resetpassword", post(reset_password))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    let user = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let (access_token, refresh_token, user) = services::login(&state, payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AuthResponse {
            message: format!("Welcome back {} {}", user.fname, user.lname),
            access_token,
            refresh_token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<(StatusCode, Json<UpdateResponse>), AuthError> {
    let user = services::update_profile(&state, user_id, payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(UpdateResponse {
            message: "User profile updated successfully".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<AckResponse>), AuthError> {
    services::forgot_password(&state, &payload.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AckResponse {
            message: "OTP sent successfully".into(),
            success: true,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn verify_password(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<(StatusCode, Json<VerifyResponse>), AuthError> {
    let reset_token = services::verify_otp(&state, &payload.email, &payload.otp).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(VerifyResponse {
            message: "OTP verified successfully".into(),
            success: true,
            reset_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, Json<AckResponse>), AuthError> {
    services::reset_password(&state, payload).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AckResponse {
            message: "Password reset successfully".into(),
            success: true,
        }),
    ))
}

#[instrument(skip(state))]
async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(StatusCode, Json<AckResponse>), AuthError> {
    services::logout(&state, user_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AckResponse {
            message: "User logged out successfully".into(),
            success: true,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let (access_token, refresh_token, user) =
        services::refresh_session(&state, &payload.refresh_token).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AuthResponse {
            message: "Session refreshed".into(),
            access_token,
            refresh_token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state))]
async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found".into()))?;
    Ok(Json(user.into()))
}
