use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{AccountStatus, Role, User};

/// Inline file payload (avatar or resume) carried in a JSON request body.
#[derive(Debug, Clone, Deserialize)]
pub struct FileUpload {
    pub data: serde_bytes::ByteBuf,
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub profilephoto: Option<FileUpload>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Partial profile update. Absent or empty fields are no-ops; skills,
/// education and projects arrive comma-separated and are split in order.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub fname: Option<String>,
    #[serde(default)]
    pub lname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub projects: Option<String>,
    #[serde(default)]
    pub resume: Option<FileUpload>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
    #[serde(rename = "resetToken")]
    pub reset_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileOut {
    pub bio: String,
    pub skills: Vec<String>,
    pub education: Vec<String>,
    pub projects: Vec<String>,
    pub profilephoto: String,
    pub resume: String,
    pub originalname: String,
}

/// Public part of the account: everything except credential material.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub profile: ProfileOut,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            fname: u.fname,
            lname: u.lname,
            email: u.email,
            phone: u.phone,
            role: u.role,
            status: u.status,
            profile: ProfileOut {
                bio: u.bio,
                skills: u.skills,
                education: u.education,
                projects: u.projects,
                profilephoto: u.profile_photo,
                resume: u.resume,
                originalname: u.resume_original_name,
            },
            last_login_at: u.last_login_at,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub message: String,
    pub success: bool,
    #[serde(rename = "resetToken")]
    pub reset_token: String,
}
