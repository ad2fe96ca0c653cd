use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{AccountStatus, NewUser, ProfilePatch, StoreError, User};

/// Credential store consumed by the session lifecycle. Backed by Postgres
/// in production and by [`MemStore`] in tests.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Insert a fresh account. Fails `DuplicateEmail` on a unique-constraint
    /// hit, so concurrent registrations with the same email cannot both win.
    async fn insert(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> Result<User, StoreError>;
    async fn set_otp(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;
    async fn clear_otp(&self, id: Uuid) -> Result<(), StoreError>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;
    async fn clear_reset_token(&self, id: Uuid) -> Result<(), StoreError>;
    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;
    /// Store the latest refresh token and stamp last-login in one write.
    /// Single slot: a second login overwrites the first session's token.
    async fn record_login(
        &self,
        id: Uuid,
        refresh_token: &str,
        at: OffsetDateTime,
    ) -> Result<(), StoreError>;
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, fname, lname, email, password_hash, phone, role, status, \
     bio, skills, education, projects, profile_photo, resume, resume_original_name, \
     otp, otp_expires_at, reset_token, reset_token_expires_at, refresh_token, \
     last_login_at, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (fname, lname, email, password_hash, role, status, profile_photo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new.fname)
            .bind(&new.lname)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role)
            .bind(AccountStatus::Active)
            .bind(&new.profile_photo)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET \
                fname = COALESCE($2, fname), \
                lname = COALESCE($3, lname), \
                email = COALESCE($4, email), \
                phone = COALESCE($5, phone), \
                bio = COALESCE($6, bio), \
                skills = COALESCE($7, skills), \
                education = COALESCE($8, education), \
                projects = COALESCE($9, projects), \
                resume = COALESCE($10, resume), \
                resume_original_name = COALESCE($11, resume_original_name), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.fname)
            .bind(patch.lname)
            .bind(patch.email)
            .bind(patch.phone)
            .bind(patch.bio)
            .bind(patch.skills)
            .bind(patch.education)
            .bind(patch.projects)
            .bind(patch.resume)
            .bind(patch.resume_original_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_otp(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET otp = $2, otp_expires_at = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_otp(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET otp = NULL, otp_expires_at = NULL, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_reset_token(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_login(
        &self,
        id: Uuid,
        refresh_token: &str,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET refresh_token = $2, last_login_at = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(refresh_token)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-memory store behind the same trait, used by `AppState::fake` and the
/// lifecycle tests.
#[derive(Default)]
pub struct MemStore {
    users: std::sync::Mutex<std::collections::HashMap<Uuid, User>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn set_status(&self, id: Uuid, status: AccountStatus) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&id) {
            user.status = status;
        }
    }

    fn with_user<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut User) -> T,
    ) -> Result<T, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        let out = f(user);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(out)
    }
}

#[async_trait]
impl UserStore for MemStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            fname: new.fname,
            lname: new.lname,
            email: new.email,
            password_hash: new.password_hash,
            phone: None,
            role: new.role,
            status: AccountStatus::Active,
            bio: String::new(),
            skills: Vec::new(),
            education: Vec::new(),
            projects: Vec::new(),
            profile_photo: new.profile_photo,
            resume: String::new(),
            resume_original_name: String::new(),
            otp: None,
            otp_expires_at: None,
            reset_token: None,
            reset_token_expires_at: None,
            refresh_token: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> Result<User, StoreError> {
        // Same uniqueness guarantee as the DB constraint in PgStore.
        if let Some(email) = &patch.email {
            let users = self.users.lock().unwrap();
            if users.values().any(|u| u.id != id && u.email == *email) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        self.with_user(id, |u| {
            if let Some(v) = patch.fname {
                u.fname = v;
            }
            if let Some(v) = patch.lname {
                u.lname = v;
            }
            if let Some(v) = patch.email {
                u.email = v;
            }
            if let Some(v) = patch.phone {
                u.phone = Some(v);
            }
            if let Some(v) = patch.bio {
                u.bio = v;
            }
            if let Some(v) = patch.skills {
                u.skills = v;
            }
            if let Some(v) = patch.education {
                u.education = v;
            }
            if let Some(v) = patch.projects {
                u.projects = v;
            }
            if let Some(v) = patch.resume {
                u.resume = v;
            }
            if let Some(v) = patch.resume_original_name {
                u.resume_original_name = v;
            }
            u.clone()
        })
    }

    async fn set_otp(
        &self,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.otp = Some(code.to_string());
            u.otp_expires_at = Some(expires_at);
        })
    }

    async fn clear_otp(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.otp = None;
            u.otp_expires_at = None;
        })
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.reset_token = Some(token.to_string());
            u.reset_token_expires_at = Some(expires_at);
        })
    }

    async fn clear_reset_token(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.reset_token = None;
            u.reset_token_expires_at = None;
        })
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.password_hash = hash.to_string();
        })
    }

    async fn record_login(
        &self,
        id: Uuid,
        refresh_token: &str,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.refresh_token = Some(refresh_token.to_string());
            u.last_login_at = Some(at);
        })
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.refresh_token = token.map(str::to_string);
        })
    }
}
