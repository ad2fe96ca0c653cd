use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Argon2 cost parameters, tuned via env rather than per-call literals.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    pub length: usize,
    pub ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub relay_url: String,
    pub from: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub otp: OtpConfig,
    pub storage: StorageConfig,
    pub mail: MailConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")?,
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "identify".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "identify-users".into()),
            access_ttl_minutes: env_or("JWT_ACCESS_TTL_MINUTES", 15),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };
        let hash = HashConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", 19 * 1024),
            iterations: env_or("ARGON2_ITERATIONS", 2),
            parallelism: env_or("ARGON2_PARALLELISM", 1),
        };
        let otp = OtpConfig {
            length: env_or("OTP_LENGTH", 6),
            ttl_minutes: env_or("OTP_TTL_MINUTES", 5),
            reset_token_ttl_minutes: env_or("RESET_TOKEN_TTL_MINUTES", 10),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("S3_ENDPOINT")?,
            bucket: std::env::var("S3_BUCKET").unwrap_or_else(|_| "identify".into()),
            access_key: std::env::var("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY")?,
        };
        let mail = MailConfig {
            relay_url: std::env::var("MAIL_RELAY_URL")?,
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@identify.local".into()),
            timeout_secs: env_or("MAIL_TIMEOUT_SECS", 10),
        };
        Ok(Self {
            database_url,
            jwt,
            hash,
            otp,
            storage,
            mail,
        })
    }
}
