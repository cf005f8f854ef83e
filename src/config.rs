use std::time::Duration;

use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub files: FilePolicy,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Prefix for absolute URLs handed to third-party clients (PicGo).
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    Local,
    Telegram,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: BlobBackend,
    /// Directory for local blob backend
    pub local_storage_path: String,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    /// Extra attempts after the first failed send
    pub max_retries: u32,
    /// Linear backoff unit: attempt N waits N × this
    pub retry_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub share_grant_ttl_secs: i64,
    /// Moderation routes are only mounted when this is set.
    pub admin: Option<AdminCredentials>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("share_grant_ttl_secs", &self.share_grant_ttl_secs)
            .field("admin", &self.admin.as_ref().map(|a| &a.username))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FilePolicy {
    /// Where moderation-blocked content is redirected
    pub blocked_redirect_url: String,
    /// Serve unknown ids as fresh public records instead of 404.
    pub auto_register_unknown_files: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            public_base_url: None,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::Local,
            local_storage_path: "./files".to_string(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self {
            blocked_redirect_url: "/block-img.html".to_string(),
            auto_register_unknown_files: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let backend = match std::env::var("BLOB_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "telegram" => BlobBackend::Telegram,
            _ => BlobBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let telegram_defaults = TelegramConfig::default();
        let telegram = TelegramConfig {
            api_base: std::env::var("TG_API_BASE")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(telegram_defaults.api_base),
            bot_token: std::env::var("TG_BOT_TOKEN").ok().filter(|t| !t.is_empty()),
            chat_id: std::env::var("TG_CHAT_ID").ok().filter(|c| !c.is_empty()),
            max_retries: env_parse("UPLOAD_MAX_RETRIES").unwrap_or(telegram_defaults.max_retries),
            retry_delay: env_parse("UPLOAD_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(telegram_defaults.retry_delay),
        };

        let jwt_secret = match std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "JWT_SECRET is not set; using a random per-process secret. \
                     Issued tokens will not survive a restart."
                );
                random_secret()?
            }
        };

        let admin = match (
            std::env::var("ADMIN_USERNAME").ok().filter(|s| !s.is_empty()),
            std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            _ => None,
        };

        let auth = AuthConfig {
            jwt_secret,
            token_ttl_hours: env_parse("TOKEN_TTL_HOURS").unwrap_or(24 * 7),
            share_grant_ttl_secs: env_parse("SHARE_GRANT_TTL_SECS").unwrap_or(3600),
            admin,
        };

        let file_defaults = FilePolicy::default();
        let files = FilePolicy {
            blocked_redirect_url: std::env::var("BLOCKED_REDIRECT_URL")
                .unwrap_or(file_defaults.blocked_redirect_url),
            auto_register_unknown_files: std::env::var("AUTO_REGISTER_UNKNOWN_FILES")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(file_defaults.auto_register_unknown_files),
        };

        let max_upload_size = env_parse("MAX_UPLOAD_SIZE").unwrap_or(20 * 1024 * 1024); // 20MB

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
                public_base_url,
            },
            storage: StorageConfig {
                backend,
                local_storage_path,
                telegram,
            },
            auth,
            files,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == BlobBackend::Telegram {
            if self.storage.telegram.bot_token.is_none() {
                return Err(ConfigError::ValidationError(
                    "TG_BOT_TOKEN is required when BLOB_BACKEND=telegram".to_string(),
                ));
            }
            if self.storage.telegram.chat_id.is_none() {
                return Err(ConfigError::ValidationError(
                    "TG_CHAT_ID is required when BLOB_BACKEND=telegram".to_string(),
                ));
            }
        }

        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "TOKEN_TTL_HOURS must be positive".to_string(),
            ));
        }

        if self.auth.share_grant_ttl_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "SHARE_GRANT_TTL_SECS must be positive".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.auth.jwt_secret.len() < 16 {
            tracing::warn!("JWT_SECRET is shorter than 16 bytes; consider a longer secret");
        }

        Ok(())
    }

    /// Turn a server-relative path into the URL handed to external clients.
    pub fn public_url(&self, path: &str) -> String {
        match self.server.public_base_url {
            Some(ref base) => format!("{base}{path}"),
            None => path.to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn random_secret() -> Result<String, ConfigError> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| ConfigError::ValidationError("failed to generate JWT secret".to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}
