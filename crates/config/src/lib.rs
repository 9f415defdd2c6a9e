use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "courier.toml",
    "config/courier.toml",
    "crates/config/courier.toml",
    "../courier.toml",
    "../config/courier.toml",
    "../crates/config/courier.toml",
];

/// Secret used when no `auth.jwt_secret` is configured. Only suitable for local development.
pub const DEVELOPMENT_JWT_SECRET: &str = "courier-development-secret";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://courier.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Settings for the external object store that turns uploaded attachments into URLs.
///
/// Uploads are disabled while `upload_url` is unset; every attachment then fails ingestion.
///
/// ```
/// use courier_config::MediaConfig;
///
/// let media = MediaConfig::default();
/// assert!(media.upload_url.is_none());
/// assert_eq!(media.request_timeout_seconds, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub upload_preset: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default = "MediaConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl MediaConfig {
    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_url: None,
            upload_preset: None,
            folder: None,
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Redis endpoint used to share notifications between nodes. `None` keeps them in-process.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "NotifierConfig::default_channel_prefix")]
    pub channel_prefix: String,
    #[serde(default = "NotifierConfig::default_channel_capacity")]
    pub channel_capacity: usize,
}

impl NotifierConfig {
    fn default_channel_prefix() -> String {
        "courier:".to_string()
    }

    const fn default_channel_capacity() -> usize {
        100
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            channel_prefix: Self::default_channel_prefix(),
            channel_capacity: Self::default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_cookie_name")]
    pub cookie_name: String,
}

impl AuthConfig {
    fn default_jwt_secret() -> String {
        DEVELOPMENT_JWT_SECRET.to_string()
    }

    fn default_cookie_name() -> String {
        "auth".to_string()
    }

    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Self::default_jwt_secret(),
            cookie_name: Self::default_cookie_name(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use courier_config::load;
///
/// std::env::remove_var("COURIER_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "media.request_timeout_seconds",
            i64::try_from(defaults.media.request_timeout_seconds).unwrap_or(i64::MAX),
        )?
        .set_default("notifier.channel_prefix", defaults.notifier.channel_prefix.clone())?
        .set_default(
            "notifier.channel_capacity",
            i64::try_from(defaults.notifier.channel_capacity).unwrap_or(i64::MAX),
        )?
        .set_default("auth.jwt_secret", defaults.auth.jwt_secret.clone())?
        .set_default("auth.cookie_name", defaults.auth.cookie_name.clone())?;

    let environment_overrides = config::Environment::with_prefix("COURIER").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("COURIER_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via COURIER_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.notifier.channel_capacity == 0 {
        config.notifier.channel_capacity = NotifierConfig::default_channel_capacity();
    }

    debug!(
        http = %format!("{}:{}", config.http.address, config.http.port),
        database = %config.database.url,
        redis = config.notifier.redis_url.is_some(),
        media = config.media.upload_url.is_some(),
        "loaded backend configuration"
    );
    Ok(config)
}
