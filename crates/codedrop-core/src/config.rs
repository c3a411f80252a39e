//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env` with dotenvy),
//! defaulted where a sensible default exists, then validated as a whole.

use std::env;

use crate::storage_types::{RecordStoreKind, StorageBackend};

const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const UPLOAD_URL_TTL_SECS: u64 = 300;
const DOWNLOAD_URL_TTL_SECS: u64 = 3600;
const DEFAULT_EXPIRY_MINUTES: i32 = 5;
const DEFAULT_UPLOAD_FOLDER: &str = "uploads";
const EXPIRY_SWEEP_INTERVAL_SECS: u64 = 300;
const ACCESS_ATTEMPT_LIMIT: u32 = 5;
const ACCESS_ATTEMPT_WINDOW_SECS: u64 = 900;
const SMTP_PORT: u16 = 587;

/// Bounds for `expiry_duration_minutes`, inclusive.
pub const MIN_EXPIRY_MINUTES: i32 = 1;
pub const MAX_EXPIRY_MINUTES: i32 = 1440;

/// Full service configuration
#[derive(Clone, Debug)]
pub struct CodedropConfig {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    // Persistence
    pub record_store: RecordStoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Auth
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // MinIO and other S3-compatible providers
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub upload_url_ttl_secs: u64,
    pub download_url_ttl_secs: u64,
    // File lifecycle
    pub default_expiry_minutes: i32,
    pub default_upload_folder: String,
    /// Interval between eager expiry sweeps. 0 = disabled.
    pub expiry_sweep_interval_secs: u64,
    pub access_attempt_limit: u32,
    pub access_attempt_window_secs: u64,
    pub purge_on_withdraw: bool,
    // Recipient notifications
    pub email_notifications_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<CodedropConfig>);

impl Config {
    fn inner(&self) -> &CodedropConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = CodedropConfig::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.inner().environment)
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn record_store(&self) -> RecordStoreKind {
        self.inner().record_store
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().jwt_expiry_hours
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn upload_url_ttl_secs(&self) -> u64 {
        self.inner().upload_url_ttl_secs
    }

    pub fn download_url_ttl_secs(&self) -> u64 {
        self.inner().download_url_ttl_secs
    }

    pub fn default_expiry_minutes(&self) -> i32 {
        self.inner().default_expiry_minutes
    }

    pub fn default_upload_folder(&self) -> &str {
        &self.inner().default_upload_folder
    }

    pub fn expiry_sweep_interval_secs(&self) -> u64 {
        self.inner().expiry_sweep_interval_secs
    }

    pub fn access_attempt_limit(&self) -> u32 {
        self.inner().access_attempt_limit
    }

    pub fn access_attempt_window_secs(&self) -> u64 {
        self.inner().access_attempt_window_secs
    }

    pub fn purge_on_withdraw(&self) -> bool {
        self.inner().purge_on_withdraw
    }

    pub fn email_notifications_enabled(&self) -> bool {
        self.inner().email_notifications_enabled
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.inner().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.inner().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.inner().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.inner().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.inner().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.inner().smtp_tls
    }
}

fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_bool_or(value: Option<String>, default: bool) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) if v == "true" || v == "1" || v == "yes" => true,
        Some(v) if v == "false" || v == "0" || v == "no" => false,
        _ => default,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CodedropConfig {
    /// Build a configuration from an arbitrary key lookup.
    ///
    /// `Config::from_env` passes `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match lookup("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let record_store = match non_empty(lookup("RECORD_STORE")) {
            Some(kind) => kind.parse()?,
            None => RecordStoreKind::Postgres,
        };

        let storage_backend = match non_empty(lookup("STORAGE_BACKEND")) {
            Some(backend) => backend.parse()?,
            None => StorageBackend::S3,
        };

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?;

        Ok(CodedropConfig {
            server_port,
            environment,
            cors_origins,
            record_store,
            database_url: non_empty(lookup("DATABASE_URL")),
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), MAX_CONNECTIONS),
            db_timeout_seconds: parse_or(lookup("DB_TIMEOUT_SECONDS"), CONNECTION_TIMEOUT_SECS),
            jwt_secret,
            jwt_expiry_hours: parse_or(lookup("JWT_EXPIRY_HOURS"), JWT_EXPIRY_HOURS),
            storage_backend,
            s3_bucket: non_empty(lookup("S3_BUCKET")),
            s3_region: non_empty(lookup("S3_REGION")).or_else(|| non_empty(lookup("AWS_REGION"))),
            s3_endpoint: non_empty(lookup("S3_ENDPOINT")),
            local_storage_path: non_empty(lookup("LOCAL_STORAGE_PATH")),
            local_storage_base_url: non_empty(lookup("LOCAL_STORAGE_BASE_URL")),
            upload_url_ttl_secs: parse_or(lookup("UPLOAD_URL_TTL_SECS"), UPLOAD_URL_TTL_SECS),
            download_url_ttl_secs: parse_or(lookup("DOWNLOAD_URL_TTL_SECS"), DOWNLOAD_URL_TTL_SECS),
            default_expiry_minutes: parse_or(
                lookup("DEFAULT_EXPIRY_MINUTES"),
                DEFAULT_EXPIRY_MINUTES,
            ),
            default_upload_folder: non_empty(lookup("DEFAULT_UPLOAD_FOLDER"))
                .unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string()),
            expiry_sweep_interval_secs: parse_or(
                lookup("EXPIRY_SWEEP_INTERVAL_SECS"),
                EXPIRY_SWEEP_INTERVAL_SECS,
            ),
            access_attempt_limit: parse_or(lookup("ACCESS_ATTEMPT_LIMIT"), ACCESS_ATTEMPT_LIMIT),
            access_attempt_window_secs: parse_or(
                lookup("ACCESS_ATTEMPT_WINDOW_SECS"),
                ACCESS_ATTEMPT_WINDOW_SECS,
            ),
            purge_on_withdraw: parse_bool_or(lookup("PURGE_ON_WITHDRAW"), false),
            email_notifications_enabled: parse_bool_or(
                lookup("EMAIL_NOTIFICATIONS_ENABLED"),
                false,
            ),
            smtp_host: non_empty(lookup("SMTP_HOST")),
            smtp_port: parse_or(lookup("SMTP_PORT"), SMTP_PORT),
            smtp_user: non_empty(lookup("SMTP_USER")),
            smtp_password: lookup("SMTP_PASSWORD"),
            smtp_from: non_empty(lookup("SMTP_FROM")),
            smtp_tls: parse_bool_or(lookup("SMTP_TLS"), true),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if self.jwt_expiry_hours <= 0 {
            return Err(anyhow::anyhow!("JWT_EXPIRY_HOURS must be positive"));
        }

        if self.record_store == RecordStoreKind::Postgres {
            match self.database_url.as_deref() {
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when RECORD_STORE=postgres"
                    ))
                }
                Some(url)
                    if !url.starts_with("postgres://") && !url.starts_with("postgresql://") =>
                {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                Some(_) => {}
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.upload_url_ttl_secs == 0 || self.download_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_URL_TTL_SECS and DOWNLOAD_URL_TTL_SECS must be positive"
            ));
        }

        if !(MIN_EXPIRY_MINUTES..=MAX_EXPIRY_MINUTES).contains(&self.default_expiry_minutes) {
            return Err(anyhow::anyhow!(
                "DEFAULT_EXPIRY_MINUTES must be between {} and {}",
                MIN_EXPIRY_MINUTES,
                MAX_EXPIRY_MINUTES
            ));
        }

        if self.access_attempt_limit == 0 {
            return Err(anyhow::anyhow!("ACCESS_ATTEMPT_LIMIT must be at least 1"));
        }

        if self.email_notifications_enabled && (self.smtp_host.is_none() || self.smtp_from.is_none())
        {
            return Err(anyhow::anyhow!(
                "EMAIL_NOTIFICATIONS_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<CodedropConfig, anyhow::Error> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CodedropConfig::from_lookup(|key| map.get(key).cloned())
    }

    fn memory_local() -> Vec<(&'static str, &'static str)> {
        vec![
            ("JWT_SECRET", SECRET),
            ("RECORD_STORE", "memory"),
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/codedrop"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost:4000/objects"),
        ]
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&memory_local()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.upload_url_ttl_secs, 300);
        assert_eq!(config.download_url_ttl_secs, 3600);
        assert_eq!(config.default_expiry_minutes, 5);
        assert_eq!(config.default_upload_folder, "uploads");
        assert_eq!(config.expiry_sweep_interval_secs, 300);
        assert_eq!(config.access_attempt_limit, 5);
        assert!(!config.purge_on_withdraw);
        assert!(config.smtp_tls);
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn missing_jwt_secret_is_rejected() {
        let err = load(&[("RECORD_STORE", "memory")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn short_jwt_secret_fails_validation() {
        let mut vars = memory_local();
        vars[0] = ("JWT_SECRET", "short");
        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn postgres_store_requires_database_url() {
        let mut vars = memory_local();
        vars[1] = ("RECORD_STORE", "postgres");
        assert!(load(&vars).unwrap().validate().is_err());

        vars.push(("DATABASE_URL", "postgres://localhost/codedrop"));
        load(&vars).unwrap().validate().unwrap();
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let vars = vec![
            ("JWT_SECRET", SECRET),
            ("RECORD_STORE", "memory"),
            ("S3_BUCKET", "drop"),
        ];
        assert!(load(&vars).unwrap().validate().is_err());

        let mut vars = vars;
        vars.push(("AWS_REGION", "eu-west-1"));
        let config = load(&vars).unwrap();
        config.validate().unwrap();
        assert_eq!(config.s3_region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn wildcard_cors_rejected_in_production() {
        let mut vars = memory_local();
        vars.push(("ENVIRONMENT", "production"));
        assert!(load(&vars).is_err());

        vars.push(("CORS_ORIGINS", "https://drop.example.com"));
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn default_expiry_outside_bounds_fails_validation() {
        let mut vars = memory_local();
        vars.push(("DEFAULT_EXPIRY_MINUTES", "1441"));
        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn email_notifications_require_smtp() {
        let mut vars = memory_local();
        vars.push(("EMAIL_NOTIFICATIONS_ENABLED", "true"));
        assert!(load(&vars).unwrap().validate().is_err());

        vars.push(("SMTP_HOST", "smtp.example.com"));
        vars.push(("SMTP_FROM", "noreply@example.com"));
        load(&vars).unwrap().validate().unwrap();
    }
}
