use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub delinquency: DelinquencyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bootstrap administrator, created at startup if missing
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_admin_email() -> String {
    "admin@condominio.local".to_string()
}

fn default_admin_password() -> String {
    // Random throwaway when not configured; set [auth].admin_password to
    // control the bootstrap credentials
    uuid::Uuid::new_v4().to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Receipt size ceiling in bytes (default 10 MiB)
    #[serde(default = "default_max_receipt_bytes")]
    pub max_receipt_bytes: usize,
    /// Accepted receipt MIME types
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_receipt_bytes: default_max_receipt_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

fn default_max_receipt_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_mime_types() -> Vec<String> {
    vec!["image/*".to_string(), "application/pdf".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct DelinquencyConfig {
    #[serde(default = "default_delinquency_enabled")]
    pub enabled: bool,
    /// Interval between background delinquency scans in seconds
    #[serde(default = "default_scan_interval")]
    pub scan_interval_seconds: u64,
}

impl Default for DelinquencyConfig {
    fn default() -> Self {
        Self {
            enabled: default_delinquency_enabled(),
            scan_interval_seconds: default_scan_interval(),
        }
    }
}

fn default_delinquency_enabled() -> bool {
    true
}

fn default_scan_interval() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            uploads: UploadConfig::default(),
            delinquency: DelinquencyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
