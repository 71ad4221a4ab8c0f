use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workflow::WorkflowSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub notify: NotifyConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
    pub busy_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<SecretString>,
    pub batch_window_hours: u32,
    pub sweep_interval_minutes: u32,
    pub portal_base_url: String,
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub default_sla_hours: u32,
    pub max_tiers: u32,
    pub tier_sla_hours: Vec<u32>,
    pub max_page_size: u32,
}

impl WorkflowConfig {
    pub fn settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            default_sla_hours: self.default_sla_hours,
            max_tiers: self.max_tiers,
            tier_sla_hours: self.tier_sla_hours.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub webhook_url: Option<String>,
    pub portal_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://docgate.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
                busy_timeout_ms: 5_000,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            notify: NotifyConfig {
                webhook_url: None,
                webhook_secret: None,
                batch_window_hours: 24,
                sweep_interval_minutes: 60,
                portal_base_url: "http://localhost:8080/approvals".to_string(),
            },
            workflow: WorkflowConfig {
                default_sla_hours: 72,
                max_tiers: 3,
                tier_sla_hours: Vec::new(),
                max_page_size: 100,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    notify: Option<NotifyPatch>,
    workflow: Option<WorkflowPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
    busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifyPatch {
    webhook_url: Option<String>,
    webhook_secret: Option<String>,
    batch_window_hours: Option<u32>,
    sweep_interval_minutes: Option<u32>,
    portal_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    default_sla_hours: Option<u32>,
    max_tiers: Option<u32>,
    tier_sla_hours: Option<Vec<u32>>,
    max_page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("docgate.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
            if let Some(busy_timeout_ms) = database.busy_timeout_ms {
                self.database.busy_timeout_ms = busy_timeout_ms;
            }
        }
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }
        if let Some(notify) = patch.notify {
            if let Some(webhook_url) = notify.webhook_url {
                self.notify.webhook_url = Some(webhook_url);
            }
            if let Some(webhook_secret) = notify.webhook_secret {
                self.notify.webhook_secret = Some(webhook_secret.into());
            }
            if let Some(batch_window_hours) = notify.batch_window_hours {
                self.notify.batch_window_hours = batch_window_hours;
            }
            if let Some(sweep_interval_minutes) = notify.sweep_interval_minutes {
                self.notify.sweep_interval_minutes = sweep_interval_minutes;
            }
            if let Some(portal_base_url) = notify.portal_base_url {
                self.notify.portal_base_url = portal_base_url;
            }
        }
        if let Some(workflow) = patch.workflow {
            if let Some(default_sla_hours) = workflow.default_sla_hours {
                self.workflow.default_sla_hours = default_sla_hours;
            }
            if let Some(max_tiers) = workflow.max_tiers {
                self.workflow.max_tiers = max_tiers;
            }
            if let Some(tier_sla_hours) = workflow.tier_sla_hours {
                self.workflow.tier_sla_hours = tier_sla_hours;
            }
            if let Some(max_page_size) = workflow.max_page_size {
                self.workflow.max_page_size = max_page_size;
            }
        }
        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("DOCGATE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(level) = env::var("DOCGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("DOCGATE_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        if let Ok(url) = env::var("DOCGATE_WEBHOOK_URL") {
            self.notify.webhook_url = Some(url);
        }
        if let Ok(secret) = env::var("DOCGATE_WEBHOOK_SECRET") {
            self.notify.webhook_secret = Some(secret.into());
        }
        if let Ok(hours) = env::var("DOCGATE_SLA_HOURS") {
            self.workflow.default_sla_hours = hours.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride { key: "DOCGATE_SLA_HOURS".to_owned(), value: hours }
            })?;
        }
        if let Ok(hours) = env::var("DOCGATE_BATCH_WINDOW_HOURS") {
            self.notify.batch_window_hours = hours.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "DOCGATE_BATCH_WINDOW_HOURS".to_owned(),
                    value: hours,
                }
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(webhook_url) = overrides.webhook_url {
            self.notify.webhook_url = Some(webhook_url);
        }
        if let Some(portal_base_url) = overrides.portal_base_url {
            self.notify.portal_base_url = portal_base_url;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_owned()));
        }
        if self.workflow.default_sla_hours == 0 {
            return Err(ConfigError::Validation(
                "workflow.default_sla_hours must be greater than zero".to_owned(),
            ));
        }
        if self.workflow.max_tiers == 0 {
            return Err(ConfigError::Validation(
                "workflow.max_tiers must be greater than zero".to_owned(),
            ));
        }
        if self.workflow.max_page_size == 0 {
            return Err(ConfigError::Validation(
                "workflow.max_page_size must be greater than zero".to_owned(),
            ));
        }
        if self.notify.batch_window_hours == 0 {
            return Err(ConfigError::Validation(
                "notify.batch_window_hours must be greater than zero".to_owned(),
            ));
        }
        if self.notify.sweep_interval_minutes == 0 {
            return Err(ConfigError::Validation(
                "notify.sweep_interval_minutes must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("docgate.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}
