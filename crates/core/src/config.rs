//! Layered runtime configuration.
//!
//! Every tunable is a [`Setting`] with one dotted file key (`server.port`) and one
//! environment variable (`SHELF_SERVER_PORT`). Layers apply in order: defaults, TOML
//! file, environment, programmatic overrides. Each value remembers which layer set it,
//! so `shelf config` can explain the effective configuration.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use toml::{Table, Value};

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["shelf.toml", "config/shelf.toml"];

const ENV_PREFIX: &str = "SHELF_";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub api_prefix: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported log format `{other}` (expected compact|pretty|json)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Setting {
    DatabaseUrl,
    DatabaseMaxConnections,
    DatabaseTimeoutSecs,
    ServerBindAddress,
    ServerPort,
    ServerGracefulShutdownSecs,
    ServerApiPrefix,
    LoggingLevel,
    LoggingFormat,
}

impl Setting {
    pub const ALL: [Setting; 9] = [
        Setting::DatabaseUrl,
        Setting::DatabaseMaxConnections,
        Setting::DatabaseTimeoutSecs,
        Setting::ServerBindAddress,
        Setting::ServerPort,
        Setting::ServerGracefulShutdownSecs,
        Setting::ServerApiPrefix,
        Setting::LoggingLevel,
        Setting::LoggingFormat,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::DatabaseUrl => "database.url",
            Self::DatabaseMaxConnections => "database.max_connections",
            Self::DatabaseTimeoutSecs => "database.timeout_secs",
            Self::ServerBindAddress => "server.bind_address",
            Self::ServerPort => "server.port",
            Self::ServerGracefulShutdownSecs => "server.graceful_shutdown_secs",
            Self::ServerApiPrefix => "server.api_prefix",
            Self::LoggingLevel => "logging.level",
            Self::LoggingFormat => "logging.format",
        }
    }

    /// `server.api_prefix` -> `SHELF_SERVER_API_PREFIX`.
    pub fn env_var(self) -> String {
        format!("{ENV_PREFIX}{}", self.key().replace('.', "_").to_ascii_uppercase())
    }
}

/// The layer that supplied a setting's effective value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueOrigin {
    Default,
    File(PathBuf),
    Env(String),
    Override,
}

impl fmt::Display for ValueOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::File(path) => write!(f, "file ({})", path.display()),
            Self::Env(var) => write!(f, "env ({var})"),
            Self::Override => f.write_str("override"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub api_prefix: Option<String>,
}

impl ConfigOverrides {
    fn into_entries(self) -> Vec<(Setting, String)> {
        [
            (Setting::DatabaseUrl, self.database_url),
            (Setting::LoggingLevel, self.log_level),
            (Setting::ServerBindAddress, self.bind_address),
            (Setting::ServerPort, self.port.map(|port| port.to_string())),
            (Setting::ServerApiPrefix, self.api_prefix),
        ]
        .into_iter()
        .filter_map(|(setting, value)| value.map(|value| (setting, value)))
        .collect()
    }
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
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid value `{value}` for `{key}` from {origin}: {reason}")]
    InvalidValue { key: &'static str, origin: ValueOrigin, value: String, reason: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://shelf.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                api_prefix: "/api/productos".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

static DEFAULT_ORIGIN: ValueOrigin = ValueOrigin::Default;

/// Effective configuration plus the origin of every value.
#[derive(Clone, Debug, Default)]
pub struct TracedConfig {
    pub config: AppConfig,
    origins: BTreeMap<Setting, ValueOrigin>,
}

impl TracedConfig {
    pub fn origin(&self, setting: Setting) -> &ValueOrigin {
        self.origins.get(&setting).unwrap_or(&DEFAULT_ORIGIN)
    }

    fn assign(&mut self, setting: Setting, raw: &str, origin: ValueOrigin) -> Result<(), ConfigError> {
        self.config.assign(setting, raw).map_err(|reason| ConfigError::InvalidValue {
            key: setting.key(),
            origin: origin.clone(),
            value: raw.to_string(),
            reason,
        })?;
        self.origins.insert(setting, origin);
        Ok(())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        Ok(Self::load_traced(options)?.config)
    }

    pub fn load_traced(options: LoadOptions) -> Result<TracedConfig, ConfigError> {
        let mut traced = TracedConfig::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => {
                for (setting, raw) in read_file_values(&path)? {
                    traced.assign(setting, &raw, ValueOrigin::File(path.clone()))?;
                }
            }
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        for setting in Setting::ALL {
            let var = setting.env_var();
            if let Some(raw) = read_env(&var) {
                traced.assign(setting, &raw, ValueOrigin::Env(var))?;
            }
        }

        for (setting, raw) in options.overrides.into_entries() {
            traced.assign(setting, &raw, ValueOrigin::Override)?;
        }

        traced.config.validate()?;
        Ok(traced)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    /// Current value of `setting`, rendered the way it would be written in the file.
    pub fn value_of(&self, setting: Setting) -> String {
        match setting {
            Setting::DatabaseUrl => self.database.url.clone(),
            Setting::DatabaseMaxConnections => self.database.max_connections.to_string(),
            Setting::DatabaseTimeoutSecs => self.database.timeout_secs.to_string(),
            Setting::ServerBindAddress => self.server.bind_address.clone(),
            Setting::ServerPort => self.server.port.to_string(),
            Setting::ServerGracefulShutdownSecs => self.server.graceful_shutdown_secs.to_string(),
            Setting::ServerApiPrefix => self.server.api_prefix.clone(),
            Setting::LoggingLevel => self.logging.level.clone(),
            Setting::LoggingFormat => self.logging.format.as_str().to_string(),
        }
    }

    fn assign(&mut self, setting: Setting, raw: &str) -> Result<(), String> {
        match setting {
            Setting::DatabaseUrl => self.database.url = raw.to_string(),
            Setting::DatabaseMaxConnections => self.database.max_connections = parse(raw)?,
            Setting::DatabaseTimeoutSecs => self.database.timeout_secs = parse(raw)?,
            Setting::ServerBindAddress => self.server.bind_address = raw.to_string(),
            Setting::ServerPort => self.server.port = parse(raw)?,
            Setting::ServerGracefulShutdownSecs => {
                self.server.graceful_shutdown_secs = parse(raw)?
            }
            Setting::ServerApiPrefix => self.server.api_prefix = raw.to_string(),
            Setting::LoggingLevel => self.logging.level = raw.to_string(),
            Setting::LoggingFormat => self.logging.format = raw.parse()?,
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problem = database_problem(&self.database)
            .or_else(|| server_problem(&self.server))
            .or_else(|| logging_problem(&self.logging));

        match problem {
            Some(message) => Err(ConfigError::Validation(message)),
            None => Ok(()),
        }
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

/// Known settings present in the file, as raw strings. Unknown keys are ignored.
fn read_file_values(path: &Path) -> Result<Vec<(Setting, String)>, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let table = interpolate_env_vars(&raw)?
        .parse::<Table>()
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;

    Ok(Setting::ALL
        .into_iter()
        .filter_map(|setting| lookup(&table, setting.key()).map(|value| (setting, value)))
        .collect())
}

fn lookup(table: &Table, dotted_key: &str) -> Option<String> {
    let (section, field) = dotted_key.split_once('.')?;
    match table.get(section)?.as_table()?.get(field)? {
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn parse<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|error: T::Err| error.to_string())
}

fn database_problem(database: &DatabaseConfig) -> Option<String> {
    let url = database.url.trim();
    if !(url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:") {
        return Some(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        );
    }
    if database.max_connections == 0 {
        return Some("database.max_connections must be greater than zero".to_string());
    }
    if !(1..=300).contains(&database.timeout_secs) {
        return Some("database.timeout_secs must be in range 1..=300".to_string());
    }
    None
}

fn server_problem(server: &ServerConfig) -> Option<String> {
    if server.port == 0 {
        return Some("server.port must be greater than zero".to_string());
    }
    if server.graceful_shutdown_secs == 0 {
        return Some("server.graceful_shutdown_secs must be greater than zero".to_string());
    }
    let prefix = server.api_prefix.as_str();
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        return Some(format!(
            "server.api_prefix must start with `/` and must not end with `/` (got `{prefix}`)"
        ));
    }
    None
}

fn logging_problem(logging: &LoggingConfig) -> Option<String> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => None,
        _ => Some("logging.level must be one of trace|debug|info|warn|error".to_string()),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
