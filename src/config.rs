//! Configuration handling for the SQL API gateway.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::models::{DEFAULT_DATASOURCE, DataSourceConfig};
use clap::Parser;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 60;

// Pool configuration defaults
pub const DEFAULT_INITIAL_SIZE: u32 = 5;
pub const DEFAULT_MIN_IDLE: u32 = 5;
pub const DEFAULT_MAX_ACTIVE: u32 = 20;
pub const DEFAULT_MAX_WAIT_MS: u64 = 60_000;
/// Idle connections above `min_idle` are evicted after this long.
pub const DEFAULT_IDLE_EVICTION_SECS: u64 = 300;

/// Connection pool sizing for one datasource.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolSettings {
    /// Connections opened when the pool is created (default: 5)
    pub initial_size: Option<u32>,
    /// Idle connections kept open (default: 5)
    pub min_idle: Option<u32>,
    /// Maximum connections in pool (default: 20)
    pub max_active: Option<u32>,
    /// Maximum wait for a connection in milliseconds (default: 60000)
    pub max_wait_ms: Option<u64>,
}

impl PoolSettings {
    pub fn initial_size_or_default(&self) -> u32 {
        self.initial_size.unwrap_or(DEFAULT_INITIAL_SIZE)
    }

    pub fn min_idle_or_default(&self) -> u32 {
        self.min_idle.unwrap_or(DEFAULT_MIN_IDLE)
    }

    pub fn max_active_or_default(&self) -> u32 {
        self.max_active.unwrap_or(DEFAULT_MAX_ACTIVE)
    }

    pub fn max_wait_or_default(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms.unwrap_or(DEFAULT_MAX_WAIT_MS))
    }

    /// Connections the pool keeps open: the larger of `initial_size` and `min_idle`,
    /// never more than `max_active`.
    pub fn min_connections(&self) -> u32 {
        self.initial_size_or_default()
            .max(self.min_idle_or_default())
            .min(self.max_active_or_default())
    }

    /// Validate pool settings and return an error message if invalid.
    ///
    /// Only explicitly supplied values are checked against each other, so a
    /// small `max_active` on its own clamps the defaults instead of failing.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_active == Some(0) {
            return Err("max_active must be greater than 0".to_string());
        }
        if self.max_wait_ms == Some(0) {
            return Err("max_wait must be greater than 0".to_string());
        }
        if let Some(max) = self.max_active {
            if let Some(min) = self.min_idle.filter(|min| *min > max) {
                return Err(format!(
                    "min_idle ({}) cannot exceed max_active ({})",
                    min, max
                ));
            }
            if let Some(initial) = self.initial_size.filter(|initial| *initial > max) {
                return Err(format!(
                    "initial_size ({}) cannot exceed max_active ({})",
                    initial, max
                ));
            }
        }
        Ok(())
    }
}

/// Parser for `[name=]url[?options]` datasource arguments.
pub struct DataSourceSpec;

impl DataSourceSpec {
    /// Gateway option keys that we extract from URL query parameters.
    /// Everything else stays on the URL for the driver.
    const OPTION_KEYS: &'static [&'static str] = &[
        "initial_size",
        "min_idle",
        "max_active",
        "max_wait",
        "validation_query",
        "enabled",
        "username",
        "password",
    ];

    /// Parse a datasource config from a CLI argument.
    ///
    /// # Examples
    ///
    /// ```text
    /// sqlite:gateway.db                                   # named "master"
    /// slave=mysql://app@replica:3306/shop?max_active=50   # named "slave"
    /// report=postgres://db/report?validation_query=SELECT%202&enabled=false
    /// ```
    pub fn parse(s: &str) -> Result<DataSourceConfig, String> {
        // Split name=url format (only if '=' appears before the scheme separator)
        let scheme_pos = s.find(':').unwrap_or(s.len());
        let (explicit_name, url_str) = match s[..scheme_pos].find('=') {
            Some(idx) => (Some(s[..idx].trim()), s[idx + 1..].trim()),
            None => (None, s.trim()),
        };

        let mut url = Url::parse(url_str).map_err(|e| format!("Invalid URL: {e}"))?;
        let mut opts = Self::extract_options(&mut url, Self::OPTION_KEYS);

        let pool = PoolSettings {
            initial_size: Self::parse_number(&mut opts, "initial_size")?,
            min_idle: Self::parse_number(&mut opts, "min_idle")?,
            max_active: Self::parse_number(&mut opts, "max_active")?,
            max_wait_ms: Self::parse_number(&mut opts, "max_wait")?,
        };
        pool.validate()?;

        let enabled = match opts.remove("enabled") {
            None => true,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) => return Err(format!("Invalid value for enabled: {v}")),
        };

        let name = explicit_name.unwrap_or(DEFAULT_DATASOURCE);
        let mut config = DataSourceConfig::new(name, url.to_string())
            .map_err(|e| e.to_string())?
            .with_pool(pool)
            .with_enabled(enabled);

        config.validation_query = opts.remove("validation_query");
        config.username = opts.remove("username");
        config.password = opts.remove("password");

        Ok(config)
    }

    fn parse_number<T: std::str::FromStr>(
        opts: &mut HashMap<String, String>,
        key: &str,
    ) -> Result<Option<T>, String> {
        opts.remove(key)
            .map(|v| {
                v.parse()
                    .map_err(|_| format!("Invalid value for {key}: {v}"))
            })
            .transpose()
    }

    /// Extract gateway options from URL query params, keeping others for the driver.
    /// Uses proper URL encoding to preserve special characters in remaining params.
    fn extract_options(url: &mut Url, keys: &[&str]) -> HashMap<String, String> {
        let mut opts = HashMap::new();
        let remaining: Vec<(String, String)> = url
            .query_pairs()
            .filter_map(|(k, v)| {
                let key_lower = k.to_ascii_lowercase();
                if keys.contains(&key_lower.as_str()) {
                    opts.insert(key_lower, v.into_owned());
                    None
                } else {
                    Some((k.into_owned(), v.into_owned()))
                }
            })
            .collect();

        if remaining.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(remaining);
        }
        opts
    }
}

/// Configuration for the SQL API gateway.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sql-api-gateway",
    about = "Serve published SQL templates as HTTP endpoints over named database pools",
    version,
    author
)]
pub struct Config {
    /// Datasources to register at startup.
    /// Format: "url" (named "master") or "name=url".
    /// Pool options go in the query string: initial_size, min_idle, max_active, max_wait,
    /// validation_query, enabled, username, password.
    #[arg(
        short = 'd',
        long = "datasource",
        value_name = "URL",
        env = "GATEWAY_DATASOURCE",
        value_delimiter = ','
    )]
    pub datasources: Vec<String>,

    /// JSON file with an array of API definitions to load at startup
    #[arg(long, value_name = "FILE", env = "GATEWAY_DEFINITIONS")]
    pub definitions: Option<PathBuf>,

    /// HTTP host to bind to
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "GATEWAY_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "GATEWAY_HTTP_PORT")]
    pub http_port: u16,

    /// Statement timeout in seconds (unset: no deadline beyond the pool's max wait)
    #[arg(long, env = "GATEWAY_QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,

    /// Seconds between background health checks (0 disables them)
    #[arg(
        long,
        default_value_t = DEFAULT_HEALTH_INTERVAL_SECS,
        env = "GATEWAY_HEALTH_INTERVAL"
    )]
    pub health_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "GATEWAY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            datasources: Vec::new(),
            definitions: None,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            query_timeout: None,
            health_interval: DEFAULT_HEALTH_INTERVAL_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Parse all datasource configurations, rejecting duplicate names.
    pub fn parse_datasources(&self) -> Result<Vec<DataSourceConfig>, String> {
        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(self.datasources.len());
        for spec in &self.datasources {
            let config = DataSourceSpec::parse(spec)?;
            if !seen.insert(config.name.clone()) {
                return Err(format!("Duplicate datasource name: {}", config.name));
            }
            configs.push(config);
        }
        Ok(configs)
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn query_timeout_duration(&self) -> Option<Duration> {
        self.query_timeout.map(Duration::from_secs)
    }

    /// Health check period, `None` when disabled.
    pub fn health_interval_duration(&self) -> Option<Duration> {
        (self.health_interval > 0).then(|| Duration::from_secs(self.health_interval))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
