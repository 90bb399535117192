//! Datasource configuration models.
//!
//! A [`DataSourceConfig`] describes one named backend. The registry turns it into a
//! live pool; nothing else mutates it.

use crate::config::PoolSettings;
use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the primary backend. Used whenever no other name is selected.
pub const DEFAULT_DATASOURCE: &str = "master";

/// Relational vendors known to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorKind {
    PostgreSql,
    /// Includes MariaDB
    MySql,
    Sqlite,
    Oracle,
    /// Dameng
    Dm,
    SqlServer,
}

impl VendorKind {
    /// Detect the vendor from the scheme of a connection URL.
    ///
    /// A leading `jdbc:` prefix is ignored so that existing JDBC-style URLs are
    /// still recognized.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.trim().to_ascii_lowercase();
        let lower = lower.strip_prefix("jdbc:").unwrap_or(&lower);
        let scheme = lower.split(':').next()?;
        match scheme {
            "postgres" | "postgresql" => Some(Self::PostgreSql),
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            "oracle" => Some(Self::Oracle),
            "dm" => Some(Self::Dm),
            "sqlserver" | "mssql" => Some(Self::SqlServer),
            _ => None,
        }
    }

    /// Parse a vendor code such as `MYSQL` or `postgresql`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "POSTGRESQL" | "POSTGRES" | "PG" => Some(Self::PostgreSql),
            "MYSQL" | "MARIADB" => Some(Self::MySql),
            "SQLITE" => Some(Self::Sqlite),
            "ORACLE" => Some(Self::Oracle),
            "DM" => Some(Self::Dm),
            "SQLSERVER" | "MSSQL" => Some(Self::SqlServer),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::PostgreSql => "POSTGRESQL",
            Self::MySql => "MYSQL",
            Self::Sqlite => "SQLITE",
            Self::Oracle => "ORACLE",
            Self::Dm => "DM",
            Self::SqlServer => "SQLSERVER",
        }
    }

    /// Get the display name for this vendor.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSql => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
            Self::Oracle => "Oracle",
            Self::Dm => "DM",
            Self::SqlServer => "SQL Server",
        }
    }

    /// Liveness probe used when a config does not supply one.
    pub fn default_validation_query(&self) -> &'static str {
        match self {
            Self::Oracle | Self::Dm => "SELECT 1 FROM DUAL",
            _ => "SELECT 1",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSql => Some(5432),
            Self::MySql => Some(3306),
            Self::Sqlite => None,
            Self::Oracle => Some(1521),
            Self::Dm => Some(5236),
            Self::SqlServer => Some(1433),
        }
    }

    /// Whether a pool can actually be built for this vendor.
    pub fn has_driver(&self) -> bool {
        matches!(self, Self::PostgreSql | Self::MySql | Self::Sqlite)
    }
}

impl std::fmt::Display for VendorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Configuration for one named backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub name: String,
    pub vendor: VendorKind,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub pool: PoolSettings,
    /// Falls back to the vendor default when absent or blank.
    #[serde(default)]
    pub validation_query: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl DataSourceConfig {
    /// Create a config for `name`, detecting the vendor from `url`.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, DataSourceConfigError> {
        let name = name.into();
        let url = url.into();

        if name.trim().is_empty() {
            return Err(DataSourceConfigError::EmptyName);
        }
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(DataSourceConfigError::InvalidName(name));
        }
        if url.trim().is_empty() {
            return Err(DataSourceConfigError::EmptyUrl);
        }

        let vendor = VendorKind::from_url(&url)
            .ok_or_else(|| DataSourceConfigError::UnknownVendor(mask_url(&url)))?;
        // Drivers expect their own scheme first
        let url = strip_jdbc_prefix(url.trim()).to_string();

        Ok(Self {
            name,
            vendor,
            url,
            username: None,
            password: None,
            pool: PoolSettings::default(),
            validation_query: None,
            enabled: true,
        })
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_pool(mut self, pool: PoolSettings) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_validation_query(mut self, sql: impl Into<String>) -> Self {
        self.validation_query = Some(sql.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The probe statement actually used for health checks.
    pub fn validation_query_or_default(&self) -> &str {
        self.validation_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| self.vendor.default_validation_query())
    }

    /// Get a display-safe version of the URL (credentials masked).
    pub fn masked_url(&self) -> String {
        mask_url(&self.url)
    }
}

fn strip_jdbc_prefix(url: &str) -> &str {
    match url.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("jdbc:") => &url[5..],
        _ => url,
    }
}

fn mask_url(url: &str) -> String {
    if let Ok(mut parsed) = Url::parse(url) {
        if parsed.password().is_none() {
            return url.to_string();
        }
        if parsed.set_password(Some("****")).is_ok() {
            return parsed.to_string();
        }
    }

    // Userinfo ends at the last '@' before the host
    if let Some(at_pos) = url.rfind('@') {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if let Some(colon_pos) = url[scheme_end..at_pos].find(':').map(|p| p + scheme_end) {
            return format!("{}****{}", &url[..colon_pos + 1], &url[at_pos..]);
        }
    }
    url.to_string()
}

/// Errors that can occur when creating a datasource configuration.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceConfigError {
    #[error("Datasource name cannot be empty")]
    EmptyName,

    #[error("Datasource name contains invalid characters: {0}")]
    InvalidName(String),

    #[error("Datasource URL cannot be empty")]
    EmptyUrl,

    #[error("Unknown database vendor in URL: {0}")]
    UnknownVendor(String),
}
