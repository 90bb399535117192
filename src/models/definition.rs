//! API definition models.
//!
//! An [`ApiDefinition`] binds a (path, method) pair to a SQL template. Only
//! definitions in [`PublishStatus::Published`] can be executed.

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};

/// Version assigned to definitions created without one.
pub const DEFAULT_API_VERSION: &str = "1.0";

/// Lifecycle stage of an API definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
    Offline,
}

impl PublishStatus {
    /// Numeric code used by existing definition records (0/1/2).
    pub fn code(&self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::Published => 1,
            Self::Offline => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Draft),
            1 => Some(Self::Published),
            2 => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn is_invocable(&self) -> bool {
        matches!(self, Self::Published)
    }

    /// Transition to `Published`. Repeating it is a no-op.
    pub fn publish(self) -> GatewayResult<Self> {
        Ok(Self::Published)
    }

    /// Transition to `Offline`. A draft has never been published and cannot go offline.
    pub fn take_offline(self) -> GatewayResult<Self> {
        match self {
            Self::Draft => Err(GatewayError::validation(
                "a draft API definition cannot be taken offline; publish it first",
            )),
            Self::Published | Self::Offline => Ok(Self::Offline),
        }
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Payload encryption applied by the outer layer. Recorded, not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EncryptMode {
    #[default]
    None,
    Sm4,
    Aes,
}

/// Lookup key of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionKey {
    pub path: String,
    pub method: String,
}

impl DefinitionKey {
    pub fn new(path: &str, method: &str) -> Self {
        Self {
            path: path.trim().to_string(),
            method: normalize_method(method),
        }
    }
}

/// Uppercase and trim an HTTP method name.
pub fn normalize_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDefinition {
    /// Assigned by the store on creation.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    pub path: String,
    pub method: String,
    /// SQL template with `${key}` placeholders.
    pub sql: String,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub encrypt_mode: EncryptMode,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl ApiDefinition {
    /// Create a draft definition.
    pub fn new(path: impl Into<String>, method: &str, sql: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: None,
            name: path.clone(),
            path,
            method: normalize_method(method),
            sql: sql.into(),
            status: PublishStatus::Draft,
            version: default_version(),
            auth_required: false,
            encrypt_mode: EncryptMode::None,
            description: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: PublishStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_auth_required(mut self, required: bool) -> Self {
        self.auth_required = required;
        self
    }

    pub fn with_encrypt_mode(mut self, mode: EncryptMode) -> Self {
        self.encrypt_mode = mode;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> DefinitionKey {
        DefinitionKey::new(&self.path, &self.method)
    }

    /// Check the fields a definition cannot be stored without.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.path.trim().is_empty() {
            return Err(GatewayError::validation("API path must not be empty"));
        }
        if self.method.trim().is_empty() {
            return Err(GatewayError::validation("API method must not be empty"));
        }
        if self.sql.trim().is_empty() {
            return Err(GatewayError::validation("SQL content must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert_eq!(
            PublishStatus::Draft.publish().unwrap(),
            PublishStatus::Published
        );
        assert_eq!(
            PublishStatus::Published.publish().unwrap(),
            PublishStatus::Published
        );
        assert_eq!(
            PublishStatus::Published.take_offline().unwrap(),
            PublishStatus::Offline
        );
        assert_eq!(
            PublishStatus::Offline.publish().unwrap(),
            PublishStatus::Published
        );
        assert!(matches!(
            PublishStatus::Draft.take_offline(),
            Err(GatewayError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_status_codes() {
        for status in [
            PublishStatus::Draft,
            PublishStatus::Published,
            PublishStatus::Offline,
        ] {
            assert_eq!(PublishStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(PublishStatus::from_code(9), None);
        assert!(PublishStatus::Published.is_invocable());
        assert!(!PublishStatus::Offline.is_invocable());
    }

    #[test]
    fn test_new_definition_defaults() {
        let def = ApiDefinition::new("/orders", "get", "SELECT 1");
        assert_eq!(def.method, "GET");
        assert_eq!(def.status, PublishStatus::Draft);
        assert_eq!(def.version, "1.0");
        assert_eq!(def.encrypt_mode, EncryptMode::None);
        assert!(!def.auth_required);
        assert_eq!(def.name, "/orders");
    }

    #[test]
    fn test_validate() {
        assert!(ApiDefinition::new("/orders", "GET", "SELECT 1").validate().is_ok());
        assert!(ApiDefinition::new("  ", "GET", "SELECT 1").validate().is_err());
        assert!(ApiDefinition::new("/orders", "", "SELECT 1").validate().is_err());
        assert!(ApiDefinition::new("/orders", "GET", "\n").validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let def: ApiDefinition = serde_json::from_str(
            r#"{"path":"/orders","method":"GET","sql":"SELECT 1","status":"published","encrypt_mode":"SM4"}"#,
        )
        .unwrap();
        assert_eq!(def.status, PublishStatus::Published);
        assert_eq!(def.version, "1.0");
        assert_eq!(def.encrypt_mode, EncryptMode::Sm4);
        assert_eq!(def.id, None);
    }

    #[test]
    fn test_key_normalizes_method() {
        assert_eq!(
            DefinitionKey::new(" /orders ", "post"),
            DefinitionKey {
                path: "/orders".to_string(),
                method: "POST".to_string()
            }
        );
    }
}
