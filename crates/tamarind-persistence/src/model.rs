//! Domain model types for persistence operations
//!
//! These types are backend-agnostic and shared by the in-memory and SQL
//! implementations as well as every service built on top of them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite identity of a config entry
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigKey {
    pub namespace: String,
    pub group: String,
    pub key: String,
}

impl ConfigKey {
    pub fn new(namespace: &str, group: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            group: group.to_string(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.group, self.key)
    }
}

/// Declared content type of a config value
///
/// The type is advisory; payloads are never validated against it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    #[default]
    Text,
    Properties,
    Json,
    #[serde(alias = "yml")]
    Yaml,
    Xml,
    Markdown,
}

impl ConfigType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigType::Text => "text",
            ConfigType::Properties => "properties",
            ConfigType::Json => "json",
            ConfigType::Yaml => "yaml",
            ConfigType::Xml => "xml",
            ConfigType::Markdown => "markdown",
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConfigType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ConfigType::Text),
            "properties" => Ok(ConfigType::Properties),
            "json" => Ok(ConfigType::Json),
            "yaml" | "yml" => Ok(ConfigType::Yaml),
            "xml" => Ok(ConfigType::Xml),
            "markdown" => Ok(ConfigType::Markdown),
            _ => Err(format!("invalid config type: {}", s)),
        }
    }
}

/// A stored config entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub namespace: String,
    pub group: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    pub version: i64,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Config {
    pub fn config_key(&self) -> ConfigKey {
        ConfigKey::new(&self.namespace, &self.group, &self.key)
    }

    /// Notification payload emitted when a config is removed
    pub fn deleted(key: &ConfigKey, operator: &str) -> Self {
        let now = Utc::now();
        Self {
            namespace: key.namespace.clone(),
            group: key.group.clone(),
            key: key.key.clone(),
            value: String::new(),
            config_type: ConfigType::Text,
            version: tamarind_common::DELETED_VERSION,
            created_by: operator.to_string(),
            updated_by: operator.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Kind of mutation recorded in a history entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpType {
    Create,
    Update,
    Delete,
    Rollback,
}

impl OpType {
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Create => "CREATE",
            OpType::Update => "UPDATE",
            OpType::Delete => "DELETE",
            OpType::Rollback => "ROLLBACK",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(OpType::Create),
            "UPDATE" => Ok(OpType::Update),
            "DELETE" => Ok(OpType::Delete),
            "ROLLBACK" => Ok(OpType::Rollback),
            _ => Err(format!("invalid op type: {}", s)),
        }
    }
}

/// Immutable record of one config mutation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigHistory {
    pub id: String,
    pub namespace: String,
    pub group: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub config_type: ConfigType,
    pub version: i64,
    pub op_type: OpType,
    pub operator: String,
    pub created_at: DateTime<Utc>,
}

impl ConfigHistory {
    pub fn new(config: &Config, op_type: OpType, operator: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            namespace: config.namespace.clone(),
            group: config.group.clone(),
            key: config.key.clone(),
            value: config.value.clone(),
            config_type: config.config_type,
            version: config.version,
            op_type,
            operator: operator.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            _ => Err(format!("invalid role: {}", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            _ => Err(format!("invalid status: {}", s)),
        }
    }
}

/// User account
///
/// The password digest never leaves the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, password_digest: &str, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            username: username.to_string(),
            password: password_digest.to_string(),
            role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Admin that can still log in and manage users
    pub fn is_active_admin(&self) -> bool {
        self.is_admin() && self.is_active()
    }
}

/// Request counter for one token within its current window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenUsage {
    pub count: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl TokenUsage {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_end
    }
}

/// Storage backend mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageMode {
    /// In-process concurrent maps, state lost on restart
    Memory,
    /// External relational database via SeaORM
    ExternalDb,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Memory => write!(f, "memory"),
            StorageMode::ExternalDb => write!(f, "external_db"),
        }
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StorageMode::Memory),
            "external_db" => Ok(StorageMode::ExternalDb),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}
