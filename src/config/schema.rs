//! Configuration schema definitions.
//!
//! `Raw*` types mirror the three YAML files and only carry syntax; required
//! fields are `Option` so validation.rs can report them as missing by name.
//! [`EnvConfig`] is the validated, environment-scoped half of a snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::security::credentials::CredentialStatus;

/// Process mode selected by `api.yaml` or `CAASPAY_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Debug,
    Release,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Debug => "debug",
            Mode::Release => "release",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "development" => Ok(Mode::Debug),
            "release" | "production" => Ok(Mode::Release),
            other => Err(format!("unrecognized mode {:?} (expected debug or release)", other)),
        }
    }
}

/// `api.yaml` as written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawApiConfig {
    pub mode: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub max_body_bytes: Option<usize>,
    pub admin: Option<AdminConfig>,
    pub metrics: Option<MetricsConfig>,
    pub log_level: Option<String>,

    /// Any other keys, passed through to handlers.
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

/// One `routes.yaml` entry as written.
///
/// Unknown keys are rejected so a misspelled `capabilities` cannot drop a
/// requirement.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRouteEntry {
    pub method: Option<String>,
    pub path: Option<String>,
    pub handler: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub public: bool,
    pub timeout_ms: Option<u64>,
}

/// One `credentials.yaml` entry as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCredentialEntry {
    pub id: Option<String>,
    #[serde(alias = "secretHash")]
    pub secret_hash: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub status: CredentialStatus,
}

/// Operator endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Bearer key for the admin endpoints.
    pub api_key: String,

    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Prometheus exporter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Validated environment-scoped settings.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub mode: Mode,
    pub host: String,
    pub port: u16,

    /// Handler deadline for routes without their own `timeout_ms`.
    pub request_timeout: Duration,

    /// Applied when the listener starts; reloads do not change it.
    pub max_body_bytes: usize,

    pub admin: AdminConfig,
    pub metrics: MetricsConfig,
    pub log_level: String,
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

impl EnvConfig {
    /// A debug-mode config with defaults, mostly useful in tests.
    pub fn new(mode: Mode, port: u16) -> Self {
        Self {
            mode,
            host: DEFAULT_HOST.to_string(),
            port,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            admin: AdminConfig::default(),
            metrics: MetricsConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            settings: BTreeMap::new(),
        }
    }

    pub fn is_release(&self) -> bool {
        self.mode == Mode::Release
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// A pass-through setting from `api.yaml`.
    pub fn setting(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.settings.get(key)
    }
}
