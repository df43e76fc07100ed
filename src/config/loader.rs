//! Configuration loading from disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::config::overrides::EnvOverrides;
use crate::config::schema::{EnvConfig, RawApiConfig, RawCredentialEntry, RawRouteEntry};
use crate::config::validation;
use crate::routing::RouteDefinition;
use crate::security::credentials::CredentialRecord;

pub const API_FILE: &str = "api.yaml";
pub const ROUTES_FILE: &str = "routes.yaml";
pub const CREDENTIALS_FILE: &str = "credentials.yaml";

/// Which configuration source an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFile {
    Api,
    Routes,
    Credentials,
    Environment,
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigFile::Api => API_FILE,
            ConfigFile::Routes => ROUTES_FILE,
            ConfigFile::Credentials => CREDENTIALS_FILE,
            ConfigFile::Environment => "environment",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Unreadable,
    Malformed,
    MissingField,
    DuplicateRoute,
    DuplicateCredential,
    UnknownHandler,
    InvalidValue,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigErrorKind::Unreadable => "unreadable",
            ConfigErrorKind::Malformed => "malformed",
            ConfigErrorKind::MissingField => "missing field",
            ConfigErrorKind::DuplicateRoute => "duplicate route",
            ConfigErrorKind::DuplicateCredential => "duplicate credential",
            ConfigErrorKind::UnknownHandler => "unknown handler",
            ConfigErrorKind::InvalidValue => "invalid value",
        })
    }
}

/// Error type for configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}: {kind}: {message}")]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub file: ConfigFile,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, file: ConfigFile, message: impl Into<String>) -> Self {
        Self {
            kind,
            file,
            message: message.into(),
        }
    }
}

/// Raw text of the three configuration files.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub api: String,
    pub routes: String,
    pub credentials: String,
}

impl ConfigSources {
    pub fn new(
        api: impl Into<String>,
        routes: impl Into<String>,
        credentials: impl Into<String>,
    ) -> Self {
        Self {
            api: api.into(),
            routes: routes.into(),
            credentials: credentials.into(),
        }
    }

    /// Read `api.yaml`, `routes.yaml` and `credentials.yaml` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            api: read_source(&dir.join(API_FILE), ConfigFile::Api)?,
            routes: read_source(&dir.join(ROUTES_FILE), ConfigFile::Routes)?,
            credentials: read_source(&dir.join(CREDENTIALS_FILE), ConfigFile::Credentials)?,
        })
    }

    /// Paths of the three files under `dir`.
    pub fn paths(dir: &Path) -> [PathBuf; 3] {
        [
            dir.join(API_FILE),
            dir.join(ROUTES_FILE),
            dir.join(CREDENTIALS_FILE),
        ]
    }
}

fn read_source(path: &Path, file: ConfigFile) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| {
        ConfigError::new(
            ConfigErrorKind::Unreadable,
            file,
            format!("{}: {}", path.display(), e),
        )
    })
}

/// Typed, validated contents of one set of sources.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub env: EnvConfig,
    pub routes: Vec<RouteDefinition>,
    pub credentials: Vec<CredentialRecord>,
}

/// Parse and validate all three sources. Nothing is returned unless every
/// source is valid.
pub fn load_config(
    sources: &ConfigSources,
    overrides: &EnvOverrides,
) -> Result<LoadedConfig, ConfigError> {
    let raw_api: RawApiConfig = parse_yaml(&sources.api, ConfigFile::Api)?.unwrap_or_default();
    let raw_routes: Vec<RawRouteEntry> =
        parse_yaml(&sources.routes, ConfigFile::Routes)?.unwrap_or_default();
    let raw_credentials: Vec<RawCredentialEntry> =
        parse_yaml(&sources.credentials, ConfigFile::Credentials)?.unwrap_or_default();

    let env = validation::validate_api(raw_api, overrides)?;
    let routes = validation::validate_routes(raw_routes)?;
    let credentials = validation::validate_credentials(raw_credentials)?;

    Ok(LoadedConfig {
        env,
        routes,
        credentials,
    })
}

/// Deserialize a YAML document; an empty document yields `None`.
fn parse_yaml<T: DeserializeOwned>(text: &str, file: ConfigFile) -> Result<Option<T>, ConfigError> {
    let is_blank = text
        .lines()
        .map(str::trim)
        .all(|l| l.is_empty() || l.starts_with('#') || l == "---");
    if is_blank {
        return Ok(None);
    }

    serde_yaml::from_str(text)
        .map(Some)
        .map_err(|e| ConfigError::new(ConfigErrorKind::Malformed, file, e.to_string()))
}
