//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required fields, recognized modes/methods, well-formed patterns and hashes
//! - Value ranges (port != 0, timeouts > 0)
//! - Textual duplicates of routes and credential ids
//!
//! # Design Decisions
//! - First error wins; the message names the offending entry
//! - Shape conflicts are left to `RouteTable::compile`
//! - Runs before any snapshot is built

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use crate::config::loader::{ConfigError, ConfigErrorKind, ConfigFile};
use crate::config::overrides::EnvOverrides;
use crate::config::schema::{
    EnvConfig, Mode, RawApiConfig, RawCredentialEntry, RawRouteEntry, DEFAULT_HOST,
    DEFAULT_LOG_LEVEL, DEFAULT_MAX_BODY_BYTES, DEFAULT_REQUEST_TIMEOUT_MS,
};
use crate::routing::{parse_method, PathPattern, RouteDefinition};
use crate::security::capability::capability_set;
use crate::security::credentials::CredentialRecord;
use crate::security::secret::SecretHash;

fn missing(file: ConfigFile, what: String) -> ConfigError {
    ConfigError::new(ConfigErrorKind::MissingField, file, what)
}

fn malformed(file: ConfigFile, what: String) -> ConfigError {
    ConfigError::new(ConfigErrorKind::Malformed, file, what)
}

fn invalid(file: ConfigFile, what: String) -> ConfigError {
    ConfigError::new(ConfigErrorKind::InvalidValue, file, what)
}

/// Validate `api.yaml` and apply environment overrides.
pub fn validate_api(raw: RawApiConfig, overrides: &EnvOverrides) -> Result<EnvConfig, ConfigError> {
    const FILE: ConfigFile = ConfigFile::Api;

    let mode = match raw.mode {
        Some(text) => text.parse::<Mode>().map_err(|e| malformed(FILE, format!("mode: {}", e)))?,
        None => return Err(missing(FILE, "mode".into())),
    };
    let port = raw.port.ok_or_else(|| missing(FILE, "port".into()))?;
    if port == 0 {
        return Err(invalid(FILE, "port must be between 1 and 65535".into()));
    }

    let timeout_ms = raw.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(invalid(FILE, "request_timeout_ms must be positive".into()));
    }
    let max_body_bytes = raw.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
    if max_body_bytes == 0 {
        return Err(invalid(FILE, "max_body_bytes must be positive".into()));
    }

    let admin = raw.admin.unwrap_or_default();
    if admin.enabled && admin.api_key.trim().is_empty() {
        return Err(invalid(FILE, "admin.api_key must be set when admin is enabled".into()));
    }
    if let Err(e) = admin.bind_address.parse::<SocketAddr>() {
        return Err(invalid(
            FILE,
            format!("admin.bind_address {:?}: {}", admin.bind_address, e),
        ));
    }

    let metrics = raw.metrics.unwrap_or_default();
    if let Err(e) = metrics.address.parse::<SocketAddr>() {
        return Err(invalid(FILE, format!("metrics.address {:?}: {}", metrics.address, e)));
    }

    let env = EnvConfig {
        mode: overrides.mode.unwrap_or(mode),
        host: raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: overrides.port.unwrap_or(port),
        request_timeout: Duration::from_millis(timeout_ms),
        max_body_bytes,
        admin,
        metrics,
        log_level: raw.log_level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        settings: raw.settings,
    };

    env.socket_addr()
        .map_err(|e| invalid(FILE, format!("host {:?}: {}", env.host, e)))?;

    Ok(env)
}

/// Validate `routes.yaml` entries, preserving order.
pub fn validate_routes(raw: Vec<RawRouteEntry>) -> Result<Vec<RouteDefinition>, ConfigError> {
    const FILE: ConfigFile = ConfigFile::Routes;

    let mut seen = HashSet::new();
    let mut routes = Vec::with_capacity(raw.len());

    for (i, entry) in raw.into_iter().enumerate() {
        let method_text = entry
            .method
            .ok_or_else(|| missing(FILE, format!("route #{}: method", i)))?;
        let path = entry
            .path
            .ok_or_else(|| missing(FILE, format!("route #{}: path", i)))?;
        let handler = entry
            .handler
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| missing(FILE, format!("route #{} ({}): handler", i, path)))?;

        let method = parse_method(&method_text).ok_or_else(|| {
            malformed(FILE, format!("route #{} ({}): unknown method {:?}", i, path, method_text))
        })?;
        let pattern = PathPattern::parse(&path)
            .map_err(|e| malformed(FILE, format!("route #{}: {}", i, e)))?;

        if !seen.insert((method.clone(), path.clone())) {
            return Err(ConfigError::new(
                ConfigErrorKind::DuplicateRoute,
                FILE,
                format!("{} {} is defined more than once", method, path),
            ));
        }

        if entry.capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err(malformed(FILE, format!("route #{} ({}): empty capability", i, path)));
        }

        let mut def = RouteDefinition::new(method, pattern, handler)
            .with_capabilities(capability_set(entry.capabilities));
        if entry.public {
            def = def.public();
        }
        if let Some(ms) = entry.timeout_ms {
            if ms == 0 {
                return Err(invalid(FILE, format!("route #{} ({}): timeout_ms must be positive", i, path)));
            }
            def = def.with_timeout(Duration::from_millis(ms));
        }
        routes.push(def);
    }

    Ok(routes)
}

/// Validate `credentials.yaml` entries.
pub fn validate_credentials(
    raw: Vec<RawCredentialEntry>,
) -> Result<Vec<CredentialRecord>, ConfigError> {
    const FILE: ConfigFile = ConfigFile::Credentials;

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());

    for (i, entry) in raw.into_iter().enumerate() {
        let id = entry
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| missing(FILE, format!("credential #{}: id", i)))?;
        let encoded = entry
            .secret_hash
            .ok_or_else(|| missing(FILE, format!("credential {:?}: secret_hash", id)))?;
        let secret_hash = SecretHash::parse(&encoded)
            .map_err(|e| malformed(FILE, format!("credential {:?}: {}", id, e)))?;

        if !seen.insert(id.clone()) {
            return Err(ConfigError::new(
                ConfigErrorKind::DuplicateCredential,
                FILE,
                format!("credential id {:?} is defined more than once", id),
            ));
        }

        records.push(CredentialRecord {
            id,
            secret_hash,
            capabilities: capability_set(entry.capabilities),
            status: entry.status,
        });
    }

    Ok(records)
}
