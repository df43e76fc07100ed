//! Environment variable overrides.
//!
//! Read once at process start and folded into every snapshot the process
//! builds, so the environment stays authoritative for mode and port.

use crate::config::loader::{ConfigError, ConfigErrorKind, ConfigFile};
use crate::config::schema::Mode;

pub const MODE_VAR: &str = "CAASPAY_MODE";
pub const PORT_VAR: &str = "CAASPAY_PORT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub mode: Option<Mode>,
    pub port: Option<u16>,
}

impl EnvOverrides {
    /// Read `CAASPAY_MODE` and `CAASPAY_PORT` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup(MODE_VAR).filter(|v| !v.trim().is_empty()) {
            Some(value) => Some(value.parse::<Mode>().map_err(|e| {
                ConfigError::new(ConfigErrorKind::InvalidValue, ConfigFile::Environment, format!("{}: {}", MODE_VAR, e))
            })?),
            None => None,
        };

        let port = match lookup(PORT_VAR).filter(|v| !v.trim().is_empty()) {
            Some(value) => {
                let port = value.trim().parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(|| {
                    ConfigError::new(
                        ConfigErrorKind::InvalidValue,
                        ConfigFile::Environment,
                        format!("{}: {:?} is not a valid port", PORT_VAR, value),
                    )
                })?;
                Some(port)
            }
            None => None,
        };

        Ok(Self { mode, port })
    }
}
