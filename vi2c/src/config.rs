//! Device configuration
//!
//! Read as a JSON object. Every key is optional:
//!
//! ```json
//! { "name": "vI2C", "capacity": 1024, "first_major": 240 }
//! ```

use serde::Deserialize;

use crate::io::DEFAULT_CAPACITY;

/// Default device name, also used for the device node
pub const DEFAULT_NAME: &str = "vI2C";

/// First major number handed out by dynamic allocation
pub const DEFAULT_FIRST_MAJOR: u32 = 240;

/// Errors that can occur while loading a configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration source could not be read
    Read(String),
    /// The configuration was not valid JSON for `DeviceConfig`
    Parse(String),
    /// The configuration parsed but a value is out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(msg) => write!(f, "Failed to read config: {msg}"),
            Self::Parse(msg) => write!(f, "Failed to parse config JSON: {msg}"),
            Self::Invalid(msg) => write!(f, "Invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Device name; the node is created as `/dev/<name>`
    pub name: String,
    /// Store capacity in bytes
    pub capacity: usize,
    /// First major number the device may be registered under
    pub first_major: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            first_major: DEFAULT_FIRST_MAJOR,
        }
    }
}

impl DeviceConfig {
    /// Parse and validate a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed JSON or unknown keys, and
    /// `ConfigError::Invalid` if validation fails.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_slice(json.as_bytes())
    }

    /// Read, parse and validate a configuration from any byte source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the reader fails, otherwise the same
    /// errors as [`DeviceConfig::from_json`].
    pub fn from_reader(mut reader: impl embedded_io::Read) -> Result<Self, ConfigError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match embedded_io::Read::read(&mut reader, &mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) => return Err(ConfigError::Read(format!("{e:?}"))),
            }
        }
        Self::from_slice(&buffer)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an empty or path-like name, or a
    /// zero capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }
        if self.name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "name must not contain '/': {}",
                self.name
            )));
        }
        if self.capacity == 0 {
            return Err(ConfigError::Invalid(
                "capacity must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the device node
    #[must_use]
    pub fn node_path(&self) -> String {
        format!("/dev/{}", self.name)
    }
}
