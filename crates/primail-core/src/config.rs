//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Default organisational domain every account must belong to.
pub const DEFAULT_DOMAIN: &str = "primary.com";

/// Default idle timeout for sessions (30 minutes).
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Argon2 cost parameters used when hashing new passwords.
///
/// Existing hashes carry their own parameters, so changing these only
/// affects passwords registered afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of iterations.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl HashParams {
    /// Smallest parameters Argon2 accepts. Only suitable for tests.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            m_cost: 8,
            t_cost: 1,
            p_cost: 1,
        }
    }
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// Primail configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the snapshot files.
    pub data_dir: PathBuf,
    /// File name of the users snapshot.
    pub users_file: String,
    /// File name of the messages snapshot.
    pub messages_file: String,
    /// Domain every registered address must end with.
    pub allowed_domain: String,
    /// Seconds a session may stay idle before it expires.
    pub session_idle_timeout_secs: u64,
    /// Password hashing cost.
    pub password_hash: HashParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            users_file: "users.json".to_string(),
            messages_file: "messages.json".to_string(),
            allowed_domain: DEFAULT_DOMAIN.to_string(),
            session_idle_timeout_secs: DEFAULT_SESSION_IDLE_SECS,
            password_hash: HashParams::default(),
        }
    }
}

impl Config {
    /// Creates a configuration builder starting from the defaults.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| PersistenceError::Serde {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Full path of the users snapshot.
    #[must_use]
    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(&self.users_file)
    }

    /// Full path of the messages snapshot.
    #[must_use]
    pub fn messages_path(&self) -> PathBuf {
        self.data_dir.join(&self.messages_file)
    }

    /// Session idle timeout as a duration.
    #[must_use]
    pub const fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the data directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Sets the organisational domain.
    #[must_use]
    pub fn allowed_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.allowed_domain = domain.into();
        self
    }

    /// Sets the session idle timeout.
    #[must_use]
    pub const fn session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_idle_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the password hashing cost.
    #[must_use]
    pub const fn password_hash(mut self, params: HashParams) -> Self {
        self.config.password_hash = params;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("primail")
}
