//! Configuration manager for accountservices.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::account::DEFAULT_MAX_NUMBER_ATTEMPTS;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_NAME: &str = "accountservices";
const DEFAULT_PORT: u16 = 8080;
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Shared secret expected in the `x-api-key` header.
    #[serde(skip_serializing)]
    pub api_key: String,
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to account creation.
    pub accounts: Accounts,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            port: DEFAULT_PORT,
            api_key: String::default(),
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            accounts: Accounts::default(),
            postgres: None,
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Account creation configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Accounts {
    /// Account number draws allowed before a creation fails.
    pub max_number_attempts: u32,
}

impl Default for Accounts {
    fn default() -> Self {
        Self {
            max_number_attempts: DEFAULT_MAX_NUMBER_ATTEMPTS,
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Default configuration accepting `key` as API key.
    #[cfg(test)]
    pub(crate) fn with_api_key(key: &str) -> Self {
        Self {
            api_key: key.to_owned(),
            ..Default::default()
        }
    }

    /// Current crate version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location, then applies `API_KEY` and `PORT` environment overrides.
    pub fn read(self) -> Arc<Self> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let mut config = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file)
            {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        // set app version.
        config.version = VERSION.to_owned();
        config.path = file_path;

        if let Ok(key) = std::env::var("API_KEY") {
            config.api_key = key;
        }
        if let Some(port) =
            std::env::var("PORT").ok().and_then(|p| p.parse().ok())
        {
            config.port = port;
        }

        Arc::new(config)
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file cannot be read");
        Self::default()
    }
}
