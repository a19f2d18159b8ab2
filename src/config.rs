//! Startup configuration.
//!
//! Everything is read once from the environment (a `.env` file is honoured)
//! and never re-evaluated while the server runs.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::constants::{
    ENV_API_HOST, ENV_API_KEY, ENV_KEY_ID, ENV_PRIVATE_KEY, ENV_PRIVATE_KEY_PATH, ENV_PROJECT_ID,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the provider, e.g. `https://abc.re.qweatherapi.com`.
    pub base_url: String,
    pub auth: AuthConfig,
}

/// Which authentication scheme is active.
#[derive(Clone)]
pub enum AuthConfig {
    /// Static key sent on every request.
    ApiKey(String),
    /// EdDSA-signed, time-limited token.
    SignedToken {
        project_id: String,
        key_id: String,
        private_key: PrivateKeySource,
    },
}

#[derive(Clone)]
pub enum PrivateKeySource {
    Path(PathBuf),
    /// PEM content; literal `\n` escapes are unfolded when read.
    Inline(String),
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.debug_tuple("ApiKey").field(&"[REDACTED]").finish(),
            Self::SignedToken {
                project_id,
                key_id,
                private_key,
            } => f
                .debug_struct("SignedToken")
                .field("project_id", project_id)
                .field("key_id", key_id)
                .field("private_key", private_key)
                .finish(),
        }
    }
}

impl fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Inline(_) => f.debug_tuple("Inline").field(&"[REDACTED]").finish(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, after merging any
    /// `.env` file found from the working directory upwards.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Blank values count as unset. A static API key takes precedence over
    /// the signed-token settings when both are present.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(ENV_API_HOST)
            .ok_or_else(|| Error::config(format!("{} is not set", ENV_API_HOST)))?;
        let base_url = normalize_host(&host);

        let auth = if let Some(key) = get(ENV_API_KEY) {
            AuthConfig::ApiKey(key)
        } else {
            let project_id = get(ENV_PROJECT_ID);
            let key_id = get(ENV_KEY_ID);
            let private_key = get(ENV_PRIVATE_KEY_PATH)
                .map(|p| PrivateKeySource::Path(PathBuf::from(p)))
                .or_else(|| get(ENV_PRIVATE_KEY).map(PrivateKeySource::Inline));

            match (project_id, key_id, private_key) {
                (Some(project_id), Some(key_id), Some(private_key)) => AuthConfig::SignedToken {
                    project_id,
                    key_id,
                    private_key,
                },
                _ => {
                    return Err(Error::config(format!(
                        "set {} or the full signed-token configuration ({}, {}, {} or {})",
                        ENV_API_KEY, ENV_PROJECT_ID, ENV_KEY_ID, ENV_PRIVATE_KEY_PATH, ENV_PRIVATE_KEY
                    )))
                }
            }
        };

        Ok(Self { base_url, auth })
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
