//! Connection settings for the platform API.
//!
//! Settings come from the caller or from `AAP_*` environment variables and
//! are validated once, when the facade is built.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FacadeError;
use crate::FacadeResult;

/// HTTP request timeout used when none is configured (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Credentials sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Token { token: String },
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Platform root URL, e.g. `https://aap.example.com`
    pub host: String,
    pub auth: Auth,
    /// Skip TLS certificate verification
    pub insecure_skip_verify: bool,
    /// Per-request timeout; `None` disables it
    pub request_timeout: Option<Duration>,
    /// Version reported in the user agent
    pub version: String,
}

impl ConnectionConfig {
    /// Create config for a specific host with no credentials
    pub fn new(host: &str) -> Self {
        ConnectionConfig {
            host: host.to_string(),
            auth: Auth::None,
            insecure_skip_verify: false,
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            version: "dev".to_string(),
        }
    }

    /// Create a config from `AAP_*` environment variables
    pub fn from_env() -> FacadeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a config from an arbitrary variable source.
    ///
    /// `AAP_HOSTNAME` is preferred over `AAP_HOST`. A token wins over a
    /// username/password pair. `AAP_TIMEOUT=0` disables the request timeout.
    pub fn from_lookup<F>(lookup: F) -> FacadeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("AAP_HOSTNAME")
            .or_else(|| get("AAP_HOST"))
            .ok_or_else(|| FacadeError::InvalidConfig("AAP_HOSTNAME is not set".into()))?;

        let auth = match (get("AAP_TOKEN"), get("AAP_USERNAME"), get("AAP_PASSWORD")) {
            (Some(token), _, _) => Auth::Token { token },
            (None, Some(username), Some(password)) => Auth::Basic { username, password },
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(FacadeError::InvalidConfig(
                    "AAP_USERNAME and AAP_PASSWORD must be set together".into(),
                ))
            }
            (None, None, None) => Auth::None,
        };

        let insecure_skip_verify = match get("AAP_INSECURE_SKIP_VERIFY") {
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                FacadeError::InvalidConfig(format!("AAP_INSECURE_SKIP_VERIFY: invalid bool {raw:?}"))
            })?,
            None => false,
        };

        let timeout_secs = match get("AAP_TIMEOUT") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                FacadeError::InvalidConfig(format!("AAP_TIMEOUT: invalid seconds {raw:?}"))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(ConnectionConfig {
            host,
            auth,
            insecure_skip_verify,
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            version: "dev".to_string(),
        })
    }

    /// Use basic authentication
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        self.auth = Auth::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
        self
    }

    /// Use token authentication
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth = Auth::Token {
            token: token.to_string(),
        };
        self
    }

    /// Set the version reported to the server
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Check the settings and return the host as a URL with a trailing slash.
    pub fn validate(&self) -> FacadeResult<Url> {
        let mut host = self.host.trim().to_string();
        if !host.ends_with('/') {
            host.push('/');
        }
        let url = Url::parse(&host)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FacadeError::InvalidConfig(format!(
                "host must use http or https, got {}",
                url.scheme()
            )));
        }

        match &self.auth {
            Auth::Basic { username, password } if username.is_empty() || password.is_empty() => {
                Err(FacadeError::InvalidConfig(
                    "username and password must both be non-empty".into(),
                ))
            }
            Auth::Token { token } if token.is_empty() => {
                Err(FacadeError::InvalidConfig("token must be non-empty".into()))
            }
            _ => Ok(url),
        }
    }

    /// User agent sent with every request
    pub fn user_agent(&self) -> String {
        format!("aap-reconcile/{}", self.version)
    }
}
