//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::result::PageResult;
use crate::wait::{WaitOptions, DEFAULT_RETRY_EVERY_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Settings for a [`Session`](crate::session::Session)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Base url that mapped paths are joined onto; the current location when unset
    pub base_url: Option<String>,
    /// Default `wait_until` timeout in milliseconds
    pub wait_timeout_ms: u64,
    /// Default `wait_until` polling interval in milliseconds
    pub retry_every_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            retry_every_ms: DEFAULT_RETRY_EVERY_MS,
        }
    }
}

impl SessionConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document
    ///
    /// ```
    /// use pagebind::SessionConfig;
    ///
    /// let config = SessionConfig::from_yaml("base_url: http://localhost:8080\nwait_timeout_ms: 250\n").unwrap();
    /// assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080"));
    /// assert_eq!(config.retry_every_ms, 1_000);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Config`](crate::PageError::Config) on malformed
    /// YAML or unknown keys.
    pub fn from_yaml(yaml: &str) -> PageResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Set base url
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set wait timeout
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout_ms: u64) -> Self {
        self.wait_timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_retry_every(mut self, retry_every_ms: u64) -> Self {
        self.retry_every_ms = retry_every_ms;
        self
    }

    /// Wait options derived from this config
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.wait_timeout_ms,
            retry_every_ms: self.retry_every_ms,
        }
    }
}
