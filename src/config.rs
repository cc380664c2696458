use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration file looked up in the working directory when none is given.
pub const CONFIG_FILE: &str = "Voting.toml";

/// Prefix of environment variables that override the file, e.g. `VOTING_API_URL`.
pub const ENV_PREFIX: &str = "VOTING_";

/// Client configuration, derived from defaults, `Voting.toml` and `VOTING_*`
/// environment variables, in increasing order of precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    api_url: String,
    session_dir: PathBuf,
    request_timeout: u64,
    vote_timeout: u64,
    poll_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".to_string(),
            session_dir: PathBuf::from(".voting-session"),
            request_timeout: 30,
            vote_timeout: 15,
            poll_interval: 5,
        }
    }
}

impl Config {
    /// The layered configuration sources. `file` replaces the default `Voting.toml`.
    pub fn figment(file: Option<&Path>) -> Figment {
        let file = file.unwrap_or_else(|| Path::new(CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the configuration, failing on malformed values.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Ok(Self::figment(file).extract()?)
    }

    /// Base URL of the remote API, without a trailing slash.
    /// Configured via `API_URL`.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Directory holding the persisted session.
    /// Configured via `SESSION_DIR`.
    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Upper bound on any single request, in seconds.
    /// Configured via `REQUEST_TIMEOUT`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// How long to wait for a vote acknowledgment before reporting a retryable failure.
    /// Configured via `VOTE_TIMEOUT`.
    pub fn vote_timeout(&self) -> Duration {
        Duration::from_secs(self.vote_timeout)
    }

    /// Delay between live results refreshes.
    /// Configured via `POLL_INTERVAL`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_session_dir(mut self, session_dir: impl Into<PathBuf>) -> Self {
        self.session_dir = session_dir.into();
        self
    }
}
