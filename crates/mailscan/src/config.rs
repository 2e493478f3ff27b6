//! Configuration loading for the scan engine
//!
//! Settings are resolved in this order:
//! 1. A JSON file (explicit path, or `scanner.json` in a [`ConfigDir`], absent means defaults)
//! 2. Environment variable overrides
//! 3. Built-in defaults for anything still unset

use anyhow::{Context, Result};
use config::{ConfigDir, Loaded, Source};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::{HttpBackend, TokenBrokerGateway};
use crate::models::RetrievalParams;
use crate::scan::{FailurePolicy, FanOut, ScanOptions};

/// Config filename in the Sentinel config directory
pub const CONFIG_FILE: &str = "scanner.json";

/// Environment variables that override file settings
pub mod env {
    pub const BACKEND_URL: &str = "SENTINEL_BACKEND_URL";
    pub const CLIENT_ID: &str = "SENTINEL_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "SENTINEL_CLIENT_SECRET";
    pub const BROKER_URL: &str = "SENTINEL_BROKER_URL";
    pub const BROKER_SECRET: &str = "SENTINEL_BROKER_SECRET";
}

/// Settings for retrieval, classification and the session facade
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Root URL of the retrieval and classification backend
    pub backend_url: String,
    /// OAuth client identity forwarded with every retrieval
    pub client_id: String,
    pub client_secret: String,
    /// Token broker root; enables [`TokenBrokerGateway`] when set with a secret
    pub broker_url: Option<String>,
    pub broker_secret: Option<String>,
    /// OAuth provider key at the broker (defaults to Google)
    pub broker_provider: Option<String>,
    pub retrieval: RetrievalParams,
    /// Per-request timeout for every network call
    pub timeout_secs: u64,
    /// Minimum time a scan stays in `Scanning`
    pub settle_ms: u64,
    pub fan_out: FanOut,
    pub failure_policy: FailurePolicy,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            broker_url: None,
            broker_secret: None,
            broker_provider: None,
            retrieval: RetrievalParams::default(),
            timeout_secs: 30,
            settle_ms: 2000,
            fan_out: FanOut::Batched,
            failure_policy: FailurePolicy::ResetAll,
        }
    }
}

impl ScannerConfig {
    /// Load from the user config directory plus environment overrides
    pub fn load() -> Result<Self> {
        match ConfigDir::user() {
            Some(dir) => Self::load_in(&dir),
            None => Self::default().with_process_env().validated(),
        }
    }

    /// Load `scanner.json` from `dir` (defaults when absent) plus environment overrides
    pub fn load_in(dir: &ConfigDir) -> Result<Self> {
        let loaded: Loaded<Self> = dir.load_or_default(CONFIG_FILE)?;
        if let Source::File(path) = &loaded.source {
            log::debug!("Scanner config read from {}", path.display());
        }
        loaded.value.with_process_env().validated()
    }

    /// Load from a specific JSON file plus environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let base: Self = config::read_json(path)?;
        base.with_process_env().validated()
    }

    fn with_process_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse settings from a JSON string; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json).context("Failed to parse scanner config")?;
        parsed.validated()
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = lookup(env::BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(id) = lookup(env::CLIENT_ID) {
            self.client_id = id;
        }
        if let Some(secret) = lookup(env::CLIENT_SECRET) {
            self.client_secret = secret;
        }
        if let Some(url) = lookup(env::BROKER_URL) {
            self.broker_url = Some(url);
        }
        if let Some(secret) = lookup(env::BROKER_SECRET) {
            self.broker_secret = Some(secret);
        }
        self
    }

    /// Check URLs and limits, returning the config unchanged when valid
    pub fn validated(self) -> Result<Self> {
        crate::backend::validate_service_url(&self.backend_url)
            .context("Invalid backend_url")?;
        if let Some(url) = &self.broker_url {
            crate::backend::validate_service_url(url).context("Invalid broker_url")?;
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.retrieval.max_results == 0 {
            anyhow::bail!("retrieval.maxResults must be greater than zero");
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle_floor(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            fan_out: self.fan_out,
            failure_policy: self.failure_policy,
        }
    }

    /// HTTP client for the configured backend
    pub fn backend(&self) -> Result<HttpBackend> {
        HttpBackend::new(&self.backend_url, self.timeout())
    }

    /// Token broker gateway, when a broker URL and secret are configured
    pub fn token_broker(&self) -> Result<Option<TokenBrokerGateway>> {
        let (Some(url), Some(secret)) = (&self.broker_url, &self.broker_secret) else {
            return Ok(None);
        };

        let mut gateway = TokenBrokerGateway::new(
            url,
            secret.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
            self.timeout(),
        )?;
        if let Some(provider) = &self.broker_provider {
            gateway = gateway.with_provider(provider.clone());
        }
        Ok(Some(gateway))
    }

    /// Get the default config file path (~/.config/sentinel/scanner.json)
    pub fn default_config_path() -> Option<PathBuf> {
        ConfigDir::user().map(|dir| dir.file(CONFIG_FILE))
    }

    /// Write these settings as `scanner.json` in `dir`
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn save_in(&self, dir: &ConfigDir, overwrite: bool) -> Result<PathBuf> {
        dir.create(CONFIG_FILE, self, overwrite)
    }
}
