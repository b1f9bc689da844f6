//! Configuration loading for sharemeter
//!
//! Settings come from an optional `Sharemeter.toml` next to the binary,
//! overridden by `SHAREMETER_*` environment variables. The appliance
//! address, account, password and share path are required; everything else
//! has a sensible default. Configuration is immutable for the process
//! lifetime.

use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{MeterError, Result};

fn default_max_size_bytes() -> u64 {
    // 6 TiB volume
    6 * 1024u64.pow(4)
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8735
}

fn default_trigger_interval_secs() -> u64 {
    3600
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Runtime configuration for the exporter
#[derive(Debug, Clone, Deserialize)]
pub struct MeterConfig {
    /// Base URL of the appliance, e.g. "http://diskstation:5000"
    pub appliance_url: String,

    /// Account used to authenticate against the appliance
    pub account: String,

    /// Password for the account
    pub password: String,

    /// Shared folder whose size is measured, e.g. "/volume1/backups"
    pub share_path: String,

    /// Capacity the measurement is reported against
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Address the HTTP endpoint binds to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Seconds between externally-triggered measurement runs
    #[serde(default = "default_trigger_interval_secs")]
    pub trigger_interval_secs: u64,

    /// Seconds between task status polls within a run
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Connect/response timeout for appliance calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl MeterConfig {
    /// Load configuration from `Sharemeter.toml` (if present) and the
    /// `SHAREMETER_*` environment.
    pub fn load() -> Result<Self> {
        let builder = Config::builder()
            .add_source(ConfigFile::with_name("Sharemeter").required(false))
            .add_source(Environment::with_prefix("SHAREMETER"))
            .build()?;

        let config: MeterConfig = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.appliance_url.is_empty() {
            return Err(MeterError::Config("appliance_url is empty".to_string()));
        }
        if !self.appliance_url.starts_with("http://") && !self.appliance_url.starts_with("https://")
        {
            return Err(MeterError::Config(format!(
                "appliance_url must be an http(s) URL, got: {}",
                self.appliance_url
            )));
        }
        if self.share_path.is_empty() {
            return Err(MeterError::Config("share_path is empty".to_string()));
        }
        if self.max_size_bytes == 0 {
            return Err(MeterError::Config("max_size_bytes must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn trigger_interval(&self) -> Duration {
        Duration::from_secs(self.trigger_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}
