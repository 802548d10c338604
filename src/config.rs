//! Configuration types for legmap-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Remote optimizer service endpoints and request settings
///
/// Paths are joined onto `base_url`, so the base should end with a slash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the optimizer REST service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Schedule lookup path (default: "schedule")
    #[serde(default = "default_schedule_path")]
    pub schedule_path: String,

    /// Leg structure lookup path (default: "dsc")
    #[serde(default = "default_leg_structure_path")]
    pub leg_structure_path: String,

    /// Leg detail lookup path (default: "dsc/odiflegmap")
    #[serde(default = "default_leg_detail_path")]
    pub leg_detail_path: String,

    /// Carrier code sent with every flight-scoped request (default: "TP")
    #[serde(default = "default_carrier_code")]
    pub carrier_code: String,

    /// Timeout for a single request/response exchange (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            schedule_path: default_schedule_path(),
            leg_structure_path: default_leg_structure_path(),
            leg_detail_path: default_leg_detail_path(),
            carrier_code: default_carrier_code(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Per-leg download behavior (concurrency cap and pre-request jitter)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum number of leg downloads in flight (default: 6, 0 behaves as 1)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Lower bound of the random delay before each leg download (default: 500ms)
    #[serde(default = "default_jitter_min", with = "duration_millis")]
    pub jitter_min: Duration,

    /// Upper bound of the random delay before each leg download (default: 2000ms)
    ///
    /// A value below `jitter_min` collapses the range to `jitter_min`.
    /// Setting both bounds to zero disables the delay.
    #[serde(default = "default_jitter_max", with = "duration_millis")]
    pub jitter_max: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            jitter_min: default_jitter_min(),
            jitter_max: default_jitter_max(),
        }
    }
}

impl DownloadConfig {
    /// Effective concurrency cap, never below one
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Output artifact settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Base name for the CSV artifact (default: "odiflegmap")
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// Directory the artifact is written to (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_name: default_base_name(),
            output_dir: default_output_dir(),
        }
    }
}

/// Main configuration for legmap-dl
///
/// Every field has a default, so `{}` is a valid JSON configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Output artifact settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Parse a JSON configuration document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file and validate it
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&text)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.service.base_url)
            .map_err(|e| Error::config(format!("invalid base URL: {e}"), "base_url"))?;
        if base.cannot_be_a_base() {
            return Err(Error::config(
                "base URL cannot carry endpoint paths",
                "base_url",
            ));
        }
        if self.service.request_timeout.is_zero() {
            return Err(Error::config("must be greater than zero", "request_timeout"));
        }
        if self.service.carrier_code.trim().is_empty() {
            return Err(Error::config("must not be empty", "carrier_code"));
        }
        if self.export.base_name.trim().is_empty() {
            return Err(Error::config("must not be empty", "base_name"));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://prod-rm.tp.proscloud.com/prosrm/oandd/services/rest/optimizer/".to_string()
}

fn default_schedule_path() -> String {
    "schedule".to_string()
}

fn default_leg_structure_path() -> String {
    "dsc".to_string()
}

fn default_leg_detail_path() -> String {
    "dsc/odiflegmap".to_string()
}

fn default_carrier_code() -> String {
    "TP".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_concurrency() -> usize {
    6
}

fn default_jitter_min() -> Duration {
    Duration::from_millis(500)
}

fn default_jitter_max() -> Duration {
    Duration::from_millis(2000)
}

fn default_base_name() -> String {
    "odiflegmap".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

// Duration serialization helpers
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
