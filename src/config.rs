//! Gateway configuration.
//!
//! Loaded from YAML, then overridden by `ROUTEGATE_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use routegate_admission::{AdmissionConfig, AdmissionConfigError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "ROUTEGATE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration for {field}: {value}")]
    Duration { field: &'static str, value: String },
    #[error(transparent)]
    Admission(#[from] AdmissionConfigError),
    #[error("registry.base_url must not be empty")]
    MissingBaseUrl,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub registry: RegistrySection,
    pub admission: AdmissionConfig,
    pub dispatch: DispatchSection,
    pub hierarchy: HierarchySection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub base_url: String,
    /// Per-request timeout, e.g. `"30s"`.
    pub request_timeout: String,
    /// Background refresh period, e.g. `"5m"`. `"0s"` disables the loop.
    pub refresh_interval: String,
    pub local_copy_path: Option<PathBuf>,
    /// Separator for the deprecated multi-address receiver form.
    pub address_delimiter: Option<String>,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/registry".to_string(),
            request_timeout: "30s".to_string(),
            refresh_interval: "5m".to_string(),
            local_copy_path: Some(PathBuf::from("data/registry-local-copy.json")),
            address_delimiter: Some("#".to_string()),
        }
    }
}

impl RegistrySection {
    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("registry.request_timeout", &self.request_timeout)
    }

    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration("registry.refresh_interval", &self.refresh_interval)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSection {
    /// 0 disables the forward deadline.
    pub forward_timeout_ms: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            forward_timeout_ms: 30_000,
        }
    }
}

impl DispatchSection {
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchySection {
    /// YAML or JSON map of `id -> [ancestors...]`.
    pub path: Option<PathBuf>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        self.registry.request_timeout()?;
        self.registry.refresh_interval()?;
        self.admission.validate()?;
        Ok(())
    }

    /// Applies `ROUTEGATE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(url) = var("REGISTRY_URL").filter(|value| !value.trim().is_empty()) {
            self.registry.base_url = url;
        }
        if let Some(path) = var("LOCAL_COPY_PATH") {
            self.registry.local_copy_path = Some(PathBuf::from(path));
        }
        if let Some(interval) = var("REFRESH_INTERVAL") {
            self.registry.refresh_interval = interval;
        }

        let admission = &mut self.admission;
        admission.max_inflight = env_parse(var("MAX_INFLIGHT"), admission.max_inflight);
        admission.resume_percent_of_max =
            env_parse(var("RESUME_PERCENT_OF_MAX"), admission.resume_percent_of_max);
        admission.sender.max_requests =
            env_parse(var("SENDER_MAX_REQUESTS"), admission.sender.max_requests);
        admission.sender.time_period_ms =
            env_parse(var("SENDER_TIME_PERIOD_MS"), admission.sender.time_period_ms);
        admission.sender.reject_execution =
            env_parse(var("SENDER_REJECT_EXECUTION"), admission.sender.reject_execution);

        self.dispatch.forward_timeout_ms =
            env_parse(var("FORWARD_TIMEOUT_MS"), self.dispatch.forward_timeout_ms);
    }
}

fn env_parse<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|_| ConfigError::Duration {
        field,
        value: value.to_string(),
    })
}
