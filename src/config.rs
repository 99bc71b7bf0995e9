//! Runtime configuration: `scoutsec.toml` parsing and environment overrides.
//!
//! Load order (later wins):
//! 1. `Default` values
//! 2. TOML file (`--config scoutsec.toml`)
//! 3. Environment (`SCOUTSEC_TRANSPORT_RATE_PER_SECOND=20`)
//! 4. CLI flags, applied by the binary

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const MAX_RETRIES_LIMIT: u32 = 16;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoutConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub fuzz: FuzzConfig,
    #[serde(default)]
    pub master: MasterConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub signatures: SignatureConfig,
}

impl ScoutConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::ParseFailed {
                    reason: format!("{}: {}", path.display(), e),
                }
            }
        })?;
        Self::parse(&content)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })
    }

    pub fn apply_env_overrides(&mut self) {
        override_u32(&mut self.transport.rate_per_second, "SCOUTSEC_TRANSPORT_RATE_PER_SECOND");
        override_u32(&mut self.transport.max_retries, "SCOUTSEC_TRANSPORT_MAX_RETRIES");
        override_u64(&mut self.transport.base_backoff_ms, "SCOUTSEC_TRANSPORT_BASE_BACKOFF_MS");
        override_u64(&mut self.transport.timeout_secs, "SCOUTSEC_TRANSPORT_TIMEOUT_SECS");
        override_string(&mut self.transport.user_agent, "SCOUTSEC_TRANSPORT_USER_AGENT");

        override_usize(&mut self.fuzz.workers, "SCOUTSEC_FUZZ_WORKERS");
        override_usize(&mut self.fuzz.queue_capacity, "SCOUTSEC_FUZZ_QUEUE_CAPACITY");

        override_string(&mut self.master.bind, "SCOUTSEC_MASTER_BIND");
        override_opt_u64(&mut self.master.lease_secs, "SCOUTSEC_MASTER_LEASE_SECS");

        override_string(&mut self.worker.master_url, "SCOUTSEC_WORKER_MASTER_URL");
        override_u64(&mut self.worker.poll_interval_secs, "SCOUTSEC_WORKER_POLL_INTERVAL_SECS");
        override_u64(&mut self.worker.http_timeout_secs, "SCOUTSEC_WORKER_HTTP_TIMEOUT_SECS");
        if let Ok(id) = std::env::var("SCOUTSEC_WORKER_ID") {
            self.worker.worker_id = Some(id);
        }

        if let Ok(path) = std::env::var("SCOUTSEC_SIGNATURES_RULES_FILE") {
            self.signatures.rules_file = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.rate_per_second == 0 {
            return Err(ConfigError::invalid("transport.rate_per_second", "must be > 0"));
        }
        if self.transport.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::invalid(
                "transport.max_retries",
                format!("must be <= {}", MAX_RETRIES_LIMIT),
            ));
        }
        if self.transport.timeout_secs == 0 {
            return Err(ConfigError::invalid("transport.timeout_secs", "must be > 0"));
        }
        if self.fuzz.workers == 0 {
            return Err(ConfigError::invalid("fuzz.workers", "must be > 0"));
        }
        if self.fuzz.queue_capacity == 0 {
            return Err(ConfigError::invalid("fuzz.queue_capacity", "must be > 0"));
        }
        if self.master.lease_secs == Some(0) {
            return Err(ConfigError::invalid("master.lease_secs", "must be > 0 when set"));
        }
        if self.worker.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("worker.poll_interval_secs", "must be > 0"));
        }
        if self.worker.http_timeout_secs == 0 {
            return Err(ConfigError::invalid("worker.http_timeout_secs", "must be > 0"));
        }
        url::Url::parse(&self.worker.master_url)
            .map_err(|e| ConfigError::invalid("worker.master_url", e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub rate_per_second: u32,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 10,
            max_retries: 3,
            base_backoff_ms: 1000,
            timeout_secs: 10,
            user_agent: format!("ScoutSec/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    #[serde(skip)]
    pub show_progress: bool,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 256,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub bind: String,
    pub lease_secs: Option<u64>,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8090".to_string(),
            lease_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub master_url: String,
    pub poll_interval_secs: u64,
    pub http_timeout_secs: u64,
    pub worker_id: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            master_url: "http://localhost:8090".to_string(),
            poll_interval_secs: 5,
            http_timeout_secs: 10,
            worker_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub rules_file: Option<PathBuf>,
}

fn override_string(target: &mut String, var: &str) {
    if let Ok(val) = std::env::var(var) {
        *target = val;
    }
}

fn override_u32(target: &mut u32, var: &str) {
    if let Ok(val) = std::env::var(var) {
        match val.parse() {
            Ok(v) => *target = v,
            Err(_) => warn!(var = var, value = %val, "Ignoring non-numeric override"),
        }
    }
}

fn override_u64(target: &mut u64, var: &str) {
    if let Ok(val) = std::env::var(var) {
        match val.parse() {
            Ok(v) => *target = v,
            Err(_) => warn!(var = var, value = %val, "Ignoring non-numeric override"),
        }
    }
}

fn override_opt_u64(target: &mut Option<u64>, var: &str) {
    if let Ok(val) = std::env::var(var) {
        match val.parse() {
            Ok(v) => *target = Some(v),
            Err(_) => warn!(var = var, value = %val, "Ignoring non-numeric override"),
        }
    }
}

fn override_usize(target: &mut usize, var: &str) {
    if let Ok(val) = std::env::var(var) {
        match val.parse() {
            Ok(v) => *target = v,
            Err(_) => warn!(var = var, value = %val, "Ignoring non-numeric override"),
        }
    }
}
