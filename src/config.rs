//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, TurnstileError};

/// Prefix for environment variable overrides, e.g. `TURNSTILE_LIMITER__BURST=10`.
const ENV_PREFIX: &str = "TURNSTILE";

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-visitor limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
        }
    }
}

fn default_grpc_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

/// Rate limiting configuration shared by every visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Sustained refill rate per visitor, in tokens per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Maximum number of tokens a visitor's bucket may hold
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// How often the eviction task scans for idle visitors, in seconds
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,

    /// Idle time after which a visitor is forgotten, in seconds
    #[serde(default = "default_staleness_threshold")]
    pub staleness_threshold_secs: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            eviction_interval_secs: default_eviction_interval(),
            staleness_threshold_secs: default_staleness_threshold(),
        }
    }
}

fn default_requests_per_second() -> f64 {
    1.0
}

fn default_burst() -> u32 {
    3
}

fn default_eviction_interval() -> u64 {
    60
}

fn default_staleness_threshold() -> u64 {
    300
}

impl LimiterConfig {
    /// Create a configuration with the given rate and burst and default eviction timings.
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            requests_per_second,
            burst,
            ..Self::default()
        }
    }

    /// Check that the configuration describes a usable limiter.
    pub fn validate(&self) -> Result<()> {
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(TurnstileError::Config(format!(
                "requests_per_second must be a positive number, got {}",
                self.requests_per_second
            )));
        }
        if self.burst == 0 {
            return Err(TurnstileError::Config("burst must be at least 1".to_string()));
        }
        if self.eviction_interval_secs == 0 {
            return Err(TurnstileError::Config(
                "eviction_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.staleness_threshold_secs == 0 {
            return Err(TurnstileError::Config(
                "staleness_threshold_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_threshold_secs)
    }
}

impl TurnstileConfig {
    /// Load configuration from an optional YAML file, then apply `TURNSTILE_*` overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::with_name(path).format(config::FileFormat::Yaml),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: TurnstileConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TurnstileError::Config(e.to_string()))?;
        config.limiter.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TurnstileConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse config: {}", e)))?;
        config.limiter.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TurnstileConfig::default();
        assert_eq!(config.server.grpc_addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.limiter.requests_per_second, 1.0);
        assert_eq!(config.limiter.burst, 3);
        assert_eq!(config.limiter.eviction_interval(), Duration::from_secs(60));
        assert_eq!(config.limiter.staleness_threshold(), Duration::from_secs(300));
        assert!(config.limiter.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
limiter:
  requests_per_second: 2.5
  burst: 10
"#;
        let config = TurnstileConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.requests_per_second, 2.5);
        assert_eq!(config.limiter.burst, 10);
        assert_eq!(config.limiter.eviction_interval_secs, 60);
        assert_eq!(config.server.grpc_addr, default_grpc_addr());
    }

    #[test]
    fn test_parse_rejects_zero_burst() {
        let yaml = r#"
limiter:
  burst: 0
"#;
        let err = TurnstileConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, TurnstileError::Config(_)));
    }

    #[test]
    fn test_validate_rate() {
        assert!(LimiterConfig::new(0.0, 1).validate().is_err());
        assert!(LimiterConfig::new(-1.0, 1).validate().is_err());
        assert!(LimiterConfig::new(f64::NAN, 1).validate().is_err());
        assert!(LimiterConfig::new(f64::INFINITY, 1).validate().is_err());
        assert!(LimiterConfig::new(0.5, 1).validate().is_ok());
    }

    #[test]
    fn test_validate_eviction_timings() {
        let mut config = LimiterConfig::default();
        config.eviction_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = LimiterConfig::default();
        config.staleness_threshold_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let overrides: Vec<String> = std::env::vars()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with(ENV_PREFIX))
            .collect();
        for key in overrides {
            std::env::remove_var(key);
        }

        let config = TurnstileConfig::load(None).unwrap();
        assert_eq!(config.limiter, LimiterConfig::default());
    }
}
