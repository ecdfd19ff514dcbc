use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Adaptive timeout parameters (`[timeouts]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout used until an endpoint has `min_samples` successful latencies.
    pub default_ms: u64,
    /// Lower clamp for the learned timeout.
    pub min_ms: u64,
    /// Upper clamp for the learned timeout.
    pub max_ms: u64,
    /// Samples required before the learned timeout replaces the default.
    pub min_samples: usize,
    /// Latency samples kept per endpoint (oldest dropped first).
    pub sample_capacity: usize,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: 15_000,
            min_ms: 3_000,
            max_ms: 30_000,
            min_samples: 5,
            sample_capacity: 100,
        }
    }
}

/// Transport retry parameters (`[retry]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff delay (jitter included).
    pub cap_delay_ms: u64,
    /// Jitter is drawn uniformly from `[0, jitter_ms)`.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            cap_delay_ms: 10_000,
            jitter_ms: 1_000,
        }
    }
}

/// Result cache parameters (`[cache]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries accessed within this window earn a recency bonus.
    pub recency_window_secs: u64,
    /// A sweep never shrinks the cache below this many entries.
    pub min_keep: usize,
    /// Share of entries (percent, rounded up) a sweep keeps.
    pub keep_percent: u8,
    /// Persisted results older than this are ignored and trimmed.
    pub ttl_secs: u64,
    /// Interval of the background maintenance task.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            recency_window_secs: 24 * 60 * 60,
            min_keep: 10,
            keep_percent: 80,
            ttl_secs: 7 * 24 * 60 * 60,
            sweep_interval_secs: 60 * 60,
        }
    }
}

/// Error recovery parameters (`[recovery]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Recovery attempts per (error type, request) before giving up.
    pub max_retries: u32,
    /// Pause before retrying after a network failure.
    pub network_wait_ms: u64,
    /// Pause before retrying after the backend rate-limited us.
    pub rate_limit_wait_ms: u64,
    /// Diagnostic error records kept for health reporting.
    pub history_capacity: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            network_wait_ms: 1_000,
            rate_limit_wait_ms: 5_000,
            history_capacity: 100,
        }
    }
}

/// Risk score thresholds (`[thresholds]`). Requires `safe_max < caution_max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub safe_max: f64,
    pub caution_max: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            safe_max: 0.3,
            caution_max: 0.6,
        }
    }
}

/// Pipeline behaviour (`[pipeline]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items classified concurrently per batch chunk.
    pub batch_size: usize,
    /// When the fingerprint backend is unreachable, report the item as safe
    /// (true) or as caution (false). Either way the error is attached.
    pub fail_open: bool,
    /// Endpoint latency histories idle for longer than this are dropped.
    pub stale_history_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            fail_open: true,
            stale_history_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// One remote classification backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEndpoint {
    /// Display name used in logs.
    pub name: String,
    /// Base URL, e.g. `https://hashlookup.example.com/v1/`.
    pub url: String,
    /// Optional bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Configured backends (`[backends]`). Deep-analysis providers are tried in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub fingerprint: Option<BackendEndpoint>,
    pub deep: Vec<BackendEndpoint>,
}

/// Global configuration loaded from `~/.config/imgshield/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub recovery: RecoveryConfig,
    pub thresholds: ThresholdConfig,
    pub pipeline: PipelineConfig,
    pub backends: BackendsConfig,
}

impl ShieldConfig {
    /// Reject settings the components cannot honour.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if !(0.0..=1.0).contains(&t.safe_max) || !(0.0..=1.0).contains(&t.caution_max) {
            bail!(
                "thresholds must lie in [0, 1] (safe_max = {}, caution_max = {})",
                t.safe_max,
                t.caution_max
            );
        }
        if t.safe_max >= t.caution_max {
            bail!(
                "thresholds.safe_max ({}) must be lower than thresholds.caution_max ({})",
                t.safe_max,
                t.caution_max
            );
        }
        if self.timeouts.min_ms > self.timeouts.max_ms {
            bail!(
                "timeouts.min_ms ({}) must not exceed timeouts.max_ms ({})",
                self.timeouts.min_ms,
                self.timeouts.max_ms
            );
        }
        let tm = &self.timeouts;
        if tm.default_ms < tm.min_ms || tm.default_ms > tm.max_ms {
            bail!(
                "timeouts.default_ms ({}) must lie within [timeouts.min_ms, timeouts.max_ms] ([{}, {}])",
                tm.default_ms,
                tm.min_ms,
                tm.max_ms
            );
        }
        if self.timeouts.sample_capacity == 0 {
            bail!("timeouts.sample_capacity must be at least 1");
        }
        if self.cache.keep_percent == 0 || self.cache.keep_percent > 100 {
            bail!(
                "cache.keep_percent must be between 1 and 100 (got {})",
                self.cache.keep_percent
            );
        }
        if self.cache.sweep_interval_secs == 0 {
            bail!("cache.sweep_interval_secs must be at least 1");
        }
        if self.pipeline.batch_size == 0 {
            bail!("pipeline.batch_size must be at least 1");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imgshield")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load and validate configuration from a specific file.
pub fn load_from_path(path: &Path) -> Result<ShieldConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: ShieldConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ShieldConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ShieldConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let cfg = ShieldConfig::default();
        assert_eq!(cfg.timeouts.default_ms, 15_000);
        assert_eq!(cfg.timeouts.min_ms, 3_000);
        assert_eq!(cfg.timeouts.max_ms, 30_000);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.retry.cap_delay_ms, 10_000);
        assert_eq!(cfg.cache.min_keep, 10);
        assert_eq!(cfg.cache.keep_percent, 80);
        assert_eq!(cfg.recovery.history_capacity, 100);
        assert_eq!(cfg.pipeline.batch_size, 5);
        assert!(cfg.pipeline.fail_open);
        assert!(cfg.backends.fingerprint.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ShieldConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ShieldConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.timeouts.max_ms, cfg.timeouts.max_ms);
        assert_eq!(parsed.cache.ttl_secs, cfg.cache.ttl_secs);
        assert!((parsed.thresholds.safe_max - cfg.thresholds.safe_max).abs() < 1e-9);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml = r#"
            [retry]
            max_retries = 5

            [thresholds]
            safe_max = 0.2
            caution_max = 0.7
        "#;
        let cfg: ShieldConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.retry.base_delay_ms, 1_000);
        assert!((cfg.thresholds.caution_max - 0.7).abs() < 1e-9);
        assert_eq!(cfg.timeouts.default_ms, 15_000);
        cfg.validate().unwrap();
    }

    #[test]
    fn config_toml_backends() {
        let toml = r#"
            [backends.fingerprint]
            name = "hashlookup"
            url = "https://hash.example.com/v1/"

            [[backends.deep]]
            name = "vision-a"
            url = "https://vision-a.example.com/"
            api_key = "secret"

            [[backends.deep]]
            name = "vision-b"
            url = "https://vision-b.example.com/"
        "#;
        let cfg: ShieldConfig = toml::from_str(toml).unwrap();
        let fp = cfg.backends.fingerprint.as_ref().unwrap();
        assert_eq!(fp.name, "hashlookup");
        assert!(fp.api_key.is_none());
        assert_eq!(cfg.backends.deep.len(), 2);
        assert_eq!(cfg.backends.deep[0].api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        let mut cfg = ShieldConfig::default();
        cfg.thresholds.safe_max = 0.6;
        cfg.thresholds.caution_max = 0.6;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("safe_max"));
    }

    #[test]
    fn validate_rejects_inverted_timeouts_and_zero_batch() {
        let mut cfg = ShieldConfig::default();
        cfg.timeouts.min_ms = 40_000;
        assert!(cfg.validate().is_err());

        let mut cfg = ShieldConfig::default();
        cfg.pipeline.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_default_timeout_outside_clamp() {
        let mut cfg = ShieldConfig::default();
        cfg.timeouts.default_ms = 60_000;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("timeouts.default_ms"));

        cfg.timeouts.default_ms = 1_000;
        assert!(cfg.validate().is_err());

        cfg.timeouts.default_ms = cfg.timeouts.max_ms;
        cfg.validate().unwrap();
    }

    #[test]
    fn load_from_path_reports_invalid_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[thresholds]\nsafe_max = 0.9\ncaution_max = 0.1").unwrap();
        f.flush().unwrap();
        let err = load_from_path(f.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid config"));
    }
}
