// src/sourcing/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SOURCING_CONFIG_PATH: &str = "config/sourcing.toml";

pub const ENV_SOURCING_CONFIG_PATH: &str = "SOURCING_CONFIG_PATH";
pub const ENV_ADAPTER_TIMEOUT_MS: &str = "SOURCING_ADAPTER_TIMEOUT_MS";
pub const ENV_SOURCING_MODE: &str = "SOURCING_MODE";

fn default_adapter_timeout_ms() -> u64 {
    15_000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_max_results() -> usize {
    5
}
fn default_enabled() -> bool {
    true
}

/// Where the built-in adapters get their listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Mock,
    Live,
}

impl DataMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Some(DataMode::Mock),
            "live" => Some(DataMode::Live),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformCfg {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the adapter's built-in reliability score.
    pub reliability: Option<f64>,
    /// JSON search endpoint used in live mode.
    pub endpoint: Option<String>,
}

impl Default for PlatformCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            reliability: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcingConfig {
    #[serde(default)]
    pub mode: DataMode,
    /// Upper bound for one adapter's whole search, in milliseconds.
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    /// Per-request HTTP timeout inside live adapters.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Keyed by lowercase platform name ("amazon", "walmart", "ebay").
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformCfg>,
}

impl Default for SourcingConfig {
    fn default() -> Self {
        Self {
            mode: DataMode::default(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_results: default_max_results(),
            platforms: BTreeMap::new(),
        }
    }
}

impl SourcingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: SourcingConfig = toml::from_str(s).context("parsing sourcing config")?;
        cfg.platforms = std::mem::take(&mut cfg.platforms)
            .into_iter()
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
            .collect();
        if cfg.adapter_timeout_ms == 0 {
            cfg.adapter_timeout_ms = default_adapter_timeout_ms();
        }
        if cfg.max_results == 0 {
            cfg.max_results = default_max_results();
        }
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sourcing config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve config with env + fallbacks:
    /// 1) $SOURCING_CONFIG_PATH (must exist)
    /// 2) config/sourcing.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied last.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_SOURCING_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_SOURCING_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_SOURCING_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(ms) = std::env::var(ENV_ADAPTER_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            self.adapter_timeout_ms = ms;
        }
        if let Ok(v) = std::env::var(ENV_SOURCING_MODE) {
            match DataMode::parse(&v) {
                Some(m) => self.mode = m,
                None => tracing::warn!(value = %v, "ignoring unknown {ENV_SOURCING_MODE}"),
            }
        }
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Settings for one platform; unknown keys get the defaults.
    pub fn platform(&self, name: &str) -> PlatformCfg {
        self.platforms
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg = SourcingConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.mode, DataMode::Mock);
        assert_eq!(cfg.adapter_timeout_ms, 15_000);
        assert_eq!(cfg.max_results, 5);
        assert!(cfg.platform("amazon").enabled);
    }

    #[test]
    fn platform_keys_are_case_insensitive() {
        let cfg = SourcingConfig::from_toml_str(
            r#"
mode = "live"
max_results = 0

[platforms.eBay]
enabled = false
reliability = 3.1
endpoint = "http://127.0.0.1:9/ebay"
"#,
        )
        .unwrap();
        assert_eq!(cfg.mode, DataMode::Live);
        assert_eq!(cfg.max_results, 5);
        let e = cfg.platform("EBAY");
        assert!(!e.enabled);
        assert_eq!(e.reliability, Some(3.1));
    }

    #[test]
    fn bad_mode_is_an_error() {
        assert!(SourcingConfig::from_toml_str(r#"mode = "turbo""#).is_err());
    }

    /// Puts cwd back and clears the sourcing env vars, even on a failed assert.
    struct ProcessStateGuard {
        cwd: PathBuf,
    }

    impl ProcessStateGuard {
        fn enter(dir: &Path) -> Self {
            let cwd = env::current_dir().unwrap();
            env::set_current_dir(dir).unwrap();
            clear_sourcing_env();
            Self { cwd }
        }
    }

    impl Drop for ProcessStateGuard {
        fn drop(&mut self) {
            clear_sourcing_env();
            let _ = env::set_current_dir(&self.cwd);
        }
    }

    fn clear_sourcing_env() {
        env::remove_var(ENV_SOURCING_CONFIG_PATH);
        env::remove_var(ENV_ADAPTER_TIMEOUT_MS);
        env::remove_var(ENV_SOURCING_MODE);
    }

    #[serial_test::serial]
    #[test]
    fn env_path_then_fallbacks_then_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let _state = ProcessStateGuard::enter(tmp.path());

        // nothing on disk -> defaults
        let cfg = SourcingConfig::load_default().unwrap();
        assert_eq!(cfg.adapter_timeout_ms, 15_000);

        // ./config/sourcing.toml
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join(DEFAULT_SOURCING_CONFIG_PATH),
            "adapter_timeout_ms = 2500",
        )
        .unwrap();
        assert_eq!(SourcingConfig::load_default().unwrap().adapter_timeout_ms, 2500);

        // explicit path wins, env overrides win over file
        let p = tmp.path().join("other.toml");
        fs::write(&p, "adapter_timeout_ms = 700\nmode = \"mock\"").unwrap();
        env::set_var(ENV_SOURCING_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_SOURCING_MODE, "LIVE");
        let cfg = SourcingConfig::load_default().unwrap();
        assert_eq!(cfg.adapter_timeout_ms, 700);
        assert_eq!(cfg.mode, DataMode::Live);

        env::set_var(ENV_ADAPTER_TIMEOUT_MS, "90");
        assert_eq!(SourcingConfig::load_default().unwrap().adapter_timeout_ms, 90);

        // explicit path that does not exist is an error
        env::set_var(ENV_SOURCING_CONFIG_PATH, tmp.path().join("nope.toml"));
        assert!(SourcingConfig::load_default().is_err());
    }
}
