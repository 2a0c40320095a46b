// src/sourcing/factory.rs
//! Platform registry: maps a free-text platform name to a fresh adapter.

use std::fmt;

use crate::sourcing::config::{DataMode, SourcingConfig};
use crate::sourcing::providers::{amazon, ebay, walmart, AdapterSettings, Mode};
use crate::sourcing::types::SourceAdapter;

type Ctor = Box<dyn Fn() -> Box<dyn SourceAdapter> + Send + Sync>;

/// Registry key for a user-supplied platform name.
pub fn normalize_platform(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Ordered registry of constructors. Registration order is the default
/// platform order used by the engine.
pub struct AdapterFactory {
    registry: Vec<(String, Ctor)>,
}

impl AdapterFactory {
    pub fn empty() -> Self {
        Self {
            registry: Vec::new(),
        }
    }

    /// Register (or replace) a platform. Constructors must not do I/O.
    pub fn register<F, A>(mut self, name: &str, ctor: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: SourceAdapter + 'static,
    {
        let key = normalize_platform(name);
        let boxed: Ctor = Box::new(move || Box::new(ctor()) as Box<dyn SourceAdapter>);
        match self.registry.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = boxed,
            None => self.registry.push((key, boxed)),
        }
        self
    }

    /// Built-in Amazon, Walmart and eBay adapters, skipping disabled ones.
    pub fn from_config(cfg: &SourcingConfig) -> Self {
        let mut factory = Self::empty();
        let builtins: [(&str, f64); 3] = [
            ("amazon", amazon::DEFAULT_RELIABILITY),
            ("walmart", walmart::DEFAULT_RELIABILITY),
            ("ebay", ebay::DEFAULT_RELIABILITY),
        ];
        for (key, default_reliability) in builtins {
            let pcfg = cfg.platform(key);
            if !pcfg.enabled {
                tracing::info!(platform = key, "platform disabled by config");
                continue;
            }
            let mode = match cfg.mode {
                DataMode::Mock => Mode::Mock,
                DataMode::Live => Mode::Http {
                    endpoint: pcfg.endpoint.clone().unwrap_or_default(),
                },
            };
            let settings = AdapterSettings::new(
                mode,
                pcfg.reliability.unwrap_or(default_reliability),
            )
            .with_max_results(cfg.max_results)
            .with_request_timeout(cfg.request_timeout());

            factory = match key {
                "amazon" => {
                    factory.register(key, move || amazon::AmazonAdapter::new(settings.clone()))
                }
                "walmart" => {
                    factory.register(key, move || walmart::WalmartAdapter::new(settings.clone()))
                }
                _ => factory.register(key, move || ebay::EbayAdapter::new(settings.clone())),
            };
        }
        factory
    }

    /// Fresh adapter for `platform` (case-insensitive), or `None` if unknown.
    pub fn create(&self, platform: &str) -> Option<Box<dyn SourceAdapter>> {
        let key = normalize_platform(platform);
        self.registry
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, ctor)| ctor())
    }

    pub fn supports(&self, platform: &str) -> bool {
        let key = normalize_platform(platform);
        self.registry.iter().any(|(k, _)| *k == key)
    }

    pub fn platforms(&self) -> Vec<String> {
        self.registry.iter().map(|(k, _)| k.clone()).collect()
    }
}

impl Default for AdapterFactory {
    fn default() -> Self {
        Self::from_config(&SourcingConfig::default())
    }
}

impl fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterFactory")
            .field("platforms", &self.platforms())
            .finish()
    }
}
