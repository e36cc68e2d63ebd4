use std::collections::HashMap;
use std::path::Path;

use config::{Environment, Source};
use lazy_static::lazy_static;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::Result;

static DEFAULT_CONFIG: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/default_config.toml"));

/// One `presets.<name>` table, merged on top of the current config
#[derive(Debug, Clone, serde::Deserialize)]
struct Preset(HashMap<String, config::Value>);

impl config::Source for Preset {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<HashMap<String, config::Value>, config::ConfigError> {
        let mut kv = self.0.clone();
        // presets cannot nest
        kv.remove("presets");
        Ok(kv)
    }
}

/// Layered configuration of the scheduler and its front ends
pub struct AppConfig(config::Config);

impl AppConfig {
    pub fn new() -> Self {
        Self(config::Config::new())
    }

    /// Merge the embedded defaults and `CSUBATCH_*` environment variables
    pub fn setup(&mut self) -> Result<&mut Self> {
        self.0
            .merge(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))?;

        // e.g. CSUBATCH_SESSION__QUEUE_CAPACITY=20
        self.0
            .merge(Environment::with_prefix("CSUBATCH").separator("__"))?;

        Ok(self)
    }

    /// Overlay a user config file, any format the `config` crate knows
    pub fn use_file(&mut self, path: &Path) -> Result<&mut Self> {
        self.0.merge(config::File::from(path))?;
        Ok(self)
    }

    /// Overlay the `presets.<name>` table, e.g. `quick` for short benchmark jobs
    pub fn use_preset(&mut self, name: &str) -> Result<&mut Self> {
        let preset: Preset = self.get(format!("presets.{}", name))?;
        self.0.merge(preset)?;
        Ok(self)
    }

    /// Typed value at a dotted key such as `session.queue_capacity`
    pub fn get<T, K>(&self, key: K) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        K: AsRef<str>,
    {
        Ok(self.0.get(key.as_ref())?)
    }

    /// The whole tree, used to dump the effective config
    pub fn fetch<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let t = self.0.clone().try_into()?;
        Ok(t)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref CONFIG: RwLock<AppConfig> = RwLock::new(AppConfig::new());
}

/// Load defaults and environment into the process-wide config
pub fn setup() -> Result<()> {
    config_mut().setup()?;
    Ok(())
}

/// Shared read access. Do not hold it across `config_mut`.
pub fn config() -> RwLockReadGuard<'static, AppConfig> {
    CONFIG.read()
}

pub fn config_mut() -> RwLockWriteGuard<'static, AppConfig> {
    CONFIG.write()
}

pub mod prelude {
    pub use super::{config, config_mut};
}
