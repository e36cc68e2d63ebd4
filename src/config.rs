use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::perf::PerfTestParams;
use crate::policy::SchedulingPolicy;
use crate::queue::DEFAULT_CAPACITY;
use crate::scheduler::DEFAULT_COLLECTION_WINDOW;
use crate::sink::FileSink;
use crate::utils::app_config::AppConfig;
use crate::utils::prelude::*;

/// Tunables of a [`Session`](crate::Session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub queue_capacity: usize,
    pub collection_window_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub policy: SchedulingPolicy,
}

impl SessionConfig {
    pub fn collection_window(&self) -> Duration {
        Duration::from_millis(self.collection_window_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            queue_capacity: DEFAULT_CAPACITY,
            collection_window_ms: DEFAULT_COLLECTION_WINDOW.as_millis() as u64,
            shutdown_timeout_ms: 5000,
            policy: SchedulingPolicy::Fcfs,
        }
    }
}

/// Location of the micro-benchmark log written in batch mode
#[derive(Debug, Clone, Deserialize)]
pub struct BatchLogConfig {
    pub directory: PathBuf,
    pub file: PathBuf,
}

impl BatchLogConfig {
    pub fn sink(&self) -> FileSink {
        FileSink::new(&self.directory, &self.file)
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputDir(PathBuf);

impl OutputDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OutputDir(path.into())
    }

    /// Path of `name` inside the directory, creating the directory if needed
    pub fn file(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        fs::create_dir_all(&self.0)?;
        Ok(self.0.join(name))
    }
}

pub trait AppConfigExt {
    fn session(&self) -> Result<SessionConfig>;
    fn batch_log(&self) -> Result<BatchLogConfig>;
    fn output_dir(&self) -> Result<OutputDir>;
    /// Benchmark defaults from the `perf` table
    fn perf_defaults(&self) -> Result<PerfTestParams>;
}

impl AppConfigExt for AppConfig {
    fn session(&self) -> Result<SessionConfig> {
        self.get("session")
    }

    fn batch_log(&self) -> Result<BatchLogConfig> {
        self.get("batch_log")
    }

    fn output_dir(&self) -> Result<OutputDir> {
        self.get("output_dir")
    }

    fn perf_defaults(&self) -> Result<PerfTestParams> {
        self.get("perf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> AppConfig {
        let mut config = AppConfig::new();
        config.setup().unwrap();
        config
    }

    #[test]
    fn embedded_defaults_match_code_defaults() {
        let session = default_config().session().unwrap();
        assert_eq!(session, SessionConfig::default());
        assert_eq!(session.collection_window(), DEFAULT_COLLECTION_WINDOW);
    }

    #[test]
    fn batch_log_and_perf_tables() {
        let config = default_config();
        let batch_log = config.batch_log().unwrap();
        assert_eq!(batch_log.file, PathBuf::from("micro_benchmarks.log"));

        let perf = config.perf_defaults().unwrap();
        assert_eq!(perf.job_count, 5);
        assert_eq!(perf.policy, SchedulingPolicy::Fcfs);
        assert_eq!(perf.min_cpu_time, Duration::from_secs(1));
        assert!(perf.seed.is_none());
        assert!(perf.validate().is_ok());
    }

    #[test]
    fn partial_session_table_uses_defaults() {
        let mut config = default_config();
        config.use_preset("quick").unwrap();
        let session = config.session().unwrap();
        assert_eq!(session.collection_window_ms, 10);
        assert_eq!(session.queue_capacity, DEFAULT_CAPACITY);
    }
}
