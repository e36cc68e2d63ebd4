//! A single-node batch job scheduler.
//!
//! Jobs are submitted to a [`Session`], collected into rounds by the
//! scheduler thread, ordered by the active [`SchedulingPolicy`] and run one at
//! a time by the dispatcher thread. Completed jobs feed a
//! [`PerformanceEvaluator`] that reports response, wait and turnaround times
//! and throughput.
//!
//! ```text
//! submit -> incoming JobQueue -> Scheduler (round + policy)
//!        -> scheduled JobQueue -> Dispatcher -> PerformanceEvaluator
//! ```

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod output;
pub mod perf;
pub mod policy;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod types;
pub mod utils;

pub use crate::config::SessionConfig;
pub use crate::dispatcher::{DispatchMode, Dispatcher};
pub use crate::perf::{JobRecord, MetricsSnapshot, PerfReport, PerfTestParams, PerformanceEvaluator};
pub use crate::policy::SchedulingPolicy;
pub use crate::queue::JobQueue;
pub use crate::scheduler::Scheduler;
pub use crate::session::Session;
pub use crate::types::{Job, JobInfo};
pub use crate::utils::prelude::{Error, Result};
