use std::sync::Arc;
use std::thread;

use chrono::Local;
use parking_lot::RwLock;
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::perf::PerformanceEvaluator;
use crate::queue::JobQueue;
use crate::sink::LogSink;
use crate::types::Job;
use crate::utils::prelude::*;
use crate::utils::signal::Signal;

/// Where the dispatcher reports job progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// progress lines on the console
    Interactive,
    /// start and completion lines in the batch log
    Batch,
    /// silent, for benchmark runs
    Perf,
}

impl Default for DispatchMode {
    fn default() -> Self {
        DispatchMode::Interactive
    }
}

/// The mode shared between the session and the dispatcher loop
pub type ModeCell = Arc<RwLock<DispatchMode>>;

/// Runs scheduled jobs one at a time, in queue order
pub struct Dispatcher {
    scheduled: Arc<JobQueue>,
    mode: ModeCell,
    evaluator: Option<Arc<PerformanceEvaluator>>,
    console: Arc<dyn LogSink>,
    batch_log: Arc<dyn LogSink>,
    stop: Arc<Signal>,
}

impl Dispatcher {
    pub fn new(
        scheduled: Arc<JobQueue>,
        mode: ModeCell,
        console: Arc<dyn LogSink>,
        batch_log: Arc<dyn LogSink>,
        stop: Arc<Signal>,
    ) -> Self {
        Dispatcher {
            scheduled,
            mode,
            evaluator: None,
            console,
            batch_log,
            stop,
        }
    }

    /// Report every completed job to `evaluator`
    pub fn with_evaluator(mut self, evaluator: Arc<PerformanceEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Run jobs until stopped, the queue is closed, or a sentinel arrives
    pub fn run(self) {
        let _g = info_span!("dispatcher").entered();
        info!("dispatcher started");

        loop {
            trace!(queued = self.scheduled.size(), "waiting for a job");
            let job = match self.scheduled.dequeue() {
                Ok(job) => job,
                Err(_) => break,
            };
            if self.stop.is_raised() {
                debug!(job = %job, "stopped, not running job");
                break;
            }
            if job.is_completed() {
                debug!("sentinel received");
                break;
            }

            let job = self.execute(job);
            if let Some(evaluator) = &self.evaluator {
                evaluator.record(&job);
            }
        }

        info!("dispatcher stopped");
    }

    /// Simulate the CPU burst of a job, recording its start and completion.
    /// Once started, a job always runs to the end of its burst.
    ///
    /// A job carrying its own mode is reported in that mode, the others in
    /// the dispatcher's current one.
    #[instrument(level = "debug", skip(self, job), fields(job = %job.name()))]
    pub fn execute(&self, mut job: Job) -> Job {
        let mode = job.mode().unwrap_or_else(|| *self.mode.read());

        job.mark_started(Local::now());
        match mode {
            DispatchMode::Interactive => self.report(&*self.console, format!("Dispatcher: executing job: {}", job.name())),
            DispatchMode::Batch => self.report(&*self.batch_log, format!("Job {} | Status: Started", job.name())),
            DispatchMode::Perf => {}
        }

        thread::sleep(job.execution_duration());
        job.mark_completed(Local::now());

        let ms = job.execution_duration().as_millis();
        match mode {
            DispatchMode::Interactive => self.report(
                &*self.console,
                format!("Dispatcher: job {} completed in {} ms", job.name(), ms),
            ),
            DispatchMode::Batch => self.report(
                &*self.batch_log,
                format!("Job {} | Status: Completed | Execution Duration: {} ms", job.name(), ms),
            ),
            DispatchMode::Perf => {}
        }
        debug!(%mode, ms = ms as u64, "job completed");

        job
    }

    fn report(&self, sink: &dyn LogSink, line: String) {
        if let Err(e) = sink.write_line(&line) {
            warn!(error = %e, %line, "failed to write job progress");
        }
    }
}
