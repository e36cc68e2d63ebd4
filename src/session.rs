use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand_seeder::{Seeder, SipRng};

use crate::config::SessionConfig;
use crate::dispatcher::{DispatchMode, Dispatcher, ModeCell};
use crate::perf::{MetricsSnapshot, PerfReport, PerfTestParams, PerformanceEvaluator};
use crate::policy::SchedulingPolicy;
use crate::queue::JobQueue;
use crate::scheduler::{PolicyCell, Scheduler};
use crate::sink::LogSink;
use crate::types::{Job, JobInfo};
use crate::utils::prelude::*;
use crate::utils::signal::{RaiseOnDrop, Signal};

/// A background thread and the signal it raises when it ends
struct Worker {
    name: &'static str,
    handle: JoinHandle<()>,
    exited: Arc<Signal>,
}

impl Worker {
    fn spawn<F>(name: &'static str, f: F) -> Result<Worker>
    where
        F: FnOnce() + Send + 'static,
    {
        let exited = Arc::new(Signal::new());
        let guard = RaiseOnDrop(exited.clone());
        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            let _guard = guard;
            f()
        })?;
        Ok(Worker { name, handle, exited })
    }

    fn join_until(self, deadline: Instant) {
        if !self.exited.wait_until(deadline) {
            warn!(worker = self.name, "worker did not stop in time, detaching it");
            return;
        }
        if self.handle.join().is_err() {
            error!(worker = self.name, "worker panicked");
        }
    }
}

/// One running scheduler: both queues, the scheduler and dispatcher threads,
/// and the evaluator fed by the dispatcher.
///
/// All operations take `&self`, so a session can be shared between
/// submitting threads behind an `Arc`. Dropping the session stops it.
pub struct Session {
    config: SessionConfig,
    incoming: Arc<JobQueue>,
    scheduled: Arc<JobQueue>,
    policy: PolicyCell,
    mode: ModeCell,
    evaluator: Arc<PerformanceEvaluator>,
    stop: Arc<Signal>,
    workers: Mutex<Vec<Worker>>,
    perf_runs: AtomicU64,
}

impl Session {
    /// Create the queues and start the scheduler and dispatcher threads
    pub fn start(config: SessionConfig, console: Arc<dyn LogSink>, batch_log: Arc<dyn LogSink>) -> Result<Session> {
        let incoming = Arc::new(JobQueue::new("incoming", config.queue_capacity));
        let scheduled = Arc::new(JobQueue::new("scheduled", config.queue_capacity));
        let policy: PolicyCell = Arc::new(RwLock::new(config.policy));
        let mode: ModeCell = Arc::new(RwLock::new(DispatchMode::Interactive));
        let evaluator = Arc::new(PerformanceEvaluator::new());
        let stop = Arc::new(Signal::new());

        let session = Session {
            incoming: incoming.clone(),
            scheduled: scheduled.clone(),
            policy: policy.clone(),
            mode: mode.clone(),
            evaluator: evaluator.clone(),
            stop: stop.clone(),
            workers: Mutex::new(vec![]),
            perf_runs: AtomicU64::new(0),
            config,
        };

        let scheduler = Scheduler::new(
            incoming,
            scheduled.clone(),
            policy,
            session.config.collection_window(),
            stop.clone(),
        );
        let dispatcher = Dispatcher::new(scheduled, mode, console, batch_log, stop).with_evaluator(evaluator);

        // if spawning fails the session is dropped, which stops what did start
        session.workers.lock().push(Worker::spawn("scheduler", move || scheduler.run())?);
        session.workers.lock().push(Worker::spawn("dispatcher", move || dispatcher.run())?);

        info!(
            capacity = session.config.queue_capacity,
            policy = %session.config.policy,
            "session started"
        );
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Hand a job to the scheduler. Blocks while the incoming queue is full.
    #[instrument(level = "debug", skip(self, job), fields(job = %job))]
    pub fn submit(&self, job: Job) -> Result<()> {
        if self.stop.is_raised() {
            return Err(Error::Stopped);
        }
        self.incoming.enqueue(job)
    }

    /// Submit a micro-benchmark job. Only this job is reported to the batch
    /// log, later submissions keep the dispatcher's mode.
    pub fn submit_batch_job(&self, job: Job) -> Result<()> {
        self.submit(job.with_mode(DispatchMode::Batch))
    }

    /// Jobs waiting for the scheduler, in arrival order
    pub fn list(&self) -> Vec<JobInfo> {
        self.incoming.list()
    }

    /// Jobs already ordered and waiting for the dispatcher
    pub fn list_scheduled(&self) -> Vec<JobInfo> {
        self.scheduled.list()
    }

    pub fn policy(&self) -> SchedulingPolicy {
        *self.policy.read()
    }

    /// Takes effect from the next scheduling round
    pub fn set_policy(&self, policy: SchedulingPolicy) {
        let previous = std::mem::replace(&mut *self.policy.write(), policy);
        if previous != policy {
            info!(%previous, %policy, "policy changed");
        }
    }

    /// Parse and apply a policy name. The current policy is kept on error.
    pub fn change_policy(&self, name: &str) -> Result<SchedulingPolicy> {
        let policy = name.parse()?;
        self.set_policy(policy);
        Ok(policy)
    }

    pub fn mode(&self) -> DispatchMode {
        *self.mode.read()
    }

    /// Mode for jobs that do not carry their own. Takes effect from the next
    /// dispatched job.
    pub fn set_mode(&self, mode: DispatchMode) -> DispatchMode {
        std::mem::replace(&mut *self.mode.write(), mode)
    }

    /// Metrics over every job completed so far
    pub fn metrics(&self) -> MetricsSnapshot {
        self.evaluator.metrics()
    }

    pub fn evaluator(&self) -> &Arc<PerformanceEvaluator> {
        &self.evaluator
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_raised()
    }

    /// Generate a benchmark load, push it through the pipeline and report on it.
    ///
    /// The generated jobs are tagged with a fresh run id and run silently. The
    /// report covers exactly those jobs, so jobs submitted before or during the
    /// run are executed as usual but left out of it.
    pub fn run_perf_test(&self, params: &PerfTestParams) -> Result<PerfReport> {
        params.validate()?;
        let seed = params
            .seed
            .clone()
            .unwrap_or_else(|| rand::thread_rng().gen::<u64>().to_string());
        let run = self.perf_runs.fetch_add(1, Ordering::Relaxed) + 1;
        let _g = info_span!("perf_test", name = %params.name, run, %seed).entered();

        self.set_policy(params.policy);

        let mut rng: SipRng = Seeder::from(seed.as_str()).make_rng();
        for job in params.synthesize(&mut rng) {
            debug!(job = %job, "submitting synthetic job");
            self.submit(job.for_perf_run(run))?;
        }
        if !self.evaluator.wait_for_run(run, params.job_count) {
            return Err(Error::Stopped);
        }

        let jobs = self.evaluator.run_records(run);
        let metrics = MetricsSnapshot::from_records(&jobs);
        info!(completed = metrics.completed, throughput = metrics.throughput, "perf test done");

        Ok(PerfReport {
            params: params.clone(),
            seed,
            metrics,
            jobs,
        })
    }

    /// Stop both workers and return the final metrics.
    ///
    /// Blocked submitters and benchmark runs return with an error. A job that
    /// is already executing finishes first, as long as it does so within the
    /// shutdown timeout. Calling it again is harmless.
    pub fn stop(&self) -> MetricsSnapshot {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        if !workers.is_empty() {
            info!(
                pending = self.incoming.size(),
                scheduled = self.scheduled.size(),
                "stopping session"
            );
        }

        self.stop.raise();
        self.incoming.close();
        self.scheduled.close();
        self.evaluator.cancel();

        let deadline = Instant::now() + self.config.shutdown_timeout();
        for worker in workers {
            worker.join_until(deadline);
        }

        self.evaluator.metrics()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::time::Duration;

    fn quick_config() -> SessionConfig {
        SessionConfig {
            collection_window_ms: 20,
            shutdown_timeout_ms: 2000,
            ..Default::default()
        }
    }

    fn session() -> (Session, Arc<MemorySink>) {
        let console = Arc::new(MemorySink::new());
        let session = Session::start(quick_config(), console.clone(), Arc::new(MemorySink::new())).unwrap();
        (session, console)
    }

    #[test]
    fn submitted_job_runs() {
        let (session, console) = session();
        session.submit(Job::new("hello", 1, Duration::from_millis(10))).unwrap();
        assert!(session.evaluator().wait_for_completed(1));

        let m = session.stop();
        assert_eq!(m.completed, 1);
        assert!(console
            .lines()
            .contains(&"Dispatcher: executing job: hello".to_owned()));
    }

    #[test]
    fn unsupported_policy_keeps_current() {
        let (session, _) = session();
        session.set_policy(SchedulingPolicy::Sjf);
        assert!(matches!(
            session.change_policy("lottery"),
            Err(Error::UnsupportedPolicy(_))
        ));
        assert_eq!(session.policy(), SchedulingPolicy::Sjf);

        assert_eq!(session.change_policy("priority").unwrap(), SchedulingPolicy::Priority);
        assert_eq!(session.policy(), SchedulingPolicy::Priority);
    }

    #[test]
    fn submit_after_stop_fails() {
        let (session, _) = session();
        session.stop();
        assert!(session.is_stopped());
        assert!(matches!(
            session.submit(Job::new("late", 1, Duration::from_millis(1))),
            Err(Error::Stopped)
        ));
        // stopping twice is fine
        assert_eq!(session.stop().completed, 0);
    }

    #[test]
    fn stop_is_prompt_when_idle() {
        let (session, _) = session();
        let start = Instant::now();
        session.stop();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn batch_job_goes_to_the_batch_log_only() {
        let console = Arc::new(MemorySink::new());
        let batch_log = Arc::new(MemorySink::new());
        let session = Session::start(quick_config(), console.clone(), batch_log.clone()).unwrap();
        session
            .submit_batch_job(Job::new("batch_job", 1, Duration::from_millis(5)))
            .unwrap();
        assert!(session.evaluator().wait_for_completed(1));

        // the next plain job is back on the console
        assert_eq!(session.mode(), DispatchMode::Interactive);
        session.submit(Job::new("after", 1, Duration::from_millis(5))).unwrap();
        assert!(session.evaluator().wait_for_completed(2));
        session.stop();

        assert_eq!(
            batch_log.lines(),
            vec![
                "Job batch_job | Status: Started",
                "Job batch_job | Status: Completed | Execution Duration: 5 ms"
            ]
        );
        assert_eq!(
            console.lines(),
            vec!["Dispatcher: executing job: after", "Dispatcher: job after completed in 5 ms"]
        );
    }

    #[test]
    fn session_mode_applies_to_plain_jobs() {
        let batch_log = Arc::new(MemorySink::new());
        let session = Session::start(quick_config(), Arc::new(MemorySink::new()), batch_log.clone()).unwrap();
        assert_eq!(session.set_mode(DispatchMode::Batch), DispatchMode::Interactive);
        session.submit(Job::new("logged", 1, Duration::from_millis(1))).unwrap();
        assert!(session.evaluator().wait_for_completed(1));
        assert_eq!(batch_log.lines().len(), 2);
    }

    #[test]
    fn perf_report_leaves_out_earlier_jobs() {
        let (session, console) = session();
        session.submit(Job::new("interactive_a", 1, Duration::from_millis(60))).unwrap();
        session.submit(Job::new("interactive_b", 1, Duration::from_millis(60))).unwrap();

        let params = PerfTestParams {
            name: "bench".into(),
            policy: SchedulingPolicy::Fcfs,
            job_count: 3,
            priority_levels: 2,
            min_cpu_time: Duration::from_millis(5),
            max_cpu_time: Duration::from_millis(10),
            seed: Some("mixed".into()),
        };
        let report = session.run_perf_test(&params).unwrap();

        let names: Vec<_> = report.jobs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["bench_1", "bench_2", "bench_3"]);
        assert_eq!(report.metrics.completed, 3);
        // the shell jobs still ran and printed, the benchmark did not
        assert_eq!(session.stop().completed, 5);
        assert!(console.lines().iter().all(|line| !line.contains("bench_")));
        assert!(console.lines().iter().any(|line| line.contains("interactive_b")));
    }

    #[test]
    fn back_to_back_perf_runs_are_separate() {
        let (session, _) = session();
        let params = PerfTestParams {
            name: "again".into(),
            policy: SchedulingPolicy::Sjf,
            job_count: 2,
            priority_levels: 1,
            min_cpu_time: Duration::from_millis(1),
            max_cpu_time: Duration::from_millis(3),
            seed: Some("twice".into()),
        };
        let first = session.run_perf_test(&params).unwrap();
        let second = session.run_perf_test(&params).unwrap();
        assert_eq!(first.jobs.len(), 2);
        assert_eq!(second.jobs.len(), 2);
        assert!(second.jobs[0].arrival >= first.jobs[1].finished);
    }

    #[test]
    fn invalid_perf_params_are_rejected() {
        let (session, _) = session();
        let params = PerfTestParams {
            name: "bad".into(),
            policy: SchedulingPolicy::Fcfs,
            job_count: 3,
            priority_levels: 0,
            min_cpu_time: Duration::from_millis(1),
            max_cpu_time: Duration::from_millis(2),
            seed: None,
        };
        assert!(matches!(session.run_perf_test(&params), Err(Error::InvalidPerfParams(_))));
        // nothing was touched
        assert_eq!(session.mode(), DispatchMode::Interactive);
    }
}
