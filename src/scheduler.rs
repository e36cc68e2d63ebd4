use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::policy::SchedulingPolicy;
use crate::queue::JobQueue;
use crate::utils::prelude::*;
use crate::utils::signal::Signal;

/// Default time a round stays open for near-simultaneous submissions
pub const DEFAULT_COLLECTION_WINDOW: Duration = Duration::from_millis(100);

/// The policy shared between the session and the scheduler loop
pub type PolicyCell = Arc<RwLock<SchedulingPolicy>>;

/// Moves jobs from the incoming queue to the scheduled queue, one round at a
/// time, reordering each round by the current policy.
#[derive(Debug)]
pub struct Scheduler {
    incoming: Arc<JobQueue>,
    scheduled: Arc<JobQueue>,
    policy: PolicyCell,
    window: Duration,
    stop: Arc<Signal>,
}

impl Scheduler {
    pub fn new(
        incoming: Arc<JobQueue>,
        scheduled: Arc<JobQueue>,
        policy: PolicyCell,
        window: Duration,
        stop: Arc<Signal>,
    ) -> Self {
        Scheduler {
            incoming,
            scheduled,
            policy,
            window,
            stop,
        }
    }

    /// Run rounds until stopped or a queue is closed
    pub fn run(self) {
        let _g = info_span!("scheduler").entered();
        info!(window_ms = self.window.as_millis() as u64, "scheduler started");

        while !self.stop.is_raised() {
            match self.run_round() {
                Ok(n) => debug!(jobs = n, "round scheduled"),
                Err(e) if e.is_shutdown() => break,
                Err(e) => {
                    error!(error = %e, "scheduler loop failed");
                    break;
                }
            }
        }

        info!("scheduler stopped");
    }

    /// One round: wait for a first job, let the window collect more, order
    /// them and forward them. Returns the number of jobs forwarded.
    pub fn run_round(&self) -> Result<usize> {
        let first = self.incoming.dequeue()?;

        if self.stop.wait_timeout(self.window) {
            warn!(job = %first, "shutdown during the collection window, job dropped");
            return Err(Error::Stopped);
        }

        let mut round = vec![first];
        round.extend(self.incoming.drain_all());

        let policy = *self.policy.read();
        policy.order(&mut round);
        debug!(%policy, jobs = round.len(), "ordered round");

        let n = round.len();
        let mut round = round.into_iter();
        while let Some(job) = round.next() {
            trace!(job = %job, "forwarding");
            if let Err(e) = self.scheduled.enqueue(job) {
                warn!(dropped = round.len() + 1, "scheduled queue closed mid-round");
                return Err(e);
            }
        }
        Ok(n)
    }
}
