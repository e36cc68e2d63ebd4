use crate::policy::JobOrdering;
use crate::types::Job;

/// Shortest job first. The sort is stable so equal bursts keep arrival order.
#[derive(Debug)]
pub struct Sjf;

impl JobOrdering for Sjf {
    fn order(&self, round: &mut [Job]) {
        round.sort_by_key(Job::execution_duration);
    }
}
