use crate::policy::JobOrdering;
use crate::types::Job;

/// Lowest priority value first, arrival order among equals
#[derive(Debug)]
pub struct Priority;

impl JobOrdering for Priority {
    fn order(&self, round: &mut [Job]) {
        round.sort_by_key(Job::priority);
    }
}
