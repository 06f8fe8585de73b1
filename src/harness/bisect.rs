//! Failure isolation
//!
//! A batch that fails, or whose output contains an unknown fingerprint,
//! cannot say which of its cases is responsible. Such a batch is split into
//! singletons which are resubmitted through the queue. Singletons are never
//! split again: a singleton failure is terminal and counted, a singleton
//! unknown fingerprint is only reported.

use crate::classify::Fingerprint;
use crate::error::SpawnError;
use crate::harness::queue::WorkItem;

/// What to do with a finished work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Multi-case batch with a failure or unknown fingerprint: rerun each case alone
    Bisect,
    /// Single case whose run failed
    Failed(SpawnError),
    /// Single case that ran cleanly but produced an unknown fingerprint
    Unknown(Fingerprint),
    /// Nothing to do
    Clean,
}

impl Verdict {
    /// Does this verdict count toward the run's failure total?
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Failed(_))
    }
}

/// Decide the fate of `item` given how its run went.
///
/// A failure and an unknown fingerprint are independent triggers; either one
/// bisects a multi-case batch.
pub fn judge(item: &WorkItem, failure: Option<&SpawnError>, unknown: Option<Fingerprint>) -> Verdict {
    if !item.is_singleton() && (failure.is_some() || unknown.is_some()) {
        return Verdict::Bisect;
    }

    match (failure, unknown) {
        (Some(error), _) => Verdict::Failed(error.clone()),
        (None, Some(fingerprint)) => Verdict::Unknown(fingerprint),
        (None, None) => Verdict::Clean,
    }
}
