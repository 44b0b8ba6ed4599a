use crate::state::partition::PartitionKind;
use crate::state::scheduler::RefreshOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshRequest {
    /// Periodic wake-up: refresh whatever has gone stale.
    Tick,
    Refresh { partitions: Vec<PartitionKind>, force: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshResponse {
    Completed { outcomes: Vec<(PartitionKind, RefreshOutcome)> },
}
