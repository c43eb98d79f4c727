//! Pure selection of prunable backup runs.

use crate::backup::domain::Retention;
use crate::run::domain::Run;
use std::cmp::Ordering;

/// Returns the successful backup runs that fall outside the retention
/// window, newest first.
///
/// Runs are ranked by `completed_at` descending, ties broken by `started_at`
/// descending and then by run ID descending. Runs that are not successful
/// backups are ignored entirely.
#[must_use]
pub fn select_for_pruning(runs: &[Run], retention: Retention) -> Vec<&Run> {
    let mut successes: Vec<&Run> = runs.iter().filter(|run| run.is_successful_backup()).collect();
    successes.sort_by(|left, right| newest_first(left, right));
    successes.into_iter().skip(retention.slots()).collect()
}

fn newest_first(left: &Run, right: &Run) -> Ordering {
    right
        .completed_at()
        .cmp(&left.completed_at())
        .then_with(|| right.started_at().cmp(&left.started_at()))
        .then_with(|| right.id().cmp(&left.id()))
}
