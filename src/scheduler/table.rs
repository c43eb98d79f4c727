//! Registered schedules and minute-window evaluation.

use crate::backup::domain::{BackupPolicy, BackupPolicyId, CronSchedule, truncate_to_minute};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::HashMap;
use tracing::debug;

/// A policy that became due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    /// Policy to back up.
    pub policy_id: BackupPolicyId,
    /// Latest matching minute inside the evaluated window.
    pub fired_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Entry {
    schedule: CronSchedule,
    last_fired: Option<DateTime<Utc>>,
}

/// Table of schedulable policies.
#[derive(Debug, Clone)]
pub struct Scheduler {
    timezone: FixedOffset,
    max_catch_up: Duration,
    entries: HashMap<BackupPolicyId, Entry>,
    last_tick: Option<DateTime<Utc>>,
}

impl Scheduler {
    /// Creates an empty table evaluating cron in `timezone`.
    ///
    /// `max_catch_up_minutes` bounds how many elapsed minutes a single tick
    /// considers after a stall; zero is treated as one.
    #[must_use]
    pub fn new(timezone: FixedOffset, max_catch_up_minutes: u32) -> Self {
        Self {
            timezone,
            max_catch_up: Duration::minutes(i64::from(max_catch_up_minutes.max(1))),
            entries: HashMap::new(),
            last_tick: None,
        }
    }

    /// Adds or refreshes `policy`.
    ///
    /// Inactive or deleted policies are removed instead. A refreshed policy
    /// keeps its last fired minute, so re-registering inside a minute that
    /// already fired does not fire it again.
    pub fn register(&mut self, policy: &BackupPolicy) {
        if !policy.is_schedulable() {
            self.unregister(policy.id());
            return;
        }
        let schedule = policy.schedule().clone();
        self.entries
            .entry(policy.id())
            .and_modify(|entry| entry.schedule = schedule.clone())
            .or_insert(Entry {
                schedule,
                last_fired: None,
            });
    }

    /// Removes a policy; unknown ids are ignored.
    pub fn unregister(&mut self, policy_id: BackupPolicyId) {
        self.entries.remove(&policy_id);
    }

    /// Returns whether `policy_id` is registered.
    #[must_use]
    pub fn is_registered(&self, policy_id: BackupPolicyId) -> bool {
        self.entries.contains_key(&policy_id)
    }

    /// Returns the number of registered policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no policy is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the triggers due in the minutes since the previous tick,
    /// including the minute containing `now`.
    ///
    /// Every due policy appears at most once, even when several minutes of
    /// the window match, and never twice for the same minute across ticks.
    /// Results are ordered by policy id.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, TimeZone, Utc};
    /// use strongroom::scheduler::Scheduler;
    ///
    /// let utc = FixedOffset::east_opt(0).expect("zero offset");
    /// let mut scheduler = Scheduler::new(utc, 5);
    /// let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).single().expect("valid");
    /// assert!(scheduler.tick(now).is_empty());
    /// ```
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Trigger> {
        let end = truncate_to_minute(now);
        let start = self.window_start(end);
        self.last_tick = Some(self.last_tick.map_or(end, |previous| previous.max(end)));

        let mut due: Vec<Trigger> = self
            .entries
            .iter_mut()
            .filter_map(|(policy_id, entry)| {
                let fired_at = latest_match(&entry.schedule, start, end, &self.timezone)?;
                if entry.last_fired.is_some_and(|last| last >= fired_at) {
                    return None;
                }
                entry.last_fired = Some(fired_at);
                Some(Trigger {
                    policy_id: *policy_id,
                    fired_at,
                })
            })
            .collect();
        due.sort_by_key(|trigger| trigger.policy_id);

        debug!(
            window_start = %start,
            window_end = %end,
            registered = self.entries.len(),
            due = due.len(),
            "scheduler tick"
        );
        due
    }

    fn window_start(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        let earliest = end - self.max_catch_up + Duration::minutes(1);
        let Some(previous) = self.last_tick else {
            return end;
        };
        let after_previous = previous + Duration::minutes(1);
        if after_previous > end {
            return end;
        }
        after_previous.max(earliest)
    }
}

fn latest_match(
    schedule: &CronSchedule,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: &FixedOffset,
) -> Option<DateTime<Utc>> {
    let mut cursor = start - Duration::seconds(1);
    let mut latest = None;
    while let Some(next) = schedule.next_after(cursor, timezone) {
        if next > end {
            break;
        }
        latest = Some(next);
        cursor = next;
    }
    latest
}
