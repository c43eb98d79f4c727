//! Cron evaluation and trigger emission.
//!
//! The [`Scheduler`] table is a pure, clock-free structure: callers pass the
//! current instant to [`Scheduler::tick`] and receive the triggers due since
//! the previous tick. [`spawn_scheduler`] drives the table from a tokio
//! interval and forwards triggers over a channel; it never runs jobs itself.

mod runner;
mod table;

pub use runner::{SchedulerHandle, spawn_scheduler};
pub use table::{Scheduler, Trigger};
