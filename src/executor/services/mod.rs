//! Job execution services.

mod executor;
mod handle;
mod limiter;
mod locks;

pub use executor::{JobExecutor, JobExecutorError, JobExecutorResult, SubmitOutcome};
pub use handle::RunHandle;
pub use limiter::HostLimiter;
pub use locks::{TargetGuard, TargetLocks};
