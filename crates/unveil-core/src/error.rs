use crate::config::ConfigError;
use crate::id::Millis;
use crate::scheduler::SchedulerError;

/// Errors returned by [`Stage`](crate::stage::Stage) operations.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("stage is already past page-ready")]
    AlreadyReady,

    #[error("stage has been torn down")]
    TornDown,

    #[error("cannot move the clock back to {target}ms (now {now}ms)")]
    ClockRegression { target: Millis, now: Millis },

    #[error("invalid stage config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
