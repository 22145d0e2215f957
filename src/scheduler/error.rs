//! Scheduler errors
//!
//! Two families:
//! - [`TaskError`]: a task's `run` (or `on_error`) failed. Recovered locally
//!   by the dispatch pass, never propagated to whoever drives the timer.
//! - [`SchedulerError`]: the API was misused (bad interval, task from another
//!   scheduler, ...). Returned to the caller.

use crate::json::JsonError;
use crate::platform::PlatformError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Failure raised by task code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task returned an error
    Failed(String),
    /// The task panicked; the payload message is kept
    Panicked(String),
}

impl TaskError {
    pub fn new(msg: impl Into<String>) -> Self {
        TaskError::Failed(msg.into())
    }

    pub fn message(&self) -> &str {
        match self {
            TaskError::Failed(s) | TaskError::Panicked(s) => s,
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::Failed(s) => write!(f, "task failed: {}", s),
            TaskError::Panicked(s) => write!(f, "task panicked: {}", s),
        }
    }
}

impl std::error::Error for TaskError {}

impl From<String> for TaskError {
    fn from(s: String) -> Self {
        TaskError::Failed(s)
    }
}

impl From<&str> for TaskError {
    fn from(s: &str) -> Self {
        TaskError::Failed(s.to_string())
    }
}

impl From<PlatformError> for TaskError {
    fn from(e: PlatformError) -> Self {
        TaskError::Failed(e.to_string())
    }
}

impl From<JsonError> for TaskError {
    fn from(e: JsonError) -> Self {
        TaskError::Failed(e.to_string())
    }
}

impl From<SchedulerError> for TaskError {
    fn from(e: SchedulerError) -> Self {
        TaskError::Failed(e.to_string())
    }
}

/// Misuse of the scheduler API
#[derive(Debug)]
pub enum SchedulerError {
    /// Task interval must be finite and non-negative
    InvalidInterval(f64),
    /// Task duration must be finite and positive
    InvalidDuration(f64),
    /// Repeat count must be at least 1
    InvalidRepeat(u32),
    /// Polling resolution must be finite and positive
    InvalidResolution(f64),
    /// The task belongs to a different scheduler
    ForeignTask,
    /// The task outlived its scheduler
    Detached,
    /// Configuration could not be read
    Config(JsonError),
    /// The host could not provide a clock or timer
    Host(PlatformError),
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::InvalidInterval(v) => write!(f, "invalid task interval: {}", v),
            SchedulerError::InvalidDuration(v) => write!(f, "invalid task duration: {}", v),
            SchedulerError::InvalidRepeat(v) => write!(f, "invalid repeat count: {}", v),
            SchedulerError::InvalidResolution(v) => {
                write!(f, "invalid polling resolution: {}", v)
            }
            SchedulerError::ForeignTask => write!(f, "task belongs to another scheduler"),
            SchedulerError::Detached => write!(f, "task's scheduler has been dropped"),
            SchedulerError::Config(e) => write!(f, "bad scheduler config: {}", e),
            SchedulerError::Host(e) => write!(f, "host error: {}", e),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Config(e) => Some(e),
            SchedulerError::Host(e) => Some(e),
            _ => None,
        }
    }
}

impl From<JsonError> for SchedulerError {
    fn from(e: JsonError) -> Self {
        SchedulerError::Config(e)
    }
}

impl From<PlatformError> for SchedulerError {
    fn from(e: PlatformError) -> Self {
        SchedulerError::Host(e)
    }
}

pub(crate) fn validate_interval(interval: f64) -> SchedulerResult<f64> {
    if interval.is_finite() && interval >= 0.0 {
        Ok(interval)
    } else {
        Err(SchedulerError::InvalidInterval(interval))
    }
}

pub(crate) fn validate_duration(duration: Option<f64>) -> SchedulerResult<()> {
    match duration {
        Some(d) if !(d.is_finite() && d > 0.0) => Err(SchedulerError::InvalidDuration(d)),
        _ => Ok(()),
    }
}

pub(crate) fn validate_repeat(repeat: Option<u32>) -> SchedulerResult<()> {
    match repeat {
        Some(0) => Err(SchedulerError::InvalidRepeat(0)),
        _ => Ok(()),
    }
}
