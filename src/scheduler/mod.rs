//! Task scheduling
//!
//! - [`Scheduler`]: one underlying timer multiplexed across any number of
//!   periodic or one-shot [`Task`]s
//! - [`DelayedTask`]: debounced one-shot callback
//!
//! Tasks are plain closures:
//!
//! ```ignore
//! let scheduler = Scheduler::new(10.0, host)?;
//! let clock = scheduler.new_task(
//!     TaskConfig::new(1000.0, |_task, _args| {
//!         refresh_clock_label();
//!         Ok(Flow::Continue)
//!     })
//!     .duration(60_000.0),
//! )?;
//! scheduler.start(&clock)?;
//! ```
//!
//! A task fails by returning `Err`; that never disturbs other tasks. Panics
//! are caught the same way on native targets, but the browser build aborts
//! on panic, so task code meant for the browser should return errors.
//!
//! Closures that need the scheduler should reach it through the task
//! handle they are given (`task.scheduler()`); capturing a `Scheduler`
//! clone inside one of its own tasks creates a reference cycle.

pub mod delayed;
pub mod error;
pub mod runner;
pub mod task;

pub use delayed::DelayedTask;
pub use error::{SchedulerError, SchedulerResult, TaskError};
pub use runner::{DEFAULT_RESOLUTION, Scheduler, SchedulerConfig};
pub use task::{Flow, RunArgs, Task, TaskConfig, TaskId, TaskOptions, TaskResult};

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
thread_local! {
    /// Application-wide scheduler on the browser host, created on first use
    static DEFAULT: std::cell::RefCell<Option<Scheduler>> = const { std::cell::RefCell::new(None) };
}

/// Run `f` with the application's default scheduler (browser only).
/// Nothing inside the crate uses it.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub fn with_default<R>(f: impl FnOnce(&Scheduler) -> R) -> SchedulerResult<R> {
    let scheduler = DEFAULT.with(|slot| -> SchedulerResult<Scheduler> {
        let mut slot = slot.borrow_mut();
        if let Some(s) = slot.as_ref() {
            return Ok(s.clone());
        }
        let host = std::rc::Rc::new(crate::platform::web::WebHost::new()?);
        let s = Scheduler::new(SchedulerConfig::default(), host)?;
        *slot = Some(s.clone());
        Ok(s)
    })?;
    Ok(f(&scheduler))
}
