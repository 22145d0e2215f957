//! Task abstraction
//!
//! A Task is one periodic or one-shot unit of work driven by a [`Scheduler`].
//! Tasks never own a timer. The scheduler's single timer polls them.
//!
//! [`Task`] is a cheap handle (`Rc` inside). Clones refer to the same task;
//! equality is identity.

use super::error::{SchedulerError, SchedulerResult, TaskError, validate_interval};
use super::runner::{RunnerInner, Scheduler};
use crate::console_log;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

/// Unique identifier for a task (unique per scheduler)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

/// What a task wants after an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep the task scheduled
    #[default]
    Continue,
    /// Stop the task now
    Stop,
}

impl From<bool> for Flow {
    /// `false` stops the task, `true` keeps it running
    fn from(keep_going: bool) -> Self {
        if keep_going { Flow::Continue } else { Flow::Stop }
    }
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

/// Arguments handed to `run`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunArgs<'a> {
    /// No fixed arguments were configured: the 1-based invocation counter
    Count(u32),
    /// The task's fixed argument list
    Args(&'a [Value]),
}

impl RunArgs<'_> {
    /// The invocation counter, if this call carries one
    pub fn count(&self) -> Option<u32> {
        match self {
            RunArgs::Count(n) => Some(*n),
            RunArgs::Args(_) => None,
        }
    }
}

pub type TaskResult = Result<Flow, TaskError>;
pub type RunFn = Box<dyn FnMut(&Task, RunArgs<'_>) -> TaskResult>;
pub type ErrorFn = Box<dyn FnMut(&Task, &TaskError) -> TaskResult>;
pub type StopFn = Box<dyn FnMut(&Task)>;

fn default_true() -> bool {
    true
}

/// Data-only task options, loadable from a configuration object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOptions {
    /// Minimum milliseconds between invocations
    pub interval: f64,
    /// Total lifetime in milliseconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Maximum number of invocations
    #[serde(default)]
    pub repeat: Option<u32>,
    /// Run immediately on start instead of after one interval
    #[serde(default = "default_true")]
    pub fire_on_start: bool,
    /// Fixed arguments passed to every invocation
    #[serde(default)]
    pub args: Option<Vec<Value>>,
}

impl TaskOptions {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            duration: None,
            repeat: None,
            fire_on_start: true,
            args: None,
        }
    }
}

/// Everything needed to build a task
pub struct TaskConfig {
    pub(crate) options: TaskOptions,
    pub(crate) run: RunFn,
    pub(crate) on_error: Option<ErrorFn>,
    pub(crate) on_stop: Option<StopFn>,
}

impl TaskConfig {
    /// A task running `run` every `interval` milliseconds
    pub fn new<F>(interval: f64, run: F) -> Self
    where
        F: FnMut(&Task, RunArgs<'_>) -> TaskResult + 'static,
    {
        Self::from_options(TaskOptions::new(interval), run)
    }

    /// Pair deserialized options with the task's code
    pub fn from_options<F>(options: TaskOptions, run: F) -> Self
    where
        F: FnMut(&Task, RunArgs<'_>) -> TaskResult + 'static,
    {
        Self {
            options,
            run: Box::new(run),
            on_error: None,
            on_stop: None,
        }
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.options.args = Some(args);
        self
    }

    pub fn duration(mut self, ms: f64) -> Self {
        self.options.duration = Some(ms);
        self
    }

    pub fn repeat(mut self, times: u32) -> Self {
        self.options.repeat = Some(times);
        self
    }

    pub fn fire_on_start(mut self, fire: bool) -> Self {
        self.options.fire_on_start = fire;
        self
    }

    /// Called when `run` fails. Its `Ok` value replaces `run`'s result;
    /// its `Err` is discarded.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Task, &TaskError) -> TaskResult + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Called once each time the task goes from running to stopped
    pub fn on_stop<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Task) + 'static,
    {
        self.on_stop = Some(Box::new(handler));
        self
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }
}

impl std::fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskConfig")
            .field("options", &self.options)
            .field("on_error", &self.on_error.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

/// Mutable run state of a task
#[derive(Debug)]
pub(crate) struct TaskState {
    pub interval: f64,
    pub duration: Option<f64>,
    pub repeat: Option<u32>,
    pub fire_on_start: bool,
    pub args: Option<Rc<[Value]>>,
    /// Registered in the scheduler's active list
    pub pending: bool,
    pub stopped: bool,
    pub start_time: f64,
    /// Last invocation, or the baseline set by `start`
    pub run_time: f64,
    pub run_count: u32,
}

pub(crate) struct TaskInner {
    pub id: TaskId,
    pub owner: Weak<RunnerInner>,
    pub state: RefCell<TaskState>,
    // Each closure is taken out of its slot while it runs, so re-entrant
    // calls never hit a live borrow.
    run: RefCell<Option<RunFn>>,
    on_error: RefCell<Option<ErrorFn>>,
    on_stop: RefCell<Option<StopFn>>,
}

/// Handle to a scheduled task
#[derive(Clone)]
pub struct Task {
    pub(crate) inner: Rc<TaskInner>,
}

impl Task {
    pub(crate) fn new(id: TaskId, owner: Weak<RunnerInner>, config: TaskConfig) -> Self {
        let TaskConfig {
            options,
            run,
            on_error,
            on_stop,
        } = config;

        let state = TaskState {
            interval: options.interval,
            duration: options.duration,
            repeat: options.repeat,
            fire_on_start: options.fire_on_start,
            args: options.args.map(Rc::from),
            pending: false,
            // Never started counts as stopped: stop() before start() is a no-op
            stopped: true,
            start_time: 0.0,
            run_time: 0.0,
            run_count: 0,
        };

        Self {
            inner: Rc::new(TaskInner {
                id,
                owner,
                state: RefCell::new(state),
                run: RefCell::new(Some(run)),
                on_error: RefCell::new(on_error),
                on_stop: RefCell::new(on_stop),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// The scheduler this task was created by
    pub fn scheduler(&self) -> SchedulerResult<Scheduler> {
        self.inner
            .owner
            .upgrade()
            .map(Scheduler::from_inner)
            .ok_or(SchedulerError::Detached)
    }

    /// Start the task if it is stopped. A running task keeps its run state.
    /// A new interval may be supplied; it applies either way.
    pub fn start(&self, interval: Option<f64>) -> SchedulerResult<&Self> {
        let scheduler = self.scheduler()?;
        if let Some(interval) = interval {
            self.inner.state.borrow_mut().interval = validate_interval(interval)?;
        }
        if self.is_stopped() {
            scheduler.start(self)?;
        } else if interval.is_some() {
            scheduler.rearm_for(self);
        }
        Ok(self)
    }

    /// Stop the task if it is running
    pub fn stop(&self) -> &Self {
        if !self.is_stopped() {
            stop_task(self);
        }
        self
    }

    /// (Re)start the task, resetting its run state even if it is running.
    /// A new interval may be supplied.
    pub fn restart(&self, interval: Option<f64>) -> SchedulerResult<&Self> {
        let scheduler = self.scheduler()?;
        if let Some(interval) = interval {
            self.inner.state.borrow_mut().interval = validate_interval(interval)?;
        }
        scheduler.start(self)?;
        Ok(self)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.state.borrow().stopped
    }

    /// Registered in the scheduler's active list (may still be stopped)
    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().pending
    }

    pub fn run_count(&self) -> u32 {
        self.inner.state.borrow().run_count
    }

    pub fn interval(&self) -> f64 {
        self.inner.state.borrow().interval
    }

    pub fn start_time(&self) -> f64 {
        self.inner.state.borrow().start_time
    }

    /// Time of the last invocation, or the start baseline
    pub fn run_time(&self) -> f64 {
        self.inner.state.borrow().run_time
    }

    /// Invoke `run` once with the failure boundary. Returns the effective
    /// flow after error routing.
    pub(crate) fn invoke_run(&self) -> Flow {
        let (args, count) = {
            let mut state = self.inner.state.borrow_mut();
            state.run_count += 1;
            (state.args.clone(), state.run_count)
        };

        let Some(mut run) = self.inner.run.borrow_mut().take() else {
            return Flow::Continue;
        };
        let call_args = match &args {
            Some(args) => RunArgs::Args(&args[..]),
            None => RunArgs::Count(count),
        };
        let result = guard(|| run(self, call_args));
        *self.inner.run.borrow_mut() = Some(run);

        match result {
            Ok(flow) => flow,
            Err(err) => self.route_error(err),
        }
    }

    fn route_error(&self, err: TaskError) -> Flow {
        let Some(mut handler) = self.inner.on_error.borrow_mut().take() else {
            console_log!("[scheduler] {} failed: {}", self.id(), err);
            return Flow::Continue;
        };
        let result = guard(|| handler(self, &err));
        restore(&self.inner.on_error, handler);

        // A failing error handler is discarded
        result.unwrap_or(Flow::Continue)
    }

    pub(crate) fn invoke_on_stop(&self) {
        let Some(mut handler) = self.inner.on_stop.borrow_mut().take() else {
            return;
        };
        let result = catch_unwind(AssertUnwindSafe(|| handler(self)));
        restore(&self.inner.on_stop, handler);

        if let Err(payload) = result {
            console_log!(
                "[scheduler] on_stop of {} panicked: {}",
                self.id(),
                panic_message(payload.as_ref())
            );
        }
    }
}

/// Mark a task stopped and fire `on_stop` once per transition
pub(crate) fn stop_task(task: &Task) {
    let transitioned = {
        let mut state = task.inner.state.borrow_mut();
        !std::mem::replace(&mut state.stopped, true)
    };
    if transitioned {
        task.invoke_on_stop();
    }
}

fn restore<T>(slot: &RefCell<Option<T>>, value: T) {
    let mut slot = slot.borrow_mut();
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// Run task code, turning a panic into [`TaskError::Panicked`].
///
/// Only effective where panics unwind. `wasm32-unknown-unknown` builds
/// abort on panic, so in the browser only `Err` returns are isolated.
fn guard(f: impl FnOnce() -> TaskResult) -> TaskResult {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("interval", &state.interval)
            .field("pending", &state.pending)
            .field("stopped", &state.stopped)
            .field("run_count", &state.run_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn detached(config: TaskConfig) -> Task {
        Task::new(TaskId(7), Weak::new(), config)
    }

    #[test]
    fn test_flow_conversions() {
        assert_eq!(Flow::from(false), Flow::Stop);
        assert_eq!(Flow::from(true), Flow::Continue);
        assert_eq!(Flow::from(()), Flow::Continue);
    }

    #[test]
    fn test_invoke_run_passes_counter() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let task = detached(TaskConfig::new(10.0, move |_, args| {
            s.borrow_mut().push(args.count());
            Ok(Flow::Continue)
        }));

        task.invoke_run();
        task.invoke_run();
        assert_eq!(*seen.borrow(), vec![Some(1), Some(2)]);
        assert_eq!(task.run_count(), 2);
    }

    #[test]
    fn test_invoke_run_passes_args() {
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let task = detached(
            TaskConfig::new(10.0, move |_, args| {
                if let RunArgs::Args(values) = args {
                    *s.borrow_mut() = Some(values.to_vec());
                }
                Ok(Flow::Continue)
            })
            .args(vec![json!("grid"), json!(3)]),
        );

        task.invoke_run();
        assert_eq!(*seen.borrow(), Some(vec![json!("grid"), json!(3)]));
        // Still counted, so repeat limits apply to tasks with args
        assert_eq!(task.run_count(), 1);
    }

    #[test]
    fn test_error_handler_result_substitutes() {
        let task = detached(
            TaskConfig::new(10.0, |_, _| Err(TaskError::new("layout failed")))
                .on_error(|_, err| {
                    assert_eq!(err.message(), "layout failed");
                    Ok(Flow::Stop)
                }),
        );
        assert_eq!(task.invoke_run(), Flow::Stop);
    }

    #[test]
    fn test_failing_error_handler_is_discarded() {
        let task = detached(
            TaskConfig::new(10.0, |_, _| panic!("render exploded"))
                .on_error(|_, err| {
                    assert!(matches!(err, TaskError::Panicked(m) if m == "render exploded"));
                    Err(TaskError::new("handler also failed"))
                }),
        );
        assert_eq!(task.invoke_run(), Flow::Continue);
        // Handlers survive for the next invocation
        assert_eq!(task.invoke_run(), Flow::Continue);
        assert_eq!(task.run_count(), 2);
    }

    #[test]
    fn test_stop_transition_fires_once() {
        let stops = Rc::new(Cell::new(0));
        let s = stops.clone();
        let task = detached(
            TaskConfig::new(10.0, |_, _| Ok(Flow::Continue)).on_stop(move |_| s.set(s.get() + 1)),
        );

        // Never started: already stopped
        task.stop();
        assert_eq!(stops.get(), 0);

        task.inner.state.borrow_mut().stopped = false;
        stop_task(&task);
        stop_task(&task);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_detached_task_cannot_start() {
        let task = detached(TaskConfig::new(10.0, |_, _| Ok(Flow::Continue)));
        assert!(matches!(task.start(None), Err(SchedulerError::Detached)));
        assert!(matches!(task.restart(None), Err(SchedulerError::Detached)));
    }

    #[test]
    fn test_options_from_json() {
        let options: TaskOptions = serde_json::from_str(
            r#"{"interval": 250, "repeat": 4, "fireOnStart": false, "args": ["tick"]}"#,
        )
        .unwrap();
        assert_eq!(options.interval, 250.0);
        assert_eq!(options.repeat, Some(4));
        assert!(!options.fire_on_start);
        assert_eq!(options.duration, None);
        assert_eq!(options.args, Some(vec![json!("tick")]));

        let defaults: TaskOptions = serde_json::from_str(r#"{"interval": 5}"#).unwrap();
        assert!(defaults.fire_on_start);
    }
}
