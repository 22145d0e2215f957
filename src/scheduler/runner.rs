//! Shared-timer task runner
//!
//! One underlying timer drives every registered task:
//! - Each firing runs a dispatch pass over the active list
//! - Due tasks are invoked; the timer is re-armed for the nearest due time
//! - Stopped tasks are pruned at the end of the pass, never mid-iteration
//!
//! Re-entrancy: task code may start, stop or restart any task (itself
//! included) while a pass is running. No borrow of scheduler or task state is
//! held across a user callback.

use super::error::{
    SchedulerError, SchedulerResult, validate_duration, validate_interval, validate_repeat,
};
use super::task::{Flow, Task, TaskConfig, TaskId, stop_task};
use crate::console_log;
use crate::platform::{Clock, TimerHandle, TimerHost};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Default polling resolution (ms)
pub const DEFAULT_RESOLUTION: f64 = 10.0;

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}

/// Scheduler configuration
///
/// Built from a bare number (the resolution) or read from a configuration
/// object such as `{"interval": 16}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minimum polling resolution in ms. No underlying timer is ever
    /// scheduled for less than this.
    #[serde(default = "default_resolution")]
    pub interval: f64,
}

impl SchedulerConfig {
    /// Parse a JSON configuration object
    pub fn from_json(text: &str) -> SchedulerResult<Self> {
        Ok(crate::json::decode(text)?)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RESOLUTION,
        }
    }
}

impl From<f64> for SchedulerConfig {
    fn from(interval: f64) -> Self {
        Self { interval }
    }
}

struct RunnerState {
    /// Active list, insertion order, no duplicates
    tasks: Vec<Task>,
    /// A dispatch pass is in progress
    firing: bool,
    /// Pending underlying timer
    timer: Option<TimerHandle>,
    /// When the pending timer was asked to fire
    next_expires: f64,
    resolution: f64,
}

pub(crate) struct RunnerInner {
    host: Rc<dyn TimerHost>,
    state: RefCell<RunnerState>,
    next_task_id: Cell<u64>,
}

impl Drop for RunnerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().timer.take() {
            self.host.clear_timeout(handle);
        }
    }
}

/// The task scheduler
///
/// A cheap handle; clones share the same active list and timer.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RunnerInner>,
}

impl Scheduler {
    /// Create a scheduler on `host`. `config` is either the polling
    /// resolution in ms or a [`SchedulerConfig`].
    pub fn new(config: impl Into<SchedulerConfig>, host: Rc<dyn TimerHost>) -> SchedulerResult<Self> {
        let config = config.into();
        if !(config.interval.is_finite() && config.interval > 0.0) {
            return Err(SchedulerError::InvalidResolution(config.interval));
        }

        Ok(Self {
            inner: Rc::new(RunnerInner {
                host,
                state: RefCell::new(RunnerState {
                    tasks: Vec::new(),
                    firing: false,
                    timer: None,
                    next_expires: 0.0,
                    resolution: config.interval,
                }),
                next_task_id: Cell::new(1),
            }),
        })
    }

    pub(crate) fn from_inner(inner: Rc<RunnerInner>) -> Self {
        Self { inner }
    }

    /// Build a task bound to this scheduler without starting it
    pub fn new_task(&self, config: TaskConfig) -> SchedulerResult<Task> {
        let options = config.options();
        validate_interval(options.interval)?;
        validate_duration(options.duration)?;
        validate_repeat(options.repeat)?;

        let id = TaskId(self.inner.next_task_id.get());
        self.inner.next_task_id.set(id.0 + 1);
        Ok(Task::new(id, Rc::downgrade(&self.inner), config))
    }

    /// Register `task` (once) and reset its run state.
    ///
    /// With `fire_on_start` the task is due immediately, otherwise one full
    /// interval after now. Returns the task for chaining.
    pub fn start<'t>(&self, task: &'t Task) -> SchedulerResult<&'t Task> {
        if !std::ptr::eq(task.inner.owner.as_ptr(), Rc::as_ptr(&self.inner)) {
            return Err(SchedulerError::ForeignTask);
        }

        let now = self.inner.host.now_ms();
        let (newly_registered, fire_on_start, interval) = {
            let mut state = task.inner.state.borrow_mut();
            state.stopped = false;
            state.start_time = now;
            state.run_time = if state.fire_on_start {
                now - state.interval
            } else {
                now
            };
            state.run_count = 0;
            let newly = !std::mem::replace(&mut state.pending, true);
            (newly, state.fire_on_start, state.interval)
        };

        let firing = {
            let mut state = self.inner.state.borrow_mut();
            if newly_registered {
                state.tasks.push(task.clone());
            }
            state.firing
        };

        // A running pass re-arms the timer itself when it finishes
        if !firing {
            self.start_timer(if fire_on_start { 0.0 } else { interval }, now);
        }
        Ok(task)
    }

    /// Stop `task`. Idempotent; `on_stop` runs once per transition.
    /// The task leaves the active list on the next dispatch pass.
    pub fn stop<'t>(&self, task: &'t Task) -> &'t Task {
        stop_task(task);
        task
    }

    /// Stop every registered task
    pub fn stop_all(&self) {
        let snapshot = self.inner.state.borrow().tasks.clone();
        for task in &snapshot {
            stop_task(task);
        }
    }

    /// Stop everything and release the underlying timer.
    ///
    /// Inside a dispatch pass this only stops the tasks. The running pass
    /// prunes them (tasks it already visited go on the next pass) and the
    /// timer lapses once the list is empty.
    pub fn destroy(&self) {
        self.stop_all();

        let (timer, tasks) = {
            let mut state = self.inner.state.borrow_mut();
            if state.firing {
                return;
            }
            (state.timer.take(), std::mem::take(&mut state.tasks))
        };
        if let Some(handle) = timer {
            self.inner.host.clear_timeout(handle);
        }
        for task in &tasks {
            let mut state = task.inner.state.borrow_mut();
            // Restarted by an on_stop handler: keep it
            if state.stopped {
                state.pending = false;
            }
        }
        let survivors: Vec<Task> = tasks.into_iter().filter(|t| t.is_pending()).collect();
        if !survivors.is_empty() {
            let now = self.inner.host.now_ms();
            self.inner.state.borrow_mut().tasks = survivors;
            self.start_timer(0.0, now);
        }
    }

    /// Run one dispatch pass. Normally invoked by the underlying timer.
    pub fn dispatch(&self) {
        let now = self.inner.host.now_ms();
        let mut len = {
            let mut state = self.inner.state.borrow_mut();
            if state.firing {
                console_log!("[scheduler] dispatch re-entered, ignoring");
                return;
            }
            // Normally the timer that is firing right now; clearing it is a
            // no-op then. A manual pass must not leave a stray timer behind.
            if let Some(handle) = state.timer.take() {
                self.inner.host.clear_timeout(handle);
            }
            state.firing = true;
            state.tasks.len()
        };

        let mut survivors: Option<Vec<Task>> = None;
        let mut i = 0;

        loop {
            // Tasks started during this pass are appended; pick them up too
            if i >= len {
                len = self.inner.state.borrow().tasks.len();
                if i >= len {
                    break;
                }
            }
            let task = self.inner.state.borrow().tasks[i].clone();

            if self.visit(&task, now) {
                if let Some(kept) = survivors.as_mut() {
                    kept.push(task);
                }
            } else {
                task.inner.state.borrow_mut().pending = false;
                if survivors.is_none() {
                    survivors = Some(self.inner.state.borrow().tasks[..i].to_vec());
                }
            }
            i += 1;
        }

        let next_wake = {
            let mut state = self.inner.state.borrow_mut();
            if let Some(kept) = survivors {
                state.tasks = kept;
            }
            state.firing = false;
            // Computed after the pass so restarts made by callbacks count.
            // Tasks stopped after their visit are due now, to be pruned.
            state
                .tasks
                .iter()
                .map(|task| {
                    let task = task.inner.state.borrow();
                    if task.stopped {
                        now
                    } else {
                        task.run_time + task.interval
                    }
                })
                .reduce(f64::min)
        };

        if let Some(wake) = next_wake {
            // Callbacks may have taken a while: measure from the current time
            self.start_timer((wake - now).max(0.0), self.inner.host.now_ms());
        }
    }

    /// Evaluate one task. Returns false if it must leave the active list.
    fn visit(&self, task: &Task, now: f64) -> bool {
        let (stopped, expires) = {
            let state = task.inner.state.borrow();
            (state.stopped, state.run_time + state.interval)
        };
        if stopped {
            return false;
        }

        if expires <= now {
            let flow = task.invoke_run();

            let (limit_reached, stopped_by_run) = {
                let mut state = task.inner.state.borrow_mut();
                // The pass snapshot, not the post-call time, so slow tasks
                // don't shorten their next interval
                state.run_time = now;
                (state.repeat == Some(state.run_count), state.stopped)
            };

            if flow == Flow::Stop || limit_reached {
                return retire(task);
            }
            if stopped_by_run {
                return false;
            }
        }

        let expired = {
            let state = task.inner.state.borrow();
            state
                .duration
                .is_some_and(|duration| now - state.start_time >= duration)
        };
        if expired {
            return retire(task);
        }
        true
    }

    /// Make sure the timer fires by the time `task` is next due
    pub(crate) fn rearm_for(&self, task: &Task) {
        if self.inner.state.borrow().firing {
            return;
        }
        let now = self.inner.host.now_ms();
        let due = {
            let state = task.inner.state.borrow();
            state.run_time + state.interval
        };
        self.start_timer((due - now).max(0.0), now);
    }

    /// Arm the underlying timer for `timeout` ms from `now`.
    ///
    /// A pending timer is only replaced when the new deadline is earlier by
    /// more than one resolution unit, so a very soon task may wait up to one
    /// unit longer than asked. The delay is never below the resolution.
    fn start_timer(&self, timeout: f64, now: f64) {
        let expires = now + timeout;
        let mut state = self.inner.state.borrow_mut();

        if let Some(handle) = state.timer
            && state.next_expires - expires > state.resolution
        {
            self.inner.host.clear_timeout(handle);
            state.timer = None;
        }

        if state.timer.is_none() {
            let delay = timeout.max(state.resolution);
            let weak = Rc::downgrade(&self.inner);
            let handle = self.inner.host.set_timeout(
                delay,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        Scheduler::from_inner(inner).dispatch();
                    }
                }),
            );
            state.timer = Some(handle);
            state.next_expires = expires;
        }
    }

    /// Polling resolution in ms
    pub fn resolution(&self) -> f64 {
        self.inner.state.borrow().resolution
    }

    /// Number of tasks in the active list (stopped ones included until the
    /// next pass prunes them)
    pub fn active_count(&self) -> usize {
        self.inner.state.borrow().tasks.len()
    }

    /// Snapshot of the active list
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.state.borrow().tasks.clone()
    }

    /// True while a dispatch pass is running
    pub fn is_firing(&self) -> bool {
        self.inner.state.borrow().firing
    }

    /// True if the underlying timer is armed
    pub fn has_timer(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }

    pub fn host(&self) -> Rc<dyn TimerHost> {
        self.inner.host.clone()
    }
}

/// Stop a task from inside a pass. Returns true if an `on_stop` handler
/// restarted it, so it stays listed.
fn retire(task: &Task) -> bool {
    stop_task(task);
    !task.is_stopped()
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Scheduler")
            .field("tasks", &state.tasks.len())
            .field("firing", &state.firing)
            .field("timer", &state.timer)
            .field("resolution", &state.resolution)
            .finish()
    }
}
