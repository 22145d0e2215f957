//! Browser host
//!
//! - `performance.now()` for the clock (falls back to `Date.now()`)
//! - `setTimeout` / `clearTimeout` for the timer primitive
//!
//! Each pending timer keeps its `Closure` alive in a table. Fired closures
//! are dropped lazily on the next `set_timeout`, never while they run.

use super::{Clock, PlatformError, PlatformResult, TimerHandle, TimerHost};
use crate::console_log;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Running,
    Done,
}

struct PendingTimer {
    phase: Rc<Cell<Phase>>,
    /// Stored to keep the JS function alive until it fires
    _closure: Closure<dyn FnMut()>,
}

/// Browser timer host
pub struct WebHost {
    window: web_sys::Window,
    performance: Option<web_sys::Performance>,
    timers: RefCell<HashMap<TimerHandle, PendingTimer>>,
}

impl WebHost {
    pub fn new() -> PlatformResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| PlatformError::Unavailable("No window object".to_string()))?;
        let performance = window.performance();
        Ok(Self {
            window,
            performance,
            timers: RefCell::new(HashMap::new()),
        })
    }

    /// Number of timers that have neither fired nor been cleared
    pub fn pending_count(&self) -> usize {
        self.timers
            .borrow()
            .values()
            .filter(|t| t.phase.get() == Phase::Pending)
            .count()
    }

    fn sweep(&self) {
        self.timers
            .borrow_mut()
            .retain(|_, t| t.phase.get() != Phase::Done);
    }
}

impl Clock for WebHost {
    fn now_ms(&self) -> f64 {
        self.performance
            .as_ref()
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

impl TimerHost for WebHost {
    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerHandle {
        self.sweep();

        let phase = Rc::new(Cell::new(Phase::Pending));
        let state = phase.clone();
        let mut callback = Some(callback);
        let closure = Closure::wrap(Box::new(move || {
            state.set(Phase::Running);
            if let Some(cb) = callback.take() {
                cb();
            }
            state.set(Phase::Done);
        }) as Box<dyn FnMut()>);

        let delay = delay_ms.max(0.0).min(i32::MAX as f64) as i32;
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                delay,
            ) {
            Ok(id) => {
                let handle = TimerHandle(id as u64);
                self.timers.borrow_mut().insert(
                    handle,
                    PendingTimer {
                        phase,
                        _closure: closure,
                    },
                );
                handle
            }
            Err(e) => {
                console_log!("[web] setTimeout failed: {:?}", e);
                // Never fires, clearing it is a no-op
                TimerHandle(0)
            }
        }
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        let mut timers = self.timers.borrow_mut();
        let pending = timers
            .get(&handle)
            .map(|t| t.phase.get() == Phase::Pending)
            .unwrap_or(false);
        if pending {
            self.window.clear_timeout_with_handle(handle.0 as i32);
            timers.remove(&handle);
        }
    }
}
