//! Debounced one-shot callbacks
//!
//! A [`DelayedTask`] runs its callback once, `ms` after the most recent call
//! to `delay`. Calling `delay` again before it fires pushes it back. Used for
//! buffering bursts of UI events (resize, typing) into one piece of work.

use crate::platform::{TimerHandle, TimerHost};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback = Box<dyn FnMut()>;

struct DelayedInner {
    host: Rc<dyn TimerHost>,
    callback: RefCell<Option<Callback>>,
    timer: Cell<Option<TimerHandle>>,
}

impl DelayedInner {
    fn cancel(&self) {
        if let Some(handle) = self.timer.take() {
            self.host.clear_timeout(handle);
        }
    }

    fn fire(&self) {
        self.timer.set(None);
        let Some(mut callback) = self.callback.borrow_mut().take() else {
            return;
        };
        callback();
        // Keep a callback installed from inside the call
        let mut slot = self.callback.borrow_mut();
        if slot.is_none() {
            *slot = Some(callback);
        }
    }
}

impl Drop for DelayedInner {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One-shot, restartable delayed callback
pub struct DelayedTask {
    inner: Rc<DelayedInner>,
}

impl DelayedTask {
    pub fn new<F>(host: Rc<dyn TimerHost>, callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self {
            inner: Rc::new(DelayedInner {
                host,
                callback: RefCell::new(Some(Box::new(callback))),
                timer: Cell::new(None),
            }),
        }
    }

    /// (Re)arm: fire `ms` from now, cancelling any pending firing
    pub fn delay(&self, ms: f64) {
        self.inner.cancel();
        let weak = Rc::downgrade(&self.inner);
        let handle = self.inner.host.set_timeout(
            ms,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire();
                }
            }),
        );
        self.inner.timer.set(Some(handle));
    }

    /// Replace the callback, then (re)arm
    pub fn delay_with<F>(&self, ms: f64, callback: F)
    where
        F: FnMut() + 'static,
    {
        *self.inner.callback.borrow_mut() = Some(Box::new(callback));
        self.delay(ms);
    }

    /// Cancel the pending firing, if any
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.timer.get().is_some()
    }
}
