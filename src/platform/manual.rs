//! Manual (virtual time) host
//!
//! A [`TimerHost`] whose clock only moves when the caller says so.
//!
//! Design:
//! - Pending timers live in a min-heap sorted by deadline
//! - Equal deadlines fire in scheduling order
//! - `advance` walks the clock forward deadline by deadline, so every
//!   callback observes `now_ms()` equal to its own deadline
//! - Cancellation is lazy: the callback is dropped, the heap entry is
//!   skipped when it surfaces
//!
//! Used natively (tests, headless tools) and anywhere a deterministic
//! timeline is wanted.

use super::{Clock, TimerHandle, TimerHost};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Entry in the timer heap (for ordering)
#[derive(Debug)]
struct TimerEntry {
    deadline: f64,
    handle: TimerHandle,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (smallest deadline first, then oldest)
        other
            .deadline
            .partial_cmp(&self.deadline)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.handle.0.cmp(&self.handle.0))
    }
}

#[derive(Default)]
struct TimerQueue {
    /// Min-heap of timer entries
    heap: BinaryHeap<TimerEntry>,
    /// Callbacks of timers that have neither fired nor been cancelled
    callbacks: HashMap<TimerHandle, Box<dyn FnOnce()>>,
    /// Next timer ID
    next_id: u64,
}

impl TimerQueue {
    /// Pop the earliest live timer if it is due at or before `limit`
    fn pop_due(&mut self, limit: f64) -> Option<(f64, Box<dyn FnOnce()>)> {
        while let Some(entry) = self.heap.peek() {
            if !self.callbacks.contains_key(&entry.handle) {
                // Cancelled
                self.heap.pop();
                continue;
            }
            if entry.deadline > limit {
                return None;
            }
            let entry = self.heap.pop()?;
            let callback = self.callbacks.remove(&entry.handle)?;
            return Some((entry.deadline, callback));
        }
        None
    }

    fn next_deadline(&self) -> Option<f64> {
        self.heap
            .iter()
            .filter(|e| self.callbacks.contains_key(&e.handle))
            .map(|e| e.deadline)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }
}

/// Virtual clock plus timer queue
pub struct ManualHost {
    now: Cell<f64>,
    queue: RefCell<TimerQueue>,
}

impl ManualHost {
    /// Create a host whose clock reads 0
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Create a host whose clock starts at `now`
    pub fn starting_at(now: f64) -> Self {
        Self {
            now: Cell::new(now),
            queue: RefCell::new(TimerQueue {
                next_id: 1,
                ..TimerQueue::default()
            }),
        }
    }

    /// Move the clock forward by `ms`, firing every timer that falls due on
    /// the way. Timers scheduled by callbacks fire too if their deadline is
    /// within the window. Returns the number of callbacks run.
    pub fn advance(&self, ms: f64) -> usize {
        let target = self.now.get() + ms.max(0.0);
        let mut fired = 0;

        loop {
            // Release the queue before running user code
            let next = self.queue.borrow_mut().pop_due(target);
            let Some((deadline, callback)) = next else {
                break;
            };
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
            callback();
            fired += 1;
        }

        self.now.set(target);
        fired
    }

    /// Move the clock to the absolute time `when` (never backwards)
    pub fn advance_to(&self, when: f64) -> usize {
        self.advance(when - self.now.get())
    }

    /// Fire the earliest pending timer, moving the clock to its deadline.
    /// Returns false if nothing is pending.
    pub fn fire_next(&self) -> bool {
        let next = self.queue.borrow_mut().pop_due(f64::INFINITY);
        match next {
            Some((deadline, callback)) => {
                if deadline > self.now.get() {
                    self.now.set(deadline);
                }
                callback();
                true
            }
            None => false,
        }
    }

    /// Keep firing timers until none are pending or `max_steps` callbacks
    /// have run. Returns the number of callbacks run.
    pub fn run_until_idle(&self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.fire_next() {
            steps += 1;
        }
        steps
    }

    /// Number of pending timers
    pub fn pending_count(&self) -> usize {
        self.queue.borrow().callbacks.len()
    }

    /// Time until the next timer fires
    pub fn time_until_next(&self) -> Option<f64> {
        let now = self.now.get();
        self.queue
            .borrow()
            .next_deadline()
            .map(|deadline| (deadline - now).max(0.0))
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualHost {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

impl TimerHost for ManualHost {
    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let mut queue = self.queue.borrow_mut();
        let handle = TimerHandle(queue.next_id);
        queue.next_id += 1;

        let deadline = self.now.get() + delay_ms.max(0.0);
        queue.heap.push(TimerEntry { deadline, handle });
        queue.callbacks.insert(handle, callback);
        handle
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.queue.borrow_mut().callbacks.remove(&handle);
    }
}
