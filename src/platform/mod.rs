//! Platform Abstraction Layer
//!
//! The scheduler and the profiling helpers never talk to the host directly.
//! They see two traits:
//!
//! - [`Clock`]: current time in milliseconds
//! - [`TimerHost`]: a single-shot timer primitive (schedule, cancel)
//!
//! Hosts:
//! - Browser (via wasm-bindgen, web-sys): [`web::WebHost`]
//! - Anywhere: [`ManualHost`], virtual time advanced by the caller

#[cfg(target_arch = "wasm32")]
#[cfg(target_os = "unknown")] // Browser WASM (no WASI)
pub mod web;

pub mod manual;

pub use manual::ManualHost;

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform-specific errors
#[derive(Debug, Clone)]
pub enum PlatformError {
    /// A host object (window, document, performance) is missing
    Unavailable(String),
    /// The host rejected a call
    HostCall(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Unavailable(s) => write!(f, "Unavailable: {}", s),
            PlatformError::HostCall(s) => write!(f, "Host call failed: {}", s),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Opaque handle of a pending single-shot timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Source of the current time
pub trait Clock {
    /// Current time in milliseconds since some fixed origin
    fn now_ms(&self) -> f64;
}

/// Single-shot timer primitive
///
/// Callbacks run later, on the same thread, from the host's event loop.
/// A callback must never run synchronously inside `set_timeout`.
pub trait TimerHost: Clock {
    /// Run `callback` once after `delay_ms` milliseconds
    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerHandle;

    /// Cancel a pending timer. Unknown or already fired handles are ignored.
    fn clear_timeout(&self, handle: TimerHandle);
}

impl<T: Clock + ?Sized> Clock for std::rc::Rc<T> {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

impl<T: TimerHost + ?Sized> TimerHost for std::rc::Rc<T> {
    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>) -> TimerHandle {
        (**self).set_timeout(delay_ms, callback)
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        (**self).clear_timeout(handle)
    }
}
