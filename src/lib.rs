//! uibase - foundation layer of a browser UI widget framework, compiled to WASM
//!
//! Design principles:
//! - One shared timer drives every periodic UI task
//! - Re-entrant by construction: callbacks may start and stop anything
//! - Platform knowledge lives behind the `platform` traits
//! - Everything is testable natively with virtual time
//!
//! Platform support:
//! - Browser (wasm32-unknown-unknown): setTimeout timers, performance.now clock
//! - Native: `ManualHost` virtual time, driven by the caller

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod browser;
pub mod cache;
pub mod format;
pub mod json;
pub mod perf;
pub mod platform;
pub mod scheduler;

pub use platform::{Clock, ManualHost, TimerHandle, TimerHost};
pub use scheduler::{Flow, RunArgs, Scheduler, SchedulerConfig, Task, TaskConfig, TaskError};

/// Initialize panic hook for better error messages in browser console
#[cfg(target_arch = "wasm32")]
fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WASM entry point. Only installs the panic hook; the application
/// constructs its own scheduler.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    init_panic_hook();
}

/// Console logging helper
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[doc(hidden)]
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Log to browser console (WASM)
#[cfg(target_arch = "wasm32")]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::log(&format!($($t)*))
    };
}

/// Log to stderr (native)
#[cfg(not(target_arch = "wasm32"))]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        eprintln!($($t)*)
    };
}
