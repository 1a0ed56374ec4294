//! Keyboard matrix scanning engine.
//!
//! Samples a row/column key matrix under timer and wake-up interrupts,
//! debounces each key, rejects ghost keys and buffers the resulting
//! transitions for the application, which drains them as keycodes or as a
//! numeric passcode.
//!
//! The crate is `no_std` and allocation-free. Hardware access goes through
//! [`ScanPlatform`]; the `sim` feature adds an in-memory matrix for host
//! tools and tests.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod buffer;
pub mod config;
mod debounce;
pub mod decoder;
mod deghost;
pub mod keycode;
pub mod keymap;
pub mod matrix;
pub mod notify;
pub mod platform;
pub mod report;
pub mod scanner;
pub mod signals;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(test)]
mod testkit;
#[cfg(test)]
mod scanner_props;

pub use buffer::KeyTransitionEvent;
pub use config::{ConfigError, KeyboardConfig, ScanTicks, ScanTimingBudget};
pub use debounce::DebounceState;
pub use decoder::KeyOutput;
pub use keycode::{KeyClass, KeyEntry, Keycode};
pub use keymap::{Combo, KeyMap, KeyPos, KeySet};
pub use notify::{Notification, Notifier};
pub use platform::{Pin, PinMask, ScanPlatform, WakeConfig};
pub use report::ReportMode;
pub use scanner::{ScanState, Scanner};
pub use signals::ScanSignals;
