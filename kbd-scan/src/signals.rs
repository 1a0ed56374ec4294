//! Pending flags shared between interrupt handlers and the scheduler.

use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};

/// Tick and wake flags raised from interrupt context.
///
/// Meant to live in a `static`; interrupt handlers call
/// [`raise_tick`](Self::raise_tick) or [`raise_wake`](Self::raise_wake) and
/// the application then calls [`Scanner::poll`](crate::Scanner::poll).
pub struct ScanSignals {
    tick: Mutex<Cell<bool>>,
    wake: Mutex<Cell<bool>>,
}

impl ScanSignals {
    pub const fn new() -> Self {
        Self {
            tick: Mutex::new(Cell::new(false)),
            wake: Mutex::new(Cell::new(false)),
        }
    }

    /// Periodic tick elapsed.
    pub fn raise_tick(&self) {
        critical_section::with(|cs| self.tick.borrow(cs).set(true));
    }

    /// Wake controller saw matrix activity.
    pub fn raise_wake(&self) {
        critical_section::with(|cs| self.wake.borrow(cs).set(true));
    }

    pub fn tick_pending(&self) -> bool {
        critical_section::with(|cs| self.tick.borrow(cs).get())
    }

    pub fn wake_pending(&self) -> bool {
        critical_section::with(|cs| self.wake.borrow(cs).get())
    }

    pub(crate) fn take_tick(&self) -> bool {
        critical_section::with(|cs| self.tick.borrow(cs).replace(false))
    }

    pub(crate) fn take_wake(&self, cs: CriticalSection) -> bool {
        self.wake.borrow(cs).replace(false)
    }

    pub(crate) fn clear(&self, cs: CriticalSection) {
        self.tick.borrow(cs).set(false);
        self.wake.borrow(cs).set(false);
    }
}

impl Default for ScanSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SIGNALS: ScanSignals = ScanSignals::new();

    #[test]
    fn test_flags_are_taken_once() {
        SIGNALS.raise_tick();
        assert!(SIGNALS.tick_pending());
        assert!(SIGNALS.take_tick());
        assert!(!SIGNALS.take_tick());

        SIGNALS.raise_wake();
        critical_section::with(|cs| {
            assert!(SIGNALS.take_wake(cs));
            assert!(!SIGNALS.take_wake(cs));
        });
    }
}
