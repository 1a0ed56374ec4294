//! In-memory matrix for host-side runs.
//!
//! Rows live on port 0 and columns on port 1, pin n for index n. A column
//! reads low when a pressed key connects it to a row driven low; the matrix
//! is modelled with diodes, so there is no electrical ghosting. The wake
//! controller fires as soon as an armed column reads at its active level.
//!
//! Time is simulated: the tick source is periodic from the moment it is
//! started, and [`Scanner::run_until`] delivers every tick that falls due.

use crate::notify::Notifier;
use crate::platform::{Pin, ScanPlatform, WakeConfig};
use crate::scanner::Scanner;
use crate::signals::ScanSignals;

pub const ROW_PORT: u8 = 0;
pub const COLUMN_PORT: u8 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RowDrive {
    HighZ,
    Low,
    High,
}

pub struct SimMatrix<'a, const ROWS: usize, const COLS: usize> {
    signals: &'a ScanSignals,
    keys: [[bool; COLS]; ROWS],
    rows: [RowDrive; ROWS],
    pullups: [bool; COLS],
    wake: Option<WakeConfig>,
    tick: Option<SimTick>,
    now_us: u64,
    wake_count: u32,
}

#[derive(Copy, Clone, Debug)]
struct SimTick {
    period_us: u32,
    due_us: u64,
}

impl<'a, const ROWS: usize, const COLS: usize> SimMatrix<'a, ROWS, COLS> {
    pub fn new(signals: &'a ScanSignals) -> Self {
        Self {
            signals,
            keys: [[false; COLS]; ROWS],
            rows: [RowDrive::HighZ; ROWS],
            pullups: [false; COLS],
            wake: None,
            tick: None,
            now_us: 0,
            wake_count: 0,
        }
    }

    pub fn row_pins() -> [Pin; ROWS] {
        core::array::from_fn(|i| Pin::new(ROW_PORT, i as u8))
    }

    pub fn column_pins() -> [Pin; COLS] {
        core::array::from_fn(|i| Pin::new(COLUMN_PORT, i as u8))
    }

    pub fn press(&mut self, row: usize, col: usize) {
        self.set_key(row, col, true);
    }

    pub fn release(&mut self, row: usize, col: usize) {
        self.set_key(row, col, false);
    }

    pub fn set_key(&mut self, row: usize, col: usize, pressed: bool) {
        self.keys[row][col] = pressed;
        self.evaluate_wake();
    }

    pub fn tick_period(&self) -> Option<u32> {
        self.tick.map(|t| t.period_us)
    }

    /// When the next tick fires, if one is running.
    pub fn next_tick_us(&self) -> Option<u64> {
        self.tick.map(|t| t.due_us)
    }

    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    /// Fire the pending tick: advance the clock to it and schedule the next.
    fn fire_tick(&mut self) -> bool {
        let Some(tick) = self.tick.as_mut() else {
            return false;
        };
        self.now_us = tick.due_us;
        tick.due_us += tick.period_us.max(1) as u64;
        self.signals.raise_tick();
        true
    }

    pub fn wake_armed(&self) -> bool {
        self.wake.is_some()
    }

    /// Number of times the wake controller fired.
    pub fn wake_count(&self) -> u32 {
        self.wake_count
    }

    pub fn has_pullup(&self, col: usize) -> bool {
        self.pullups[col]
    }

    pub fn row_drive(&self, row: usize) -> RowDrive {
        self.rows[row]
    }

    fn column_level(&self, col: usize) -> bool {
        !(0..ROWS).any(|row| self.keys[row][col] && self.rows[row] == RowDrive::Low)
    }

    fn evaluate_wake(&mut self) {
        let Some(config) = self.wake else {
            return;
        };
        let fired = (0..COLS).any(|col| {
            let pin = Pin::new(COLUMN_PORT, col as u8);
            config.pins.contains(pin) && self.column_level(col) != config.active_low.contains(pin)
        });
        if fired {
            self.wake = None;
            self.wake_count += 1;
            self.signals.raise_wake();
        }
    }

    fn index(pin: Pin, port: u8, len: usize) -> Option<usize> {
        (pin.port == port && (pin.pin as usize) < len).then_some(pin.pin as usize)
    }
}

impl<const ROWS: usize, const COLS: usize> ScanPlatform for SimMatrix<'_, ROWS, COLS> {
    fn set_output(&mut self, pin: Pin, high: bool) {
        if let Some(row) = Self::index(pin, ROW_PORT, ROWS) {
            self.rows[row] = if high { RowDrive::High } else { RowDrive::Low };
            self.evaluate_wake();
        }
    }

    fn set_high_impedance(&mut self, pin: Pin) {
        if let Some(row) = Self::index(pin, ROW_PORT, ROWS) {
            self.rows[row] = RowDrive::HighZ;
        }
    }

    fn set_input_pullup(&mut self, pin: Pin) {
        if let Some(col) = Self::index(pin, COLUMN_PORT, COLS) {
            self.pullups[col] = true;
        }
    }

    fn read_level(&mut self, pin: Pin) -> bool {
        match Self::index(pin, COLUMN_PORT, COLS) {
            Some(col) => self.column_level(col),
            None => true,
        }
    }

    fn arm_wake(&mut self, config: WakeConfig) {
        self.wake = Some(config);
        self.evaluate_wake();
    }

    fn disarm_wake(&mut self) {
        self.wake = None;
    }

    fn start_tick(&mut self, period_us: u32) {
        self.tick = Some(SimTick {
            period_us,
            due_us: self.now_us + period_us.max(1) as u64,
        });
    }

    fn stop_tick(&mut self) {
        self.tick = None;
    }
}

impl<'a, N, const ROWS: usize, const COLS: usize, const SLOTS: usize, const BUF: usize>
    Scanner<'a, SimMatrix<'a, ROWS, COLS>, N, ROWS, COLS, SLOTS, BUF>
where
    N: Notifier,
{
    /// Deliver the next tick, or only poll when no tick is running.
    /// Returns whether a tick was delivered.
    pub fn step(&mut self) -> bool {
        let fired = self.platform_mut().fire_tick();
        self.poll();
        fired
    }

    /// Run the simulation up to `deadline_us`, delivering every tick that
    /// falls due on the way.
    pub fn run_until(&mut self, deadline_us: u64) {
        loop {
            self.poll();
            match self.platform().next_tick_us() {
                Some(due) if due <= deadline_us => {
                    self.platform_mut().fire_tick();
                }
                _ => break,
            }
        }
        let platform = self.platform_mut();
        platform.now_us = platform.now_us.max(deadline_us);
    }

    pub fn run_for(&mut self, duration_us: u32) {
        let deadline = self.platform().now_us() + duration_us as u64;
        self.run_until(deadline);
    }
}
