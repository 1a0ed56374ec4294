//! Scan scheduler and the engine facade.
//!
//! The scheduler is a four-state machine driven by two interrupt sources:
//!
//! - `Inactive`: nothing armed.
//! - `Idle`: every row driven low, the wake controller watches the columns.
//! - `Scanning`: one row per tick until the cycle is complete.
//! - `StatusUpdate`: waits for the end of the cycle period, then either
//!   starts the next cycle or falls back to `Idle`.
//!
//! A full scan visits every row. A partial scan visits only the rows that
//! changed or are still debouncing, while the quiet rows stay driven low
//! under the wake controller between cycles. A wake during partial scanning
//! forces the next cycle to be a full scan. After a full scan that found
//! nothing new, full scans continue until the global settle counter runs
//! out so that a second, slightly later press is not missed.

use crate::buffer::EventBuffer;
use crate::config::{ConfigError, KeyboardConfig, ScanTicks, MIN_TICK_US};
use crate::debounce::{DebouncePool, DebounceState};
use crate::decoder::{KeyDecoder, KeyOutput};
use crate::deghost;
use crate::keymap::KeyPos;
use crate::matrix::{MatrixDriver, ScanMatrix, ScanWord};
use crate::notify::{Notification, Notifier};
use crate::platform::{PinMask, ScanPlatform, WakeConfig};
use crate::report::{PasscodeStep, ReportController, ReportMode};
use crate::signals::ScanSignals;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanState {
    Inactive,
    Idle,
    Scanning,
    StatusUpdate,
}

/// State mutated by scanning: the matrix, the debounce pool and the event
/// buffer.
pub(crate) struct ScannerContext<const ROWS: usize, const SLOTS: usize, const BUF: usize> {
    pub(crate) matrix: ScanMatrix<ROWS>,
    pub(crate) debounce: DebouncePool<SLOTS, ROWS>,
    pub(crate) buffer: EventBuffer<BUF>,
}

/// Keyboard scanning engine.
///
/// `ROWS` × `COLS` is the matrix size, `SLOTS` the number of keys that can
/// debounce at once and `BUF` the event buffer capacity.
///
/// Interrupt handlers raise flags on the shared [`ScanSignals`]; the
/// application calls [`poll`](Self::poll) afterwards, from the interrupt or
/// from its main loop. When the scanner is shared between an interrupt and
/// the main loop, wrap it in a `critical_section::Mutex<RefCell<_>>`.
pub struct Scanner<'a, P, N, const ROWS: usize, const COLS: usize, const SLOTS: usize, const BUF: usize> {
    platform: P,
    notifier: N,
    signals: &'a ScanSignals,
    config: KeyboardConfig<'a, ROWS, COLS>,
    ticks: ScanTicks,
    columns: PinMask,
    driver: MatrixDriver<ROWS, COLS>,
    ctx: ScannerContext<ROWS, SLOTS, BUF>,
    decoder: KeyDecoder,
    report: ReportController,
    state: ScanState,
    full_scan: bool,
    next_is_full_scan: bool,
    /// Reasons to keep scanning: a busy debounce slot, a running settle count.
    busy: u8,
    global_settle: u16,
    scan_wake_armed: bool,
    cycle_remaining_us: u32,
}

impl<'a, P, N, const ROWS: usize, const COLS: usize, const SLOTS: usize, const BUF: usize>
    Scanner<'a, P, N, ROWS, COLS, SLOTS, BUF>
where
    P: ScanPlatform,
    N: Notifier,
{
    /// Validate `config` and build a stopped engine.
    pub fn new(
        mut platform: P,
        notifier: N,
        signals: &'a ScanSignals,
        config: KeyboardConfig<'a, ROWS, COLS>,
    ) -> Result<Self, ConfigError> {
        let ticks = config.validate()?;
        debug!(
            "debounce ticks: press {}, release {}, settle {}",
            ticks.press,
            ticks.release,
            ticks.global_settle
        );

        platform.stop_tick();
        platform.disarm_wake();
        critical_section::with(|cs| signals.clear(cs));

        Ok(Self {
            platform,
            notifier,
            signals,
            ticks,
            columns: PinMask::from_pins(&config.columns),
            driver: MatrixDriver::new(config.rows, config.columns),
            ctx: ScannerContext {
                matrix: ScanMatrix::new(COLS),
                debounce: DebouncePool::new(),
                buffer: EventBuffer::new(),
            },
            decoder: KeyDecoder::new(),
            report: ReportController::new(config.passcode_enter_key),
            config,
            state: ScanState::Inactive,
            full_scan: false,
            next_is_full_scan: false,
            busy: 0,
            global_settle: 0,
            scan_wake_armed: false,
            cycle_remaining_us: 0,
        })
    }

    /// Leave `Inactive`: configure the matrix for wake-up and wait in `Idle`.
    pub fn start(&mut self) {
        if self.state != ScanState::Inactive {
            return;
        }
        self.enable_wake();
        self.set_state(ScanState::Idle);
    }

    /// Cancel an active scan, return to `Idle` and drop buffered events.
    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        critical_section::with(|cs| {
            self.platform.stop_tick();
            self.signals.clear(cs);
            self.disarm_scan_wake();
            self.enable_wake();
            self.set_state(ScanState::Idle);
        });
        self.ctx.buffer.flush();
    }

    /// Release the matrix and disarm everything.
    pub fn power_down(&mut self) {
        critical_section::with(|cs| {
            self.platform.stop_tick();
            self.platform.disarm_wake();
            self.scan_wake_armed = false;
            self.driver.rows_high_z(&mut self.platform);
            self.signals.clear(cs);
            self.set_state(ScanState::Inactive);
        });
    }

    /// Restore the idle pin setup after the system slept with GPIO state
    /// lost.
    pub fn reinit_io_after_wake(&mut self) {
        if self.is_idle() {
            self.driver.columns_pullup(&mut self.platform);
            self.driver.rows_low(&mut self.platform);
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ScanState::Idle
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ScanState::Scanning | ScanState::StatusUpdate)
    }

    /// Service pending tick and wake signals.
    pub fn poll(&mut self) {
        match self.state {
            ScanState::Inactive => critical_section::with(|cs| self.signals.clear(cs)),
            ScanState::Idle => {
                // No tick runs while idle; a pending one is stale.
                self.signals.take_tick();
                critical_section::with(|cs| {
                    if self.signals.take_wake(cs) {
                        self.begin_scanning();
                    }
                });
            }
            ScanState::Scanning => {
                if self.signals.take_tick() {
                    self.cycle_remaining_us = self
                        .cycle_remaining_us
                        .saturating_sub(self.config.timing.row_settle_us);
                    if self.scan_step() {
                        self.set_state(ScanState::StatusUpdate);
                    }
                }
            }
            ScanState::StatusUpdate => {
                if self.report.mode() == ReportMode::Disabled {
                    self.prepare_passcode();
                }
                if self.signals.take_tick() {
                    if self.update_status() {
                        self.set_state(ScanState::Scanning);
                        self.driver.restart();
                        if self.scan_step() {
                            self.set_state(ScanState::StatusUpdate);
                        }
                    } else {
                        critical_section::with(|_| {
                            self.enable_wake();
                            self.set_state(ScanState::Idle);
                        });
                    }
                }
            }
        }
    }

    fn set_state(&mut self, state: ScanState) {
        if self.state != state {
            trace!("scan state {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn wake_config(&self, debounce_ms: u8) -> WakeConfig {
        WakeConfig {
            pins: self.columns,
            active_low: self.columns,
            event_count: 1,
            debounce_ms,
        }
    }

    /// Idle setup: pulled-up columns, all rows low, wake on any column.
    fn enable_wake(&mut self) {
        self.driver.columns_pullup(&mut self.platform);
        self.driver.rows_low(&mut self.platform);
        let config = self.wake_config(self.config.wake_debounce_ms);
        self.platform.arm_wake(config);
    }

    fn disarm_scan_wake(&mut self) {
        if self.scan_wake_armed {
            self.scan_wake_armed = false;
            self.platform.disarm_wake();
        }
    }

    fn begin_scanning(&mut self) {
        self.platform.disarm_wake();
        self.ctx.matrix.reset();
        self.ctx.debounce.reset();
        self.decoder.reset();
        self.busy = 0;
        self.global_settle = 0;
        self.next_is_full_scan = false;
        self.scan_wake_armed = false;
        self.full_scan = true;
        self.driver.restart();
        self.start_cycle();
        self.driver.rows_high_z(&mut self.platform);
        self.set_state(ScanState::Scanning);
    }

    /// Reset the cycle budget and tick once per row.
    fn start_cycle(&mut self) {
        self.cycle_remaining_us = self.config.timing.cycle_us(self.full_scan);
        self.platform.start_tick(self.config.timing.row_settle_us);
    }

    /// One row step. Returns `true` when the cycle is complete.
    fn scan_step(&mut self) -> bool {
        let done = self.driver.step(
            &mut self.platform,
            &mut self.ctx.matrix,
            self.ctx.debounce.bounce_rows(),
            self.full_scan,
        );
        if done {
            self.finish_cycle();
        }
        done
    }

    fn finish_cycle(&mut self) {
        self.process_scan();

        self.busy = self.ctx.debounce.tick() as u8;
        if self.global_settle > 0 {
            self.global_settle -= 1;
            self.busy += 1;
        }

        // Quiet rows go back under the wake controller until the next cycle.
        let config = self.wake_config(0);
        self.platform.arm_wake(config);
        self.scan_wake_armed = true;
        self.driver.quiet_rows_low(&mut self.platform, &self.ctx.matrix);

        self.platform
            .start_tick(self.cycle_remaining_us.max(MIN_TICK_US));
    }

    /// Debounce the sampled rows, then deghost and record what settled.
    fn process_scan(&mut self) {
        let keymap = self.config.keymap;
        let matrix = &mut self.ctx.matrix;
        let mut new_status = matrix.sampled;

        for row in 0..ROWS {
            let changed =
                (matrix.stable[row] ^ matrix.sampled[row]) | self.ctx.debounce.bounce_rows()[row];
            matrix.active[row] = changed != 0;
            for col in (0..COLS).rev().filter(|c| changed & (1 << c) != 0) {
                let pos = KeyPos::new(row as u8, col as u8);
                let bit: ScanWord = 1 << col;
                let pressed = new_status[row] & bit == 0;
                let accepted = keymap.is_key(pos)
                    && self.ctx.debounce.debounce(
                        pos,
                        pressed,
                        matrix.stable[row],
                        &mut matrix.sampled[row],
                        &self.ticks,
                    );
                if !accepted {
                    new_status[row] = (new_status[row] & !bit) | (matrix.stable[row] & bit);
                }
            }
        }

        for row in 0..ROWS {
            let changed = self.ctx.matrix.stable[row] ^ new_status[row];
            for col in (0..COLS).rev().filter(|c| changed & (1 << c) != 0) {
                let pos = KeyPos::new(row as u8, col as u8);
                let bit: ScanWord = 1 << col;
                if !self.record_key(pos, new_status[row] & bit == 0) {
                    new_status[row] = (new_status[row] & !bit) | (self.ctx.matrix.stable[row] & bit);
                }
            }
        }

        self.ctx.matrix.stable = new_status;
    }

    /// Deghost a settled transition and hand it to the decoder. Returns
    /// `false` when the reported state must not change.
    fn record_key(&mut self, pos: KeyPos, pressed: bool) -> bool {
        let keymap = &self.config.keymap;
        if !keymap.is_key(pos) {
            return false;
        }
        if pressed && deghost::is_ghost(keymap, pos, &self.ctx.matrix.sampled, &self.ctx.matrix.stable) {
            return false;
        }
        self.decoder.record(
            keymap,
            self.config.combos,
            self.config.has_fn_lock,
            self.report.mode() == ReportMode::Disabled,
            &mut self.ctx.buffer,
            &mut self.notifier,
            pos,
            pressed,
        );
        true
    }

    /// End-of-period bookkeeping. Returns whether to scan another cycle.
    fn update_status(&mut self) -> bool {
        self.platform.stop_tick();

        critical_section::with(|cs| {
            self.disarm_scan_wake();
            if self.signals.take_wake(cs) {
                self.next_is_full_scan = true;
            }
        });

        if self.full_scan {
            if !self.ctx.matrix.new_key_detected {
                if self.global_settle == 0 {
                    self.busy = 1;
                    self.global_settle = self.ticks.global_settle;
                } else if self.global_settle == 1 {
                    self.busy = self.busy.saturating_sub(1);
                    self.global_settle = 0;
                    self.full_scan = false;
                }
            } else {
                self.global_settle = 0;
                self.full_scan = self.next_is_full_scan;
            }
        } else {
            self.full_scan = self.next_is_full_scan;
        }
        self.ctx.matrix.new_key_detected = false;

        self.start_cycle();
        self.driver.rows_high_z(&mut self.platform);

        if self.next_is_full_scan {
            self.next_is_full_scan = false;
            true
        } else if self.busy > 0 || self.config.scan_always_active {
            true
        } else {
            self.platform.stop_tick();
            false
        }
    }

    /// Next decoded keycode, if reporting is enabled.
    ///
    /// After an overflow the buffer is discarded and a single
    /// [`KeyOutput::FullRelease`] is returned.
    pub fn next_keycode(&mut self) -> KeyOutput {
        if self.report.mode() == ReportMode::Paused {
            return KeyOutput::Empty;
        }
        if self.ctx.buffer.take_overflow() {
            self.ctx.buffer.flush();
            return KeyOutput::FullRelease;
        }
        if self.report.mode() == ReportMode::Enabled {
            while let Some(event) = self.ctx.buffer.pop() {
                if let Some(output) = self.decoder.decode(&self.config.keymap, self.config.has_fn_lock, &event) {
                    return output;
                }
            }
        }
        KeyOutput::Empty
    }

    /// Drain buffered releases into the passcode while capturing one. Stops
    /// at the enter key, which switches to reporting.
    pub fn prepare_passcode(&mut self) {
        if self.report.mode() != ReportMode::Disabled {
            return;
        }
        while let Some(event) = self.ctx.buffer.pop() {
            if event.pressed {
                continue;
            }
            let entry = self.decoder.entry(&self.config.keymap, self.config.has_fn_lock, &event);
            if let PasscodeStep::Entered(_) = self.report.accumulate(entry) {
                self.notifier.notify(Notification::PasscodeEntered);
                break;
            }
        }
    }

    pub fn current_passcode(&self) -> u32 {
        self.report.passcode()
    }

    pub fn report_mode(&self) -> ReportMode {
        self.report.mode()
    }

    pub fn start_reporting(&mut self) {
        self.report.start_reporting();
    }

    /// Capture a passcode. Clears the previous one and any Fn-lock.
    pub fn start_passcode(&mut self) {
        self.report.start_passcode();
        if self.decoder.release_fn_lock() {
            self.notifier.notify(Notification::FnLockReleased);
        }
    }

    pub fn stop_reporting(&mut self) {
        self.report.stop_reporting();
    }

    pub fn fn_locked(&self) -> bool {
        self.decoder.fn_locked()
    }

    /// Debounce state of the key at `pos`.
    pub fn debounce_state(&self, pos: KeyPos) -> DebounceState {
        self.ctx.debounce.state_of(pos)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.ctx.buffer.is_empty() || self.ctx.buffer.has_overflowed()
    }

    pub fn flush_buffer(&mut self) {
        self.ctx.buffer.flush();
    }

    pub fn ticks(&self) -> &ScanTicks {
        &self.ticks
    }

    pub fn signals(&self) -> &'a ScanSignals {
        self.signals
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }
}
