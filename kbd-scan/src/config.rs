//! Engine configuration and the timing budget.

use core::fmt;

use crate::keycode::KeyEntry;
use crate::keymap::{Combo, KeyMap, MAX_COMBOS};
use crate::matrix::MAX_COLS;
use crate::platform::Pin;

/// Minimum period the tick source is restarted with after the last row.
pub const MIN_TICK_US: u32 = 20;

/// Scan timing, all in microseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanTimingBudget {
    /// Time a driven row needs before its columns can be sampled.
    pub row_settle_us: u32,
    /// Period of a cycle that visits every row.
    pub full_scan_cycle_us: u32,
    /// Period of a cycle that visits only the active rows.
    pub partial_scan_cycle_us: u32,
    pub press_debounce_us: u32,
    pub release_debounce_us: u32,
}

impl Default for ScanTimingBudget {
    fn default() -> Self {
        Self {
            row_settle_us: 150,
            full_scan_cycle_us: 3_000,
            partial_scan_cycle_us: 3_000,
            press_debounce_us: 12_000,
            release_debounce_us: 24_000,
        }
    }
}

/// Debounce budgets converted to scan-cycle counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanTicks {
    pub press: u16,
    pub release: u16,
    /// Full-scan cycles kept after activity stops.
    pub global_settle: u16,
}

impl ScanTimingBudget {
    /// Convert the budget to cycle counts for a matrix with `rows` rows.
    ///
    /// A transition may be first sampled late in a full scan and confirmed
    /// early in a partial one, so one row sweep is added to each debounce
    /// duration before dividing by the partial period.
    pub fn ticks(&self, rows: usize) -> Result<ScanTicks, ConfigError> {
        if self.row_settle_us == 0 || self.full_scan_cycle_us == 0 || self.partial_scan_cycle_us == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.partial_scan_cycle_us > self.full_scan_cycle_us {
            return Err(ConfigError::PartialScanSlowerThanFull {
                partial_us: self.partial_scan_cycle_us,
                full_us: self.full_scan_cycle_us,
            });
        }
        let sweep = (rows as u64 + 1) * self.row_settle_us as u64;
        if sweep > self.partial_scan_cycle_us as u64 {
            return Err(ConfigError::RowSettleExceedsCycle {
                row_settle_us: self.row_settle_us,
                rows,
            });
        }

        let skew = rows as u64 * self.row_settle_us as u64;
        let press = cycles(self.press_debounce_us as u64 + skew, self.partial_scan_cycle_us);
        let release = cycles(self.release_debounce_us as u64 + skew, self.partial_scan_cycle_us);
        Ok(ScanTicks {
            press,
            release,
            global_settle: press.saturating_add(1),
        })
    }

    pub(crate) fn cycle_us(&self, full_scan: bool) -> u32 {
        if full_scan {
            self.full_scan_cycle_us
        } else {
            self.partial_scan_cycle_us
        }
    }
}

fn cycles(duration_us: u64, period_us: u32) -> u16 {
    let n = duration_us.div_ceil(period_us as u64);
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Everything the engine needs at construction.
#[derive(Copy, Clone, Debug)]
pub struct KeyboardConfig<'a, const ROWS: usize, const COLS: usize> {
    /// Row outputs, driven low one at a time.
    pub rows: [Pin; ROWS],
    /// Column inputs with pull-ups; low means pressed.
    pub columns: [Pin; COLS],
    pub timing: ScanTimingBudget,
    pub keymap: KeyMap<'a, ROWS, COLS>,
    pub combos: &'a [Combo],
    /// Fn becomes sticky when tapped without another key in between.
    pub has_fn_lock: bool,
    /// Never fall back to wake-controller idle.
    pub scan_always_active: bool,
    /// Extra key that ends passcode entry, besides Enter and keypad Enter.
    pub passcode_enter_key: Option<KeyEntry>,
    /// Hardware debounce of the idle wake controller.
    pub wake_debounce_ms: u8,
}

impl<'a, const ROWS: usize, const COLS: usize> KeyboardConfig<'a, ROWS, COLS> {
    pub fn new(rows: [Pin; ROWS], columns: [Pin; COLS], keymap: KeyMap<'a, ROWS, COLS>) -> Self {
        Self {
            rows,
            columns,
            timing: ScanTimingBudget::default(),
            keymap,
            combos: &[],
            has_fn_lock: false,
            scan_always_active: false,
            passcode_enter_key: None,
            wake_debounce_ms: 0,
        }
    }

    /// Check the configuration and derive the debounce tick counts.
    pub fn validate(&self) -> Result<ScanTicks, ConfigError> {
        if COLS > MAX_COLS {
            return Err(ConfigError::TooManyColumns { columns: COLS });
        }
        if self.keymap.sets() == 0 {
            return Err(ConfigError::EmptyKeymap);
        }
        if self.combos.len() > MAX_COMBOS {
            return Err(ConfigError::TooManyCombinations { combos: self.combos.len() });
        }
        if let Some(pin) = self.rows.iter().chain(self.columns.iter()).find(|p| !p.in_range()) {
            return Err(ConfigError::PinOutOfRange { port: pin.port, pin: pin.pin });
        }
        self.timing.ticks(ROWS)
    }
}

/// Fatal configuration problems, reported once at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    PartialScanSlowerThanFull { partial_us: u32, full_us: u32 },
    ZeroPeriod,
    RowSettleExceedsCycle { row_settle_us: u32, rows: usize },
    TooManyColumns { columns: usize },
    EmptyKeymap,
    TooManyCombinations { combos: usize },
    PinOutOfRange { port: u8, pin: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PartialScanSlowerThanFull { partial_us, full_us } => write!(
                f,
                "partial scan period {partial_us} us exceeds full scan period {full_us} us"
            ),
            ConfigError::ZeroPeriod => f.write_str("scan periods must be non-zero"),
            ConfigError::RowSettleExceedsCycle { row_settle_us, rows } => write!(
                f,
                "{rows} rows at {row_settle_us} us settle time do not fit in a scan cycle"
            ),
            ConfigError::TooManyColumns { columns } => {
                write!(f, "{columns} columns, at most {MAX_COLS} supported")
            }
            ConfigError::EmptyKeymap => f.write_str("keymap has no modifier sets"),
            ConfigError::TooManyCombinations { combos } => {
                write!(f, "{combos} key combinations, at most {MAX_COMBOS} supported")
            }
            ConfigError::PinOutOfRange { port, pin } => {
                write!(f, "pin P{port}.{pin} is outside ports 0-3, pins 0-15")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ticks() {
        let ticks = ScanTimingBudget::default().ticks(4).unwrap();
        // (12000 + 600) / 3000 and (24000 + 600) / 3000, rounded up
        assert_eq!(ticks.press, 5);
        assert_eq!(ticks.release, 9);
        assert_eq!(ticks.global_settle, 6);
    }

    #[test]
    fn test_press_ticks_cover_row_sweep() {
        // A press first sampled on the last row of a full scan and confirmed
        // on the first row of a partial one loses a whole row sweep.
        let budget = ScanTimingBudget::default();
        for rows in 1..=8u32 {
            let ticks = budget.ticks(rows as usize).unwrap();
            let needed = budget.press_debounce_us + rows * budget.row_settle_us;
            let confirmed = u32::from(ticks.press) * budget.partial_scan_cycle_us;
            assert!(confirmed >= needed, "{rows} rows");
            assert!(confirmed - budget.partial_scan_cycle_us < needed, "{rows} rows");
        }
        // Counting down the full period instead would confirm after 9 ms.
        assert!(budget.ticks(4).unwrap().press > (12_000 - 3_000) / 3_000);
    }

    #[test]
    fn test_exact_division() {
        let budget = ScanTimingBudget {
            row_settle_us: 100,
            full_scan_cycle_us: 2_000,
            partial_scan_cycle_us: 1_000,
            press_debounce_us: 4_800,
            release_debounce_us: 0,
        };
        let ticks = budget.ticks(2).unwrap();
        assert_eq!(ticks.press, 5);
        assert_eq!(ticks.release, 1);
    }

    #[test]
    fn test_partial_slower_than_full() {
        let budget = ScanTimingBudget {
            partial_scan_cycle_us: 4_000,
            ..ScanTimingBudget::default()
        };
        assert_eq!(
            budget.ticks(4),
            Err(ConfigError::PartialScanSlowerThanFull {
                partial_us: 4_000,
                full_us: 3_000
            })
        );
    }

    #[test]
    fn test_zero_period() {
        let budget = ScanTimingBudget {
            row_settle_us: 0,
            ..ScanTimingBudget::default()
        };
        assert_eq!(budget.ticks(4), Err(ConfigError::ZeroPeriod));
    }

    #[test]
    fn test_rows_do_not_fit() {
        let budget = ScanTimingBudget {
            row_settle_us: 1_000,
            ..ScanTimingBudget::default()
        };
        assert_eq!(
            budget.ticks(3),
            Err(ConfigError::RowSettleExceedsCycle {
                row_settle_us: 1_000,
                rows: 3
            })
        );
        assert!(budget.ticks(2).is_ok());
    }

    #[test]
    fn test_saturating_ticks() {
        let budget = ScanTimingBudget {
            row_settle_us: 1,
            full_scan_cycle_us: 10,
            partial_scan_cycle_us: 10,
            press_debounce_us: u32::MAX,
            release_debounce_us: u32::MAX,
        };
        let ticks = budget.ticks(1).unwrap();
        assert_eq!(ticks.press, u16::MAX);
        assert_eq!(ticks.global_settle, u16::MAX);
    }
}
