//! Matrix state and the pipelined row driver.
//!
//! Rows are outputs driven low one at a time, columns are inputs with
//! pull-ups. A row word holds one bit per column with the active-low
//! convention of the hardware: 1 = released, 0 = pressed.
//!
//! Each tick services one row: the row driven on the previous tick is
//! sampled and released, the next row is driven, and the sampled levels are
//! folded into the row word while the new row settles.

use crate::platform::{Pin, ScanPlatform};

/// One row's column bits.
pub type ScanWord = u32;

/// Widest matrix a row word can hold.
pub const MAX_COLS: usize = ScanWord::BITS as usize;

/// Per-row stable and sampled words.
pub(crate) struct ScanMatrix<const ROWS: usize> {
    /// Last reported state.
    pub(crate) stable: [ScanWord; ROWS],
    /// This cycle's reads, with debouncing keys pinned.
    pub(crate) sampled: [ScanWord; ROWS],
    /// Rows that changed or are still debouncing.
    pub(crate) active: [bool; ROWS],
    /// All columns released.
    pub(crate) released: ScanWord,
    /// A row showed a press the debounce pool did not know about.
    pub(crate) new_key_detected: bool,
}

impl<const ROWS: usize> ScanMatrix<ROWS> {
    pub(crate) const fn new(cols: usize) -> Self {
        let released = if cols >= MAX_COLS {
            ScanWord::MAX
        } else {
            (1 << cols) - 1
        };
        Self {
            stable: [released; ROWS],
            sampled: [released; ROWS],
            active: [false; ROWS],
            released,
            new_key_detected: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.stable = [self.released; ROWS];
        self.sampled = [self.released; ROWS];
        self.active = [false; ROWS];
        self.new_key_detected = false;
    }

    /// Rows that can be left to the wake controller: not active and
    /// nothing pressed in the last sample.
    pub(crate) fn is_quiet(&self, row: usize) -> bool {
        !self.active[row] && self.sampled[row] == self.released
    }
}

/// Walks the rows of one scan cycle.
pub(crate) struct MatrixDriver<const ROWS: usize, const COLS: usize> {
    rows: [Pin; ROWS],
    columns: [Pin; COLS],
    /// Next row to consider.
    cursor: usize,
    /// Row driven on the previous tick, sampled on this one.
    driven: Option<usize>,
}

impl<const ROWS: usize, const COLS: usize> MatrixDriver<ROWS, COLS> {
    pub(crate) const fn new(rows: [Pin; ROWS], columns: [Pin; COLS]) -> Self {
        Self {
            rows,
            columns,
            cursor: 0,
            driven: None,
        }
    }

    /// Start a new cycle at row 0.
    pub(crate) fn restart(&mut self) {
        self.cursor = 0;
        self.driven = None;
    }

    /// Service one tick. Partial scans skip rows that are not active.
    /// Returns `true` once every row of the cycle has been sampled.
    pub(crate) fn step<P: ScanPlatform>(
        &mut self,
        platform: &mut P,
        matrix: &mut ScanMatrix<ROWS>,
        bounce_rows: &[ScanWord; ROWS],
        full_scan: bool,
    ) -> bool {
        let mut next = self.cursor;
        if !full_scan {
            while next < ROWS && !matrix.active[next] {
                next += 1;
            }
        }

        let prev = self.driven.take();
        let mut levels = [true; COLS];
        if let Some(prev) = prev {
            for (level, col) in levels.iter_mut().zip(self.columns.iter()) {
                *level = platform.read_level(*col);
            }
            platform.set_high_impedance(self.rows[prev]);
        }

        if next < ROWS {
            platform.set_output(self.rows[next], false);
            self.driven = Some(next);
        }
        self.cursor = next + 1;

        // Convert while the next row settles.
        if let Some(prev) = prev {
            let word = levels
                .iter()
                .enumerate()
                .fold(0, |word, (col, high)| word | ((*high as ScanWord) << col));
            if !word & matrix.released != bounce_rows[prev] {
                matrix.new_key_detected = true;
            }
            matrix.sampled[prev] = word;
        }

        next >= ROWS
    }

    pub(crate) fn columns_pullup<P: ScanPlatform>(&self, platform: &mut P) {
        for col in &self.columns {
            platform.set_input_pullup(*col);
        }
    }

    /// Drive every row low so any key pulls its column down.
    pub(crate) fn rows_low<P: ScanPlatform>(&self, platform: &mut P) {
        for row in &self.rows {
            platform.set_output(*row, false);
        }
    }

    pub(crate) fn rows_high_z<P: ScanPlatform>(&self, platform: &mut P) {
        for row in &self.rows {
            platform.set_high_impedance(*row);
        }
    }

    /// Drive the quiet rows low so the wake controller watches them while
    /// only the active rows are scanned.
    pub(crate) fn quiet_rows_low<P: ScanPlatform>(&self, platform: &mut P, matrix: &ScanMatrix<ROWS>) {
        for (i, row) in self.rows.iter().enumerate() {
            if matrix.is_quiet(i) {
                platform.set_output(*row, false);
            }
        }
    }
}
