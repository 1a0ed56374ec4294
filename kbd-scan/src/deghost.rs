//! Ghost-key rejection.
//!
//! Without diodes, three pressed keys on two rows and two columns pull the
//! fourth intersection low as well. A press is withheld when it completes
//! such a rectangle with keys that are all wired in the keymap; it is
//! offered again on later cycles until the rectangle breaks up.

use crate::keymap::{KeyMap, KeyPos};
use crate::matrix::ScanWord;

/// Whether a press at `pos` would complete a rectangle of mapped keys.
///
/// `sampled` holds this cycle's rows (pinned for debouncing keys) and
/// `stable` the last reported rows, both with 0 = pressed.
pub(crate) fn is_ghost<const ROWS: usize, const COLS: usize>(
    keymap: &KeyMap<'_, ROWS, COLS>,
    pos: KeyPos,
    sampled: &[ScanWord; ROWS],
    stable: &[ScanWord; ROWS],
) -> bool {
    let row = pos.row as usize;
    let col = pos.col as usize;
    let bit: ScanWord = 1 << col;
    let pressed = |word: ScanWord, c: usize| word & (1 << c) == 0;

    let corners_mapped = |other_row: usize, other_col: usize| {
        let key = |r: usize, c: usize| keymap.is_key(KeyPos::new(r as u8, c as u8));
        key(row, other_col) && key(other_row, col) && key(other_row, other_col)
    };

    // Another column pressed in this row, and another row pressed on
    // either column.
    for other_col in (0..COLS).filter(|&c| c != col && pressed(sampled[row], c)) {
        let pair = bit | (1 << other_col);
        for other_row in (0..ROWS).filter(|&r| r != row) {
            if !sampled[other_row] & pair != 0 && corners_mapped(other_row, other_col) {
                trace!("ghost at {}.{} via row {} col {}", row, col, other_row, other_col);
                return true;
            }
        }
    }

    // Another row pressed on this column, and another column pressed on
    // either row.
    for other_row in (0..ROWS).filter(|&r| r != row && pressed(sampled[r], col)) {
        for other_col in (0..COLS).filter(|&c| c != col) {
            let either = pressed(stable[row], other_col) || pressed(sampled[other_row], other_col);
            if either && corners_mapped(other_row, other_col) {
                trace!("ghost at {}.{} via row {} col {}", row, col, other_row, other_col);
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycode::{KeyEntry, Keycode};
    use crate::keymap::KeySet;

    const K: KeyEntry = KeyEntry::key(Keycode::A);
    const ___: KeyEntry = KeyEntry::UNUSED;

    static FULL: [KeySet<3, 3>; 1] = [[[K, K, K], [K, K, K], [K, K, K]]];
    static HOLE: [KeySet<3, 3>; 1] = [[[K, K, K], [K, ___, K], [K, K, K]]];

    const UP: ScanWord = 0b111;

    fn rows(pressed: &[(usize, usize)]) -> [ScanWord; 3] {
        let mut words = [UP; 3];
        for &(r, c) in pressed {
            words[r] &= !(1 << c);
        }
        words
    }

    #[test]
    fn test_fourth_corner_is_ghost() {
        let map = KeyMap::new(&FULL);
        let sampled = rows(&[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let stable = rows(&[(0, 0), (0, 1), (1, 0)]);
        assert!(is_ghost(&map, KeyPos::new(1, 1), &sampled, &stable));
    }

    #[test]
    fn test_third_key_of_l_shape_is_withheld() {
        let map = KeyMap::new(&FULL);
        let stable = rows(&[(0, 0), (0, 1)]);
        let sampled = rows(&[(0, 0), (0, 1), (1, 0)]);
        assert!(is_ghost(&map, KeyPos::new(1, 0), &sampled, &stable));
    }

    #[test]
    fn test_unmapped_corner_is_not_ghost() {
        let map = KeyMap::new(&HOLE);
        let stable = rows(&[(0, 0), (0, 1)]);
        let sampled = rows(&[(0, 0), (0, 1), (1, 0)]);
        assert!(!is_ghost(&map, KeyPos::new(1, 0), &sampled, &stable));
    }

    #[test]
    fn test_diagonal_and_same_row_pass() {
        let map = KeyMap::new(&FULL);
        let sampled = rows(&[(0, 0), (1, 1)]);
        assert!(!is_ghost(&map, KeyPos::new(1, 1), &sampled, &rows(&[(0, 0)])));

        let sampled = rows(&[(2, 0), (2, 1), (2, 2)]);
        assert!(!is_ghost(&map, KeyPos::new(2, 2), &sampled, &rows(&[(2, 0), (2, 1)])));
    }
}
