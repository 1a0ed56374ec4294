//! Keymap lookup and multi-key combinations.

use crate::keycode::KeyEntry;

/// Maximum number of combinations a keyboard may define.
pub const MAX_COMBOS: usize = 16;

/// A matrix coordinate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyPos {
    pub row: u8,
    pub col: u8,
}

impl KeyPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// One modifier set: an entry per matrix position.
pub type KeySet<const ROWS: usize, const COLS: usize> = [[KeyEntry; COLS]; ROWS];

/// Modifier sets indexed by the latched Fn mask. Set 0 is the base layer
/// and alone decides which positions carry a key.
#[derive(Copy, Clone, Debug)]
pub struct KeyMap<'a, const ROWS: usize, const COLS: usize> {
    sets: &'a [KeySet<ROWS, COLS>],
}

impl<'a, const ROWS: usize, const COLS: usize> KeyMap<'a, ROWS, COLS> {
    pub const fn new(sets: &'a [KeySet<ROWS, COLS>]) -> Self {
        Self { sets }
    }

    /// Number of modifier sets.
    pub fn sets(&self) -> usize {
        self.sets.len()
    }

    /// Whether a key is wired at `pos`. Unused positions are ghosts.
    pub fn is_key(&self, pos: KeyPos) -> bool {
        !self.entry(0, pos).is_unused()
    }

    /// Entry at `pos` in modifier set `set`; unused when out of range.
    pub fn entry(&self, set: usize, pos: KeyPos) -> KeyEntry {
        self.sets
            .get(set)
            .and_then(|s| s.get(pos.row as usize))
            .and_then(|r| r.get(pos.col as usize))
            .copied()
            .unwrap_or(KeyEntry::UNUSED)
    }
}

/// Two keys that, held together, fire a custom action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Combo {
    pub keys: [KeyPos; 2],
    pub action: u8,
}

impl Combo {
    pub const fn new(first: KeyPos, second: KeyPos, action: u8) -> Self {
        Self {
            keys: [first, second],
            action,
        }
    }
}

/// Which keys of each combination are currently held.
#[derive(Clone, Debug, Default)]
pub(crate) struct ComboTracker {
    held: [u8; MAX_COMBOS],
}

impl ComboTracker {
    pub(crate) const fn new() -> Self {
        Self { held: [0; MAX_COMBOS] }
    }

    pub(crate) fn reset(&mut self) {
        self.held = [0; MAX_COMBOS];
    }

    /// Track a transition, calling `fired` with the action of every
    /// combination that became complete. Returns whether any fired.
    pub(crate) fn update(
        &mut self,
        combos: &[Combo],
        pos: KeyPos,
        pressed: bool,
        mut fired: impl FnMut(u8),
    ) -> bool {
        let mut any = false;
        for (combo, held) in combos.iter().zip(self.held.iter_mut()) {
            let Some(bit) = combo.keys.iter().position(|k| *k == pos) else {
                continue;
            };
            if pressed {
                *held |= 1 << bit;
            } else {
                *held &= !(1 << bit);
            }
            if *held == 0b11 {
                fired(combo.action);
                any = true;
            }
        }
        any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycode::Keycode;

    const ___: KeyEntry = KeyEntry::UNUSED;

    static SETS: [KeySet<2, 2>; 2] = [
        [
            [KeyEntry::key(Keycode::A), KeyEntry::key(Keycode::B)],
            [KeyEntry::fn_key(0x01), ___],
        ],
        [
            [KeyEntry::key(Keycode::F1), ___],
            [KeyEntry::fn_key(0x01), KeyEntry::key(Keycode::F2)],
        ],
    ];

    #[test]
    fn test_validity_uses_base_set() {
        let map = KeyMap::new(&SETS);
        assert!(map.is_key(KeyPos::new(0, 0)));
        assert!(map.is_key(KeyPos::new(1, 0)));
        assert!(!map.is_key(KeyPos::new(1, 1)));
    }

    #[test]
    fn test_entry_out_of_range() {
        let map = KeyMap::new(&SETS);
        assert_eq!(map.entry(1, KeyPos::new(0, 0)), KeyEntry::key(Keycode::F1));
        assert_eq!(map.entry(2, KeyPos::new(0, 0)), KeyEntry::UNUSED);
        assert_eq!(map.entry(0, KeyPos::new(5, 0)), KeyEntry::UNUSED);
    }

    #[test]
    fn test_combo_fires_when_both_held() {
        let combos = [Combo::new(KeyPos::new(0, 0), KeyPos::new(0, 1), 7)];
        let mut tracker = ComboTracker::new();
        let mut fired = None;

        assert!(!tracker.update(&combos, KeyPos::new(0, 0), true, |a| fired = Some(a)));
        assert!(!tracker.update(&combos, KeyPos::new(1, 1), true, |a| fired = Some(a)));
        assert!(tracker.update(&combos, KeyPos::new(0, 1), true, |a| fired = Some(a)));
        assert_eq!(fired, Some(7));

        fired = None;
        assert!(!tracker.update(&combos, KeyPos::new(0, 0), false, |a| fired = Some(a)));
        assert_eq!(fired, None);
    }
}
