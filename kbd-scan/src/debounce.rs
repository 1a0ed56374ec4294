//! Per-key debounce over a shared pool of tracking slots.
//!
//! A key gets a slot on its first sampled press and keeps it until its
//! release has settled. While the slot is settling the key's sampled bit is
//! pinned, so bounce never reaches the deghost filter. The pool is sized for
//! the number of keys expected to bounce at once; a press that finds no free
//! slot is ignored until one frees.

use crate::config::ScanTicks;
use crate::keymap::KeyPos;
use crate::matrix::ScanWord;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    Idle,
    PressSettling,
    WaitingForRelease,
    ReleaseSettling,
}

#[derive(Copy, Clone, Debug)]
struct DebounceSlot {
    pos: KeyPos,
    state: DebounceState,
    remaining: u16,
}

impl DebounceSlot {
    const FREE: DebounceSlot = DebounceSlot {
        pos: KeyPos::new(0, 0),
        state: DebounceState::Idle,
        remaining: 0,
    };
}

/// Slot pool plus, per row, the columns that currently hold a slot.
pub(crate) struct DebouncePool<const SLOTS: usize, const ROWS: usize> {
    slots: [DebounceSlot; SLOTS],
    bounce_rows: [ScanWord; ROWS],
}

impl<const SLOTS: usize, const ROWS: usize> DebouncePool<SLOTS, ROWS> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [DebounceSlot::FREE; SLOTS],
            bounce_rows: [0; ROWS],
        }
    }

    pub(crate) fn reset(&mut self) {
        self.slots = [DebounceSlot::FREE; SLOTS];
        self.bounce_rows = [0; ROWS];
    }

    /// Columns per row whose key holds a slot (1 = tracked).
    pub(crate) fn bounce_rows(&self) -> &[ScanWord; ROWS] {
        &self.bounce_rows
    }

    pub(crate) fn state_of(&self, pos: KeyPos) -> DebounceState {
        self.find(pos)
            .map_or(DebounceState::Idle, |i| self.slots[i].state)
    }

    fn find(&self, pos: KeyPos) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.state != DebounceState::Idle && s.pos == pos)
    }

    fn free(&mut self, index: usize) {
        let pos = self.slots[index].pos;
        self.bounce_rows[pos.row as usize] &= !(1 << pos.col);
        self.slots[index] = DebounceSlot::FREE;
    }

    /// Feed one sampled key state.
    ///
    /// `stable` is the key's row as last reported and `sampled` its row as
    /// read this cycle; the key's bit in `sampled` is pinned while the slot
    /// settles. Returns `true` when the transition may go on to the deghost
    /// filter, `false` when the reported state must stay as it is.
    pub(crate) fn debounce(
        &mut self,
        pos: KeyPos,
        pressed: bool,
        stable: ScanWord,
        sampled: &mut ScanWord,
        ticks: &ScanTicks,
    ) -> bool {
        let bit: ScanWord = 1 << pos.col;

        let Some(index) = self.find(pos) else {
            if !pressed {
                return false;
            }
            let Some(index) = self
                .slots
                .iter()
                .position(|s| s.state == DebounceState::Idle)
            else {
                debug!("debounce pool exhausted, press at {}.{} ignored", pos.row, pos.col);
                return false;
            };
            self.slots[index] = DebounceSlot {
                pos,
                state: DebounceState::PressSettling,
                remaining: ticks.press,
            };
            self.bounce_rows[pos.row as usize] |= bit;
            *sampled |= bit;
            return false;
        };

        let slot = &mut self.slots[index];
        match slot.state {
            DebounceState::PressSettling if slot.remaining > 0 => {
                *sampled |= bit;
                false
            }
            DebounceState::PressSettling => {
                if pressed {
                    slot.state = DebounceState::WaitingForRelease;
                    true
                } else {
                    // Blip shorter than the press budget.
                    self.free(index);
                    false
                }
            }
            DebounceState::WaitingForRelease => {
                if !pressed {
                    slot.state = DebounceState::ReleaseSettling;
                    slot.remaining = ticks.release;
                    *sampled &= !bit;
                    false
                } else {
                    // Already reported presses stay put; withheld ones are
                    // offered to the deghost filter again.
                    stable & bit != 0
                }
            }
            DebounceState::ReleaseSettling if slot.remaining > 0 => {
                *sampled &= !bit;
                false
            }
            DebounceState::ReleaseSettling => {
                if pressed {
                    slot.state = DebounceState::WaitingForRelease;
                    false
                } else {
                    self.free(index);
                    // A press that was never reported has no release either.
                    stable & bit == 0
                }
            }
            DebounceState::Idle => false,
        }
    }

    /// End-of-cycle countdown. Returns whether any slot is in use.
    pub(crate) fn tick(&mut self) -> bool {
        let mut busy = false;
        for slot in self.slots.iter_mut().filter(|s| s.state != DebounceState::Idle) {
            busy = true;
            slot.remaining = slot.remaining.saturating_sub(1);
        }
        busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKS: ScanTicks = ScanTicks {
        press: 2,
        release: 3,
        global_settle: 3,
    };
    const ALL_RELEASED: ScanWord = 0b1111;

    fn feed(pool: &mut DebouncePool<2, 2>, pos: KeyPos, pressed: bool, stable: ScanWord) -> (bool, ScanWord) {
        let mut sampled = ALL_RELEASED;
        if pressed {
            sampled &= !(1 << pos.col);
        }
        let accepted = pool.debounce(pos, pressed, stable, &mut sampled, &TICKS);
        (accepted, sampled)
    }

    #[test]
    fn test_press_settles_after_countdown() {
        let mut pool = DebouncePool::<2, 2>::new();
        let pos = KeyPos::new(1, 2);

        let (accepted, sampled) = feed(&mut pool, pos, true, ALL_RELEASED);
        assert!(!accepted);
        assert_eq!(sampled, ALL_RELEASED, "bit pinned while settling");
        assert_eq!(pool.bounce_rows()[1], 0b0100);

        for _ in 0..TICKS.press {
            assert!(pool.tick());
            let (accepted, _) = feed(&mut pool, pos, true, ALL_RELEASED);
            if pool.state_of(pos) == DebounceState::WaitingForRelease {
                assert!(accepted);
                return;
            }
            assert!(!accepted);
        }
        panic!("press never settled");
    }

    #[test]
    fn test_blip_is_dropped() {
        let mut pool = DebouncePool::<2, 2>::new();
        let pos = KeyPos::new(0, 0);
        feed(&mut pool, pos, true, ALL_RELEASED);
        pool.tick();
        pool.tick();
        let (accepted, _) = feed(&mut pool, pos, false, ALL_RELEASED);
        assert!(!accepted);
        assert_eq!(pool.state_of(pos), DebounceState::Idle);
        assert_eq!(pool.bounce_rows()[0], 0);
        assert!(!pool.tick());
    }

    #[test]
    fn test_release_settles_and_fake_release_is_ignored() {
        let mut pool = DebouncePool::<2, 2>::new();
        let pos = KeyPos::new(0, 1);
        let reported = ALL_RELEASED & !0b0010;

        feed(&mut pool, pos, true, ALL_RELEASED);
        pool.tick();
        pool.tick();
        assert!(feed(&mut pool, pos, true, ALL_RELEASED).0);

        // Held and reported: nothing further.
        assert!(!feed(&mut pool, pos, true, reported).0);

        let (accepted, sampled) = feed(&mut pool, pos, false, reported);
        assert!(!accepted);
        assert_eq!(sampled & 0b0010, 0, "release pinned to pressed");
        assert_eq!(pool.state_of(pos), DebounceState::ReleaseSettling);

        for _ in 0..TICKS.release {
            pool.tick();
        }
        // Pressed again when the countdown ends: fake release.
        assert!(!feed(&mut pool, pos, true, reported).0);
        assert_eq!(pool.state_of(pos), DebounceState::WaitingForRelease);

        feed(&mut pool, pos, false, reported);
        for _ in 0..TICKS.release {
            pool.tick();
        }
        assert!(feed(&mut pool, pos, false, reported).0);
        assert_eq!(pool.state_of(pos), DebounceState::Idle);
    }

    #[test]
    fn test_unreported_press_has_no_release() {
        let mut pool = DebouncePool::<2, 2>::new();
        let pos = KeyPos::new(0, 3);
        feed(&mut pool, pos, true, ALL_RELEASED);
        pool.tick();
        pool.tick();
        // Accepted here but withheld downstream, so stable stays released.
        assert!(feed(&mut pool, pos, true, ALL_RELEASED).0);
        assert!(feed(&mut pool, pos, true, ALL_RELEASED).0);

        feed(&mut pool, pos, false, ALL_RELEASED);
        for _ in 0..TICKS.release {
            pool.tick();
        }
        assert!(!feed(&mut pool, pos, false, ALL_RELEASED).0);
        assert_eq!(pool.state_of(pos), DebounceState::Idle);
    }

    #[test]
    fn test_exhausted_pool_ignores_press() {
        let mut pool = DebouncePool::<2, 2>::new();
        feed(&mut pool, KeyPos::new(0, 0), true, ALL_RELEASED);
        feed(&mut pool, KeyPos::new(0, 1), true, ALL_RELEASED);
        let (accepted, sampled) = feed(&mut pool, KeyPos::new(1, 0), true, ALL_RELEASED);
        assert!(!accepted);
        assert_eq!(sampled & 1, 0, "untracked key is not pinned");
        assert_eq!(pool.state_of(KeyPos::new(1, 0)), DebounceState::Idle);
        assert_eq!(pool.bounce_rows()[1], 0);
    }
}
