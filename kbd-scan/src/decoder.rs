//! Key decoder: latches Fn state and combinations when a transition is
//! recorded, and turns buffered transitions into keycodes when drained.

use crate::buffer::{EventBuffer, KeyTransitionEvent};
use crate::keycode::{KeyClass, KeyEntry};
use crate::keymap::{Combo, ComboTracker, KeyMap, KeyPos};
use crate::notify::{Notification, Notifier};

/// Result of [`Scanner::next_keycode`](crate::Scanner::next_keycode).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyOutput {
    /// Keymap entry of the transition.
    Keycode { code: KeyEntry, pressed: bool },
    /// Release everything; sent for Fn keys and after a buffer overflow.
    FullRelease,
    Empty,
}

pub(crate) struct KeyDecoder {
    fn_mask: u8,
    fn_locked: bool,
    key_after_fn: bool,
    combos: ComboTracker,
}

impl KeyDecoder {
    pub(crate) const fn new() -> Self {
        Self {
            fn_mask: 0,
            fn_locked: false,
            key_after_fn: false,
            combos: ComboTracker::new(),
        }
    }

    /// Forget held keys after the matrix was reset to all released. A
    /// latched Fn-lock is kept.
    pub(crate) fn reset(&mut self) {
        if !self.fn_locked {
            self.fn_mask = 0;
        }
        self.key_after_fn = false;
        self.combos.reset();
    }

    pub(crate) fn fn_locked(&self) -> bool {
        self.fn_locked
    }

    /// Drop a latched Fn-lock. Returns whether one was latched.
    pub(crate) fn release_fn_lock(&mut self) -> bool {
        if !self.fn_locked {
            return false;
        }
        self.fn_locked = false;
        self.fn_mask = 0;
        true
    }

    /// Record an accepted transition.
    ///
    /// Combinations and custom keys are reported through the notifier and
    /// only buffered while capturing a passcode; everything else is
    /// buffered.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record<N: Notifier, const ROWS: usize, const COLS: usize, const BUF: usize>(
        &mut self,
        keymap: &KeyMap<'_, ROWS, COLS>,
        combos: &[Combo],
        has_fn_lock: bool,
        passcode: bool,
        buffer: &mut EventBuffer<BUF>,
        notifier: &mut N,
        pos: KeyPos,
        pressed: bool,
    ) {
        let combo = self.combos.update(combos, pos, pressed, |action| {
            notifier.notify(Notification::Custom { action, pressed: true })
        });
        if combo && !passcode {
            return;
        }

        let mut fn_key = false;
        match keymap.entry(self.fn_mask as usize, pos).class() {
            KeyClass::Custom(action) => {
                notifier.notify(Notification::Custom { action, pressed });
                notifier.key_detected(pos, pressed);
                if !passcode {
                    return;
                }
            }
            KeyClass::Fn(mask) => {
                fn_key = true;
                self.latch_fn(mask, pressed, has_fn_lock, notifier);
            }
            _ => {}
        }

        if !fn_key && has_fn_lock {
            self.key_after_fn = true;
        }

        let event = KeyTransitionEvent {
            pos,
            pressed,
            fn_mask: self.fn_mask,
            fn_locked: self.fn_locked,
        };
        if !buffer.push(event) {
            warn!("event buffer overflow");
        }
        notifier.notify(Notification::KeyAction);
        notifier.key_detected(pos, pressed);
    }

    fn latch_fn<N: Notifier>(&mut self, mask: u8, pressed: bool, has_fn_lock: bool, notifier: &mut N) {
        if !has_fn_lock {
            if pressed {
                self.fn_mask |= mask;
            } else {
                self.fn_mask &= !mask;
            }
            return;
        }

        if pressed {
            self.fn_mask |= mask;
            self.key_after_fn = false;
            return;
        }

        if self.key_after_fn {
            // Used as a plain Fn: unlatch.
            self.fn_locked = false;
        } else {
            self.fn_locked = !self.fn_locked;
        }
        if self.fn_locked {
            self.fn_mask |= mask;
        } else {
            self.fn_mask &= !mask;
        }
        notifier.notify(if self.fn_locked {
            Notification::FnLockPressed
        } else {
            Notification::FnLockReleased
        });
    }

    /// Keymap entry for a buffered event. While Fn-lock is latched the
    /// event decodes against set 1 if that set maps the key.
    pub(crate) fn entry<const ROWS: usize, const COLS: usize>(
        &self,
        keymap: &KeyMap<'_, ROWS, COLS>,
        has_fn_lock: bool,
        event: &KeyTransitionEvent,
    ) -> KeyEntry {
        let set = if has_fn_lock && self.fn_locked {
            if keymap.entry(1, event.pos).keychar() != 0 {
                1
            } else {
                0
            }
        } else {
            event.fn_mask as usize
        };
        keymap.entry(set, event.pos)
    }

    /// Decode a buffered event. `None` means the event produces no output.
    pub(crate) fn decode<const ROWS: usize, const COLS: usize>(
        &self,
        keymap: &KeyMap<'_, ROWS, COLS>,
        has_fn_lock: bool,
        event: &KeyTransitionEvent,
    ) -> Option<KeyOutput> {
        let entry = self.entry(keymap, has_fn_lock, event);
        match entry.class() {
            KeyClass::Normal(_) | KeyClass::Modifier(_) | KeyClass::Special(_) => Some(KeyOutput::Keycode {
                code: entry,
                pressed: event.pressed,
            }),
            KeyClass::Fn(_) => Some(KeyOutput::FullRelease),
            KeyClass::Unused | KeyClass::Custom(_) | KeyClass::Unknown => None,
        }
    }
}
