//! Event buffer between the scheduler and the decoder.

use heapless::Deque;

use crate::keymap::KeyPos;

/// A debounced, deghosted key transition.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyTransitionEvent {
    pub pos: KeyPos,
    pub pressed: bool,
    /// Fn mask latched when the transition was recorded.
    pub fn_mask: u8,
    pub fn_locked: bool,
}

const FLAG_PRESSED: u8 = 0x10;
const FLAG_FN_LOCKED: u8 = 0x20;
const FLAG_FN_MASK: u8 = 0x0F;

impl KeyTransitionEvent {
    /// Packed one-byte form: bit 4 pressed, bit 5 Fn-lock, bits 0-3 Fn mask.
    pub const fn flags(&self) -> u8 {
        let mut flags = self.fn_mask & FLAG_FN_MASK;
        if self.pressed {
            flags |= FLAG_PRESSED;
        }
        if self.fn_locked {
            flags |= FLAG_FN_LOCKED;
        }
        flags
    }

    pub const fn from_flags(pos: KeyPos, flags: u8) -> Self {
        Self {
            pos,
            pressed: flags & FLAG_PRESSED != 0,
            fn_mask: flags & FLAG_FN_MASK,
            fn_locked: flags & FLAG_FN_LOCKED != 0,
        }
    }
}

/// Fixed-capacity FIFO of key transitions.
///
/// A push into a full buffer is refused and latches the overflow flag; the
/// drain side then discards everything and reports a full release.
pub struct EventBuffer<const N: usize> {
    events: Deque<KeyTransitionEvent, N>,
    overflow: bool,
}

impl<const N: usize> EventBuffer<N> {
    const NONZERO: () = assert!(N > 0, "event buffer needs capacity");

    pub const fn new() -> Self {
        let () = Self::NONZERO;
        Self {
            events: Deque::new(),
            overflow: false,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn has_overflowed(&self) -> bool {
        self.overflow
    }

    /// Append an event. Returns `false` and latches overflow when full.
    pub fn push(&mut self, event: KeyTransitionEvent) -> bool {
        if self.events.push_back(event).is_err() {
            self.overflow = true;
            return false;
        }
        true
    }

    pub fn pop(&mut self) -> Option<KeyTransitionEvent> {
        self.events.pop_front()
    }

    /// Read and clear the overflow flag.
    pub fn take_overflow(&mut self) -> bool {
        core::mem::replace(&mut self.overflow, false)
    }

    /// Drop all buffered events.
    pub fn flush(&mut self) {
        self.events.clear();
    }
}

impl<const N: usize> Default for EventBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(col: u8, pressed: bool) -> KeyTransitionEvent {
        KeyTransitionEvent {
            pos: KeyPos::new(0, col),
            pressed,
            ..Default::default()
        }
    }

    #[test]
    fn test_fifo_order_across_wrap() {
        let mut buf = EventBuffer::<3>::new();
        assert!(buf.push(event(0, true)));
        assert!(buf.push(event(1, true)));
        assert_eq!(buf.pop(), Some(event(0, true)));
        assert!(buf.push(event(2, true)));
        assert!(buf.push(event(3, true)));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.pop(), Some(event(1, true)));
        assert_eq!(buf.pop(), Some(event(2, true)));
        assert_eq!(buf.pop(), Some(event(3, true)));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn test_full_push_sets_overflow() {
        let mut buf = EventBuffer::<2>::new();
        assert_eq!(buf.capacity(), 2);
        assert!(buf.push(event(0, true)));
        assert!(buf.push(event(1, true)));
        assert!(!buf.has_overflowed());
        assert!(!buf.push(event(2, true)));
        assert!(buf.has_overflowed());
        assert_eq!(buf.len(), 2);

        assert!(buf.take_overflow());
        assert!(!buf.take_overflow());
    }

    #[test]
    fn test_flush() {
        let mut buf = EventBuffer::<4>::new();
        buf.push(event(0, true));
        buf.push(event(1, false));
        buf.flush();
        assert!(buf.is_empty());
        assert_eq!(buf.pop(), None);
        buf.push(event(5, true));
        assert_eq!(buf.pop(), Some(event(5, true)));
    }

    #[test]
    fn test_flags_byte() {
        let ev = KeyTransitionEvent {
            pos: KeyPos::new(2, 3),
            pressed: true,
            fn_mask: 0x01,
            fn_locked: true,
        };
        assert_eq!(ev.flags(), 0x31);
        assert_eq!(KeyTransitionEvent::from_flags(ev.pos, 0x31), ev);
        assert_eq!(event(0, false).flags(), 0x00);
    }
}
