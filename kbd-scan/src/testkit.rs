//! Shared fixtures for the scanner tests.

use crate::config::KeyboardConfig;
use crate::decoder::KeyOutput;
use crate::keycode::{KeyEntry, Keycode};
use crate::keymap::{KeyMap, KeyPos, KeySet};
use crate::notify::{Notification, Notifier};
use crate::scanner::Scanner;
use crate::signals::ScanSignals;
use crate::sim::SimMatrix;

pub(crate) const FN: KeyEntry = KeyEntry::fn_key(0x01);
pub(crate) const CUSTOM: KeyEntry = KeyEntry::custom(1);
const ___: KeyEntry = KeyEntry::UNUSED;

const fn k(code: Keycode) -> KeyEntry {
    KeyEntry::key(code)
}

/// Digits, Fn, Enter and a custom key; set 1 maps F1-F9 over the digits.
pub(crate) static SETS: [KeySet<4, 4>; 2] = [
    [
        [k(Keycode::N1), k(Keycode::N2), k(Keycode::N3), k(Keycode::A)],
        [k(Keycode::N4), k(Keycode::N5), k(Keycode::N6), k(Keycode::B)],
        [k(Keycode::N7), k(Keycode::N8), k(Keycode::N9), k(Keycode::C)],
        [FN, k(Keycode::N0), k(Keycode::Enter), CUSTOM],
    ],
    [
        [k(Keycode::F1), k(Keycode::F2), k(Keycode::F3), ___],
        [k(Keycode::F4), k(Keycode::F5), k(Keycode::F6), ___],
        [k(Keycode::F7), k(Keycode::F8), k(Keycode::F9), ___],
        [FN, ___, ___, CUSTOM],
    ],
];

/// Records notifications and raw key detections.
#[derive(Default)]
pub(crate) struct Recorder {
    pub(crate) notes: Vec<Notification>,
    pub(crate) keys: Vec<(KeyPos, bool)>,
}

impl Notifier for Recorder {
    fn notify(&mut self, notification: Notification) {
        self.notes.push(notification);
    }

    fn key_detected(&mut self, pos: KeyPos, pressed: bool) {
        self.keys.push((pos, pressed));
    }
}

pub(crate) type TestScanner<'a, const SLOTS: usize, const BUF: usize> =
    Scanner<'a, SimMatrix<'a, 4, 4>, Recorder, 4, 4, SLOTS, BUF>;

pub(crate) fn config() -> KeyboardConfig<'static, 4, 4> {
    KeyboardConfig::new(
        SimMatrix::<4, 4>::row_pins(),
        SimMatrix::<4, 4>::column_pins(),
        KeyMap::new(&SETS),
    )
}

/// Started scanner with a 5-slot pool and a 16-event buffer.
pub(crate) fn scanner(signals: &ScanSignals) -> TestScanner<'_, 5, 16> {
    scanner_with(signals, config())
}

pub(crate) fn scanner_with<'a, const SLOTS: usize, const BUF: usize>(
    signals: &'a ScanSignals,
    config: KeyboardConfig<'a, 4, 4>,
) -> TestScanner<'a, SLOTS, BUF> {
    let mut scanner = Scanner::new(SimMatrix::new(signals), Recorder::default(), signals, config)
        .expect("valid config");
    scanner.start();
    scanner
}

/// Pull keycodes until the buffer reports empty.
pub(crate) fn drain<const SLOTS: usize, const BUF: usize>(
    scanner: &mut TestScanner<'_, SLOTS, BUF>,
) -> Vec<KeyOutput> {
    let mut out = Vec::new();
    loop {
        match scanner.next_keycode() {
            KeyOutput::Empty => return out,
            output => out.push(output),
        }
    }
}

pub(crate) fn pressed(code: Keycode) -> KeyOutput {
    KeyOutput::Keycode {
        code: KeyEntry::key(code),
        pressed: true,
    }
}

pub(crate) fn released(code: Keycode) -> KeyOutput {
    KeyOutput::Keycode {
        code: KeyEntry::key(code),
        pressed: false,
    }
}

/// Long enough for a press to settle with the default budget.
pub(crate) const PRESS_SETTLE_US: u32 = 40_000;
/// Long enough for a release to settle and the scanner to go idle.
pub(crate) const RELEASE_SETTLE_US: u32 = 80_000;

/// Press, settle, release, settle.
pub(crate) fn tap<const SLOTS: usize, const BUF: usize>(
    scanner: &mut TestScanner<'_, SLOTS, BUF>,
    row: usize,
    col: usize,
) {
    scanner.platform_mut().press(row, col);
    scanner.run_for(PRESS_SETTLE_US);
    scanner.platform_mut().release(row, col);
    scanner.run_for(RELEASE_SETTLE_US);
}
