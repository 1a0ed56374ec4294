//! Property tests for debouncing and ghost rejection.

use proptest::prelude::*;

use crate::config::{KeyboardConfig, ScanTimingBudget};
use crate::keycode::{KeyEntry, Keycode};
use crate::keymap::{KeyMap, KeyPos, KeySet};
use crate::signals::ScanSignals;
use crate::sim::SimMatrix;
use crate::testkit::{scanner_with, PRESS_SETTLE_US};

const fn k(code: Keycode) -> KeyEntry {
    KeyEntry::key(code)
}

/// Every position is a plain key.
static LETTERS: [KeySet<4, 4>; 1] = [[
    [k(Keycode::A), k(Keycode::B), k(Keycode::C), k(Keycode::D)],
    [k(Keycode::E), k(Keycode::F), k(Keycode::G), k(Keycode::H)],
    [k(Keycode::I), k(Keycode::J), k(Keycode::K), k(Keycode::L)],
    [k(Keycode::M), k(Keycode::N), k(Keycode::O), k(Keycode::P)],
]];

fn letters() -> KeyboardConfig<'static, 4, 4> {
    KeyboardConfig::new(
        SimMatrix::<4, 4>::row_pins(),
        SimMatrix::<4, 4>::column_pins(),
        KeyMap::new(&LETTERS),
    )
}

/// Alternating pressed/released durations, starting and ending pressed,
/// whose total stays under the press budget.
fn bounce() -> impl Strategy<Value = Vec<u32>> {
    let budget = ScanTimingBudget::default().press_debounce_us;
    prop::collection::vec(50u32..4_000, 1..12).prop_map(move |mut spans| {
        let mut total = 0;
        spans.retain(|span| {
            total += span;
            total < budget
        });
        if spans.len() % 2 == 0 {
            spans.pop();
        }
        spans
    })
}

/// Two distinct rows, two distinct columns.
fn rectangle() -> impl Strategy<Value = ([usize; 2], [usize; 2])> {
    let pair = (0usize..4, 1usize..4).prop_map(|(a, d)| [a, (a + d) % 4]);
    (pair.clone(), pair)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bounce_shorter_than_press_budget_emits_nothing(
        row in 0usize..4,
        col in 0usize..4,
        lead_in in 0u32..6_000,
        spans in bounce(),
    ) {
        let signals = ScanSignals::new();
        let mut s = scanner_with::<5, 16>(&signals, letters());
        s.start_reporting();
        s.run_for(lead_in);

        let mut pressed = false;
        for span in spans {
            pressed = !pressed;
            s.platform_mut().set_key(row, col, pressed);
            s.run_for(span);
        }
        s.platform_mut().release(row, col);
        s.run_for(4 * PRESS_SETTLE_US);

        prop_assert!(s.notifier().keys.is_empty());
        prop_assert!(!s.has_pending_events());
        prop_assert!(s.is_idle());
    }

    #[test]
    fn fourth_corner_is_never_reported(
        (rows, cols) in rectangle(),
        fourth in 0usize..4,
    ) {
        let signals = ScanSignals::new();
        let mut s = scanner_with::<5, 16>(&signals, letters());
        s.start_reporting();

        let corners = [
            (rows[0], cols[0]),
            (rows[0], cols[1]),
            (rows[1], cols[0]),
            (rows[1], cols[1]),
        ];
        for (i, &(r, c)) in corners.iter().enumerate() {
            if i != fourth {
                s.platform_mut().press(r, c);
                s.run_for(PRESS_SETTLE_US);
            }
        }

        let (r, c) = corners[fourth];
        s.platform_mut().press(r, c);
        s.run_for(4 * PRESS_SETTLE_US);

        let ghost = (KeyPos::new(r as u8, c as u8), true);
        prop_assert!(!s.notifier().keys.contains(&ghost));
    }
}
