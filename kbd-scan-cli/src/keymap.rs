//! Demo keymap for the simulated ErgoDox matrix.

use kbd_scan::{KeyClass, KeyEntry, KeyMap, KeySet, Keycode};

pub const ROWS: usize = 6;
pub const COLS: usize = 14;
pub const NUM_SETS: usize = 2;

const fn k(code: Keycode) -> KeyEntry {
    KeyEntry::key(code)
}

const fn m(code: Keycode) -> KeyEntry {
    KeyEntry::modifier(code)
}

/// Key is unused in the matrix position.
const ___: KeyEntry = KeyEntry::UNUSED;

/// Shorthand aliases for readability.
const ENT: KeyEntry = k(Keycode::Enter);
const ESC: KeyEntry = k(Keycode::Escape);
const BSP: KeyEntry = k(Keycode::Backspace);
const TAB: KeyEntry = k(Keycode::Tab);
const SPC: KeyEntry = k(Keycode::Space);
const DEL: KeyEntry = k(Keycode::Delete);
const PGUP: KeyEntry = k(Keycode::PageUp);
const PGDN: KeyEntry = k(Keycode::PageDown);
const LCTL: KeyEntry = m(Keycode::LCtrl);
const LALT: KeyEntry = m(Keycode::LAlt);
const LGUI: KeyEntry = m(Keycode::LGui);
const RSFT: KeyEntry = m(Keycode::RShift);
const LSFT: KeyEntry = m(Keycode::LShift);
/// Fn key selecting set 1 while held.
const FN1: KeyEntry = KeyEntry::fn_key(0x01);
/// Reported to the notifier only.
const LOCK: KeyEntry = KeyEntry::custom(0);

/// Modifier sets. Rows 0-5, columns 0-6 are the left half and 7-13 the
/// right half.
///
/// Set 0: QWERTY
/// Set 1: function keys, arrows and keypad digits
pub static SETS: [KeySet<ROWS, COLS>; NUM_SETS] = [
    [
        // Row 0: number row
        [k(Keycode::Grave), k(Keycode::N1), k(Keycode::N2), k(Keycode::N3), k(Keycode::N4), k(Keycode::N5), ___,
         k(Keycode::Minus), k(Keycode::N6), k(Keycode::N7), k(Keycode::N8), k(Keycode::N9), k(Keycode::N0), k(Keycode::Equal)],

        // Row 1: top letter row
        [TAB, k(Keycode::Q), k(Keycode::W), k(Keycode::E), k(Keycode::R), k(Keycode::T), PGUP,
         k(Keycode::LBracket), k(Keycode::Y), k(Keycode::U), k(Keycode::I), k(Keycode::O), k(Keycode::P), k(Keycode::RBracket)],

        // Row 2: home row
        [LCTL, k(Keycode::A), k(Keycode::S), k(Keycode::D), k(Keycode::F), k(Keycode::G), FN1,
         ___, k(Keycode::H), k(Keycode::J), k(Keycode::K), k(Keycode::L), k(Keycode::Semicolon), k(Keycode::Quote)],

        // Row 3: bottom row
        [LSFT, k(Keycode::Z), k(Keycode::X), k(Keycode::C), k(Keycode::V), k(Keycode::B), PGDN,
         ___, k(Keycode::N), k(Keycode::M), k(Keycode::Comma), k(Keycode::Dot), k(Keycode::Slash), k(Keycode::Backslash)],

        // Row 4: thumb cluster top
        [FN1, LALT, LGUI, ___, ___, ___, ___,
         ___, ___, k(Keycode::Left), k(Keycode::Down), k(Keycode::Up), k(Keycode::Right), FN1],

        // Row 5: thumb cluster bottom
        [ESC, ___, ENT, SPC, k(Keycode::Home), k(Keycode::End), ___,
         ___, DEL, ___, RSFT, BSP, ___, LOCK],
    ],
    [
        // Row 0
        [___, k(Keycode::F1), k(Keycode::F2), k(Keycode::F3), k(Keycode::F4), k(Keycode::F5), ___,
         ___, k(Keycode::F6), k(Keycode::F7), k(Keycode::F8), k(Keycode::F9), k(Keycode::F10), ___],

        // Row 1
        [___, ___, ___, ___, ___, ___, k(Keycode::F11),
         k(Keycode::F12), ___, k(Keycode::Kp7), k(Keycode::Kp8), k(Keycode::Kp9), ___, ___],

        // Row 2
        [___, ___, ___, ___, ___, ___, FN1,
         ___, ___, k(Keycode::Kp4), k(Keycode::Kp5), k(Keycode::Kp6), ___, ___],

        // Row 3
        [___, ___, ___, ___, ___, ___, ___,
         ___, ___, k(Keycode::Kp1), k(Keycode::Kp2), k(Keycode::Kp3), ___, ___],

        // Row 4
        [FN1, ___, ___, ___, ___, ___, ___,
         ___, ___, k(Keycode::Kp0), ___, ___, k(Keycode::KpEnter), FN1],

        // Row 5
        [___, ___, ___, ___, ___, ___, ___,
         ___, ___, ___, ___, ___, ___, LOCK],
    ],
];

pub fn keymap() -> KeyMap<'static, ROWS, COLS> {
    KeyMap::new(&SETS)
}

/// Short label for an entry, as printed by the CLI.
pub fn label(entry: KeyEntry) -> String {
    match entry.class() {
        KeyClass::Unused => String::new(),
        KeyClass::Normal(usage) | KeyClass::Modifier(usage) => match entry.keycode() {
            Some(code) => code.display_name().to_string(),
            None => format!("0x{usage:02X}"),
        },
        KeyClass::Fn(mask) => format!("Fn{mask:X}"),
        KeyClass::Special(function) => format!("Sp{function:02X}"),
        KeyClass::Custom(action) => format!("C{action}"),
        KeyClass::Unknown => format!("?{:04X}", entry.raw()),
    }
}

/// Render one set as a text grid, halves separated by a gap.
pub fn render(set: usize) -> String {
    let map = keymap();
    let mut out = String::new();
    for row in 0..ROWS {
        let mut line = String::new();
        for col in 0..COLS {
            if col == COLS / 2 {
                line.push_str("   ");
            }
            let entry = map.entry(set, kbd_scan::KeyPos::new(row as u8, col as u8));
            let cell = if entry.is_unused() { "·".to_string() } else { label(entry) };
            line.push_str(&format!("{cell:^7}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
