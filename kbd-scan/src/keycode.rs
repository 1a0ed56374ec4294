//! HID usage codes and the 16-bit keymap entry encoding.
//!
//! A keymap entry packs a class selector into its high byte:
//!
//! | high byte & 0xFC | class                                   |
//! |------------------|-----------------------------------------|
//! | `0x00`           | normal key, low byte is the HID usage   |
//! | `0xFC`           | modifier key                            |
//! | `0xF8`           | Fn modifier, low byte is the set mask   |
//! | `0xF4`           | special function (`0xF4Fx` is custom)   |
//!
//! An all-zero entry marks an unused matrix position.

/// USB HID keycodes.
/// See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Keycode {
    // Letters
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Numbers
    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    // Control keys
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    LBracket = 0x2F,
    RBracket = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Dot = 0x37,
    Slash = 0x38,
    CapsLock = 0x39,

    // Function keys
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    // Keypad
    KpEnter = 0x58,
    Kp1 = 0x59,
    Kp2 = 0x5A,
    Kp3 = 0x5B,
    Kp4 = 0x5C,
    Kp5 = 0x5D,
    Kp6 = 0x5E,
    Kp7 = 0x5F,
    Kp8 = 0x60,
    Kp9 = 0x61,
    Kp0 = 0x62,

    // Modifiers
    LCtrl = 0xE0,
    LShift = 0xE1,
    LAlt = 0xE2,
    LGui = 0xE3,
    RCtrl = 0xE4,
    RShift = 0xE5,
    RAlt = 0xE6,
    RGui = 0xE7,
}

impl Keycode {
    /// Every keycode, in usage order.
    pub const ALL: [Keycode; 97] = {
        use Keycode::*;
        [
            A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
            N1, N2, N3, N4, N5, N6, N7, N8, N9, N0,
            Enter, Escape, Backspace, Tab, Space, Minus, Equal, LBracket, RBracket, Backslash,
            Semicolon, Quote, Grave, Comma, Dot, Slash, CapsLock,
            F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
            PrintScreen, ScrollLock, Pause, Insert, Home, PageUp, Delete, End, PageDown,
            Right, Left, Down, Up,
            KpEnter, Kp1, Kp2, Kp3, Kp4, Kp5, Kp6, Kp7, Kp8, Kp9, Kp0,
            LCtrl, LShift, LAlt, LGui, RCtrl, RShift, RAlt, RGui,
        ]
    };

    /// Look up a keycode by its HID usage value.
    pub fn from_u8(usage: u8) -> Option<Keycode> {
        Self::ALL.iter().copied().find(|k| *k as u8 == usage)
    }

    /// Check if this keycode is a modifier (LCtrl..RGui).
    pub fn is_modifier(self) -> bool {
        let v = self as u8;
        (0xE0..=0xE7).contains(&v)
    }

    /// Value of a digit key on the number row or the keypad.
    pub fn digit(self) -> Option<u8> {
        let v = self as u8;
        let n = match v {
            0x1E..=0x27 => v - 0x1D,
            0x59..=0x62 => v - 0x58,
            _ => return None,
        };
        Some(n % 10)
    }

    /// Short label for keymap printouts and traces.
    pub fn display_name(self) -> &'static str {
        match self {
            Keycode::A => "A",
            Keycode::B => "B",
            Keycode::C => "C",
            Keycode::D => "D",
            Keycode::E => "E",
            Keycode::F => "F",
            Keycode::G => "G",
            Keycode::H => "H",
            Keycode::I => "I",
            Keycode::J => "J",
            Keycode::K => "K",
            Keycode::L => "L",
            Keycode::M => "M",
            Keycode::N => "N",
            Keycode::O => "O",
            Keycode::P => "P",
            Keycode::Q => "Q",
            Keycode::R => "R",
            Keycode::S => "S",
            Keycode::T => "T",
            Keycode::U => "U",
            Keycode::V => "V",
            Keycode::W => "W",
            Keycode::X => "X",
            Keycode::Y => "Y",
            Keycode::Z => "Z",
            Keycode::N1 => "1",
            Keycode::N2 => "2",
            Keycode::N3 => "3",
            Keycode::N4 => "4",
            Keycode::N5 => "5",
            Keycode::N6 => "6",
            Keycode::N7 => "7",
            Keycode::N8 => "8",
            Keycode::N9 => "9",
            Keycode::N0 => "0",
            Keycode::Enter => "Ent",
            Keycode::Escape => "Esc",
            Keycode::Backspace => "Bksp",
            Keycode::Tab => "Tab",
            Keycode::Space => "Spc",
            Keycode::Minus => "-",
            Keycode::Equal => "=",
            Keycode::LBracket => "[",
            Keycode::RBracket => "]",
            Keycode::Backslash => "\\",
            Keycode::Semicolon => ";",
            Keycode::Quote => "'",
            Keycode::Grave => "`",
            Keycode::Comma => ",",
            Keycode::Dot => ".",
            Keycode::Slash => "/",
            Keycode::CapsLock => "Caps",
            Keycode::F1 => "F1",
            Keycode::F2 => "F2",
            Keycode::F3 => "F3",
            Keycode::F4 => "F4",
            Keycode::F5 => "F5",
            Keycode::F6 => "F6",
            Keycode::F7 => "F7",
            Keycode::F8 => "F8",
            Keycode::F9 => "F9",
            Keycode::F10 => "F10",
            Keycode::F11 => "F11",
            Keycode::F12 => "F12",
            Keycode::PrintScreen => "PScr",
            Keycode::ScrollLock => "ScrL",
            Keycode::Pause => "Paus",
            Keycode::Insert => "Ins",
            Keycode::Home => "Home",
            Keycode::PageUp => "PgUp",
            Keycode::Delete => "Del",
            Keycode::End => "End",
            Keycode::PageDown => "PgDn",
            Keycode::Right => "\u{2192}",
            Keycode::Left => "\u{2190}",
            Keycode::Down => "\u{2193}",
            Keycode::Up => "\u{2191}",
            Keycode::KpEnter => "PEnt",
            Keycode::Kp1 => "P1",
            Keycode::Kp2 => "P2",
            Keycode::Kp3 => "P3",
            Keycode::Kp4 => "P4",
            Keycode::Kp5 => "P5",
            Keycode::Kp6 => "P6",
            Keycode::Kp7 => "P7",
            Keycode::Kp8 => "P8",
            Keycode::Kp9 => "P9",
            Keycode::Kp0 => "P0",
            Keycode::LCtrl => "Ctrl",
            Keycode::LShift => "Shft",
            Keycode::LAlt => "Alt",
            Keycode::LGui => "Gui",
            Keycode::RCtrl => "RCtl",
            Keycode::RShift => "RSft",
            Keycode::RAlt => "RAlt",
            Keycode::RGui => "RGui",
        }
    }
}

/// Class of a keymap entry, selected by its high byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyClass {
    /// No key at this position; also how ghost positions are marked.
    Unused,
    /// Ordinary key carrying a HID usage.
    Normal(u8),
    /// Modifier key carrying a HID usage.
    Modifier(u8),
    /// Fn key; the payload is the modifier-set mask it latches.
    Fn(u8),
    /// Special or extended function handled by the consumer.
    Special(u8),
    /// Custom action, reported through the notifier only.
    Custom(u8),
    /// Reserved encoding.
    Unknown,
}

/// One 16-bit keymap entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEntry(u16);

impl KeyEntry {
    pub const UNUSED: KeyEntry = KeyEntry(0);

    const MODIFIER: u16 = 0xFC00;
    const FN: u16 = 0xF800;
    const SPECIAL: u16 = 0xF400;
    const CUSTOM: u16 = 0xF4F0;

    pub const fn from_raw(raw: u16) -> Self {
        KeyEntry(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Normal key entry.
    pub const fn key(code: Keycode) -> Self {
        KeyEntry(code as u16)
    }

    /// Modifier key entry.
    pub const fn modifier(code: Keycode) -> Self {
        KeyEntry(Self::MODIFIER | code as u16)
    }

    /// Fn key latching the modifier sets in `mask` while held.
    pub const fn fn_key(mask: u8) -> Self {
        KeyEntry(Self::FN | mask as u16)
    }

    /// Special function `function` (0..=0xEF).
    pub const fn special(function: u8) -> Self {
        KeyEntry(Self::SPECIAL | function as u16)
    }

    /// Custom action `action` (0..=15).
    pub const fn custom(action: u8) -> Self {
        KeyEntry(Self::CUSTOM | (action & 0x0F) as u16)
    }

    pub const fn is_unused(self) -> bool {
        self.0 == 0
    }

    /// Low byte: HID usage, Fn mask, or function number depending on class.
    pub const fn keychar(self) -> u8 {
        self.0 as u8
    }

    pub fn class(self) -> KeyClass {
        if self.0 == 0 {
            return KeyClass::Unused;
        }
        let keychar = self.keychar();
        match ((self.0 >> 8) as u8) & 0xFC {
            0x00 => KeyClass::Normal(keychar),
            0xFC => KeyClass::Modifier(keychar),
            0xF8 => KeyClass::Fn(keychar),
            0xF4 if keychar >> 4 == 0x0F => KeyClass::Custom(keychar & 0x0F),
            0xF4 => KeyClass::Special(keychar),
            _ => KeyClass::Unknown,
        }
    }

    /// HID keycode for normal and modifier entries.
    pub fn keycode(self) -> Option<Keycode> {
        match self.class() {
            KeyClass::Normal(usage) | KeyClass::Modifier(usage) => Keycode::from_u8(usage),
            _ => None,
        }
    }
}

impl From<Keycode> for KeyEntry {
    fn from(code: Keycode) -> Self {
        if code.is_modifier() {
            KeyEntry::modifier(code)
        } else {
            KeyEntry::key(code)
        }
    }
}
