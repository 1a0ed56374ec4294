//! Report mode and passcode capture.

use crate::keycode::{KeyClass, KeyEntry, Keycode};

/// What drained key events are used for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportMode {
    /// Digits accumulate into a passcode.
    Disabled,
    /// Keycodes are handed to the caller.
    Enabled,
    /// Events stay buffered; nothing is handed out.
    Paused,
}

/// Outcome of feeding one released key to the passcode accumulator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PasscodeStep {
    Digit(u8),
    Entered(u32),
    Ignored,
}

pub(crate) struct ReportController {
    mode: ReportMode,
    passcode: u32,
    enter_key: Option<KeyEntry>,
}

impl ReportController {
    pub(crate) const fn new(enter_key: Option<KeyEntry>) -> Self {
        Self {
            mode: ReportMode::Paused,
            passcode: 0,
            enter_key,
        }
    }

    pub(crate) fn mode(&self) -> ReportMode {
        self.mode
    }

    pub(crate) fn passcode(&self) -> u32 {
        self.passcode
    }

    pub(crate) fn start_reporting(&mut self) {
        info!("reporting on");
        self.mode = ReportMode::Enabled;
    }

    pub(crate) fn start_passcode(&mut self) {
        info!("reporting off (passcode)");
        self.passcode = 0;
        self.mode = ReportMode::Disabled;
    }

    pub(crate) fn stop_reporting(&mut self) {
        info!("reporting off");
        self.passcode = 0;
        self.mode = ReportMode::Paused;
    }

    fn is_enter(&self, entry: KeyEntry) -> bool {
        self.enter_key == Some(entry)
            || entry == KeyEntry::key(Keycode::Enter)
            || entry == KeyEntry::key(Keycode::KpEnter)
    }

    /// Feed the keymap entry of a released key. Enter switches to
    /// reporting; digits on the number row or keypad accumulate.
    pub(crate) fn accumulate(&mut self, entry: KeyEntry) -> PasscodeStep {
        if self.is_enter(entry) {
            debug!("passcode entered: {}", self.passcode);
            self.start_reporting();
            return PasscodeStep::Entered(self.passcode);
        }
        let KeyClass::Normal(usage) = entry.class() else {
            return PasscodeStep::Ignored;
        };
        match Keycode::from_u8(usage).and_then(Keycode::digit) {
            Some(digit) => {
                self.passcode = self.passcode.wrapping_mul(10).wrapping_add(digit as u32);
                debug!("passcode digit {}", digit);
                PasscodeStep::Digit(digit)
            }
            None => PasscodeStep::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: Keycode) -> KeyEntry {
        KeyEntry::key(code)
    }

    #[test]
    fn test_starts_paused() {
        let ctl = ReportController::new(None);
        assert_eq!(ctl.mode(), ReportMode::Paused);
        assert_eq!(ctl.passcode(), 0);
    }

    #[test]
    fn test_digits_then_enter() {
        let mut ctl = ReportController::new(None);
        ctl.start_passcode();
        assert_eq!(ctl.accumulate(key(Keycode::N1)), PasscodeStep::Digit(1));
        assert_eq!(ctl.accumulate(key(Keycode::Kp2)), PasscodeStep::Digit(2));
        assert_eq!(ctl.accumulate(key(Keycode::A)), PasscodeStep::Ignored);
        assert_eq!(ctl.accumulate(key(Keycode::N0)), PasscodeStep::Digit(0));
        assert_eq!(ctl.accumulate(key(Keycode::KpEnter)), PasscodeStep::Entered(120));
        assert_eq!(ctl.mode(), ReportMode::Enabled);
        assert_eq!(ctl.passcode(), 120);
    }

    #[test]
    fn test_custom_enter_key() {
        let enter = KeyEntry::special(0x30);
        let mut ctl = ReportController::new(Some(enter));
        ctl.start_passcode();
        ctl.accumulate(key(Keycode::N7));
        assert_eq!(ctl.accumulate(enter), PasscodeStep::Entered(7));
    }

    #[test]
    fn test_mode_switch_clears_passcode() {
        let mut ctl = ReportController::new(None);
        ctl.start_passcode();
        ctl.accumulate(key(Keycode::N5));
        ctl.stop_reporting();
        assert_eq!(ctl.passcode(), 0);
        assert_eq!(ctl.mode(), ReportMode::Paused);

        ctl.start_passcode();
        ctl.accumulate(key(Keycode::N5));
        ctl.start_passcode();
        assert_eq!(ctl.passcode(), 0);
    }

    #[test]
    fn test_modifier_digit_is_ignored() {
        let mut ctl = ReportController::new(None);
        ctl.start_passcode();
        assert_eq!(
            ctl.accumulate(KeyEntry::from_raw(0xFC00 | Keycode::N3 as u16)),
            PasscodeStep::Ignored
        );
    }
}
