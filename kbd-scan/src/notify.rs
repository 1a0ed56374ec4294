//! Notifications towards the application.

use crate::keymap::KeyPos;

/// Something the application may want to react to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// A key transition was buffered.
    KeyAction,
    /// Passcode entry finished; reporting has been switched on.
    PasscodeEntered,
    FnLockPressed,
    FnLockReleased,
    /// A custom key or a key combination.
    Custom { action: u8, pressed: bool },
}

/// Receiver of engine notifications. Called from the scheduler, so
/// implementations must be short.
pub trait Notifier {
    fn notify(&mut self, notification: Notification);

    /// Raw hook for every accepted transition.
    fn key_detected(&mut self, _pos: KeyPos, _pressed: bool) {}
}

impl<F: FnMut(Notification)> Notifier for F {
    fn notify(&mut self, notification: Notification) {
        self(notification)
    }
}
