//! Hardware capabilities the engine runs on.
//!
//! Firmware implements [`ScanPlatform`] over its GPIO, wake-up controller and
//! timer peripherals and forwards the two interrupts to
//! [`ScanSignals`](crate::ScanSignals).

/// A digital pin addressed by port and pin number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin {
    pub port: u8,
    pub pin: u8,
}

impl Pin {
    pub const fn new(port: u8, pin: u8) -> Self {
        Self { port, pin }
    }

    pub(crate) const fn in_range(self) -> bool {
        self.port < 4 && self.pin < 16
    }

    const fn bit(self) -> u64 {
        1 << (self.port as u32 * 16 + self.pin as u32)
    }
}

/// Set of pins, one bit per `port * 16 + pin`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMask(u64);

impl PinMask {
    pub const EMPTY: PinMask = PinMask(0);

    pub fn from_pins(pins: &[Pin]) -> Self {
        pins.iter().fold(Self::EMPTY, |mask, pin| mask.with(*pin))
    }

    pub const fn with(self, pin: Pin) -> Self {
        PinMask(self.0 | pin.bit())
    }

    pub const fn contains(self, pin: Pin) -> bool {
        self.0 & pin.bit() != 0
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Mask of port `port`, bit n for pin n.
    pub const fn port(self, port: u8) -> u16 {
        (self.0 >> (port as u32 * 16)) as u16
    }
}

/// Arming parameters for the wake controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeConfig {
    /// Pins that may fire the wake interrupt.
    pub pins: PinMask,
    /// Pins that fire on a low level; the rest fire on high.
    pub active_low: PinMask,
    /// Number of qualifying events before the interrupt fires.
    pub event_count: u8,
    pub debounce_ms: u8,
}

/// Digital I/O, wake controller and tick source.
///
/// The wake controller and the tick source are one-shot: the engine re-arms
/// them after each firing.
pub trait ScanPlatform {
    /// Drive `pin` as an output.
    fn set_output(&mut self, pin: Pin, high: bool);
    /// Release `pin` to high impedance.
    fn set_high_impedance(&mut self, pin: Pin);
    /// Configure `pin` as an input with pull-up.
    fn set_input_pullup(&mut self, pin: Pin);
    fn read_level(&mut self, pin: Pin) -> bool;

    /// Arm the wake controller. Firing must end up in
    /// [`ScanSignals::raise_wake`](crate::ScanSignals::raise_wake).
    fn arm_wake(&mut self, config: WakeConfig);
    fn disarm_wake(&mut self);

    /// Start the tick source; each period must end up in
    /// [`ScanSignals::raise_tick`](crate::ScanSignals::raise_tick).
    fn start_tick(&mut self, period_us: u32);
    fn stop_tick(&mut self);
}
