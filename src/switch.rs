//! Raw switch input.
//!
//! The state machine only needs "is the switch held right now"; debouncing
//! happens in [`usb::debounce`](crate::usb::debounce).

use embedded_hal::digital::InputPin;

/// Raw, undebounced press condition.
pub trait Switch {
    fn is_pressed(&mut self) -> bool;
}

/// Push button wired to ground with a pull-up: pressed reads low.
///
/// A pin read error counts as released.
pub struct ActiveLow<P> {
    pin: P,
}

impl<P: InputPin> ActiveLow<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> Switch for ActiveLow<P> {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_low().unwrap_or(false)
    }
}
