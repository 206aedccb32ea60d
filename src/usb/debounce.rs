//! Frame-tick based switch debouncing.
//!
//! A press must stay asserted for a speed-dependent number of USB frame
//! ticks before it is latched. Any release in between cancels the candidate.

use crate::config::{SWITCH_DEBOUNCE_COUNT_FS, SWITCH_DEBOUNCE_COUNT_HS};

use super::shared::Shared;
use super::stack::Speed;

/// Ticks required at `speed`, or `None` when the speed has no threshold.
pub fn debounce_target(speed: Speed) -> Option<u16> {
    match speed {
        Speed::Full => Some(SWITCH_DEBOUNCE_COUNT_FS),
        Speed::High => Some(SWITCH_DEBOUNCE_COUNT_HS),
        Speed::Low => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer {
    ticks: u16,
    target: u16,
    armed: bool,
    pressed: bool,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            target: SWITCH_DEBOUNCE_COUNT_FS,
            armed: false,
            pressed: false,
        }
    }

    /// Run one observation.
    ///
    /// `speed` is queried each time a tick is consumed so a renegotiation
    /// mid-press takes effect on the next tick.
    pub fn poll(&mut self, raw_pressed: bool, shared: &Shared, speed: impl Fn() -> Speed) {
        if !raw_pressed {
            self.armed = false;
            self.ticks = 0;
            shared.drop_frame_tick();
            return;
        }

        if !self.armed {
            // Fresh press.
            self.armed = true;
            self.ticks = 0;
            return;
        }

        if !shared.take_frame_tick() {
            return;
        }

        self.ticks = self.ticks.saturating_add(1);
        if let Some(target) = debounce_target(speed()) {
            self.target = target;
        }

        if self.ticks >= self.target {
            trace!("switch: press after {} ticks", self.ticks);
            self.pressed = true;
            self.ticks = 0;
            self.armed = false;
        }
    }

    /// A debounced press is waiting to be consumed.
    pub fn press_latched(&self) -> bool {
        self.pressed
    }

    /// Consume the latched press.
    pub fn take_press(&mut self) -> bool {
        core::mem::replace(&mut self.pressed, false)
    }

    pub fn ticks(&self) -> u16 {
        self.ticks
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Threshold applied at the last consumed tick.
    pub fn target(&self) -> u16 {
        self.target
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold_for(deb: &mut Debouncer, shared: &Shared, ticks: u16, speed: Speed) {
        for _ in 0..ticks {
            shared.signal_frame_tick();
            deb.poll(true, shared, || speed);
        }
    }

    #[test]
    fn targets_follow_speed() {
        assert_eq!(debounce_target(Speed::Full), Some(150));
        assert_eq!(debounce_target(Speed::High), Some(1200));
        assert_eq!(debounce_target(Speed::Low), None);
    }

    #[test]
    fn first_press_only_arms() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        shared.signal_frame_tick();
        deb.poll(true, &shared, || Speed::Full);
        assert!(deb.is_armed());
        assert_eq!(deb.ticks(), 0);
        // The owed tick is left for the next observation.
        assert!(shared.frame_tick_pending());
    }

    #[test]
    fn latches_exactly_on_target_tick() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        deb.poll(true, &shared, || Speed::Full);

        hold_for(&mut deb, &shared, 149, Speed::Full);
        assert!(!deb.press_latched());
        assert_eq!(deb.ticks(), 149);

        hold_for(&mut deb, &shared, 1, Speed::Full);
        assert!(deb.press_latched());
        assert_eq!(deb.ticks(), 0);
        assert!(!deb.is_armed());
    }

    #[test]
    fn steps_without_tick_do_not_count() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        deb.poll(true, &shared, || Speed::Full);
        for _ in 0..500 {
            deb.poll(true, &shared, || Speed::Full);
        }
        assert_eq!(deb.ticks(), 0);
        assert!(!deb.press_latched());
    }

    #[test]
    fn early_release_discards_candidate() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        deb.poll(true, &shared, || Speed::Full);
        hold_for(&mut deb, &shared, 100, Speed::Full);

        shared.signal_frame_tick();
        deb.poll(false, &shared, || Speed::Full);
        assert_eq!(deb.ticks(), 0);
        assert!(!deb.is_armed());
        assert!(!deb.press_latched());
        assert!(!shared.frame_tick_pending());
    }

    #[test]
    fn high_speed_needs_more_ticks() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        deb.poll(true, &shared, || Speed::High);
        hold_for(&mut deb, &shared, 1199, Speed::High);
        assert!(!deb.press_latched());
        hold_for(&mut deb, &shared, 1, Speed::High);
        assert!(deb.press_latched());
    }

    #[test]
    fn speed_change_mid_press_uses_new_target() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        deb.poll(true, &shared, || Speed::High);
        hold_for(&mut deb, &shared, 200, Speed::High);
        assert!(!deb.press_latched());

        // Renegotiated to full speed: already past 150, fires on the next tick.
        hold_for(&mut deb, &shared, 1, Speed::Full);
        assert!(deb.press_latched());
        assert_eq!(deb.target(), 150);
    }

    #[test]
    fn low_speed_keeps_previous_target() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        deb.poll(true, &shared, || Speed::Low);
        hold_for(&mut deb, &shared, 150, Speed::Low);
        assert!(deb.press_latched());
        assert_eq!(deb.target(), 150);
    }

    #[test]
    fn held_switch_repeats_at_target_cadence() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        let mut presses = 0;

        // Re-arm step + 150 ticks per press.
        for _ in 0..3 {
            deb.poll(true, &shared, || Speed::Full);
            hold_for(&mut deb, &shared, 150, Speed::Full);
            if deb.take_press() {
                presses += 1;
            }
        }
        assert_eq!(presses, 3);
    }

    #[test]
    fn take_press_clears_latch() {
        let shared = Shared::new();
        let mut deb = Debouncer::new();
        deb.poll(true, &shared, || Speed::Full);
        hold_for(&mut deb, &shared, 150, Speed::Full);
        assert!(deb.take_press());
        assert!(!deb.take_press());
    }
}
