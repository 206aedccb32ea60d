//! Host-testable library for the cdc-switch firmware.
//!
//! Everything with real logic lives here so it can be tested on the host
//! (no embedded hardware required):
//!
//! - [`usb`]: the CDC application state machine, its event relay and the
//!   switch debounce filter
//! - [`expander`]: the MCP23017 LED chaser used by the sibling firmware
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binaries (`src/main.rs`, `src/bin/led_chaser.rs`) are
//! `#![no_std]`/`#![no_main]` and only build with `--features embedded`.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod config;
pub mod error;
pub mod expander;
pub mod switch;
pub mod usb;

pub use error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::config;

    #[test]
    fn prompt_is_plain_ascii() {
        assert!(config::SWITCH_PROMPT.is_ascii());
        assert!(config::SWITCH_PROMPT.starts_with(b"\r\n"));
        assert!(!config::SWITCH_PROMPT.contains(&0));
    }

    #[test]
    fn prompt_is_sent_without_terminator() {
        // 21 text bytes; the C-string NUL is not part of the payload.
        assert_eq!(config::SWITCH_PROMPT.len(), 21);
        assert_eq!(config::SWITCH_PROMPT.last(), Some(&b'D'));
    }

    #[test]
    fn prompt_fits_write_buffer() {
        assert!(config::SWITCH_PROMPT.len() <= config::READ_BUFFER_SIZE);
    }

    #[test]
    fn high_speed_threshold_covers_same_time_as_full_speed() {
        // 8 microframes per 1 ms frame.
        assert_eq!(
            config::SWITCH_DEBOUNCE_COUNT_HS,
            config::SWITCH_DEBOUNCE_COUNT_FS * 8
        );
    }

    #[test]
    fn dormant_paths_are_off() {
        assert!(!config::SCHEDULE_READ_ON_CONFIGURE);
        assert!(!config::ECHO_RECEIVED);
    }
}
