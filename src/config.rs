//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "cdc-switch";
pub const USB_PRODUCT: &str = "Switch Prompt Serial Port";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// The only configuration value the device accepts from the host.
pub const SUPPORTED_CONFIGURATION: u8 = 1;

/// Max packet size of the CDC bulk endpoints (full speed).
pub const CDC_MAX_PACKET_SIZE: u16 = 64;

// CDC application

/// Size of the state machine's read and write buffers.
pub const READ_BUFFER_SIZE: usize = 512;

/// Frame ticks a press must be held for at full speed (1 ms frames).
pub const SWITCH_DEBOUNCE_COUNT_FS: u16 = 150;

/// Frame ticks a press must be held for at high speed (125 µs microframes).
pub const SWITCH_DEBOUNCE_COUNT_HS: u16 = 1200;

/// Sent to the host once per debounced press, without a trailing NUL.
pub const SWITCH_PROMPT: &[u8] = b"\r\nPUSH BUTTON PRESSED";

/// Schedule a host read as soon as the device is configured.
///
/// Off: the device only polls the switch and never services host data.
pub const SCHEDULE_READ_ON_CONFIGURE: bool = false;

/// Echo received bytes (each incremented by one) when no press is pending.
pub const ECHO_RECEIVED: bool = false;

// Line coding reported to the host before it sets its own.

pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// 0 = 1 stop bit.
pub const DEFAULT_CHAR_FORMAT: u8 = 0;
/// 0 = no parity.
pub const DEFAULT_PARITY: u8 = 0;
pub const DEFAULT_DATA_BITS: u8 = 8;

// GPIO pin assignments (nRF52840-DK defaults)
//
//   Switch (Button 1)  → P0.11, active low
//   Expander I²C SDA   → P0.26
//   Expander I²C SCL   → P0.27

/// Period of the frame tick that stands in for SOF on the nRF52840 (ms).
pub const FRAME_TICK_MS: u64 = 1;

// GPIO expander

/// MCP23017 7-bit address (A2..A0 strapped high).
pub const EXPANDER_ADDRESS: u8 = 0x27;

/// Time each LED stays lit in the chaser pattern (ms).
pub const LED_STEP_MS: u64 = 100;
