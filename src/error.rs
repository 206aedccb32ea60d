//! Unified error type for cdc-switch.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

use core::fmt;

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // USB
    /// The device stack could not open a device session.
    DeviceUnavailable,

    /// The device stack refused a read or write submission.
    TransferRejected,

    /// A transfer of the same direction is still in flight.
    Busy,

    // Expander
    /// I²C transaction to the GPIO expander failed.
    I2c,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable => write!(f, "USB device unavailable"),
            Self::TransferRejected => write!(f, "transfer rejected by device stack"),
            Self::Busy => write!(f, "transfer already in flight"),
            Self::I2c => write!(f, "I2C transaction failed"),
            Self::BufferOverflow => write!(f, "buffer overflow"),
        }
    }
}
