//! USB CDC subsystem - a virtual serial port that reports switch presses.
//!
//! ## Components
//!
//! - **stack**: contract with the USB device stack (external collaborator)
//! - **relay**: device and CDC event callbacks, run in interrupt-like context
//! - **class_request**: CDC control requests mapped onto the relay
//! - **shared**: atomic flags the relay sets and the application consumes
//! - **debounce**: frame-tick based switch filter
//! - **app**: the cooperative state machine that schedules transfers
//! - **device**: the `embassy-usb` CDC-ACM binding (embedded builds only)
//!
//! Data flows stack → relay → shared → app → stack. The relay never calls
//! the app; the app never runs inside a callback.

pub mod app;
pub mod class_request;
pub mod debounce;
#[cfg(feature = "embedded")]
pub mod device;
pub mod line_coding;
pub mod relay;
pub mod shared;
pub mod stack;

pub use app::{CdcApp, State};
pub use debounce::Debouncer;
pub use line_coding::LineCoding;
pub use relay::{CdcEvent, ControlReply, DeviceEvent, EventRelay};
pub use shared::Shared;
pub use stack::{
    CdcIndex, DeviceControl, DeviceHandle, DeviceStack, Speed, TransferFlags, TransferHandle,
};
