//! Contract between the application and the USB device stack.
//!
//! The stack is an external collaborator: the firmware wraps `embassy-usb`,
//! tests use a recording mock. Submissions are fire-and-forget; completion
//! reaches the application only through [`EventRelay`](super::relay::EventRelay).

use crate::error::Result;

/// Opened device-layer session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceHandle(pub u32);

/// Token for one in-flight read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferHandle(pub u32);

/// CDC function instance on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CdcIndex(pub u8);

impl CdcIndex {
    /// The single serial port this firmware exposes.
    pub const PRIMARY: CdcIndex = CdcIndex(0);
}

/// Negotiated bus speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    Low,
    Full,
    High,
}

/// How the stack should terminate a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferFlags {
    /// Whole message: terminate with a short or zero-length packet.
    DataComplete,
}

/// Operations the state machine drives from task context.
pub trait DeviceStack {
    /// Open a session on the device layer.
    fn open(&mut self) -> Result<DeviceHandle>;

    /// Start delivering device-level events for `device` to the relay.
    fn enable_device_events(&mut self, device: DeviceHandle);

    /// Speed negotiated with the host for `device`.
    fn active_speed(&self, device: DeviceHandle) -> Speed;

    /// Queue a host-to-device read of at most `max_len` bytes.
    fn submit_read(&mut self, index: CdcIndex, max_len: usize) -> Result<TransferHandle>;

    /// Queue a device-to-host write. The stack copies `data` before returning.
    fn submit_write(
        &mut self,
        index: CdcIndex,
        data: &[u8],
        flags: TransferFlags,
    ) -> Result<TransferHandle>;

    /// Copy the bytes of the last completed read into `buf`, returning the count.
    fn received(&mut self, index: CdcIndex, buf: &mut [u8]) -> usize;
}

/// Operations the relay may trigger from event context.
///
/// Implementations must not block.
pub trait DeviceControl {
    /// VBUS appeared: connect the pull-up.
    fn attach(&mut self, device: DeviceHandle);

    /// VBUS went away: disconnect.
    fn detach(&mut self, device: DeviceHandle);

    /// Route CDC class events for `index` to the relay.
    fn enable_cdc_events(&mut self, index: CdcIndex);
}
