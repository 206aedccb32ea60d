//! Device-level and CDC-level event callbacks.
//!
//! The stack calls into [`EventRelay`] from interrupt-like context. Each
//! handler returns immediately: it records facts into [`Shared`] and, for
//! control requests, hands back a [`ControlReply`] for the stack to execute.
//! Nothing here calls into the state machine.

use crate::config;

use super::line_coding::{LineCoding, LINE_CODING_SIZE};
use super::shared::Shared;
use super::stack::{CdcIndex, DeviceControl};

/// Device-layer events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceEvent {
    Reset,
    /// The host selected a configuration.
    Configured { value: u8 },
    /// VBUS appeared.
    PowerDetected,
    /// VBUS went away.
    PowerRemoved,
    /// Start of frame.
    FrameTick,
    Suspended,
    Resumed,
    Error,
}

/// CDC class events for one function instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CdcEvent<'d> {
    GetLineCoding,
    SetLineCoding,
    SetControlLineState { dtr: bool, carrier: bool },
    /// Break duration in ms (0xFFFF = until cleared).
    SendBreak { duration: u16 },
    ReadComplete { length: usize },
    /// Data stage of the last host-to-device control transfer.
    ControlDataReceived(&'d [u8]),
    /// Data stage of the last device-to-host control transfer.
    ControlDataSent,
    WriteComplete { length: usize },
}

/// What the stack must do to finish a control request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlReply {
    /// Nothing to do.
    None,
    /// Send this payload in the data stage.
    Send([u8; LINE_CODING_SIZE]),
    /// Receive a data stage of this many bytes; a `ControlDataReceived` follows.
    Receive(usize),
    /// Complete the status stage with ACK.
    StatusOk,
}

/// Callback surface registered with the device stack.
#[derive(Clone, Copy)]
pub struct EventRelay<'a> {
    shared: &'a Shared,
}

impl<'a> EventRelay<'a> {
    pub const fn new(shared: &'a Shared) -> Self {
        Self { shared }
    }

    /// Handle a device-layer event.
    pub fn on_device_event<C: DeviceControl>(&self, event: DeviceEvent, control: &mut C) {
        match event {
            DeviceEvent::FrameTick => self.shared.signal_frame_tick(),
            DeviceEvent::Reset => {
                debug!("usb: reset");
                self.shared.set_configured(false);
            }
            DeviceEvent::Configured { value } => {
                if value == config::SUPPORTED_CONFIGURATION {
                    control.enable_cdc_events(CdcIndex::PRIMARY);
                    self.shared.set_configured(true);
                    info!("usb: configured ({})", value);
                } else {
                    warn!("usb: ignoring configuration {}", value);
                }
            }
            DeviceEvent::PowerDetected => match self.shared.device() {
                Some(device) => {
                    debug!("usb: vbus detected, attaching");
                    control.attach(device);
                }
                None => {
                    warn!("usb: vbus detected before device open");
                }
            },
            DeviceEvent::PowerRemoved => {
                if let Some(device) = self.shared.device() {
                    debug!("usb: vbus removed, detaching");
                    control.detach(device);
                }
            }
            DeviceEvent::Suspended | DeviceEvent::Resumed | DeviceEvent::Error => {
                trace!("usb: {:?}", event);
            }
        }
    }

    /// Handle a CDC class event.
    pub fn on_cdc_event(&self, _index: CdcIndex, event: CdcEvent<'_>) -> ControlReply {
        match event {
            CdcEvent::GetLineCoding => ControlReply::Send(LineCoding::DEFAULT.to_bytes()),
            CdcEvent::SetLineCoding => ControlReply::Receive(LINE_CODING_SIZE),
            CdcEvent::SetControlLineState { dtr, carrier } => {
                trace!("cdc: dtr={} carrier={}", dtr, carrier);
                self.shared.record_control_line_state(dtr, carrier);
                ControlReply::StatusOk
            }
            CdcEvent::SendBreak { duration } => {
                self.shared.record_break(duration);
                ControlReply::StatusOk
            }
            CdcEvent::ReadComplete { length } => {
                self.shared.signal_read_complete(length);
                ControlReply::None
            }
            CdcEvent::ControlDataReceived(data) => {
                // Accepted unconditionally; a short payload keeps the old coding.
                if let Some(coding) = LineCoding::from_bytes(data) {
                    self.shared.record_host_line_coding(coding);
                }
                ControlReply::StatusOk
            }
            CdcEvent::ControlDataSent => ControlReply::None,
            CdcEvent::WriteComplete { length: _length } => {
                trace!("cdc: wrote {} bytes", _length);
                self.shared.signal_write_complete();
                ControlReply::None
            }
        }
    }
}
