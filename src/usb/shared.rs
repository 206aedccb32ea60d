//! State shared between the event relay and the application task.
//!
//! Every field is an atomic so the relay can run in interrupt context.
//! Writers are partitioned:
//!
//! - `signal_*` / `record_*`: called only by [`EventRelay`](super::relay::EventRelay).
//!   Completion flags are only ever set to `true` here.
//! - `claim_*` / `rearm_transfers` / `publish_device`: called only by
//!   [`CdcApp`](super::app::CdcApp). Completion flags are cleared here
//!   immediately before a submission.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicUsize, Ordering};

use super::line_coding::LineCoding;
use super::stack::DeviceHandle;

pub struct Shared {
    // relay → task
    configured: AtomicBool,
    read_complete: AtomicBool,
    write_complete: AtomicBool,
    frame_tick: AtomicBool,
    bytes_read: AtomicUsize,

    // relay only, observational
    dtr: AtomicBool,
    carrier: AtomicBool,
    break_duration: AtomicU16,
    host_baud_rate: AtomicU32,
    host_format: AtomicU32,

    // task → relay
    device: AtomicU32,
    device_open: AtomicBool,
}

impl Shared {
    pub const fn new() -> Self {
        Self {
            configured: AtomicBool::new(false),
            read_complete: AtomicBool::new(true),
            write_complete: AtomicBool::new(true),
            frame_tick: AtomicBool::new(false),
            bytes_read: AtomicUsize::new(0),
            dtr: AtomicBool::new(false),
            carrier: AtomicBool::new(false),
            break_duration: AtomicU16::new(0),
            host_baud_rate: AtomicU32::new(LineCoding::DEFAULT.baud_rate),
            host_format: AtomicU32::new(LineCoding::DEFAULT.format_word()),
            device: AtomicU32::new(0),
            device_open: AtomicBool::new(false),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    pub fn is_read_complete(&self) -> bool {
        self.read_complete.load(Ordering::Acquire)
    }

    pub fn is_write_complete(&self) -> bool {
        self.write_complete.load(Ordering::Acquire)
    }

    pub fn frame_tick_pending(&self) -> bool {
        self.frame_tick.load(Ordering::Acquire)
    }

    /// Length reported by the most recent read completion.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read.load(Ordering::Acquire)
    }

    pub fn dtr(&self) -> bool {
        self.dtr.load(Ordering::Relaxed)
    }

    pub fn carrier(&self) -> bool {
        self.carrier.load(Ordering::Relaxed)
    }

    /// Last SEND_BREAK duration requested by the host (ms).
    pub fn break_duration(&self) -> u16 {
        self.break_duration.load(Ordering::Relaxed)
    }

    /// Line coding last written by the host (defaults until the first SET_LINE_CODING).
    pub fn host_line_coding(&self) -> LineCoding {
        LineCoding::from_parts(
            self.host_baud_rate.load(Ordering::Relaxed),
            self.host_format.load(Ordering::Relaxed),
        )
    }

    /// Device session published by the task, if one is open.
    pub fn device(&self) -> Option<DeviceHandle> {
        if self.device_open.load(Ordering::Acquire) {
            Some(DeviceHandle(self.device.load(Ordering::Acquire)))
        } else {
            None
        }
    }

    // Relay side

    pub(crate) fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::Release);
    }

    pub(crate) fn signal_read_complete(&self, length: usize) {
        self.bytes_read.store(length, Ordering::Release);
        self.read_complete.store(true, Ordering::Release);
    }

    pub(crate) fn signal_write_complete(&self) {
        self.write_complete.store(true, Ordering::Release);
    }

    pub(crate) fn signal_frame_tick(&self) {
        self.frame_tick.store(true, Ordering::Release);
    }

    pub(crate) fn record_control_line_state(&self, dtr: bool, carrier: bool) {
        self.dtr.store(dtr, Ordering::Relaxed);
        self.carrier.store(carrier, Ordering::Relaxed);
    }

    pub(crate) fn record_break(&self, duration: u16) {
        self.break_duration.store(duration, Ordering::Relaxed);
    }

    pub(crate) fn record_host_line_coding(&self, coding: LineCoding) {
        self.host_baud_rate.store(coding.baud_rate, Ordering::Relaxed);
        self.host_format.store(coding.format_word(), Ordering::Relaxed);
    }

    // Task side

    pub(crate) fn claim_read_complete(&self) {
        self.read_complete.store(false, Ordering::Release);
    }

    pub(crate) fn claim_write_complete(&self) {
        self.write_complete.store(false, Ordering::Release);
    }

    /// Consume one owed frame tick, if any.
    pub(crate) fn take_frame_tick(&self) -> bool {
        self.frame_tick.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn drop_frame_tick(&self) {
        self.frame_tick.store(false, Ordering::Release);
    }

    /// Forget in-flight transfers after the host went away.
    pub(crate) fn rearm_transfers(&self) {
        self.read_complete.store(true, Ordering::Release);
        self.write_complete.store(true, Ordering::Release);
    }

    pub(crate) fn publish_device(&self, device: DeviceHandle) {
        self.device.store(device.0, Ordering::Release);
        self.device_open.store(true, Ordering::Release);
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}
