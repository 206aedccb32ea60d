//! CDC application state machine.
//!
//! Stepped once per pass of the firmware's main loop. A step never blocks:
//! it submits transfers and moves on, then observes completion on later
//! steps through the flags the relay sets in [`Shared`].
//!
//! ```text
//! Init ──open ok──▶ WaitForConfiguration ──configured──▶ CheckSwitch ◀──── Idle
//!                          ▲                                 │ press        ▲
//!                          │ reset guard                     ▼              │
//!                   (any post-Init state)              ScheduleWrite ──▶ WaitForWriteComplete
//! ```
//!
//! `ScheduleRead`/`WaitForReadComplete` are only entered when read
//! scheduling is enabled (off by default).

use crate::config;
use crate::switch::Switch;

use super::debounce::Debouncer;
use super::shared::Shared;
use super::stack::{CdcIndex, DeviceHandle, DeviceStack, Speed, TransferFlags, TransferHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Init,
    WaitForConfiguration,
    ScheduleRead,
    WaitForReadComplete,
    CheckSwitch,
    ScheduleWrite,
    WaitForWriteComplete,
    Idle,
    /// A submission was rejected. Terminal until power cycle.
    Error,
}

pub struct CdcApp<'a> {
    shared: &'a Shared,
    state: State,
    device: Option<DeviceHandle>,
    read_transfer: Option<TransferHandle>,
    write_transfer: Option<TransferHandle>,
    debouncer: Debouncer,
    read_on_configure: bool,
    echo: bool,
    read_buf: [u8; config::READ_BUFFER_SIZE],
    write_buf: [u8; config::READ_BUFFER_SIZE],
}

impl<'a> CdcApp<'a> {
    pub fn new(shared: &'a Shared) -> Self {
        Self {
            shared,
            state: State::Init,
            device: None,
            read_transfer: None,
            write_transfer: None,
            debouncer: Debouncer::new(),
            read_on_configure: config::SCHEDULE_READ_ON_CONFIGURE,
            echo: config::ECHO_RECEIVED,
            read_buf: [0; config::READ_BUFFER_SIZE],
            write_buf: [0; config::READ_BUFFER_SIZE],
        }
    }

    /// Go to `ScheduleRead` instead of `CheckSwitch` once configured.
    pub fn schedule_reads(mut self, enable: bool) -> Self {
        self.read_on_configure = enable;
        self
    }

    /// Echo received bytes when a write is scheduled without a pending press.
    pub fn echo_received(mut self, enable: bool) -> Self {
        self.echo = enable;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn device(&self) -> Option<DeviceHandle> {
        self.device
    }

    pub fn read_transfer(&self) -> Option<TransferHandle> {
        self.read_transfer
    }

    pub fn write_transfer(&self) -> Option<TransferHandle> {
        self.write_transfer
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// Run one step of the state machine.
    pub fn step<S, W>(&mut self, stack: &mut S, switch: &mut W)
    where
        S: DeviceStack,
        W: Switch,
    {
        if !matches!(self.state, State::Init | State::Error) && self.host_gone() {
            return;
        }

        match self.state {
            State::Init => self.open(stack),
            State::WaitForConfiguration => {
                if self.shared.is_configured() {
                    let next = if self.read_on_configure {
                        State::ScheduleRead
                    } else {
                        State::CheckSwitch
                    };
                    self.goto(next);
                }
            }
            State::ScheduleRead => self.schedule_read(stack),
            State::WaitForReadComplete | State::CheckSwitch => {
                let pressed = switch.is_pressed();
                let device = self.device;
                self.debouncer.poll(pressed, self.shared, || match device {
                    Some(d) => stack.active_speed(d),
                    None => Speed::Full,
                });

                // A completed read only counts when echo is on and its data is unconsumed.
                let echo_ready = self.echo && self.read_transfer.is_some();
                if self.shared.is_read_complete() && (self.debouncer.press_latched() || echo_ready)
                {
                    self.goto(State::ScheduleWrite);
                }
            }
            State::ScheduleWrite => self.schedule_write(stack),
            State::WaitForWriteComplete => {
                if self.shared.is_write_complete() {
                    self.goto(State::Idle);
                }
            }
            State::Idle => self.goto(State::CheckSwitch),
            State::Error => {}
        }
    }

    /// Reset guard: the host reset or disconnected, forget in-flight work.
    fn host_gone(&mut self) -> bool {
        if self.shared.is_configured() {
            return false;
        }
        if self.state != State::WaitForConfiguration {
            info!("cdc: host gone in {:?}", self.state);
        }
        self.state = State::WaitForConfiguration;
        // In-flight transfers are abandoned, not cancelled.
        self.read_transfer = None;
        self.write_transfer = None;
        self.shared.rearm_transfers();
        true
    }

    fn open<S: DeviceStack>(&mut self, stack: &mut S) {
        match stack.open() {
            Ok(device) => {
                self.device = Some(device);
                self.shared.publish_device(device);
                stack.enable_device_events(device);
                self.goto(State::WaitForConfiguration);
            }
            Err(_e) => {
                // Retried next step; the device may not be up yet.
                trace!("cdc: open failed: {:?}", _e);
            }
        }
    }

    fn schedule_read<S: DeviceStack>(&mut self, stack: &mut S) {
        self.goto(State::WaitForReadComplete);
        if !self.shared.is_read_complete() {
            return;
        }

        self.shared.claim_read_complete();
        self.read_transfer = None;
        match stack.submit_read(CdcIndex::PRIMARY, self.read_buf.len()) {
            Ok(handle) => self.read_transfer = Some(handle),
            Err(_e) => {
                warn!("cdc: read rejected: {:?}", _e);
                self.goto(State::Error);
            }
        }
    }

    fn schedule_write<S: DeviceStack>(&mut self, stack: &mut S) {
        self.write_transfer = None;
        self.shared.claim_write_complete();
        self.goto(State::WaitForWriteComplete);

        let submitted = if self.debouncer.take_press() {
            stack.submit_write(
                CdcIndex::PRIMARY,
                config::SWITCH_PROMPT,
                TransferFlags::DataComplete,
            )
        } else if self.echo && self.read_transfer.is_some() {
            self.read_transfer = None;
            let n = stack.received(CdcIndex::PRIMARY, &mut self.read_buf);
            let n = n.min(self.shared.bytes_read());
            let len = echo_transform(&self.read_buf[..n], &mut self.write_buf);
            stack.submit_write(
                CdcIndex::PRIMARY,
                &self.write_buf[..len],
                TransferFlags::DataComplete,
            )
        } else {
            return;
        };

        match submitted {
            Ok(handle) => self.write_transfer = Some(handle),
            Err(_e) => {
                warn!("cdc: write rejected: {:?}", _e);
                self.goto(State::Error);
            }
        }
    }

    fn goto(&mut self, next: State) {
        if next != self.state {
            debug!("cdc: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// Echo transform: every byte except CR/LF is incremented by one.
///
/// Returns the number of bytes written to `output`.
pub fn echo_transform(input: &[u8], output: &mut [u8]) -> usize {
    let n = input.len().min(output.len());
    for (out, &b) in output[..n].iter_mut().zip(input) {
        *out = match b {
            b'\r' | b'\n' => b,
            _ => b.wrapping_add(1),
        };
    }
    n
}
