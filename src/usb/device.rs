//! USB CDC-ACM device on the nRF52840, wired to the state machine.
//!
//! Initialises the Embassy USB stack on the hardware USB peripheral,
//! builds the CDC-ACM function and provides [`EmbassyStack`], the
//! [`DeviceStack`] the application drives. Class requests on the
//! communication interface are answered by the [`EventRelay`]. Transfers
//! are handed to the writer/reader tasks through signals; their
//! completions come back through the relay as well.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use embassy_usb::control::{InResponse, OutResponse, Recipient, Request, RequestType};
use embassy_usb::driver::{Endpoint, EndpointError, EndpointIn, EndpointOut};
use embassy_usb::types::InterfaceNumber;
use embassy_usb::{Builder, Config, Handler, UsbDevice};
use heapless::Vec;
use static_cell::StaticCell;

use crate::config;
use crate::error::{Error, Result};

use super::class_request;
use super::relay::{CdcEvent, DeviceEvent, EventRelay};
use super::shared::Shared;
use super::stack::{
    CdcIndex, DeviceControl, DeviceHandle, DeviceStack, Speed, TransferFlags, TransferHandle,
};

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;
/// Bulk IN endpoint of the data interface.
pub type CdcSender = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointIn;
/// Bulk OUT endpoint of the data interface.
pub type CdcReceiver = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointOut;

const USB_CLASS_CDC: u8 = 0x02;
const USB_CLASS_CDC_DATA: u8 = 0x0A;
const CDC_SUBCLASS_ACM: u8 = 0x02;
const CDC_PROTOCOL_NONE: u8 = 0x00;

const CS_INTERFACE: u8 = 0x24;
const CDC_TYPE_HEADER: u8 = 0x00;
const CDC_TYPE_CALL_MANAGEMENT: u8 = 0x01;
const CDC_TYPE_ACM: u8 = 0x02;
const CDC_TYPE_UNION: u8 = 0x06;

/// ACM bmCapabilities: line coding + control line state, SEND_BREAK.
const ACM_CAPABILITIES: u8 = 0x02 | 0x04;

/// Flags and counters shared by the application and the relay.
pub static SHARED: Shared = Shared::new();

static CDC_CONTROL: StaticCell<CdcControl> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_EVENT_HANDLER: StaticCell<UsbEventHandler> = StaticCell::new();

static DEVICE_EVENTS: AtomicBool = AtomicBool::new(false);
static CDC_EVENTS: AtomicBool = AtomicBool::new(false);

static WRITE_REQUEST: Signal<CriticalSectionRawMutex, Vec<u8, { config::READ_BUFFER_SIZE }>> =
    Signal::new();
static READ_REQUEST: Signal<CriticalSectionRawMutex, usize> = Signal::new();
static RX_DATA: Mutex<CriticalSectionRawMutex, RefCell<Vec<u8, { config::READ_BUFFER_SIZE }>>> =
    Mutex::new(RefCell::new(Vec::new()));

fn relay() -> EventRelay<'static> {
    EventRelay::new(&SHARED)
}

/// Forward a device event, once the application asked for them.
fn device_event(event: DeviceEvent) {
    if DEVICE_EVENTS.load(Ordering::Acquire) {
        relay().on_device_event(event, &mut SoftConnect);
    }
}

fn cdc_events_enabled() -> bool {
    CDC_EVENTS.load(Ordering::Acquire)
}

fn cdc_event(event: CdcEvent<'_>) {
    if cdc_events_enabled() {
        relay().on_cdc_event(CdcIndex::PRIMARY, event);
    }
}

/// Bus-state callbacks from `embassy-usb`.
struct UsbEventHandler;

impl Handler for UsbEventHandler {
    fn enabled(&mut self, enabled: bool) {
        // The peripheral is enabled when VBUS is present.
        device_event(if enabled {
            DeviceEvent::PowerDetected
        } else {
            DeviceEvent::PowerRemoved
        });
    }

    fn reset(&mut self) {
        device_event(DeviceEvent::Reset);
    }

    fn configured(&mut self, configured: bool) {
        device_event(if configured {
            DeviceEvent::Configured {
                value: config::SUPPORTED_CONFIGURATION,
            }
        } else {
            // SET_CONFIGURATION(0)
            DeviceEvent::Reset
        });
    }

    fn suspended(&mut self, suspended: bool) {
        device_event(if suspended {
            DeviceEvent::Suspended
        } else {
            DeviceEvent::Resumed
        });
    }
}

/// Class requests addressed to the CDC communication interface.
struct CdcControl {
    comm_if: InterfaceNumber,
}

impl CdcControl {
    fn accepts(&self, req: &Request) -> bool {
        req.request_type == RequestType::Class
            && req.recipient == Recipient::Interface
            && req.index == u16::from(self.comm_if.0)
    }
}

impl Handler for CdcControl {
    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        if !self.accepts(&req) {
            return None;
        }
        let ok = cdc_events_enabled()
            && class_request::handle_out(
                &relay(),
                CdcIndex::PRIMARY,
                req.request,
                req.value,
                data,
            );
        Some(if ok {
            OutResponse::Accepted
        } else {
            OutResponse::Rejected
        })
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if !self.accepts(&req) {
            return None;
        }
        if !cdc_events_enabled() {
            return Some(InResponse::Rejected);
        }
        match class_request::handle_in(&relay(), CdcIndex::PRIMARY, req.request, buf) {
            Some(n) => Some(InResponse::Accepted(&buf[..n])),
            None => Some(InResponse::Rejected),
        }
    }
}

/// `embassy-usb` drives the pull-up itself; attach/detach are only traced.
struct SoftConnect;

impl DeviceControl for SoftConnect {
    fn attach(&mut self, _device: DeviceHandle) {
        debug!("usb: attach");
    }

    fn detach(&mut self, _device: DeviceHandle) {
        debug!("usb: detach");
    }

    fn enable_cdc_events(&mut self, _index: CdcIndex) {
        CDC_EVENTS.store(true, Ordering::Release);
    }
}

/// [`DeviceStack`] backed by the reader/writer tasks below.
pub struct EmbassyStack {
    next_transfer: u32,
}

impl EmbassyStack {
    pub const fn new() -> Self {
        Self { next_transfer: 1 }
    }

    fn transfer(&mut self) -> TransferHandle {
        let handle = TransferHandle(self.next_transfer);
        self.next_transfer = self.next_transfer.wrapping_add(1);
        handle
    }
}

impl Default for EmbassyStack {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStack for EmbassyStack {
    fn open(&mut self) -> Result<DeviceHandle> {
        Ok(DeviceHandle(0))
    }

    fn enable_device_events(&mut self, _device: DeviceHandle) {
        DEVICE_EVENTS.store(true, Ordering::Release);
    }

    fn active_speed(&self, _device: DeviceHandle) -> Speed {
        // The nRF52840 controller is full speed only.
        Speed::Full
    }

    fn submit_read(&mut self, _index: CdcIndex, max_len: usize) -> Result<TransferHandle> {
        if max_len == 0 {
            return Err(Error::TransferRejected);
        }
        if READ_REQUEST.signaled() {
            return Err(Error::Busy);
        }
        READ_REQUEST.signal(max_len.min(config::READ_BUFFER_SIZE));
        Ok(self.transfer())
    }

    fn submit_write(
        &mut self,
        _index: CdcIndex,
        data: &[u8],
        _flags: TransferFlags,
    ) -> Result<TransferHandle> {
        if WRITE_REQUEST.signaled() {
            return Err(Error::Busy);
        }
        // Every write is a complete message and is terminated on the wire.
        let data = Vec::from_slice(data).map_err(|_| Error::BufferOverflow)?;
        WRITE_REQUEST.signal(data);
        Ok(self.transfer())
    }

    fn received(&mut self, _index: CdcIndex, buf: &mut [u8]) -> usize {
        RX_DATA.lock(|rx| {
            let rx = rx.borrow();
            let n = rx.len().min(buf.len());
            buf[..n].copy_from_slice(&rx[..n]);
            n
        })
    }
}

/// Build result containing the USB device runner and the CDC data endpoints.
pub struct UsbCdcDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub sender: CdcSender,
    pub receiver: CdcReceiver,
}

/// Initialise the USB stack and create the CDC-ACM device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbCdcDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    // IAD so Windows binds usbser to the CDC pair.
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;
    usb_config.composite_with_iads = true;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let handler = USB_EVENT_HANDLER.init(UsbEventHandler);
    builder.handler(handler);

    let mut func = builder.function(USB_CLASS_CDC, CDC_SUBCLASS_ACM, CDC_PROTOCOL_NONE);

    // Communication interface
    let mut iface = func.interface();
    let comm_if = iface.interface_number();
    let data_if = comm_if.0 + 1;
    let mut alt = iface.alt_setting(USB_CLASS_CDC, CDC_SUBCLASS_ACM, CDC_PROTOCOL_NONE, None);
    alt.descriptor(CS_INTERFACE, &[CDC_TYPE_HEADER, 0x10, 0x01]); // CDC 1.10
    alt.descriptor(CS_INTERFACE, &[CDC_TYPE_ACM, ACM_CAPABILITIES]);
    alt.descriptor(CS_INTERFACE, &[CDC_TYPE_UNION, comm_if.0, data_if]);
    alt.descriptor(CS_INTERFACE, &[CDC_TYPE_CALL_MANAGEMENT, 0x00, data_if]);
    // Notification endpoint; no serial state is ever sent on it.
    let _notify = alt.endpoint_interrupt_in(8, 255);

    // Data interface
    let mut iface = func.interface();
    let mut alt = iface.alt_setting(USB_CLASS_CDC_DATA, 0x00, CDC_PROTOCOL_NONE, None);
    let receiver = alt.endpoint_bulk_out(config::CDC_MAX_PACKET_SIZE);
    let sender = alt.endpoint_bulk_in(config::CDC_MAX_PACKET_SIZE);
    drop(func);

    let control = CDC_CONTROL.init(CdcControl { comm_if });
    builder.handler(control);

    let device = builder.build();

    info!("USB CDC-ACM device initialised");

    UsbCdcDevice {
        device,
        sender,
        receiver,
    }
}

/// Run the USB device stack. Handles enumeration, suspend/resume and
/// endpoint servicing forever.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Stand-in for start-of-frame: the nRF52840 driver does not surface SOF,
/// so a 1 ms ticker feeds the debounce filter instead.
pub async fn frame_tick_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(config::FRAME_TICK_MS));
    loop {
        ticker.next().await;
        device_event(DeviceEvent::FrameTick);
    }
}

/// Sends each submitted write in max-packet chunks, then reports completion.
pub async fn writer_task(mut sender: CdcSender) -> ! {
    let max_packet = usize::from(config::CDC_MAX_PACKET_SIZE);
    loop {
        let data = WRITE_REQUEST.wait().await;
        match send(&mut sender, &data, max_packet).await {
            Ok(()) => cdc_event(CdcEvent::WriteComplete { length: data.len() }),
            Err(_e) => {
                // Abandoned; the application re-arms on reset.
                warn!("cdc: write dropped: {:?}", _e);
            }
        }
    }
}

async fn send(
    sender: &mut CdcSender,
    data: &[u8],
    max_packet: usize,
) -> core::result::Result<(), EndpointError> {
    for chunk in data.chunks(max_packet) {
        sender.write(chunk).await?;
    }
    // A full last packet needs a ZLP to end the transfer.
    if data.len() % max_packet == 0 {
        sender.write(&[]).await?;
    }
    Ok(())
}

/// Services read requests one packet at a time.
pub async fn reader_task(mut receiver: CdcReceiver) -> ! {
    let mut packet = [0u8; config::CDC_MAX_PACKET_SIZE as usize];
    loop {
        let max_len = READ_REQUEST.wait().await;
        receiver.wait_enabled().await;

        match receiver.read(&mut packet).await {
            Ok(n) => {
                let n = n.min(max_len);
                RX_DATA.lock(|rx| {
                    let mut rx = rx.borrow_mut();
                    rx.clear();
                    // n <= packet size < capacity
                    let _ = rx.extend_from_slice(&packet[..n]);
                });
                cdc_event(CdcEvent::ReadComplete { length: n });
            }
            Err(_e) => {
                warn!("cdc: read dropped: {:?}", _e);
            }
        }
    }
}
