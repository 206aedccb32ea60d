//! cdc-switch firmware - nRF52840 USB virtual serial port.
//!
//! Enumerates as a CDC-ACM device and writes a prompt to the host every
//! time Button 1 (P0.11) is held long enough to pass the debounce filter.
//!
//! Everything runs as joined futures on the thread executor:
//!
//! - USB device stack (enumeration, control requests)
//! - CDC writer and reader (transfer submission and completion)
//! - 1 ms frame ticker
//! - the application state machine, stepped once per executor pass

#![no_std]
#![no_main]

use cdc_switch::switch::ActiveLow;
use cdc_switch::usb::device::{self, EmbassyStack, SHARED};
use cdc_switch::usb::CdcApp;
use defmt::info;
use embassy_executor::Spawner;
use embassy_futures::join::join5;
use embassy_futures::yield_now;
use embassy_nrf::config::{Config, HfclkSource};
use embassy_nrf::gpio::{Input, Pull};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    // USB needs the external 32 MHz crystal.
    let mut nrf_config = Config::default();
    nrf_config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(nrf_config);

    info!("cdc-switch starting");

    let usb = device::init(p.USBD);
    let mut switch = ActiveLow::new(Input::new(p.P0_11, Pull::Up));
    let mut stack = EmbassyStack::new();
    let mut app = CdcApp::new(&SHARED);

    let app_loop = async {
        loop {
            app.step(&mut stack, &mut switch);
            yield_now().await;
        }
    };

    join5(
        device::run_usb_device(usb.device),
        device::writer_task(usb.sender),
        device::reader_task(usb.receiver),
        device::frame_tick_task(),
        app_loop,
    )
    .await;
}
