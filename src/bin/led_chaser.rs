//! led-chaser firmware - walking LED on an MCP23017 GPIO expander.
//!
//! Configures the expander on TWIM0 (SDA P0.26, SCL P0.27), lists the
//! addresses that answer on the bus, then lights one port A LED at a time.

#![no_std]
#![no_main]

use cdc_switch::config;
use cdc_switch::expander::{self, Chaser, Mcp23017};
use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("led-chaser starting");

    let mut i2c_config = twim::Config::default();
    i2c_config.frequency = twim::Frequency::K100;
    let mut bus = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, i2c_config);

    let found = expander::scan(&mut bus);
    info!("i2c: {} device(s) at {=[u8]:#x}", found.len(), found.as_slice());
    if !found.contains(&config::EXPANDER_ADDRESS) {
        warn!("i2c: no expander at {=u8:#x}", config::EXPANDER_ADDRESS);
    }

    let mut leds = Mcp23017::new(bus);
    if let Err(e) = leds.configure() {
        error!("expander: configuration failed: {}", e);
        return;
    }

    let mut chaser = Chaser::new();
    loop {
        if let Err(e) = leds.set_leds(chaser.next_pattern()) {
            warn!("expander: write failed: {}", e);
        }
        Timer::after_millis(config::LED_STEP_MS).await;
    }
}
