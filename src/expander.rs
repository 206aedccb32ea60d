//! MCP23017 I²C GPIO expander driving a row of eight LEDs.
//!
//! The expander is configured once (port A pull-ups, sequential addressing
//! off, both ports output) and then port A is written with a walking-one
//! pattern. Blocking `embedded-hal` I²C; the caller owns the pacing.

use embedded_hal::i2c::{I2c, SevenBitAddress};
use heapless::Vec;

use crate::config::EXPANDER_ADDRESS;
use crate::error::{Error, Result};

/// Register addresses (IOCON.BANK = 0).
pub mod reg {
    pub const IODIRA: u8 = 0x00;
    pub const IODIRB: u8 = 0x01;
    pub const IPOLA: u8 = 0x02;
    pub const IPOLB: u8 = 0x03;
    pub const GPINTENA: u8 = 0x04;
    pub const GPINTENB: u8 = 0x05;
    pub const DEFVALA: u8 = 0x06;
    pub const DEFVALB: u8 = 0x07;
    pub const INTCONA: u8 = 0x08;
    pub const INTCONB: u8 = 0x09;
    pub const IOCONA: u8 = 0x0A;
    pub const IOCONB: u8 = 0x0B;
    pub const GPPUA: u8 = 0x0C;
    pub const GPPUB: u8 = 0x0D;
    pub const INTFA: u8 = 0x0E;
    pub const INTFB: u8 = 0x0F;
    pub const INTCAPA: u8 = 0x10;
    pub const INTCAPB: u8 = 0x11;
    pub const GPIOA: u8 = 0x12;
    pub const GPIOB: u8 = 0x13;
    pub const OLATA: u8 = 0x14;
    pub const OLATB: u8 = 0x15;
}

/// IOCON.MIRROR: INTA/INTB internally connected.
pub const IOCON_MIRROR: u8 = 0x40;

/// Register writes applied by [`Mcp23017::configure`], in order.
pub const CONFIG_SEQUENCE: [(u8, u8); 4] = [
    (reg::GPPUA, 0x0F),
    (reg::IOCONA, IOCON_MIRROR),
    (reg::IODIRA, 0x00),
    (reg::IODIRB, 0x00),
];

pub struct Mcp23017<I2C> {
    i2c: I2C,
    address: SevenBitAddress,
}

impl<I2C: I2c> Mcp23017<I2C> {
    /// Expander at the board's default address.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, EXPANDER_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: SevenBitAddress) -> Self {
        Self { i2c, address }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|_| Error::I2c)
    }

    pub fn read_register(&mut self, register: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|_| Error::I2c)?;
        Ok(buf[0])
    }

    /// Apply [`CONFIG_SEQUENCE`]. Stops at the first failed write.
    pub fn configure(&mut self) -> Result<()> {
        for (register, value) in CONFIG_SEQUENCE {
            self.write_register(register, value)?;
        }
        info!("expander: configured at {=u8:#x}", self.address);
        Ok(())
    }

    /// Drive the LEDs on port A.
    pub fn set_leds(&mut self, pattern: u8) -> Result<()> {
        self.write_register(reg::GPIOA, pattern)
    }
}

/// Probe every 7-bit address with a one-byte read and list the ones that ACK.
pub fn scan<I2C: I2c>(i2c: &mut I2C) -> Vec<SevenBitAddress, 128> {
    let mut found = Vec::new();
    let mut buf = [0u8; 1];
    for address in 0..=0x7Fu8 {
        if i2c.read(address, &mut buf).is_ok() {
            // Capacity equals the address space.
            let _ = found.push(address);
        }
    }
    found
}

/// Walking-one LED pattern: 0x01, 0x02, … 0x80, then wraps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chaser {
    position: u8,
}

impl Chaser {
    pub const fn new() -> Self {
        Self { position: 0 }
    }

    /// Pattern for the current step, then advance.
    pub fn next_pattern(&mut self) -> u8 {
        let pattern = 1u8 << self.position;
        self.position = if self.position >= 7 {
            0
        } else {
            self.position + 1
        };
        pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    /// Records writes; answers reads with `read_value`; only ACKs `present`.
    struct Bus {
        present: u8,
        writes: std::vec::Vec<(u8, std::vec::Vec<u8>)>,
        read_value: u8,
        fail_after: Option<usize>,
    }

    impl Bus {
        fn new(present: u8) -> Self {
            Self {
                present,
                writes: std::vec::Vec::new(),
                read_value: 0,
                fail_after: None,
            }
        }
    }

    impl ErrorType for Bus {
        type Error = ErrorKind;
    }

    impl I2c for Bus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> core::result::Result<(), Self::Error> {
            if address != self.present {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            if let Some(limit) = self.fail_after {
                if self.writes.len() >= limit {
                    return Err(ErrorKind::Bus);
                }
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                    Operation::Read(buf) => buf.fill(self.read_value),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn configure_writes_fixed_sequence() {
        let mut dev = Mcp23017::new(Bus::new(0x27));
        dev.configure().unwrap();
        let bus = dev.release();
        let writes: std::vec::Vec<_> = bus.writes.iter().map(|(_, w)| w.clone()).collect();
        assert_eq!(
            writes,
            [
                vec![0x0C, 0x0F],
                vec![0x0A, 0x40],
                vec![0x00, 0x00],
                vec![0x01, 0x00],
            ]
        );
        assert!(bus.writes.iter().all(|(a, _)| *a == 0x27));
    }

    #[test]
    fn configure_stops_on_first_failure() {
        let mut bus = Bus::new(0x27);
        bus.fail_after = Some(2);
        let mut dev = Mcp23017::new(bus);
        assert_eq!(dev.configure(), Err(Error::I2c));
        assert_eq!(dev.release().writes.len(), 2);
    }

    #[test]
    fn missing_device_is_an_error() {
        let mut dev = Mcp23017::with_address(Bus::new(0x20), 0x27);
        assert_eq!(dev.set_leds(0x01), Err(Error::I2c));
    }

    #[test]
    fn read_register_uses_write_read() {
        let mut bus = Bus::new(0x27);
        bus.read_value = 0xA5;
        let mut dev = Mcp23017::new(bus);
        assert_eq!(dev.read_register(reg::OLATA), Ok(0xA5));
        assert_eq!(dev.release().writes, [(0x27, vec![reg::OLATA])]);
    }

    #[test]
    fn set_leds_targets_gpioa() {
        let mut dev = Mcp23017::new(Bus::new(0x27));
        dev.set_leds(0x80).unwrap();
        assert_eq!(dev.release().writes, [(0x27, vec![0x12, 0x80])]);
    }

    #[test]
    fn scan_reports_acking_addresses() {
        let mut bus = Bus::new(0x27);
        let found = scan(&mut bus);
        assert_eq!(found.as_slice(), &[0x27]);
    }

    #[test]
    fn chaser_walks_and_wraps() {
        let mut chaser = Chaser::new();
        let seq: std::vec::Vec<u8> = (0..10).map(|_| chaser.next_pattern()).collect();
        assert_eq!(seq, [1, 2, 4, 8, 16, 32, 64, 128, 1, 2]);
    }
}
