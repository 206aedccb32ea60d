//! CDC line coding record (GET/SET_LINE_CODING payload).

use crate::config;

/// Size of the line coding payload on the wire.
pub const LINE_CODING_SIZE: usize = 7;

/// Serial-port parameters a host may query or set.
///
/// Stored only; nothing in this firmware drives a physical UART.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCoding {
    /// Data terminal rate in bits per second.
    pub baud_rate: u32,
    /// 0 = 1 stop bit, 1 = 1.5, 2 = 2.
    pub char_format: u8,
    /// 0 = none, 1 = odd, 2 = even, 3 = mark, 4 = space.
    pub parity: u8,
    pub data_bits: u8,
}

impl LineCoding {
    /// 9600 8N1.
    pub const DEFAULT: LineCoding = LineCoding {
        baud_rate: config::DEFAULT_BAUD_RATE,
        char_format: config::DEFAULT_CHAR_FORMAT,
        parity: config::DEFAULT_PARITY,
        data_bits: config::DEFAULT_DATA_BITS,
    };

    /// Parse the 7-byte little-endian payload. Trailing bytes are ignored.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < LINE_CODING_SIZE {
            return None;
        }
        Some(Self {
            baud_rate: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            char_format: data[4],
            parity: data[5],
            data_bits: data[6],
        })
    }

    pub fn to_bytes(&self) -> [u8; LINE_CODING_SIZE] {
        let rate = self.baud_rate.to_le_bytes();
        [
            rate[0],
            rate[1],
            rate[2],
            rate[3],
            self.char_format,
            self.parity,
            self.data_bits,
        ]
    }

    /// Pack the three format bytes for atomic storage.
    pub(crate) const fn format_word(&self) -> u32 {
        u32::from_le_bytes([self.char_format, self.parity, self.data_bits, 0])
    }

    pub(crate) fn from_parts(baud_rate: u32, format_word: u32) -> Self {
        let [char_format, parity, data_bits, _] = format_word.to_le_bytes();
        Self {
            baud_rate,
            char_format,
            parity,
            data_bits,
        }
    }
}

impl Default for LineCoding {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_9600_8n1() {
        let lc = LineCoding::default();
        assert_eq!(lc.baud_rate, 9600);
        assert_eq!(lc.char_format, 0);
        assert_eq!(lc.parity, 0);
        assert_eq!(lc.data_bits, 8);
    }

    #[test]
    fn wire_layout_is_little_endian() {
        assert_eq!(
            LineCoding::DEFAULT.to_bytes(),
            [0x80, 0x25, 0x00, 0x00, 0x00, 0x00, 0x08]
        );
    }

    #[test]
    fn short_payload_is_rejected() {
        assert!(LineCoding::from_bytes(&[]).is_none());
        assert!(LineCoding::from_bytes(&[0x00, 0xC2, 0x01, 0x00, 0x00, 0x00]).is_none());
    }

    #[test]
    fn host_values_are_taken_verbatim() {
        // 115200, 2 stop bits, even parity, 7 data bits
        let lc = LineCoding::from_bytes(&[0x00, 0xC2, 0x01, 0x00, 0x02, 0x02, 0x07]).unwrap();
        assert_eq!(lc.baud_rate, 115_200);
        assert_eq!(lc.char_format, 2);
        assert_eq!(lc.parity, 2);
        assert_eq!(lc.data_bits, 7);
    }

    #[test]
    fn packed_format_word_restores_fields() {
        let lc = LineCoding {
            baud_rate: 57_600,
            char_format: 1,
            parity: 3,
            data_bits: 5,
        };
        assert_eq!(LineCoding::from_parts(lc.baud_rate, lc.format_word()), lc);
    }
}
