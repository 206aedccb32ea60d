//! CDC class requests on the communication interface.
//!
//! The USB stack hands over the raw `bRequest`/`wValue` and data stage;
//! these helpers turn them into [`CdcEvent`]s for the relay and carry out
//! the [`ControlReply`] it returns.

use super::relay::{CdcEvent, ControlReply, EventRelay};
use super::stack::CdcIndex;

/// PSTN `bRequest` codes.
pub const SET_LINE_CODING: u8 = 0x20;
pub const GET_LINE_CODING: u8 = 0x21;
pub const SET_CONTROL_LINE_STATE: u8 = 0x22;
pub const SEND_BREAK: u8 = 0x23;

/// `wValue` bits of SET_CONTROL_LINE_STATE.
const DTR: u16 = 1 << 0;
const CARRIER: u16 = 1 << 1;

/// Host-to-device request whose data stage (if any) is already in `data`.
///
/// Returns `true` to ACK the status stage, `false` to stall.
pub fn handle_out(
    relay: &EventRelay<'_>,
    index: CdcIndex,
    request: u8,
    value: u16,
    data: &[u8],
) -> bool {
    let event = match request {
        SET_LINE_CODING => CdcEvent::SetLineCoding,
        SET_CONTROL_LINE_STATE => CdcEvent::SetControlLineState {
            dtr: value & DTR != 0,
            carrier: value & CARRIER != 0,
        },
        SEND_BREAK => CdcEvent::SendBreak { duration: value },
        _ => return false,
    };

    match relay.on_cdc_event(index, event) {
        ControlReply::StatusOk => true,
        ControlReply::Receive(_) => matches!(
            relay.on_cdc_event(index, CdcEvent::ControlDataReceived(data)),
            ControlReply::StatusOk
        ),
        ControlReply::Send(_) | ControlReply::None => false,
    }
}

/// Device-to-host request. Fills `buf` with the data stage and returns its
/// length, or `None` to stall.
pub fn handle_in(
    relay: &EventRelay<'_>,
    index: CdcIndex,
    request: u8,
    buf: &mut [u8],
) -> Option<usize> {
    if request != GET_LINE_CODING {
        return None;
    }
    match relay.on_cdc_event(index, CdcEvent::GetLineCoding) {
        ControlReply::Send(payload) => {
            let n = payload.len().min(buf.len());
            buf[..n].copy_from_slice(&payload[..n]);
            relay.on_cdc_event(index, CdcEvent::ControlDataSent);
            Some(n)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::line_coding::LineCoding;
    use crate::usb::shared::Shared;

    const PORT: CdcIndex = CdcIndex::PRIMARY;

    fn get_line_coding(relay: &EventRelay<'_>) -> [u8; 7] {
        let mut buf = [0u8; 64];
        let n = handle_in(relay, PORT, GET_LINE_CODING, &mut buf).unwrap();
        assert_eq!(n, 7);
        let mut out = [0u8; 7];
        out.copy_from_slice(&buf[..7]);
        out
    }

    #[test]
    fn get_line_coding_is_always_9600_8n1() {
        let shared = Shared::new();
        let relay = EventRelay::new(&shared);
        let fixed = [0x80, 0x25, 0x00, 0x00, 0x00, 0x00, 0x08];
        assert_eq!(get_line_coding(&relay), fixed);

        // 115200 7O2 from the host is stored but never reported back.
        let host = [0x00, 0xC2, 0x01, 0x00, 0x02, 0x01, 0x07];
        assert!(handle_out(&relay, PORT, SET_LINE_CODING, 0, &host));
        assert_eq!(shared.host_line_coding(), LineCoding::from_bytes(&host).unwrap());
        assert_eq!(get_line_coding(&relay), fixed);
    }

    #[test]
    fn short_line_coding_is_acknowledged() {
        let shared = Shared::new();
        let relay = EventRelay::new(&shared);
        assert!(handle_out(&relay, PORT, SET_LINE_CODING, 0, &[0x01, 0x02]));
        assert_eq!(shared.host_line_coding(), LineCoding::DEFAULT);
    }

    #[test]
    fn send_break_is_recorded_and_acknowledged() {
        let shared = Shared::new();
        let relay = EventRelay::new(&shared);
        assert!(handle_out(&relay, PORT, SEND_BREAK, 500, &[]));
        assert_eq!(shared.break_duration(), 500);
        assert!(handle_out(&relay, PORT, SEND_BREAK, 0xFFFF, &[]));
        assert_eq!(shared.break_duration(), 0xFFFF);
    }

    #[test]
    fn control_line_state_bits() {
        let shared = Shared::new();
        let relay = EventRelay::new(&shared);

        assert!(handle_out(&relay, PORT, SET_CONTROL_LINE_STATE, 0b01, &[]));
        assert!(shared.dtr());
        assert!(!shared.carrier());

        assert!(handle_out(&relay, PORT, SET_CONTROL_LINE_STATE, 0b10, &[]));
        assert!(!shared.dtr());
        assert!(shared.carrier());

        assert!(handle_out(&relay, PORT, SET_CONTROL_LINE_STATE, 0, &[]));
        assert!(!shared.dtr());
        assert!(!shared.carrier());
    }

    #[test]
    fn unknown_requests_stall() {
        let shared = Shared::new();
        let relay = EventRelay::new(&shared);
        let mut buf = [0u8; 64];

        // SEND_ENCAPSULATED_COMMAND / GET_ENCAPSULATED_RESPONSE
        assert!(!handle_out(&relay, PORT, 0x00, 0, &[1, 2, 3]));
        assert_eq!(handle_in(&relay, PORT, 0x01, &mut buf), None);
        // GET_LINE_CODING is IN only.
        assert!(!handle_out(&relay, PORT, GET_LINE_CODING, 0, &[]));
        assert_eq!(handle_in(&relay, PORT, SET_LINE_CODING, &mut buf), None);
    }

    #[test]
    fn short_in_buffer_truncates() {
        let shared = Shared::new();
        let relay = EventRelay::new(&shared);
        let mut buf = [0u8; 4];
        assert_eq!(handle_in(&relay, PORT, GET_LINE_CODING, &mut buf), Some(4));
        assert_eq!(buf, [0x80, 0x25, 0x00, 0x00]);
    }
}
