//! Link-layer frame codec.
//!
//! Wire layout: `SOF(1) VER(1) FLAGS(1) CMD(1) SEQ(2,LE) LEN(2,LE)` header,
//! followed by `LEN` payload bytes, followed by a little-endian CRC-16 over
//! `[VER .. end-of-payload)`. The SOF byte itself is excluded from the CRC
//! so a stray SOF-like byte in a noisy link can't silently re-sync with a
//! matching checksum; the version byte anchors the check instead.

use crate::error::{Error, Result};
use crate::link::crc16::crc16_ccitt_false;

pub const SOF: u8 = 0xA5;
pub const VERSION: u8 = 0x01;

pub const HEADER_LEN: usize = 8;
pub const CRC_LEN: usize = 2;
pub const MAX_PAYLOAD_LEN: usize = 512;
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CRC_LEN;
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN + CRC_LEN;

/// Wire command byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Nop = 0x00,
    Heartbeat = 0x01,
    Telemetry = 0x10,
    Control = 0x11,
    OtaBegin = 0x20,
    OtaChunk = 0x21,
    OtaEnd = 0x22,
    Ack = 0x7E,
    Nack = 0x7F,
}

impl Command {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Nop),
            0x01 => Ok(Self::Heartbeat),
            0x10 => Ok(Self::Telemetry),
            0x11 => Ok(Self::Control),
            0x20 => Ok(Self::OtaBegin),
            0x21 => Ok(Self::OtaChunk),
            0x22 => Ok(Self::OtaEnd),
            0x7E => Ok(Self::Ack),
            0x7F => Ok(Self::Nack),
            other => Err(Error::protocol(format!("unknown command byte 0x{other:02X}"))),
        }
    }
}

/// A decoded, non-owning view into a caller-supplied frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub flags: u8,
    pub cmd: u8,
    pub seq: u16,
    pub payload: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

fn read_u16_le(b: &[u8]) -> u16 {
    u16::from(b[0]) | (u16::from(b[1]) << 8)
}

fn write_u16_le(out: &mut [u8], v: u16) {
    out[0] = (v & 0xFF) as u8;
    out[1] = (v >> 8) as u8;
}

/// Encode a frame into `out`, returning the number of bytes written.
///
/// `out` must have capacity `HEADER_LEN + payload.len() + CRC_LEN`.
pub fn encode(flags: u8, cmd: u8, seq: u16, payload: &[u8], out: &mut [u8]) -> Result<usize> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::MessageTooLong);
    }
    let frame_len = HEADER_LEN + payload.len() + CRC_LEN;
    if out.len() < frame_len {
        return Err(Error::BufferTooSmall);
    }

    out[0] = SOF;
    out[1] = VERSION;
    out[2] = flags;
    out[3] = cmd;
    write_u16_le(&mut out[4..6], seq);
    write_u16_le(&mut out[6..8], payload.len() as u16);
    out[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);

    let crc = crc16_ccitt_false(&out[1..HEADER_LEN + payload.len()]);
    write_u16_le(
        &mut out[HEADER_LEN + payload.len()..frame_len],
        crc,
    );

    Ok(frame_len)
}

/// Convenience wrapper over [`encode`] that allocates an exactly-sized buffer.
pub fn encode_vec(flags: u8, cmd: u8, seq: u16, payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = vec![0u8; HEADER_LEN + payload.len() + CRC_LEN];
    let n = encode(flags, cmd, seq, payload, &mut out)?;
    out.truncate(n);
    Ok(out)
}

/// Decode a frame, borrowing its payload from `frame`.
pub fn decode(frame: &[u8]) -> Result<FrameView<'_>> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(Error::MessageTooLong);
    }
    if frame[0] != SOF || frame[1] != VERSION {
        return Err(Error::protocol("bad SOF or version"));
    }

    let payload_len = read_u16_le(&frame[6..8]) as usize;
    if payload_len > MAX_PAYLOAD_LEN || frame.len() != HEADER_LEN + payload_len + CRC_LEN {
        return Err(Error::MessageTooLong);
    }

    let crc_expected = read_u16_le(&frame[HEADER_LEN + payload_len..HEADER_LEN + payload_len + CRC_LEN]);
    let crc_actual = crc16_ccitt_false(&frame[1..HEADER_LEN + payload_len]);
    if crc_expected != crc_actual {
        return Err(Error::bad_message("CRC mismatch"));
    }

    Ok(FrameView {
        flags: frame[2],
        cmd: frame[3],
        seq: read_u16_le(&frame[4..6]),
        payload: &frame[HEADER_LEN..HEADER_LEN + payload_len],
    })
}
