//! Link-layer binary framing: fixed header + payload + CRC-16.

pub mod codec;
pub mod crc16;

pub use codec::{decode, encode, encode_vec, Command, FrameView, MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
