//! Fixed wire formats for benchmark traffic.
//!
//! A data datagram is the magic prefix followed by random filler up to the
//! fixed data length; a feedback datagram is exactly four bytes carrying the
//! window's count. The two are told apart purely by length, since the link
//! delivers the length alongside the bytes. No length field, no sequence
//! number, no checksum beyond the transport's own.

use bytes::Bytes;
use rand::Rng;

/// Prefix marking benchmark data traffic on a shared channel.
pub const MAGIC: &[u8; 4] = b"AGB1";

/// Fixed data datagram length, shared by both roles.
pub const DATA_LEN: usize = 250;

/// Fixed feedback datagram length.
pub const FEEDBACK_LEN: usize = 4;

/// Build one data datagram of `len` bytes: magic prefix, random filler.
pub fn data_datagram(len: usize) -> Bytes {
    let mut buf = vec![0u8; len.max(MAGIC.len())];
    buf[..MAGIC.len()].copy_from_slice(MAGIC);
    rand::rng().fill(&mut buf[MAGIC.len()..]);
    Bytes::from(buf)
}

/// True iff `payload` is a valid data datagram of the expected length.
pub fn is_data_datagram(payload: &[u8], len: usize) -> bool {
    payload.len() == len && payload.starts_with(MAGIC)
}

pub fn feedback_datagram(count: u32) -> Bytes {
    Bytes::copy_from_slice(&count.to_ne_bytes())
}

/// Decode a feedback datagram; anything but exactly four bytes is rejected.
pub fn parse_feedback(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; FEEDBACK_LEN] = payload.try_into().ok()?;
    Some(u32::from_ne_bytes(bytes))
}
