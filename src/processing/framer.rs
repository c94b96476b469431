//! # Payload Framing
//!
//! Wraps a text message into a self-delimiting, key-bound bitstream before it is
//! scattered across the carrier, and unwraps it again after extraction.
//!
//! ## Frame Layout
//!
//! ```text
//! [4 bytes] length prefix: message byte count (big-endian u32)
//! [4 bytes] header check:  HMAC-SHA256(key, "hdr" || length)[0..4]
//! [N bytes] message (UTF-8)
//! [4 bytes] integrity tag: HMAC-SHA256(key, "tag" || length || message)[0..4]
//! ```
//!
//! Bits are emitted MSB-first within each byte. Total frame size is
//! `12 + N` bytes.
//!
//! The header check lets the decoder reject a wrong key after reading only 64
//! bits, before trusting the length prefix. A wrong key slips past the header
//! check with probability 2^-32 and then past the integrity tag with another
//! 2^-32.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::{Result, StegoError};

type HmacSha256 = Hmac<Sha256>;

pub const LENGTH_BYTES: usize = 4;
pub const HEADER_CHECK_BYTES: usize = 4;
pub const TAG_BYTES: usize = 4;

/// Length prefix + header check.
pub const HEADER_BYTES: usize = LENGTH_BYTES + HEADER_CHECK_BYTES;
pub const HEADER_BITS: usize = HEADER_BYTES * 8;

/// Fixed overhead: length(4) + header check(4) + tag(4) = 12 bytes.
pub const FRAME_OVERHEAD_BYTES: usize = HEADER_BYTES + TAG_BYTES;
pub const FRAME_OVERHEAD_BITS: usize = FRAME_OVERHEAD_BYTES * 8;

const HEADER_DOMAIN: &[u8] = b"hdr";
const TAG_DOMAIN: &[u8] = b"tag";

/// Number of bits a framed message of `message_len` bytes occupies.
pub fn framed_bits(message_len: usize) -> usize {
    message_len
        .saturating_add(FRAME_OVERHEAD_BYTES)
        .saturating_mul(8)
}

/// Largest message (in bytes) whose frame fits in `capacity_bits`.
pub fn max_message_len(capacity_bits: usize) -> usize {
    (capacity_bits / 8).saturating_sub(FRAME_OVERHEAD_BYTES)
}

/// An ordered sequence of bits, packed MSB-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitstream {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            len: 0,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() * 8;
        Self { bytes, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one bit (only bit 0 of `bit` is used).
    pub fn push(&mut self, bit: u8) {
        let offset = self.len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit & 1 == 1 {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (7 - offset);
        }
        self.len += 1;
    }

    pub fn get(&self, k: usize) -> Option<u8> {
        if k >= self.len {
            return None;
        }
        Some((self.bytes[k / 8] >> (7 - k % 8)) & 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |k| (self.bytes[k / 8] >> (7 - k % 8)) & 1)
    }

    /// Packed bytes; a trailing partial byte is zero-padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl FromIterator<u8> for Bitstream {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut stream = Bitstream::new();
        for bit in iter {
            stream.push(bit);
        }
        stream
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Declared message length in bytes.
    pub message_len: usize,
}

impl FrameHeader {
    /// Total bits of the frame this header announces, header included.
    pub fn frame_bits(&self) -> usize {
        framed_bits(self.message_len)
    }
}

fn keyed_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length")
}

fn header_mac(key: &[u8], length: &[u8; LENGTH_BYTES]) -> HmacSha256 {
    let mut mac = keyed_mac(key);
    mac.update(HEADER_DOMAIN);
    mac.update(length);
    mac
}

fn tag_mac(key: &[u8], length: &[u8; LENGTH_BYTES], message: &[u8]) -> HmacSha256 {
    let mut mac = keyed_mac(key);
    mac.update(TAG_DOMAIN);
    mac.update(length);
    mac.update(message);
    mac
}

/// Serialize `message` into a framed bitstream bound to `key`.
///
/// # Errors
/// [`StegoError::InsufficientCapacity`] if the message is longer than a `u32`
/// length prefix can describe.
pub fn serialize(message: &str, key: &[u8]) -> Result<Bitstream> {
    let body = message.as_bytes();
    let length = u32::try_from(body.len()).map_err(|_| StegoError::InsufficientCapacity {
        required: framed_bits(body.len()),
        available: framed_bits(u32::MAX as usize),
    })?;
    let length = length.to_be_bytes();

    let check = header_mac(key, &length).finalize().into_bytes();
    let tag = tag_mac(key, &length, body).finalize().into_bytes();

    let mut frame = Vec::with_capacity(FRAME_OVERHEAD_BYTES + body.len());
    frame.extend_from_slice(&length);
    frame.extend_from_slice(&check[..HEADER_CHECK_BYTES]);
    frame.extend_from_slice(body);
    frame.extend_from_slice(&tag[..TAG_BYTES]);

    Ok(Bitstream::from_bytes(frame))
}

/// Validate the first [`HEADER_BYTES`] of a frame against `key`.
///
/// # Errors
/// - [`StegoError::TruncatedStream`] if fewer than [`HEADER_BYTES`] are given
/// - [`StegoError::InvalidKeyOrCorruptData`] if the header check does not match
pub fn parse_header(bytes: &[u8], key: &[u8]) -> Result<FrameHeader> {
    if bytes.len() < HEADER_BYTES {
        return Err(StegoError::TruncatedStream {
            declared: HEADER_BITS,
            available: bytes.len() * 8,
        });
    }

    let mut length = [0u8; LENGTH_BYTES];
    length.copy_from_slice(&bytes[..LENGTH_BYTES]);

    header_mac(key, &length)
        .verify_truncated_left(&bytes[LENGTH_BYTES..HEADER_BYTES])
        .map_err(|_| StegoError::InvalidKeyOrCorruptData)?;

    Ok(FrameHeader {
        message_len: u32::from_be_bytes(length) as usize,
    })
}

/// Recover the message from an extracted bitstream.
///
/// The stream may be longer than the frame; bits past the declared end are ignored.
///
/// # Errors
/// - [`StegoError::InvalidKeyOrCorruptData`] on header or tag mismatch, or if the
///   authenticated bytes are not UTF-8
/// - [`StegoError::TruncatedStream`] if the declared length runs past the stream
pub fn deserialize(stream: &Bitstream, key: &[u8]) -> Result<String> {
    let available = stream.len();
    // Only whole bytes carry frame data
    let bytes = &stream.as_bytes()[..available / 8];

    let header = parse_header(bytes, key)?;
    let declared = header.frame_bits();
    if declared > available {
        return Err(StegoError::TruncatedStream {
            declared,
            available,
        });
    }

    let body_end = HEADER_BYTES + header.message_len;
    let body = &bytes[HEADER_BYTES..body_end];
    let tag = &bytes[body_end..body_end + TAG_BYTES];

    let mut length = [0u8; LENGTH_BYTES];
    length.copy_from_slice(&bytes[..LENGTH_BYTES]);
    tag_mac(key, &length, body)
        .verify_truncated_left(tag)
        .map_err(|_| StegoError::InvalidKeyOrCorruptData)?;

    String::from_utf8(body.to_vec()).map_err(|_| StegoError::InvalidKeyOrCorruptData)
}
