//! # Keyed LSB Codec
//!
//! Hides a framed text payload in the least-significant bits of an 8-bit image
//! and recovers it with the same key.
//!
//! ### Embedding
//! 1. Count usable positions (capacity)
//! 2. Frame the message ([`framer::serialize`])
//! 3. Reject frames larger than the capacity before touching any pixel
//! 4. Derive the position stream from the key ([`KeySchedule`])
//! 5. Clone the image and write bit `k` into the LSB of position `k`
//!
//! ### Extraction
//! 1. Count usable positions and derive the same position stream
//! 2. Read the 64 header bits and validate them against the key
//! 3. Read exactly the remaining bits the header declares
//! 4. Verify the integrity tag and decode UTF-8
//!
//! Each call is self-contained: no state is shared between calls, and the input
//! image is never mutated.

use image::DynamicImage;
use log::{debug, info, warn};

use super::error::{Result, StegoError};
use super::framer::{self, Bitstream, HEADER_BITS, HEADER_BYTES};
use super::key_schedule::KeySchedule;
use super::pixel_plane::{ChannelLayout, PixelPlane};

/// Tunables that change which channel bytes are addressable.
///
/// Both sides must use the same options: they are part of the wire contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    /// Also hide bits in the alpha channel of LA/RGBA images.
    pub include_alpha: bool,
}

/// Orchestrates key schedule, framing and pixel plane for one image at a time.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    options: CodecOptions,
}

impl Codec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> CodecOptions {
        self.options
    }

    /// Number of bit positions the image offers under these options.
    pub fn capacity(&self, image: &DynamicImage) -> Result<usize> {
        let layout = ChannelLayout::for_image(image, self.options.include_alpha)?;
        Ok(PixelPlane::new(image.as_bytes(), layout).len())
    }

    /// Longest message, in UTF-8 bytes, that fits in `image`.
    pub fn max_message_len(&self, image: &DynamicImage) -> Result<usize> {
        Ok(framer::max_message_len(self.capacity(image)?))
    }

    /// Return a copy of `image` carrying `message`, readable only with `key`.
    ///
    /// # Errors
    /// - [`StegoError::EmptyCarrier`] if the image has no usable positions
    /// - [`StegoError::InsufficientCapacity`] if the framed message does not fit
    /// - [`StegoError::UnsupportedColorType`] for layouts that are not 8-bit
    pub fn embed(&self, image: &DynamicImage, key: &str, message: &str) -> Result<DynamicImage> {
        if key.is_empty() {
            warn!("Embedding with an empty key; anyone can extract this payload");
        }

        let layout = ChannelLayout::for_image(image, self.options.include_alpha)?;
        let capacity = PixelPlane::new(image.as_bytes(), layout).len();
        if capacity == 0 {
            return Err(StegoError::EmptyCarrier);
        }
        debug!("capacity computed: {} positions", capacity);

        let bitstream = framer::serialize(message, key.as_bytes())?;
        if bitstream.len() > capacity {
            return Err(StegoError::InsufficientCapacity {
                required: bitstream.len(),
                available: capacity,
            });
        }
        debug!("bitstream ready: {} bits", bitstream.len());

        let mut schedule = KeySchedule::new(key.as_bytes(), capacity)?;
        let positions = schedule.take_positions(bitstream.len())?;
        debug!("positions derived: {}", positions.len());

        let mut stego = image.clone();
        let color = stego.color();
        let bytes = raw_bytes_mut(&mut stego)
            .ok_or_else(|| StegoError::UnsupportedColorType(format!("{:?}", color)))?;
        let mut plane = PixelPlane::new(bytes, layout);
        for (bit, position) in bitstream.iter().zip(positions) {
            plane.set_lsb(position, bit)?;
        }

        info!(
            "Embedded {} message bytes ({} of {} bits used)",
            message.len(),
            bitstream.len(),
            capacity
        );
        Ok(stego)
    }

    /// Recover the message hidden in `image` with `key`.
    ///
    /// # Errors
    /// - [`StegoError::EmptyCarrier`] if the image has no usable positions
    /// - [`StegoError::InvalidKeyOrCorruptData`] on a wrong key or tampered pixels
    /// - [`StegoError::TruncatedStream`] if the frame does not fit in the image
    pub fn extract(&self, image: &DynamicImage, key: &str) -> Result<String> {
        let layout = ChannelLayout::for_image(image, self.options.include_alpha)?;
        let plane = PixelPlane::new(image.as_bytes(), layout);
        let capacity = plane.len();
        if capacity == 0 {
            return Err(StegoError::EmptyCarrier);
        }
        if capacity < HEADER_BITS {
            return Err(StegoError::TruncatedStream {
                declared: HEADER_BITS,
                available: capacity,
            });
        }
        debug!("capacity computed: {} positions", capacity);

        let mut schedule = KeySchedule::new(key.as_bytes(), capacity)?;
        let mut stream = Bitstream::with_capacity(HEADER_BITS);
        read_bits(&plane, &mut schedule, HEADER_BITS, &mut stream)?;

        let header = framer::parse_header(&stream.as_bytes()[..HEADER_BYTES], key.as_bytes())?;
        let declared = header.frame_bits();
        if declared > capacity {
            return Err(StegoError::TruncatedStream {
                declared,
                available: capacity,
            });
        }
        debug!("header accepted: {} message bytes", header.message_len);

        read_bits(&plane, &mut schedule, declared - HEADER_BITS, &mut stream)?;
        let message = framer::deserialize(&stream, key.as_bytes())?;

        info!("Extracted {} message bytes", message.len());
        Ok(message)
    }
}

fn read_bits<B: AsRef<[u8]>>(
    plane: &PixelPlane<B>,
    schedule: &mut KeySchedule,
    count: usize,
    out: &mut Bitstream,
) -> Result<()> {
    for position in schedule.take_positions(count)? {
        out.push(plane.get_lsb(position)?);
    }
    Ok(())
}

/// Mutable channel bytes of an 8-bit image, or `None` for other layouts.
fn raw_bytes_mut(image: &mut DynamicImage) -> Option<&mut [u8]> {
    match image {
        DynamicImage::ImageLuma8(buf) => Some(&mut **buf),
        DynamicImage::ImageLumaA8(buf) => Some(&mut **buf),
        DynamicImage::ImageRgb8(buf) => Some(&mut **buf),
        DynamicImage::ImageRgba8(buf) => Some(&mut **buf),
        _ => None,
    }
}

/// Embed with default [`CodecOptions`].
pub fn embed(image: &DynamicImage, key: &str, message: &str) -> Result<DynamicImage> {
    Codec::default().embed(image, key, message)
}

/// Extract with default [`CodecOptions`].
pub fn extract(image: &DynamicImage, key: &str) -> Result<String> {
    Codec::default().extract(image, key)
}

/// Capacity in bits under default [`CodecOptions`].
pub fn capacity(image: &DynamicImage) -> Result<usize> {
    Codec::default().capacity(image)
}
