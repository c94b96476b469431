//! # Pixel Plane
//!
//! A flat, index-addressable view over the channel bytes of an 8-bit image.
//!
//! Positions are numbered in row-major, channel-minor order over the *usable*
//! channels of each pixel. When the alpha channel is excluded, an RGBA image
//! exposes 3 positions per pixel and position `p` maps to byte
//! `(p / 3) * 4 + p % 3` of the raw buffer.

use image::{ColorType, DynamicImage};

use super::error::{Result, StegoError};

/// Describes how many bytes a pixel occupies and how many of them carry payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Bytes per pixel in the raw buffer.
    pub channels: usize,
    /// Leading channels per pixel that are addressable by the plane.
    pub usable: usize,
}

impl ChannelLayout {
    /// Derive the layout for a color type, rejecting anything that is not 8 bits per channel.
    pub fn from_color(color: ColorType, include_alpha: bool) -> Result<Self> {
        let channels = match color {
            ColorType::L8 => 1,
            ColorType::La8 => 2,
            ColorType::Rgb8 => 3,
            ColorType::Rgba8 => 4,
            other => return Err(StegoError::UnsupportedColorType(format!("{:?}", other))),
        };
        // Alpha is always the last channel in the image crate's 8-bit layouts
        let usable = if color.has_alpha() && !include_alpha {
            channels - 1
        } else {
            channels
        };
        Ok(Self { channels, usable })
    }

    pub fn for_image(image: &DynamicImage, include_alpha: bool) -> Result<Self> {
        Self::from_color(image.color(), include_alpha)
    }
}

/// Flattened view over the usable channel bytes of one image.
///
/// Read access works over any byte buffer; write access requires a mutable one,
/// so the same type serves both extraction (`&[u8]`) and embedding (`&mut [u8]`).
#[derive(Debug)]
pub struct PixelPlane<B> {
    bytes: B,
    layout: ChannelLayout,
    len: usize,
}

impl<B: AsRef<[u8]>> PixelPlane<B> {
    pub fn new(bytes: B, layout: ChannelLayout) -> Self {
        let pixels = bytes.as_ref().len() / layout.channels;
        Self {
            len: pixels * layout.usable,
            bytes,
            layout,
        }
    }

    /// Number of addressable positions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn byte_index(&self, i: usize) -> Result<usize> {
        if i >= self.len {
            return Err(StegoError::IndexOutOfRange {
                index: i,
                len: self.len,
            });
        }
        let pixel = i / self.layout.usable;
        let channel = i % self.layout.usable;
        Ok(pixel * self.layout.channels + channel)
    }

    pub fn get(&self, i: usize) -> Result<u8> {
        let idx = self.byte_index(i)?;
        Ok(self.bytes.as_ref()[idx])
    }

    /// Least-significant bit of the byte at position `i`.
    pub fn get_lsb(&self, i: usize) -> Result<u8> {
        Ok(self.get(i)? & 1)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PixelPlane<B> {
    /// Overwrite the whole byte at position `i`.
    pub fn set(&mut self, i: usize, value: u8) -> Result<()> {
        let idx = self.byte_index(i)?;
        self.bytes.as_mut()[idx] = value;
        Ok(())
    }

    /// Replace bit 0 of the byte at position `i`, leaving bits 1..=7 untouched.
    pub fn set_lsb(&mut self, i: usize, bit: u8) -> Result<()> {
        let current = self.get(i)?;
        self.set(i, (current & 0xFE) | (bit & 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_layout(include_alpha: bool) -> ChannelLayout {
        ChannelLayout::from_color(ColorType::Rgba8, include_alpha).unwrap()
    }

    #[test]
    fn alpha_is_skipped_by_default_layout() {
        let bytes = [10u8, 20, 30, 255, 40, 50, 60, 255];
        let plane = PixelPlane::new(&bytes[..], rgba_layout(false));
        assert_eq!(plane.len(), 6);
        assert_eq!(plane.get(2).unwrap(), 30);
        // position 3 is the red channel of the second pixel
        assert_eq!(plane.get(3).unwrap(), 40);
    }

    #[test]
    fn alpha_can_be_included() {
        let bytes = [10u8, 20, 30, 255, 40, 50, 60, 255];
        let plane = PixelPlane::new(&bytes[..], rgba_layout(true));
        assert_eq!(plane.len(), 8);
        assert_eq!(plane.get(3).unwrap(), 255);
    }

    #[test]
    fn set_lsb_preserves_upper_bits() {
        let mut bytes = [0b1010_1010u8, 0b0101_0101, 0xFF];
        let layout = ChannelLayout::from_color(ColorType::Rgb8, false).unwrap();
        let mut plane = PixelPlane::new(&mut bytes[..], layout);

        plane.set_lsb(0, 1).unwrap();
        plane.set_lsb(1, 0).unwrap();
        plane.set_lsb(2, 1).unwrap();

        assert_eq!(bytes, [0b1010_1011, 0b0101_0100, 0xFF]);
    }

    #[test]
    fn out_of_range_access_fails() {
        let bytes = [0u8; 3];
        let layout = ChannelLayout::from_color(ColorType::Rgb8, false).unwrap();
        let plane = PixelPlane::new(&bytes[..], layout);
        match plane.get(3) {
            Err(StegoError::IndexOutOfRange { index: 3, len: 3 }) => {}
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn sixteen_bit_layouts_are_rejected() {
        let err = ChannelLayout::from_color(ColorType::Rgb16, false).unwrap_err();
        assert!(matches!(err, StegoError::UnsupportedColorType(_)));
    }
}
