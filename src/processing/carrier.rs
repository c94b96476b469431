//! # PNG Carrier I/O
//!
//! Loads and saves carrier images. This is where the format-capability check
//! lives: anything that is not a PNG is rejected with a typed error before it
//! is decoded, so the codec only ever sees a validated, lossless pixel grid.
//!
//! Output is always re-encoded as PNG. Saving a stego image through a lossy
//! encoder destroys the payload.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat};
use log::debug;

use super::codec::Codec;
use super::error::{Result, StegoError};
use super::pixel_plane::ChannelLayout;

/// Decode PNG bytes into an 8-bit image.
///
/// # Errors
/// - [`StegoError::UnsupportedFormat`] if the bytes are not a PNG
/// - [`StegoError::UnsupportedColorType`] if the PNG is not 8 bits per channel
/// - [`StegoError::Image`] if decoding fails
pub fn load_png(bytes: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(bytes)
        .map_err(|_| StegoError::UnsupportedFormat("unrecognized".to_string()))?;
    if format != ImageFormat::Png {
        return Err(StegoError::UnsupportedFormat(format!("{:?}", format)));
    }

    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    // Validates the layout; include_alpha does not affect acceptance
    ChannelLayout::for_image(&image, false)?;

    let (width, height) = image.dimensions();
    debug!("Loaded {}x{} PNG carrier ({:?})", width, height, image.color());
    Ok(image)
}

pub fn load_png_file<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let bytes = std::fs::read(path)?;
    load_png(&bytes)
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut output_bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut output_bytes), ImageFormat::Png)?;
    Ok(output_bytes)
}

pub fn save_png_file<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Hide `text` in a PNG given as raw bytes and return the stego PNG bytes.
///
/// # Example
/// ```ignore
/// let cover = std::fs::read("cover.png")?;
/// let stego = embed_png_bytes(&Codec::default(), &cover, "hunter2", "Secret message")?;
/// std::fs::write("stego.png", stego)?;
/// ```
pub fn embed_png_bytes(codec: &Codec, png: &[u8], key: &str, text: &str) -> Result<Vec<u8>> {
    let cover = load_png(png)?;
    let stego = codec.embed(&cover, key, text)?;
    encode_png(&stego)
}

/// Recover text hidden in a stego PNG given as raw bytes.
pub fn extract_png_bytes(codec: &Codec, png: &[u8], key: &str) -> Result<String> {
    let stego = load_png(png)?;
    codec.extract(&stego, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(20, 20, |x, y| {
            Rgb([(x * 11) as u8, (y * 13) as u8, ((x + y) * 5) as u8])
        }));
        encode_png(&img).unwrap()
    }

    #[test]
    fn png_roundtrip_preserves_payload() {
        let codec = Codec::default();
        let stego = embed_png_bytes(&codec, &sample_png(), "k", "through the encoder").unwrap();
        assert_eq!(
            extract_png_bytes(&codec, &stego, "k").unwrap(),
            "through the encoder"
        );
    }

    #[test]
    fn non_png_is_rejected_before_decoding() {
        // BMP magic followed by junk
        let bmp = b"BM\x00\x00\x00\x00\x00\x00\x00\x00\x36\x00\x00\x00";
        match load_png(bmp) {
            Err(StegoError::UnsupportedFormat(name)) => assert_eq!(name, "Bmp"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            load_png(b"definitely not an image"),
            Err(StegoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn sixteen_bit_png_is_rejected() {
        let deep = DynamicImage::ImageRgb16(image::ImageBuffer::new(4, 4));
        let bytes = encode_png(&deep).unwrap();
        assert!(matches!(
            load_png(&bytes),
            Err(StegoError::UnsupportedColorType(_))
        ));
    }
}
