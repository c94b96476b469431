//! # png-stego
//!
//! Keyed LSB steganography for lossless PNG images: hide a UTF-8 message in the
//! least-significant bits of pixel channels, scattered in a key-derived order,
//! and recover it only with the same key.
//!
//! ```rust,ignore
//! use png_stego::{load_png_file, save_png_file, embed, extract};
//!
//! let cover = load_png_file("cover.png")?;
//! let stego = embed(&cover, "hunter2", "meet at noon")?;
//! save_png_file(&stego, "stego.png")?;
//! assert_eq!(extract(&stego, "hunter2")?, "meet at noon");
//! ```

pub mod batch;
pub mod common;
pub mod processing;

pub use processing::{
    capacity, embed, extract, load_png, load_png_file, save_png_file, Codec, CodecOptions,
    StegoError,
};
