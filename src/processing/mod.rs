//! # Image Processing and Steganography
//!
//! Keyed LSB steganography over lossless PNG carriers.
//!
//! ## Modules
//!
//! - [`pixel_plane`]: flat view over an image's channel bytes
//! - [`key_schedule`]: key-derived order of embedding positions
//! - [`framer`]: self-delimiting, key-bound payload framing
//! - [`codec`]: embed / extract orchestration
//! - [`carrier`]: PNG load/save with format checks
//! - [`quality`]: MSE, PSNR and SSIM between cover and stego images

pub mod carrier;
pub mod codec;
pub mod error;
pub mod framer;
pub mod key_schedule;
pub mod pixel_plane;
pub mod quality;

// Re-export main functions for convenience
pub use carrier::{embed_png_bytes, extract_png_bytes, load_png, load_png_file, save_png_file};
pub use codec::{capacity, embed, extract, Codec, CodecOptions};
pub use error::StegoError;
