//! # Steganography Errors
//!
//! [`StegoError`] covers every failure the codec and the PNG carrier layer can
//! report. All of them are terminal for the current operation: retrying with the
//! same image and key cannot succeed.

use thiserror::Error;

/// Errors that can occur while embedding into or extracting from a carrier image.
#[derive(Debug, Error)]
pub enum StegoError {
    /// The carrier has no usable channel positions.
    #[error("carrier image has no usable channel positions")]
    EmptyCarrier,

    /// The framed message needs more bit positions than the carrier offers.
    #[error("insufficient capacity: need {required} bits but only {available} are available")]
    InsufficientCapacity { required: usize, available: usize },

    /// The length prefix points past the data the carrier can hold.
    #[error("truncated stream: frame declares {declared} bits but only {available} are available")]
    TruncatedStream { declared: usize, available: usize },

    /// Header check or integrity tag mismatch. Wrong key and tampered image are
    /// indistinguishable here.
    #[error("invalid key or corrupt data")]
    InvalidKeyOrCorruptData,

    /// Pixel plane addressed outside its bounds. Indicates a bug in capacity
    /// arithmetic, never a user error.
    #[error("pixel plane index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The carrier has more positions than the key schedule can address portably.
    #[error("carrier too large: {positions} positions exceeds the u32 range")]
    CarrierTooLarge { positions: usize },

    /// Input bytes are not a PNG image.
    #[error("unsupported image format: {0} (only lossless PNG carriers are accepted)")]
    UnsupportedFormat(String),

    /// The decoded image does not use 8 bits per channel.
    #[error("unsupported color type: {0} (expected 8 bits per channel)")]
    UnsupportedColorType(String),

    /// Two images that must be compared have different dimensions or layouts.
    #[error("image dimensions or channel layouts differ")]
    DimensionMismatch,

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StegoError {
    /// Short, stable label for grouping failures in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyCarrier => "empty_carrier",
            Self::InsufficientCapacity { .. } => "insufficient_capacity",
            Self::TruncatedStream { .. } => "truncated_stream",
            Self::InvalidKeyOrCorruptData => "invalid_key_or_corrupt_data",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::CarrierTooLarge { .. } => "carrier_too_large",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::UnsupportedColorType(_) => "unsupported_color_type",
            Self::DimensionMismatch => "dimension_mismatch",
            Self::Image(_) => "image",
            Self::Io(_) => "io",
        }
    }
}

/// Result alias used throughout the processing modules.
pub type Result<T> = std::result::Result<T, StegoError>;
