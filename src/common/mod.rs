//! # Common Components
//!
//! Shared utilities used by the `stego` binary and the batch runner.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing utilities

pub mod config;
