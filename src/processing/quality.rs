//! # Image Quality Metrics
//!
//! Measures how far a stego image drifted from its cover: mean squared error,
//! peak signal-to-noise ratio and structural similarity.
//!
//! SSIM is computed on a BT.601 luma plane (alpha ignored) with an 11x11
//! Gaussian window, sigma 1.5, and reflect-101 border handling.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use super::error::{Result, StegoError};
use super::pixel_plane::ChannelLayout;

const WINDOW: usize = 11;
const SIGMA: f64 = 1.5;
const K1: f64 = 0.01;
const K2: f64 = 0.03;
const PEAK: f64 = 255.0;

/// Cover-vs-stego comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub width: u32,
    pub height: u32,
    pub mse: f64,
    /// `None` when the images are identical (infinite PSNR).
    pub psnr_db: Option<f64>,
    pub ssim: f64,
}

impl QualityReport {
    pub fn export_to_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}

/// Check that two images can be compared byte for byte.
fn ensure_comparable(a: &DynamicImage, b: &DynamicImage) -> Result<ChannelLayout> {
    if a.dimensions() != b.dimensions() || a.color() != b.color() {
        return Err(StegoError::DimensionMismatch);
    }
    let layout = ChannelLayout::for_image(a, true)?;
    if a.as_bytes().is_empty() {
        return Err(StegoError::EmptyCarrier);
    }
    Ok(layout)
}

/// Mean squared error over every channel byte.
pub fn mse(original: &DynamicImage, stego: &DynamicImage) -> Result<f64> {
    ensure_comparable(original, stego)?;
    Ok(mse_bytes(original.as_bytes(), stego.as_bytes()))
}

fn mse_bytes(a: &[u8], b: &[u8]) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    sum / a.len() as f64
}

/// Peak signal-to-noise ratio in decibels; `f64::INFINITY` for identical images.
pub fn psnr(original: &DynamicImage, stego: &DynamicImage) -> Result<f64> {
    Ok(psnr_from_mse(mse(original, stego)?))
}

fn psnr_from_mse(mse: f64) -> f64 {
    if mse == 0.0 {
        return f64::INFINITY;
    }
    20.0 * (PEAK / mse.sqrt()).log10()
}

/// Mean structural similarity of the luma planes.
pub fn ssim(original: &DynamicImage, stego: &DynamicImage) -> Result<f64> {
    let layout = ensure_comparable(original, stego)?;
    Ok(ssim_unchecked(original, stego, layout))
}

/// Callers must have run [`ensure_comparable`] on the pair.
fn ssim_unchecked(original: &DynamicImage, stego: &DynamicImage, layout: ChannelLayout) -> f64 {
    let (width, height) = original.dimensions();
    let (width, height) = (width as usize, height as usize);

    let x = luma_plane(original.as_bytes(), layout);
    let y = luma_plane(stego.as_bytes(), layout);

    let kernel = gaussian_kernel(WINDOW, SIGMA);
    let smooth = |plane: &[f64]| blur(plane, width, height, &kernel);

    let xx: Vec<f64> = x.iter().map(|v| v * v).collect();
    let yy: Vec<f64> = y.iter().map(|v| v * v).collect();
    let xy: Vec<f64> = x.iter().zip(&y).map(|(a, b)| a * b).collect();

    let mu_x = smooth(&x);
    let mu_y = smooth(&y);
    let e_xx = smooth(&xx);
    let e_yy = smooth(&yy);
    let e_xy = smooth(&xy);

    let c1 = (K1 * PEAK).powi(2);
    let c2 = (K2 * PEAK).powi(2);

    let total: f64 = (0..x.len())
        .map(|i| {
            let (mx, my) = (mu_x[i], mu_y[i]);
            let var_x = e_xx[i] - mx * mx;
            let var_y = e_yy[i] - my * my;
            let cov = e_xy[i] - mx * my;
            ((2.0 * mx * my + c1) * (2.0 * cov + c2))
                / ((mx * mx + my * my + c1) * (var_x + var_y + c2))
        })
        .sum();

    total / x.len() as f64
}

/// Compute all metrics at once.
pub fn evaluate(original: &DynamicImage, stego: &DynamicImage) -> Result<QualityReport> {
    let layout = ensure_comparable(original, stego)?;
    let (width, height) = original.dimensions();
    let mse = mse_bytes(original.as_bytes(), stego.as_bytes());
    let psnr = psnr_from_mse(mse);
    Ok(QualityReport {
        width,
        height,
        mse,
        psnr_db: psnr.is_finite().then_some(psnr),
        ssim: ssim_unchecked(original, stego, layout),
    })
}

fn luma_plane(bytes: &[u8], layout: ChannelLayout) -> Vec<f64> {
    bytes
        .chunks_exact(layout.channels)
        .map(|px| match layout.channels {
            1 | 2 => px[0] as f64,
            _ => 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64,
        })
        .collect()
}

fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let center = (size / 2) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let norm: f64 = raw.iter().sum();
    raw.into_iter().map(|v| v / norm).collect()
}

/// Mirror an out-of-range index without repeating the edge sample (`gfedcb|abcdefgh|gfedcba`).
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let i = i.rem_euclid(period);
    if i >= n as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}

/// Separable convolution: rows first, then columns.
fn blur(plane: &[f64], width: usize, height: usize, kernel: &[f64]) -> Vec<f64> {
    let radius = (kernel.len() / 2) as isize;

    let mut rows = vec![0.0; plane.len()];
    for y in 0..height {
        for x in 0..width {
            rows[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sx = reflect101(x as isize + k as isize - radius, width);
                    w * plane[y * width + sx]
                })
                .sum();
        }
    }

    let mut out = vec![0.0; plane.len()];
    for y in 0..height {
        for x in 0..width {
            out[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let sy = reflect101(y as isize + k as isize - radius, height);
                    w * rows[sy * width + x]
                })
                .sum();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn textured(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 9 + y * 3) as u8, (x * y) as u8, (255 - x * 4) as u8])
        }))
    }

    #[test]
    fn identical_images() {
        let img = textured(32, 24);
        let report = evaluate(&img, &img).unwrap();
        assert_eq!(report.mse, 0.0);
        assert_eq!(report.psnr_db, None);
        assert!((report.ssim - 1.0).abs() < 1e-9);
        assert!(psnr(&img, &img).unwrap().is_infinite());
    }

    #[test]
    fn single_lsb_flip() {
        let a = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([100])));
        let mut flipped = GrayImage::from_pixel(10, 10, Luma([100]));
        flipped.put_pixel(0, 0, Luma([101]));
        let b = DynamicImage::ImageLuma8(flipped);

        assert!((mse(&a, &b).unwrap() - 0.01).abs() < 1e-12);
        // 20*log10(255/0.1)
        assert!((psnr(&a, &b).unwrap() - 68.130803).abs() < 1e-4);
        assert!(ssim(&a, &b).unwrap() < 1.0);
    }

    #[test]
    fn mismatched_sizes_rejected() {
        assert!(matches!(
            mse(&textured(4, 4), &textured(4, 5)),
            Err(StegoError::DimensionMismatch)
        ));
    }

    #[test]
    fn mismatched_layouts_rejected() {
        let rgb = textured(4, 4);
        let gray = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        assert!(matches!(
            ssim(&rgb, &gray),
            Err(StegoError::DimensionMismatch)
        ));
    }

    #[test]
    fn evaluate_rejects_mismatch_before_reporting() {
        assert!(matches!(
            evaluate(&textured(6, 4), &textured(4, 6)),
            Err(StegoError::DimensionMismatch)
        ));
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(evaluate(&empty, &empty), Err(StegoError::EmptyCarrier)));
    }

    #[test]
    fn evaluate_matches_individual_metrics() {
        let a = textured(16, 12);
        let mut b = a.to_rgb8();
        b.put_pixel(3, 3, Rgb([0, 0, 0]));
        let b = DynamicImage::ImageRgb8(b);

        let report = evaluate(&a, &b).unwrap();
        assert_eq!((report.width, report.height), (16, 12));
        assert_eq!(report.mse, mse(&a, &b).unwrap());
        assert_eq!(report.psnr_db, Some(psnr(&a, &b).unwrap()));
        assert_eq!(report.ssim, ssim(&a, &b).unwrap());
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(WINDOW, SIGMA);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((k[0] - k[10]).abs() < 1e-15);
        assert!(k[5] > k[4]);
    }

    #[test]
    fn reflect101_mirrors_without_edge_repeat() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(3, 5), 3);
        assert_eq!(reflect101(-7, 1), 0);
    }

    #[test]
    fn blur_of_constant_is_constant() {
        let plane = vec![42.0; 7 * 5];
        let out = blur(&plane, 7, 5, &gaussian_kernel(WINDOW, SIGMA));
        assert!(out.iter().all(|v| (v - 42.0).abs() < 1e-9));
    }
}
