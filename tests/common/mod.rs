//! Shared fixtures for the integration tests
//!
//! Fingerprint stand-ins are oriented sinusoidal gratings: the structure
//! tensor sees a clean dominant orientation per block, so two gratings match
//! exactly when their angles agree and disagree when they are orthogonal.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{GrayImage, ImageFormat, Luma};
use ridgeline::{Pipeline, PipelineConfig};

/// Sinusoidal grating with ridge orientation `angle` and wavelength 8px.
pub fn grating(width: u32, height: u32, angle: f64, phase: f64) -> GrayImage {
    let (sin, cos) = angle.sin_cos();
    let mut img = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let t = x as f64 * cos + y as f64 * sin + phase;
        let value = 127.5 + 127.5 * (t * std::f64::consts::TAU / 8.0).sin();
        *pixel = Luma([value as u8]);
    }
    img
}

pub fn png_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("png encode");
    buf.into_inner()
}

pub fn jpeg_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg)
        .expect("jpeg encode");
    buf.into_inner()
}

pub fn gif_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img.clone())
        .to_rgb8()
        .write_to(&mut buf, ImageFormat::Gif)
        .expect("gif encode");
    buf.into_inner()
}

pub fn encode_b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Base64 PNG grating, the fixture most tests want.
pub fn grating_b64(width: u32, height: u32, angle: f64, phase: f64) -> String {
    encode_b64(&png_bytes(&grating(width, height, angle, phase)))
}

/// Pipeline wired to an isolated staging dir and a stub normalizer.
pub fn test_pipeline(dir: &Path) -> Pipeline {
    test_pipeline_with(dir, |_| {})
}

pub fn test_pipeline_with(dir: &Path, tweak: impl FnOnce(&mut PipelineConfig)) -> Pipeline {
    let mut config = PipelineConfig::default();
    config.staging.dir = dir.join("staging");
    config.normalizer.command = "true".to_string();
    tweak(&mut config);
    Pipeline::new(config).expect("pipeline construction")
}

/// Entries left in the pipeline's staging directory, if any.
pub fn staging_residue(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir.join("staging"))
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default()
}
