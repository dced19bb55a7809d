use std::io::Cursor;

use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{GrayImage, ImageFormat, Luma};
use ridgeline::{CancelToken, Pipeline, PipelineConfig};

/// Demo: synthesize one matching and one non-matching pair of
/// fingerprint-like images and run both through the full pipeline.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::new(config).context("failed to build the pipeline")?;

    // A second capture of the same finger shifts a little but keeps the
    // ridge orientation; a different finger flows differently.
    let probe = grating_png(256, 256, 0.35, 0.0)?;
    let second_capture = grating_png(256, 256, 0.35, 3.0)?;
    let other_finger = grating_png(256, 256, 0.35 + std::f64::consts::FRAC_PI_2, 0.0)?;

    println!("probe vs second capture of the same finger:");
    let outcome = pipeline
        .compare_images(&probe, &second_capture, CancelToken::new())
        .await
        .context("matching-pair comparison failed")?;
    println!(
        "  {} (score {:.4}, took {:?})",
        outcome.verdict, outcome.score, outcome.elapsed
    );

    println!("probe vs a different finger:");
    let outcome = pipeline
        .compare_images(&probe, &other_finger, CancelToken::new())
        .await
        .context("non-matching-pair comparison failed")?;
    println!(
        "  {} (score {:.4}, took {:?})",
        outcome.verdict, outcome.score, outcome.elapsed
    );

    Ok(())
}

/// A sinusoidal grating standing in for ridge flow: `angle` sets the ridge
/// orientation, `phase` shifts the pattern without changing it.
fn grating_png(width: u32, height: u32, angle: f64, phase: f64) -> anyhow::Result<String> {
    let (sin, cos) = angle.sin_cos();
    let mut img = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let t = x as f64 * cos + y as f64 * sin + phase;
        let value = 127.5 + 127.5 * (t * std::f64::consts::TAU / 8.0).sin();
        *pixel = Luma([value as u8]);
    }

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .context("failed to encode demo image")?;
    Ok(BASE64.encode(buf.into_inner()))
}
