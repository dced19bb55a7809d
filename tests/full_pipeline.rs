mod common;

use std::sync::Arc;

use ridgeline::{
    ARTIFACT_GRAYSCALE, ARTIFACT_ORIENTATION, ARTIFACT_TEMPLATE, CancelToken, MemorySink,
    PipelineError,
};

use common::{
    encode_b64, gif_bytes, grating, grating_b64, jpeg_bytes, png_bytes, staging_residue,
    test_pipeline,
};

#[tokio::test]
async fn identical_images_score_a_perfect_match() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let img = grating_b64(128, 128, 0.35, 0.0);

    let outcome = pipeline
        .compare_images(&img, &img, CancelToken::new())
        .await?;

    assert!(
        outcome.score > 0.99,
        "identical images scored {}",
        outcome.score
    );
    assert!(outcome.verdict.starts_with("Match found with score:"));
    Ok(())
}

#[tokio::test]
async fn a_shifted_second_capture_still_matches() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let probe = grating_b64(128, 128, 0.35, 0.0);
    let second_capture = grating_b64(128, 128, 0.35, 3.0);

    let outcome = pipeline
        .compare_images(&probe, &second_capture, CancelToken::new())
        .await?;

    assert!(
        outcome.score > 0.5,
        "shifted capture scored {}",
        outcome.score
    );
    assert!(outcome.verdict.starts_with("Match found with score:"));
    Ok(())
}

#[tokio::test]
async fn orthogonal_ridge_flow_does_not_match() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let probe = grating_b64(128, 128, 0.35, 0.0);
    let other = grating_b64(128, 128, 0.35 + std::f64::consts::FRAC_PI_2, 0.0);

    let outcome = pipeline
        .compare_images(&probe, &other, CancelToken::new())
        .await?;

    assert!(
        outcome.score < 0.5,
        "orthogonal gratings scored {}",
        outcome.score
    );
    assert!(outcome.verdict.starts_with("No match found, score:"));
    Ok(())
}

#[tokio::test]
async fn data_uri_payloads_are_accepted() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let b64 = grating_b64(128, 128, 0.35, 0.0);
    let uri = format!("data:image/png;base64,{b64}");

    let outcome = pipeline
        .compare_images(&uri, &uri, CancelToken::new())
        .await?;

    assert!(outcome.score > 0.99);
    Ok(())
}

#[tokio::test]
async fn jpeg_and_gif_encodings_of_the_same_finger_match() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let img = grating(128, 128, 0.35, 0.0);

    let png = encode_b64(&png_bytes(&img));
    let jpeg = encode_b64(&jpeg_bytes(&img));
    let gif = encode_b64(&gif_bytes(&img));

    let outcome = pipeline
        .compare_images(&png, &jpeg, CancelToken::new())
        .await?;
    assert!(
        outcome.score > 0.9,
        "png vs jpeg scored {}",
        outcome.score
    );

    // No data-URI prefix: the staged name says png, the decoder goes by the
    // actual bytes.
    let outcome = pipeline
        .compare_images(&png, &gif, CancelToken::new())
        .await?;
    assert!(outcome.score > 0.9, "png vs gif scored {}", outcome.score);
    Ok(())
}

#[tokio::test]
async fn verdict_embeds_the_rounded_score() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let img = grating_b64(128, 128, 0.35, 0.0);

    let outcome = pipeline
        .compare_images(&img, &img, CancelToken::new())
        .await?;

    let rounded = format!("{:.2}", outcome.score);
    assert!(
        outcome.verdict.ends_with(&rounded),
        "verdict {:?} does not end with {rounded}",
        outcome.verdict
    );
    Ok(())
}

#[tokio::test]
async fn staging_directory_is_left_clean() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let img = grating_b64(128, 128, 0.35, 0.0);

    pipeline
        .compare_images(&img, &img, CancelToken::new())
        .await?;
    let _ = pipeline
        .compare_images(&img, &encode_b64(b"not an image"), CancelToken::new())
        .await;

    let residue = staging_residue(dir.path());
    assert!(residue.is_empty(), "staging dir still holds {residue:?}");
    Ok(())
}

#[tokio::test]
async fn transparency_sink_sees_both_extractions() -> Result<(), PipelineError> {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(MemorySink::new());
    let pipeline = test_pipeline(dir.path()).with_transparency_sink(sink.clone());
    let img = grating_b64(128, 128, 0.35, 0.0);

    pipeline
        .compare_images(&img, &img, CancelToken::new())
        .await?;

    let keys = sink.keys();
    for key in [ARTIFACT_GRAYSCALE, ARTIFACT_ORIENTATION, ARTIFACT_TEMPLATE] {
        assert_eq!(
            keys.iter().filter(|k| k.as_str() == key).count(),
            2,
            "expected {key} once per image, got {keys:?}"
        );
    }
    Ok(())
}
