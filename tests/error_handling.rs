mod common;

use ridgeline::{
    BuildError, CancelToken, DecodeError, PipelineError, StageError,
};

use common::{encode_b64, grating_b64, png_bytes, staging_residue, test_pipeline, test_pipeline_with};

#[tokio::test]
async fn empty_payload_is_an_intake_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());

    let err = pipeline
        .compare_images("", &grating_b64(128, 128, 0.35, 0.0), CancelToken::new())
        .await
        .expect_err("empty payload must fail");

    assert_eq!(err, PipelineError::Stage(StageError::EmptyImage));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn invalid_base64_fails_before_staging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());

    let err = pipeline
        .compare_images("%%%", "%%%", CancelToken::new())
        .await
        .expect_err("malformed base64 must fail");

    assert!(matches!(
        err,
        PipelineError::Stage(StageError::InvalidBase64 { .. })
    ));
    assert_eq!(err.http_status_code(), 400);
    assert!(
        !dir.path().join("staging").exists(),
        "validation failures must not touch the filesystem"
    );
}

#[tokio::test]
async fn unsupported_media_type_fails_before_staging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let valid = grating_b64(128, 128, 0.35, 0.0);

    let err = pipeline
        .compare_images("data:image/webp;base64,AAAA", &valid, CancelToken::new())
        .await
        .expect_err("webp must be rejected");

    assert_eq!(
        err,
        PipelineError::Stage(StageError::UnsupportedMediaType {
            declared: "image/webp".to_string(),
        })
    );
    assert!(!dir.path().join("staging").exists());
}

#[tokio::test]
async fn undecodable_bytes_are_a_client_error_with_cleanup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let junk = encode_b64(b"definitely not an image");

    let err = pipeline
        .compare_images(&junk, &junk, CancelToken::new())
        .await
        .expect_err("junk bytes must fail decoding");

    assert_eq!(err, PipelineError::Decode(DecodeError::UnsupportedFormat));
    assert!(err.is_client_error());
    assert!(staging_residue(dir.path()).is_empty());
}

#[tokio::test]
async fn too_small_images_fail_template_extraction() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let tiny = grating_b64(16, 16, 0.35, 0.0);

    let err = pipeline
        .compare_images(&tiny, &tiny, CancelToken::new())
        .await
        .expect_err("a 16x16 image must be rejected");

    assert_eq!(
        err,
        PipelineError::Build(BuildError::ImageTooSmall {
            width: 16,
            height: 16,
            min: 32,
        })
    );
    assert_eq!(err.http_status_code(), 500);
    assert!(staging_residue(dir.path()).is_empty());
}

#[tokio::test]
async fn featureless_images_fail_the_quality_gate() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline(dir.path());
    let flat = encode_b64(&png_bytes(&image::GrayImage::from_pixel(
        128,
        128,
        image::Luma([128]),
    )));

    let err = pipeline
        .compare_images(&flat, &flat, CancelToken::new())
        .await
        .expect_err("a flat image has no ridge structure");

    assert_eq!(err, PipelineError::Build(BuildError::NoRidgeStructure));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn failing_normalizer_degrades_without_failing_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline_with(dir.path(), |config| {
        config.normalizer.command = "false".to_string();
    });
    let img = grating_b64(128, 128, 0.35, 0.0);

    let outcome = pipeline
        .compare_images(&img, &img, CancelToken::new())
        .await
        .expect("normalization is best-effort");

    assert!(outcome.score > 0.99);
}

#[tokio::test]
async fn missing_normalizer_binary_degrades_without_failing_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = test_pipeline_with(dir.path(), |config| {
        config.normalizer.command = "ridgeline-no-such-binary".to_string();
    });
    let img = grating_b64(128, 128, 0.35, 0.0);

    let outcome = pipeline
        .compare_images(&img, &img, CancelToken::new())
        .await
        .expect("a missing normalizer must not fail the run");

    assert!(outcome.score > 0.99);
}

#[tokio::test]
async fn blocked_staging_directory_is_a_server_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"in the way").expect("write blocker");

    let pipeline = test_pipeline_with(dir.path(), |config| {
        config.staging.dir = blocked.clone();
    });
    let img = grating_b64(128, 128, 0.35, 0.0);

    let err = pipeline
        .compare_images(&img, &img, CancelToken::new())
        .await
        .expect_err("staging into a file path must fail");

    assert!(matches!(
        err,
        PipelineError::Stage(StageError::CreateDir { .. })
    ));
    assert!(!err.is_client_error());
}

#[test]
fn zero_worker_budget_fails_pipeline_construction() {
    let mut config = ridgeline::PipelineConfig::default();
    config.matcher.workers = 0;

    let err = ridgeline::Pipeline::new(config).expect_err("zero workers is invalid");
    assert_eq!(
        err,
        PipelineError::Match(ridgeline::MatchError::WorkerBudget { workers: 0 })
    );
    assert_eq!(err.http_status_code(), 500);
}
