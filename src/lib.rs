//! Workspace umbrella crate for the Ridgeline fingerprint comparison
//! pipeline.
//!
//! This crate stitches together image intake, staging, normalization,
//! template extraction, and matching so callers can compare two encoded
//! fingerprint images with a single API entry point.

pub use engine::{
    ARTIFACT_GRAYSCALE, ARTIFACT_ORIENTATION, ARTIFACT_TEMPLATE, ArtifactRecord, BLOCK_SIZE,
    BuildError, CancelToken, CanonicalImage, DecodeError, MatchError, MatchRun, MatcherConfig,
    MemorySink, NoopSink, Template, TransparencySink, WorkerPool, build_template, decode_gray,
};
pub use ingest::{
    EncodedImage, ImageExt, NormalizeOutcome, NormalizerConfig, StageError, StagedFile,
    StagingConfig, StagingStore, normalize,
};

mod config;

pub use config::{ConfigLoadError, PipelineConfig};

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, info_span, warn};

/// Errors that can occur while comparing two images through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    Stage(StageError),
    ReadStaged { path: String, detail: String },
    Decode(DecodeError),
    Build(BuildError),
    Match(MatchError),
    Cancelled,
    Internal(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Stage(err) => write!(f, "image intake failure: {err}"),
            PipelineError::ReadStaged { path, detail } => {
                write!(f, "failed to read staged image {path}: {detail}")
            }
            PipelineError::Decode(err) => write!(f, "image decoding failure: {err}"),
            PipelineError::Build(err) => write!(f, "template extraction failure: {err}"),
            PipelineError::Match(err) => write!(f, "match run failure: {err}"),
            PipelineError::Cancelled => write!(f, "comparison cancelled before completion"),
            PipelineError::Internal(detail) => write!(f, "internal pipeline failure: {detail}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Stage(err) => Some(err),
            PipelineError::Decode(err) => Some(err),
            PipelineError::Build(err) => Some(err),
            PipelineError::Match(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StageError> for PipelineError {
    fn from(err: StageError) -> Self {
        PipelineError::Stage(err)
    }
}

impl From<DecodeError> for PipelineError {
    fn from(err: DecodeError) -> Self {
        PipelineError::Decode(err)
    }
}

impl From<BuildError> for PipelineError {
    fn from(err: BuildError) -> Self {
        PipelineError::Build(err)
    }
}

impl From<MatchError> for PipelineError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Match(other),
        }
    }
}

impl PipelineError {
    /// Suggested HTTP status code for this failure.
    pub fn http_status_code(&self) -> u16 {
        match self {
            PipelineError::Stage(err) => err.http_status_code(),
            PipelineError::Decode(_) => 400,
            PipelineError::Cancelled => 408,
            _ => 500,
        }
    }

    /// Whether the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        let status = self.http_status_code();
        (400..500).contains(&status)
    }
}

/// The stages a comparison moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Validate,
    Stage,
    Normalize,
    Decode,
    Template,
    MatchInit,
    Compare,
}

impl PipelineStage {
    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Validate => "validate",
            PipelineStage::Stage => "stage",
            PipelineStage::Normalize => "normalize",
            PipelineStage::Decode => "decode",
            PipelineStage::Template => "template",
            PipelineStage::MatchInit => "match_init",
            PipelineStage::Compare => "compare",
        }
    }
}

/// Hook for recording per-stage pipeline latencies.
///
/// Implementations receive one call per stage per comparison. They must be
/// cheap and non-blocking; the pipeline invokes them inline.
pub trait PipelineMetrics: Send + Sync {
    fn record_stage(&self, stage: PipelineStage, latency: Duration, ok: bool);
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

/// Install (or clear, with `None`) the process-wide metrics recorder.
pub fn set_pipeline_metrics(metrics: Option<Arc<dyn PipelineMetrics>>) {
    let mut slot = metrics_lock()
        .write()
        .expect("pipeline metrics lock poisoned");
    *slot = metrics;
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let slot = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.clone()
}

/// A single timed stage. Created at stage entry, consumed at stage exit.
struct StageSpan {
    stage: PipelineStage,
    start: Instant,
    recorder: Option<Arc<dyn PipelineMetrics>>,
}

impl StageSpan {
    fn start(stage: PipelineStage) -> Self {
        debug!(stage = stage.as_str(), "stage_started");
        Self {
            stage,
            start: Instant::now(),
            recorder: metrics_recorder(),
        }
    }

    fn finish(self, ok: bool) {
        let latency = self.start.elapsed();
        debug!(
            stage = self.stage.as_str(),
            ok,
            latency_micros = latency.as_micros() as u64,
            "stage_finished"
        );
        if let Some(recorder) = self.recorder {
            recorder.record_stage(self.stage, latency, ok);
        }
    }
}

/// The outcome of a completed comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Similarity in `[0.0, 1.0]`.
    pub score: f64,
    /// Wall-clock time for the whole comparison.
    pub elapsed: Duration,
    /// Human-readable match verdict.
    pub verdict: String,
}

fn verdict_for(score: f64, threshold: f64) -> String {
    if score > threshold {
        format!("Match found with score: {score:.2}")
    } else {
        format!("No match found, score: {score:.2}")
    }
}

/// Cancels the token on drop unless the comparison ran to completion.
///
/// This is what turns a dropped response future (client disconnect, outer
/// timeout) into a cooperative stop signal for the matcher threads.
struct CancelGuard {
    token: CancelToken,
    armed: bool,
}

impl CancelGuard {
    fn new(token: CancelToken) -> Self {
        Self { token, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.token.cancel();
        }
    }
}

/// The full comparison pipeline.
///
/// Construction builds the matcher worker pool once; every call to
/// [`Pipeline::compare_images`] reuses it. The pipeline is cheap to share
/// behind an `Arc` and safe to call concurrently.
pub struct Pipeline {
    config: PipelineConfig,
    staging: StagingStore,
    pool: WorkerPool,
    sink: Arc<dyn TransparencySink>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("workers", &self.pool.workers())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline from a loaded configuration.
    ///
    /// Fails when the matcher worker pool cannot be constructed. The config
    /// itself is expected to be validated at load time.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let staging = StagingStore::new(&config.staging);
        let pool = WorkerPool::new(&config.matcher)?;
        Ok(Self {
            config,
            staging,
            pool,
            sink: Arc::new(NoopSink),
        })
    }

    /// Replace the transparency sink intermediate artifacts are offered to.
    pub fn with_transparency_sink(mut self, sink: Arc<dyn TransparencySink>) -> Self {
        self.sink = sink;
        self
    }

    /// The configuration this pipeline was built from.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compare two base64-encoded fingerprint images.
    ///
    /// Runs the full pipeline: payload validation, staging to disk,
    /// best-effort normalization, grayscale decoding, template extraction,
    /// and the chunked comparison itself. Staged files are removed on every
    /// exit path. Dropping the returned future mid-flight cancels the
    /// comparison through `cancel`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when any stage fails; see
    /// [`PipelineError::http_status_code`] for the HTTP mapping. A fired
    /// cancellation token or an expired compare timeout surfaces as
    /// [`PipelineError::Cancelled`].
    pub async fn compare_images(
        &self,
        probe_b64: &str,
        candidate_b64: &str,
        cancel: CancelToken,
    ) -> Result<ComparisonResult, PipelineError> {
        let started = Instant::now();
        let guard = CancelGuard::new(cancel.clone());
        let result = self
            .run(probe_b64, candidate_b64, &cancel)
            .instrument(info_span!("pipeline_compare"))
            .await;
        guard.disarm();

        match &result {
            Ok(outcome) => info!(
                score = outcome.score,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                verdict = %outcome.verdict,
                "pipeline_compare_success"
            ),
            Err(err) => warn!(
                error = %err,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "pipeline_compare_failure"
            ),
        }

        result
    }

    async fn run(
        &self,
        probe_b64: &str,
        candidate_b64: &str,
        cancel: &CancelToken,
    ) -> Result<ComparisonResult, PipelineError> {
        let started = Instant::now();

        // Both payloads are checked before anything touches the filesystem.
        let span = StageSpan::start(PipelineStage::Validate);
        let parsed = parse_pair(probe_b64, candidate_b64);
        span.finish(parsed.is_ok());
        let (probe, candidate) = parsed?;

        // Probe strictly before candidate. The guards remove the staged
        // files when this function returns, on success and failure alike.
        let span = StageSpan::start(PipelineStage::Stage);
        let staged = self.stage_pair(&probe, &candidate);
        span.finish(staged.is_ok());
        let (probe_file, candidate_file) = staged?;

        let span = StageSpan::start(PipelineStage::Normalize);
        self.normalize_staged(&probe_file).await;
        self.normalize_staged(&candidate_file).await;
        span.finish(true);

        let probe_template = self.template_from(&probe_file, "probe").await?;
        let candidate_template = self.template_from(&candidate_file, "candidate").await?;

        let span = StageSpan::start(PipelineStage::MatchInit);
        let run = MatchRun::with_pool(&probe_template, self.pool.clone());
        span.finish(run.is_ok());
        let run = run?;

        let score = self.compare_templates(run, candidate_template, cancel).await?;

        let elapsed = started.elapsed();
        let verdict = verdict_for(score, self.config.match_threshold);
        Ok(ComparisonResult {
            score,
            elapsed,
            verdict,
        })
    }

    fn stage_pair(
        &self,
        probe: &EncodedImage,
        candidate: &EncodedImage,
    ) -> Result<(StagedFile, StagedFile), PipelineError> {
        let probe_file = self.staging.stage(&probe.bytes, probe.extension)?;
        let candidate_file = self.staging.stage(&candidate.bytes, candidate.extension)?;
        Ok((probe_file, candidate_file))
    }

    /// Normalization is best-effort: a degraded outcome is logged and the
    /// staged bytes are used as-is.
    async fn normalize_staged(&self, staged: &StagedFile) {
        match normalize(staged.path(), &self.config.normalizer).await {
            NormalizeOutcome::Normalized => {}
            NormalizeOutcome::Degraded { warning } => {
                warn!(
                    path = %staged.path().display(),
                    warning = %warning,
                    "normalization_degraded"
                );
            }
        }
    }

    /// Decode and template extraction are CPU-bound, so they run off the
    /// async executor.
    async fn template_from(
        &self,
        staged: &StagedFile,
        role: &'static str,
    ) -> Result<Template, PipelineError> {
        let path = staged.path().to_path_buf();
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || template_from_file(&path, role, sink.as_ref()))
            .await
            .map_err(|err| PipelineError::Internal(err.to_string()))?
    }

    async fn compare_templates(
        &self,
        run: MatchRun,
        candidate: Template,
        cancel: &CancelToken,
    ) -> Result<f64, PipelineError> {
        let span = StageSpan::start(PipelineStage::Compare);
        let deadline = Duration::from_millis(self.config.compare_timeout_ms);
        let compare_cancel = cancel.clone();
        let task = tokio::task::spawn_blocking(move || run.compare(&candidate, &compare_cancel));

        match tokio::time::timeout(deadline, task).await {
            Err(_) => {
                // The workers poll the token between chunks, so firing it
                // winds the comparison down shortly after.
                cancel.cancel();
                span.finish(false);
                warn!(
                    timeout_ms = self.config.compare_timeout_ms,
                    "compare_timed_out"
                );
                Err(PipelineError::Cancelled)
            }
            Ok(Err(join_err)) => {
                span.finish(false);
                Err(PipelineError::Internal(join_err.to_string()))
            }
            Ok(Ok(Err(err))) => {
                span.finish(false);
                Err(PipelineError::from(err))
            }
            Ok(Ok(Ok(score))) => {
                span.finish(true);
                Ok(score)
            }
        }
    }
}

fn parse_pair(
    probe_b64: &str,
    candidate_b64: &str,
) -> Result<(EncodedImage, EncodedImage), PipelineError> {
    let probe = EncodedImage::from_base64(probe_b64)?;
    let candidate = EncodedImage::from_base64(candidate_b64)?;
    Ok((probe, candidate))
}

fn template_from_file(
    path: &Path,
    role: &'static str,
    sink: &dyn TransparencySink,
) -> Result<Template, PipelineError> {
    let span = StageSpan::start(PipelineStage::Decode);
    let decoded = read_and_decode(path);
    span.finish(decoded.is_ok());
    let image = decoded?;
    debug!(
        role,
        width = image.width,
        height = image.height,
        "image_decoded"
    );

    let span = StageSpan::start(PipelineStage::Template);
    let built = build_template(&image, sink);
    span.finish(built.is_ok());
    let template = built?;
    debug!(role, cells = template.cell_count(), "template_built");
    Ok(template)
}

fn read_and_decode(path: &Path) -> Result<CanonicalImage, PipelineError> {
    let bytes = std::fs::read(path).map_err(|err| PipelineError::ReadStaged {
        path: path.display().to_string(),
        detail: err.to_string(),
    })?;
    Ok(decode_gray(&bytes)?)
}
