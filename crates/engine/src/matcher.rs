//! Cancellable template comparison under a configured worker budget.
//!
//! A [`MatchRun`] owns one prepared reference template (the probe) and
//! compares candidate templates against it. Preparation precomputes the
//! reference-side double-angle vectors once, so repeated comparisons against
//! the same reference skip that work. Comparison is chunked: chunks may
//! evaluate in parallel on a rayon pool, partial sums are reduced in a fixed
//! order, and the cancellation token is polled once per chunk. The worker
//! budget therefore affects latency only, never the numeric score.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MatchError;
use crate::template::{Template, TemplateCell};

/// Cells evaluated between two cancellation checks. Bounds cancellation
/// latency to one chunk of work.
const CELL_CHUNK: usize = 64;

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Worker budget for comparison work.
///
/// Set once at startup and treated as read-only afterwards; a budget of 1
/// keeps everything on the calling thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Number of comparison workers. Defaults to the host's available
    /// hardware parallelism.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl MatcherConfig {
    /// Override the worker budget.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Startup-time sanity check.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.workers == 0 {
            return Err(MatchError::WorkerBudget { workers: 0 });
        }
        Ok(())
    }
}

/// Cooperative cancellation flag, cheap to clone across threads.
///
/// A fresh token is never cancelled; comparisons given one run to
/// completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the token. Idempotent; every clone observes the change.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Shared rayon pool sized by the worker budget.
///
/// One pool serves every match run in the process; cloning shares the same
/// threads.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<rayon::ThreadPool>,
    workers: usize,
}

impl WorkerPool {
    /// Build a pool for the configured budget.
    pub fn new(config: &MatcherConfig) -> Result<Self, MatchError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("ridge-match-{i}"))
            .build()
            .map_err(|err| MatchError::WorkerPool {
                reason: err.to_string(),
            })?;
        Ok(Self {
            inner: Arc::new(pool),
            workers: config.workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

/// Reference-side cell with the double-angle vector precomputed.
#[derive(Debug, Clone, Copy)]
struct PreparedCell {
    cos2: f32,
    sin2: f32,
    coherence: f32,
}

#[derive(Debug, Clone)]
struct PreparedTemplate {
    grid_w: u32,
    grid_h: u32,
    cells: Vec<PreparedCell>,
}

/// One cancellable comparison unit bound to a single reference template.
pub struct MatchRun {
    reference: PreparedTemplate,
    pool: Option<WorkerPool>,
}

impl MatchRun {
    /// Prepare a run from the reference template, building a private pool
    /// when the budget asks for more than one worker.
    pub fn new(reference: &Template, config: &MatcherConfig) -> Result<Self, MatchError> {
        config.validate()?;
        let pool = if config.workers > 1 {
            Some(WorkerPool::new(config)?)
        } else {
            None
        };
        Ok(Self {
            reference: prepare(reference)?,
            pool,
        })
    }

    /// Prepare a run that shares a process-wide pool.
    pub fn with_pool(reference: &Template, pool: WorkerPool) -> Result<Self, MatchError> {
        Ok(Self {
            reference: prepare(reference)?,
            pool: Some(pool),
        })
    }

    /// Compare the candidate against the prepared reference.
    ///
    /// Returns a similarity score in `[0, 1]`: self-comparison of the
    /// reference template yields the maximum attainable value (approximately
    /// 1.0), unrelated ridge flow approaches 0. Polls `cancel` between
    /// chunks and returns [`MatchError::Cancelled`] promptly once it fires.
    pub fn compare(&self, candidate: &Template, cancel: &CancelToken) -> Result<f64, MatchError> {
        let started = Instant::now();

        let overlap_w = self.reference.grid_w.min(candidate.grid_w) as usize;
        let overlap_h = self.reference.grid_h.min(candidate.grid_h) as usize;
        let total = overlap_w * overlap_h;
        if total == 0 {
            return Ok(0.0);
        }

        let chunk_count = total.div_ceil(CELL_CHUNK);
        let partials: Vec<(f64, f64)> = match &self.pool {
            Some(pool) if chunk_count > 1 => pool.inner.install(|| {
                (0..chunk_count)
                    .into_par_iter()
                    .map(|chunk| self.chunk_partial(candidate, overlap_w, total, chunk, cancel))
                    .collect::<Result<Vec<_>, MatchError>>()
            })?,
            _ => (0..chunk_count)
                .map(|chunk| self.chunk_partial(candidate, overlap_w, total, chunk, cancel))
                .collect::<Result<Vec<_>, MatchError>>()?,
        };

        // Fixed-order reduction: identical for every worker count.
        let mut agreement = 0.0f64;
        let mut weight = 0.0f64;
        for (num, den) in partials {
            agreement += num;
            weight += den;
        }

        let score = if weight <= 0.0 {
            0.0
        } else {
            let larger = self.reference.cells.len().max(candidate.cells.len()) as f64;
            (agreement / weight) * (total as f64 / larger)
        };

        debug!(
            score,
            cells = total,
            elapsed_micros = started.elapsed().as_micros() as u64,
            "comparison finished"
        );
        Ok(score)
    }

    /// Accumulate `(weighted agreement, weight)` for one chunk of the
    /// overlap region, checking the token before touching any cell.
    fn chunk_partial(
        &self,
        candidate: &Template,
        overlap_w: usize,
        total: usize,
        chunk: usize,
        cancel: &CancelToken,
    ) -> Result<(f64, f64), MatchError> {
        if cancel.is_cancelled() {
            return Err(MatchError::Cancelled);
        }

        let ref_stride = self.reference.grid_w as usize;
        let cand_stride = candidate.grid_w as usize;
        let start = chunk * CELL_CHUNK;
        let end = total.min(start + CELL_CHUNK);

        let mut num = 0.0f64;
        let mut den = 0.0f64;
        for i in start..end {
            let x = i % overlap_w;
            let y = i / overlap_w;
            let r = self.reference.cells[y * ref_stride + x];
            let c = &candidate.cells[y * cand_stride + x];

            let w = f64::from(r.coherence.min(c.coherence));
            if w <= 0.0 {
                continue;
            }
            let (cand_cos2, cand_sin2) = double_angle(c);
            // cos(2 * delta_theta) via the double-angle dot product; negative
            // agreement carries no evidence and clamps to zero.
            let align =
                (f64::from(r.cos2) * cand_cos2 + f64::from(r.sin2) * cand_sin2).max(0.0);
            num += align * w;
            den += w;
        }
        Ok((num, den))
    }
}

fn prepare(reference: &Template) -> Result<PreparedTemplate, MatchError> {
    if reference.is_empty() {
        return Err(MatchError::EmptyReference);
    }
    let cells = reference
        .cells
        .iter()
        .map(|cell| {
            let (sin2, cos2) = (2.0 * cell.theta).sin_cos();
            PreparedCell {
                cos2,
                sin2,
                coherence: cell.coherence,
            }
        })
        .collect();
    Ok(PreparedTemplate {
        grid_w: reference.grid_w,
        grid_h: reference.grid_h,
        cells,
    })
}

#[inline]
fn double_angle(cell: &TemplateCell) -> (f64, f64) {
    let (sin2, cos2) = (2.0 * cell.theta).sin_cos();
    (f64::from(cos2), f64::from(sin2))
}
