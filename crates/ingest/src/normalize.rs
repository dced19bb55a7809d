//! Best-effort external image normalization.
//!
//! A staged image is handed to an external tool (ImageMagick's `convert` by
//! default) that rewrites the file in place, ironing out encoding quirks
//! before decoding. The tool is strictly optional: a missing binary, a
//! non-zero exit, or a timeout degrades the run to a warning and the pipeline
//! continues with the unnormalized file. Normalization can therefore never
//! fail a request, only slow it down by at most the configured timeout.
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::config::NormalizerConfig;

/// Longest diagnostic carried in a degraded outcome, in bytes.
const MAX_DIAGNOSTIC_BYTES: usize = 512;

/// Result of one normalization attempt.
///
/// There is no error variant: every failure mode is folded into
/// [`Degraded`](NormalizeOutcome::Degraded) with a human-readable warning.
/// Callers decide how loudly to log it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a degraded outcome carries a warning that should be logged"]
pub enum NormalizeOutcome {
    /// The tool ran and exited zero; the staged file was rewritten in place.
    Normalized,
    /// The tool could not be run to completion; the staged file is untouched
    /// or partially rewritten, and the pipeline proceeds with it as-is.
    Degraded {
        /// What went wrong, truncated to a bounded length.
        warning: String,
    },
}

impl NormalizeOutcome {
    /// Returns the warning text for degraded outcomes.
    pub fn warning(&self) -> Option<&str> {
        match self {
            NormalizeOutcome::Normalized => None,
            NormalizeOutcome::Degraded { warning } => Some(warning),
        }
    }
}

/// Runs the configured tool over `path`, rewriting it in place.
///
/// The command is invoked as `<command> <path> <path>` (input and output are
/// the same file), with stdin closed and stderr captured for diagnostics. The
/// child is killed if it outlives `timeout_ms` or if this future is dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
/// use ingest::{normalize, NormalizeOutcome, NormalizerConfig};
///
/// # async fn demo() {
/// let config = NormalizerConfig::default();
/// match normalize(Path::new("temp/image_1_0.png"), &config).await {
///     NormalizeOutcome::Normalized => {}
///     NormalizeOutcome::Degraded { warning } => eprintln!("degraded: {warning}"),
/// }
/// # }
/// ```
pub async fn normalize(path: &Path, config: &NormalizerConfig) -> NormalizeOutcome {
    let start = Instant::now();

    let mut command = Command::new(&config.command);
    command
        .arg(path)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            return NormalizeOutcome::Degraded {
                warning: format!("failed to spawn {}: {err}", config.command),
            };
        }
    };

    let deadline = Duration::from_millis(config.timeout_ms);
    match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Err(_) => NormalizeOutcome::Degraded {
            warning: format!(
                "{} timed out after {}ms and was killed",
                config.command, config.timeout_ms
            ),
        },
        Ok(Err(err)) => NormalizeOutcome::Degraded {
            warning: format!("failed waiting for {}: {err}", config.command),
        },
        Ok(Ok(output)) if !output.status.success() => {
            let stderr = truncate_diagnostic(&output.stderr);
            NormalizeOutcome::Degraded {
                warning: format!("{} exited with {}: {stderr}", config.command, output.status),
            }
        }
        Ok(Ok(_)) => {
            debug!(
                command = %config.command,
                path = %path.display(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "image_normalized"
            );
            NormalizeOutcome::Normalized
        }
    }
}

/// Collapses captured stderr into a bounded, single-line diagnostic.
fn truncate_diagnostic(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        return "(no stderr)".to_string();
    }
    if text.len() <= MAX_DIAGNOSTIC_BYTES {
        return text.replace('\n', " ");
    }

    let mut cut = MAX_DIAGNOSTIC_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes total)", text[..cut].replace('\n', " "), text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(command: &str, timeout_ms: u64) -> NormalizerConfig {
        NormalizerConfig {
            command: command.to_string(),
            timeout_ms,
        }
    }

    fn staged_fixture(dir: &Path, contents: &[u8]) -> PathBuf {
        let path = dir.join("image_1_0.png");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn successful_command_is_normalized() {
        let tmp = tempfile::tempdir().unwrap();
        let path = staged_fixture(tmp.path(), b"pixels");

        // `true` ignores its arguments and exits zero.
        let outcome = normalize(&path, &config("true", 5_000)).await;
        assert_eq!(outcome, NormalizeOutcome::Normalized);
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn nonzero_exit_degrades() {
        let tmp = tempfile::tempdir().unwrap();
        let path = staged_fixture(tmp.path(), b"pixels");

        let outcome = normalize(&path, &config("false", 5_000)).await;
        match outcome {
            NormalizeOutcome::Degraded { warning } => {
                assert!(warning.contains("false"), "warning was {warning}");
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
        // The staged file survives a failed normalization.
        assert_eq!(std::fs::read(&path).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn missing_binary_degrades() {
        let tmp = tempfile::tempdir().unwrap();
        let path = staged_fixture(tmp.path(), b"pixels");

        let outcome = normalize(&path, &config("ridgeline-no-such-binary", 5_000)).await;
        match outcome {
            NormalizeOutcome::Degraded { warning } => {
                assert!(warning.contains("failed to spawn"), "warning was {warning}");
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out_and_degrades() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("slow.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let path = staged_fixture(tmp.path(), b"pixels");

        let start = Instant::now();
        let outcome = normalize(&path, &config(script.to_str().unwrap(), 100)).await;
        assert!(
            start.elapsed() < Duration::from_secs(4),
            "timeout did not cut the run short"
        );
        match outcome {
            NormalizeOutcome::Degraded { warning } => {
                assert!(warning.contains("timed out"), "warning was {warning}");
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_rewrites_file_in_place() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("rewrite.sh");
        std::fs::write(&script, "#!/bin/sh\nprintf normalized > \"$1\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let path = staged_fixture(tmp.path(), b"pixels");

        let outcome = normalize(&path, &config(script.to_str().unwrap(), 5_000)).await;
        assert_eq!(outcome, NormalizeOutcome::Normalized);
        assert_eq!(std::fs::read(&path).unwrap(), b"normalized");
    }

    #[test]
    fn diagnostics_are_truncated_and_flattened() {
        assert_eq!(truncate_diagnostic(b""), "(no stderr)");
        assert_eq!(truncate_diagnostic(b"line one\nline two\n"), "line one line two");

        let long = vec![b'x'; 2 * MAX_DIAGNOSTIC_BYTES];
        let truncated = truncate_diagnostic(&long);
        assert!(truncated.len() < long.len());
        assert!(truncated.ends_with(&format!("({} bytes total)", long.len())));
    }
}
