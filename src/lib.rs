pub mod config;
pub mod dialog;
pub mod errors;
pub mod events;
pub mod llm;
pub mod pipeline;

pub use config::PipelineConfig;
pub use dialog::{Decision, DialogKind, DialogSnapshot, ResolvedDecision, ResolvedVia, UiElement};
pub use errors::PipelineError;
pub use events::{EventBus, PipelineEvent};
pub use pipeline::{ActionExecutor, DialogPipeline, ObservedWindow};

/// Return the platform-standard data directory for DialogPilot.
///
/// - macOS: `~/Library/Application Support/com.dialogpilot.app/`
/// - Windows: `{FOLDERID_RoamingAppData}\dialogpilot\`
/// - Linux: `$XDG_DATA_HOME/com.dialogpilot.app/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.dialogpilot/` only if none of the above can be resolved.
pub(crate) fn data_dir() -> std::path::PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("com.dialogpilot.app");
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".dialogpilot")
}

/// Initialize the tracing subscriber: structured JSON logs under the data
/// directory. Call once at startup, before the pipeline is built.
///
/// 1. Rotates existing logs (pipeline.log → .1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh pipeline.log with a line-flushing writer so entries
///    survive a crash.
/// 3. Logs a startup banner with the log location for discoverability.
///
/// When the log file cannot be opened, logging falls back to stderr.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dialogpilot=info,warn"));

    let log_dir = data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_path = log_dir.join("pipeline.log");

    rotate_logs(&log_path, 3);

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(log_file) => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(FlushingWriter::new(log_file))
                .with_ansi(false)
                .init();

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                log_file = %log_path.display(),
                pid = std::process::id(),
                "dialogpilot starting"
            );
        }
        Err(error) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .init();

            tracing::warn!(
                path = %log_path.display(),
                error = %error,
                "could not open log file, logging to stderr"
            );
        }
    }
}

/// Rotate log files: `pipeline.log` → `pipeline.log.1` → `.2` → … → `.{keep}`.
///
/// The oldest file beyond `keep` is deleted. Missing files in the chain are
/// skipped.
fn rotate_logs(base_path: &std::path::Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that flushes after every write.
///
/// `tracing-subscriber` buffers output internally; without explicit flushing,
/// the tail of the log can be lost on a crash. Decision volume is low enough
/// that the extra flushes cost nothing noticeable.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_logs_shifts_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("pipeline.log");
        std::fs::write(&base, "current").unwrap();
        std::fs::write(format!("{}.1", base.display()), "one").unwrap();
        std::fs::write(format!("{}.2", base.display()), "two").unwrap();
        std::fs::write(format!("{}.3", base.display()), "three").unwrap();

        rotate_logs(&base, 3);

        assert!(!base.exists());
        let read = |suffix: &str| {
            std::fs::read_to_string(format!("{}{suffix}", base.display())).unwrap()
        };
        assert_eq!(read(".1"), "current");
        assert_eq!(read(".2"), "one");
        assert_eq!(read(".3"), "two");
    }

    #[test]
    fn test_rotate_logs_handles_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("pipeline.log");
        // Nothing exists yet; rotation must be a no-op, not an error.
        rotate_logs(&base, 3);
        assert!(!base.exists());
    }

    #[test]
    fn test_data_dir_is_never_empty() {
        assert!(!data_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_flushing_writer_writes_through_immediately() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();

        let mut writer = FlushingWriter::new(file);
        writer.write_all(b"line\n").unwrap();
        // Readable before the writer is dropped.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }
}
