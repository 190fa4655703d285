//! Output transport: path selection, named pipe creation, and opening.
//!
//! The output path is either fixed (`output.path`, `FACTORIO_PIPE_PATH`) or
//! chosen by probing an ordered candidate list: the first candidate whose
//! parent directory exists wins, and the last one is the fallback. A
//! missing path is created as a named pipe; failing to do so is reported to
//! the caller but does not stop it from trying to open the path anyway.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;

/// Errors that can occur while preparing or opening the output.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No output path is configured at all.
    #[error("no output path configured")]
    NoCandidates,

    /// The named pipe could not be created.
    #[error("failed to create named pipe at {}: {source}", path.display())]
    FifoCreate {
        /// Path the pipe was to be created at.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The output could not be opened for writing.
    #[error("failed to open {} for writing: {source}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// What [`prepare_output`] found or did at the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    /// Something already exists at the path.
    Existing {
        /// Whether the existing file is a named pipe.
        is_fifo: bool,
    },
    /// A named pipe was created.
    Created,
    /// The path is missing and pipe creation is disabled.
    Missing,
}

/// Expand a leading `~` to `home`. Other paths are returned unchanged.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

/// Pick the first candidate whose parent directory exists, else the last.
///
/// Returns `None` only if `candidates` is empty.
pub fn select_candidate(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|p| parent_exists(p))
        .or_else(|| candidates.last())
        .cloned()
}

fn parent_exists(path: &Path) -> bool {
    path.parent()
        .is_some_and(|parent| parent.as_os_str().is_empty() || parent.is_dir())
}

/// Resolve the output path from configuration, expanding `~` with `$HOME`.
///
/// # Errors
///
/// Returns [`TransportError::NoCandidates`] if neither a fixed path nor any
/// candidate is configured.
pub fn resolve_output_path(config: &OutputConfig) -> Result<PathBuf, TransportError> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let home = home.as_deref();

    if let Some(fixed) = &config.path {
        return Ok(expand_home(fixed, home));
    }

    let candidates: Vec<PathBuf> = config
        .candidate_paths
        .iter()
        .map(|c| expand_home(c, home))
        .collect();
    select_candidate(&candidates).ok_or(TransportError::NoCandidates)
}

/// Make sure something writable can be opened at `path`.
///
/// An existing file of any type is left alone. A missing path becomes a
/// named pipe (mode `0644`) when `create_fifo` is set.
///
/// # Errors
///
/// Returns [`TransportError::FifoCreate`] if the pipe cannot be created.
/// Callers treat this as non-fatal.
pub fn prepare_output(path: &Path, create_fifo: bool) -> Result<OutputStatus, TransportError> {
    if let Ok(meta) = std::fs::symlink_metadata(path) {
        return Ok(OutputStatus::Existing {
            is_fifo: is_fifo(&meta),
        });
    }
    if !create_fifo {
        return Ok(OutputStatus::Missing);
    }
    make_fifo(path).map_err(|source| TransportError::FifoCreate {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(OutputStatus::Created)
}

/// Open `path` for writing, appending if it is a regular file.
///
/// Opening a named pipe blocks until a reader opens the other end.
///
/// # Errors
///
/// Returns [`TransportError::Open`] on failure.
pub fn open_output(path: &Path) -> Result<File, TransportError> {
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// [`open_output`] on the blocking thread pool, so callers can race it
/// against a shutdown signal while waiting for a pipe reader.
///
/// # Errors
///
/// Returns [`TransportError::Open`] on failure.
pub async fn open_output_blocking(path: PathBuf) -> Result<File, TransportError> {
    let join_path = path.clone();
    tokio::task::spawn_blocking(move || open_output(&path))
        .await
        .map_err(|e| TransportError::Open {
            path: join_path,
            source: io::Error::other(e.to_string()),
        })?
}

/// Unblock an [`open_output_blocking`] call still waiting for a pipe reader
/// by briefly opening the read end ourselves.
///
/// Used on shutdown so the blocking thread can finish. Does nothing useful
/// for regular files, and errors are ignored.
#[cfg(unix)]
pub fn release_pending_open(path: &Path) {
    use std::os::unix::fs::OpenOptionsExt;

    use nix::fcntl::OFlag;

    let _ = OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path);
}

/// No-op where named pipes are unsupported.
#[cfg(not(unix))]
pub fn release_pending_open(_path: &Path) {}

#[cfg(unix)]
fn is_fifo(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    meta.file_type().is_fifo()
}

#[cfg(not(unix))]
fn is_fifo(_meta: &std::fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn make_fifo(path: &Path) -> io::Result<()> {
    use nix::sys::stat::Mode;

    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    nix::unistd::mkfifo(path, mode).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn make_fifo(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "named pipes are only supported on unix",
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn expands_tilde_prefix() {
        let home = Path::new("/home/engineer");
        assert_eq!(
            expand_home("~/factorio/events.pipe", Some(home)),
            PathBuf::from("/home/engineer/factorio/events.pipe")
        );
        assert_eq!(expand_home("~", Some(home)), PathBuf::from("/home/engineer"));
        assert_eq!(
            expand_home("/tmp/events.pipe", Some(home)),
            PathBuf::from("/tmp/events.pipe")
        );
        // `~user` forms and a missing HOME are left untouched.
        assert_eq!(expand_home("~other/x", Some(home)), PathBuf::from("~other/x"));
        assert_eq!(expand_home("~/x", None), PathBuf::from("~/x"));
    }

    #[test]
    fn selects_first_candidate_with_existing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("events.pipe");
        let present = dir.path().join("events.pipe");
        let other = dir.path().join("other.pipe");
        let chosen = select_candidate(&[missing, present.clone(), other]).unwrap();
        assert_eq!(chosen, present);
    }

    #[test]
    fn falls_back_to_last_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a").join("events.pipe");
        let b = dir.path().join("b").join("events.pipe");
        assert_eq!(select_candidate(&[a, b.clone()]).unwrap(), b);
        assert!(select_candidate(&[]).is_none());
    }

    #[test]
    fn fixed_path_bypasses_probing() {
        let config = OutputConfig {
            path: Some("/definitely/not/here/events.pipe".to_owned()),
            candidate_paths: vec!["/tmp/events.pipe".to_owned()],
            create_fifo: true,
        };
        assert_eq!(
            resolve_output_path(&config).unwrap(),
            PathBuf::from("/definitely/not/here/events.pipe")
        );
    }

    #[test]
    fn no_candidates_is_an_error() {
        let config = OutputConfig {
            path: None,
            candidate_paths: Vec::new(),
            create_fifo: true,
        };
        assert!(matches!(
            resolve_output_path(&config),
            Err(TransportError::NoCandidates)
        ));
    }

    #[test]
    fn existing_regular_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, b"").unwrap();
        let status = prepare_output(&path, true).unwrap();
        assert_eq!(status, OutputStatus::Existing { is_fifo: false });
    }

    #[test]
    fn missing_path_without_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.pipe");
        assert_eq!(prepare_output(&path, false).unwrap(), OutputStatus::Missing);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn creates_named_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.pipe");
        assert_eq!(prepare_output(&path, true).unwrap(), OutputStatus::Created);
        assert_eq!(
            prepare_output(&path, true).unwrap(),
            OutputStatus::Existing { is_fifo: true }
        );
    }

    #[test]
    fn fifo_creation_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-parent").join("events.pipe");
        let result = prepare_output(&path, true);
        assert!(matches!(result, Err(TransportError::FifoCreate { .. })));
    }

    #[test]
    fn opens_regular_file_in_append_mode() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, b"first\n").unwrap();
        {
            let mut file = open_output(&path).unwrap();
            file.write_all(b"second\n").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pending_pipe_open_can_be_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.pipe");
        prepare_output(&path, true).unwrap();

        let pending = tokio::spawn(open_output_blocking(path.clone()));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        // Retry in case the blocking open had not started yet.
        for _ in 0..200 {
            release_pending_open(&path);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if pending.is_finished() {
                break;
            }
        }
        let file = pending.await.unwrap();
        assert!(file.is_ok());
    }

    #[tokio::test]
    async fn blocking_open_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-parent").join("events.jsonl");
        let result = open_output_blocking(path).await;
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }
}
