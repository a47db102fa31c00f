// src/exec/staging.rs

//! Temporary on-disk scripts for code and commands supplied as text.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::telemetry::{EventSink, LogLevel, emit};

const ARTIFACT_PREFIX: &str = "execdesk_";

/// A staged script, owned by one execution.
///
/// Pass it back to [`ScriptStager::release`] when the run is over. If it is
/// dropped instead (the owning future was dropped or panicked), the file is
/// still removed, just without reporting.
#[derive(Debug)]
pub struct TransientArtifact {
    path: TempPath,
    created_at: DateTime<Utc>,
}

impl TransientArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Creates and removes [`TransientArtifact`]s in one directory.
#[derive(Clone)]
pub struct ScriptStager {
    dir: PathBuf,
    sink: Arc<dyn EventSink>,
}

impl ScriptStager {
    pub fn new(dir: impl Into<PathBuf>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            dir: dir.into(),
            sink,
        }
    }

    /// Stage into the platform temporary directory.
    pub fn in_temp_dir(sink: Arc<dyn EventSink>) -> Self {
        Self::new(std::env::temp_dir(), sink)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` to a fresh, uniquely named file ending in `suffix`.
    ///
    /// On a write error the partially written file is removed before
    /// returning.
    pub fn stage(&self, content: &str, suffix: &str) -> std::io::Result<TransientArtifact> {
        let mut file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(suffix)
            .rand_bytes(16)
            .tempfile_in(&self.dir)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        // Closes our handle so the interpreter can open the file on Windows.
        let path = file.into_temp_path();
        debug!(path = %path.display(), bytes = content.len(), "script staged");

        Ok(TransientArtifact {
            path,
            created_at: Utc::now(),
        })
    }

    /// Delete the artifact. Failure is logged at warn and otherwise ignored.
    pub fn release(&self, artifact: TransientArtifact) {
        let shown = artifact.path.display().to_string();
        match artifact.path.close() {
            Ok(()) => debug!(path = %shown, "staged script removed"),
            Err(err) => {
                warn!(path = %shown, error = %err, "failed to remove staged script");
                emit(
                    self.sink.as_ref(),
                    LogLevel::Warn,
                    &format!("failed to clean up temporary file {shown}: {err}"),
                );
            }
        }
    }
}
