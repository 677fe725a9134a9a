//! Scoped on-disk workspace for one pipeline run.
//!
//! Video and audio land in a temp directory keyed by submission id; the
//! directory is removed when the workspace drops, on every exit path —
//! success, policy-skip, and error alike.

use std::path::PathBuf;

use tempfile::TempDir;
use uuid::Uuid;

use clipfund_common::{EngineError, EngineResult};

pub struct SubmissionWorkspace {
    dir: TempDir,
}

impl SubmissionWorkspace {
    pub fn create(submission_id: Uuid) -> EngineResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("submission-{submission_id}-"))
            .tempdir()
            .map_err(|e| EngineError::external("temp storage", e))?;
        Ok(Self { dir })
    }

    pub fn video_path(&self) -> PathBuf {
        self.dir.path().join("input.mp4")
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.path().join("audio.wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_removed_on_drop() {
        let ws = SubmissionWorkspace::create(Uuid::new_v4()).unwrap();
        let root = ws.dir.path().to_path_buf();
        std::fs::write(ws.video_path(), b"fake video").unwrap();
        assert!(root.exists());

        drop(ws);
        assert!(!root.exists());
    }
}
