use std::path::{Path, PathBuf};

use crate::foundation::error::{ConvertError, ConvertResult};

const WORKSPACE_PREFIX: &str = "tgsconv-";

/// Scratch directory owned by exactly one conversion request.
///
/// Layout:
///
/// ```text
/// tgsconv-XXXXXX/
///   animation.json    decoded description
///   player.html       host page
///   frames/           frame_<i>.png
///   intermediate.gif  GIF feeding WebP/MP4 targets
/// ```
///
/// [`Workspace::cleanup`] is idempotent and also runs on drop, so the directory is released on
/// every exit path.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<tempfile::TempDir>,
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace under the system temp directory.
    pub fn create() -> ConvertResult<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Create a workspace under `parent`, creating `parent` if needed.
    pub fn create_in(parent: &Path) -> ConvertResult<Self> {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConvertError::io_at("create work root", parent, e))?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| ConvertError::io_at("create workspace in", parent, e))?;
        let root = dir.path().to_path_buf();
        tracing::debug!(root = %root.display(), "workspace created");
        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn animation_json_path(&self) -> PathBuf {
        self.root.join("animation.json")
    }

    pub fn page_path(&self) -> PathBuf {
        self.root.join("player.html")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn gif_path(&self) -> PathBuf {
        self.root.join("intermediate.gif")
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.dir.is_none()
    }

    pub fn ensure_frames_dir(&self) -> ConvertResult<PathBuf> {
        if self.is_cleaned_up() {
            return Err(ConvertError::validation("workspace was already cleaned up"));
        }
        let dir = self.frames_dir();
        std::fs::create_dir_all(&dir).map_err(|e| ConvertError::io_at("create frames dir", &dir, e))?;
        Ok(dir)
    }

    /// Remove the decoded description, the frames and the workspace itself.
    ///
    /// Entries that are already gone count as removed. Failures are logged, never returned.
    pub fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        remove_file_if_present(&self.animation_json_path());
        remove_dir_if_present(&self.frames_dir());

        match dir.close() {
            Ok(()) => tracing::debug!(root = %self.root.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(root = %self.root.display(), error = %e, "workspace cleanup failed"),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn remove_file_if_present(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "deleted"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "delete failed"),
    }
}

fn remove_dir_if_present(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "deleted"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "delete failed"),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/workspace.rs"]
mod tests;
