//! [`MediaEngine`] backed by the system `ffmpeg` binary.
//!
//! A private temporary directory stands in for the virtual filesystem; every command runs
//! with that directory as its working directory, so plan file names resolve inside it.

use std::{
    path::{Component, Path, PathBuf},
    process::Stdio,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    execute::engine::MediaEngine,
    foundation::error::{ClipforgeError, ClipforgeResult},
};

const STDERR_TAIL_LINES: usize = 8;

struct Loaded {
    program: PathBuf,
    root: tempfile::TempDir,
}

/// Local ffmpeg engine.
pub struct NativeFfmpegEngine {
    probe: bool,
    state: Mutex<Option<Arc<Loaded>>>,
}

impl Default for NativeFfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NativeFfmpegEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFfmpegEngine")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl NativeFfmpegEngine {
    /// An unloaded engine that checks the binary with `-version` on load.
    pub fn new() -> Self {
        Self {
            probe: true,
            state: Mutex::new(None),
        }
    }

    /// Skip the `-version` check on load.
    pub fn without_probe(mut self) -> Self {
        self.probe = false;
        self
    }

    /// Host directory backing the engine filesystem, while loaded.
    pub fn root(&self) -> Option<PathBuf> {
        self.loaded().ok().map(|l| l.root.path().to_path_buf())
    }

    fn loaded(&self) -> ClipforgeResult<Arc<Loaded>> {
        let guard = self
            .state
            .lock()
            .map_err(|_| ClipforgeError::engine("engine state lock poisoned"))?;
        guard
            .clone()
            .ok_or_else(|| ClipforgeError::engine("engine is not loaded"))
    }
}

/// Map an engine file name to a host path under `root`. Only plain relative names are allowed.
pub(crate) fn resolve_in(root: &Path, name: &str) -> ClipforgeResult<PathBuf> {
    let rel = Path::new(name.trim_start_matches('/'));
    let plain = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(ClipforgeError::engine(format!(
            "path {name:?} escapes the engine filesystem"
        )));
    }
    Ok(root.join(rel))
}

/// Whether `program -version` runs successfully.
pub async fn ffmpeg_available(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl MediaEngine for NativeFfmpegEngine {
    async fn load(&self, source: &str) -> ClipforgeResult<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let program = if source.trim().is_empty() {
            "ffmpeg"
        } else {
            source.trim()
        };
        if self.probe && !ffmpeg_available(program).await {
            return Err(ClipforgeError::engine(format!(
                "ffmpeg binary {program:?} is not runnable"
            )));
        }
        let root = tempfile::Builder::new()
            .prefix("clipforge-")
            .tempdir()
            .map_err(|e| ClipforgeError::engine(format!("failed to create engine directory: {e}")))?;
        tracing::debug!(program, root = %root.path().display(), "native engine loaded");

        let mut guard = self
            .state
            .lock()
            .map_err(|_| ClipforgeError::engine("engine state lock poisoned"))?;
        *guard = Some(Arc::new(Loaded {
            program: PathBuf::from(program),
            root,
        }));
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.state.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    async fn write_file(&self, path: &str, bytes: &[u8]) -> ClipforgeResult<()> {
        let loaded = self.loaded()?;
        let target = resolve_in(loaded.root.path(), path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClipforgeError::engine(format!("mkdir for {path}: {e}")))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| ClipforgeError::engine(format!("write {path}: {e}")))
    }

    async fn read_file(&self, path: &str) -> ClipforgeResult<Vec<u8>> {
        let loaded = self.loaded()?;
        let target = resolve_in(loaded.root.path(), path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|e| ClipforgeError::engine(format!("read {path}: {e}")))
    }

    async fn exec(&self, argv: &[String]) -> ClipforgeResult<()> {
        let loaded = self.loaded()?;
        let output = Command::new(&loaded.program)
            .args(["-hide_banner", "-nostdin", "-y"])
            .args(argv)
            .current_dir(loaded.root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ClipforgeError::engine(format!("failed to spawn ffmpeg: {e}")))?;

        if output.status.success() {
            return Ok(());
        }
        let tail = stderr_tail(&output.stderr);
        Err(ClipforgeError::engine(if tail.is_empty() {
            format!("ffmpeg exited with {}", output.status)
        } else {
            tail
        }))
    }

    async fn delete_file(&self, path: &str) -> ClipforgeResult<()> {
        let loaded = self.loaded()?;
        let target = resolve_in(loaded.root.path(), path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClipforgeError::engine(format!("delete {path}: {e}"))),
        }
    }

    async fn list_dir(&self, dir: &str) -> ClipforgeResult<Vec<String>> {
        let loaded = self.loaded()?;
        let target = resolve_in(loaded.root.path(), dir)?;
        let mut entries = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| ClipforgeError::engine(format!("list {dir}: {e}")))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ClipforgeError::engine(format!("list {dir}: {e}")))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn terminate(&self) -> ClipforgeResult<()> {
        let taken = self
            .state
            .lock()
            .map_err(|_| ClipforgeError::engine("engine state lock poisoned"))?
            .take();
        if let Some(loaded) = taken {
            tracing::debug!(root = %loaded.root.path().display(), "native engine terminated");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/execute/native.rs"]
mod tests;
