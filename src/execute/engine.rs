use async_trait::async_trait;

use crate::foundation::error::ClipforgeResult;

/// Media-processing engine with its own file namespace.
///
/// Paths are names in the engine's virtual filesystem, never host paths. One engine instance
/// must not be shared by concurrent plans.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Initialize from `source` (a module URL, binary path or program name, per engine).
    async fn load(&self, source: &str) -> ClipforgeResult<()>;

    /// Whether [`MediaEngine::load`] has succeeded.
    fn is_loaded(&self) -> bool;

    /// Write `bytes` to `path`, replacing any existing file.
    async fn write_file(&self, path: &str, bytes: &[u8]) -> ClipforgeResult<()>;

    /// Read `path` back.
    async fn read_file(&self, path: &str) -> ClipforgeResult<Vec<u8>>;

    /// Run one command. Errors carry the engine's message verbatim.
    async fn exec(&self, argv: &[String]) -> ClipforgeResult<()>;

    /// Remove `path`.
    async fn delete_file(&self, path: &str) -> ClipforgeResult<()>;

    /// Names of the files under `dir`.
    async fn list_dir(&self, dir: &str) -> ClipforgeResult<Vec<String>>;

    /// Release the engine. A later `load` may bring it back.
    async fn terminate(&self) -> ClipforgeResult<()>;
}
