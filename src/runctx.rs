//! Run-scoped temporary resources.
//!
//! Each render invocation owns exactly one [`RunContext`]: a uniquely named
//! directory under a per-crate temp root plus the scratch files created
//! inside it (one per text layer). Nothing is shared or reused across
//! invocations, so concurrent runs never collide. Removal happens on every
//! exit path; removal failures are logged, never escalated.

use crate::config::RenderConfig;
use crate::foundation::error::FfrenderResult;
use anyhow::Context as _;
use std::path::{Path, PathBuf};

/// Directory name under the temp root that namespaces this crate's runs.
const TEMP_NAMESPACE: &str = "ffrender";

/// Scratch state exclusively owned by one render invocation.
///
/// Dropping the context unlinks every scratch file (best-effort) and then
/// removes the run directory recursively, regardless of how the invocation
/// ended.
#[derive(Debug)]
pub struct RunContext {
    dir: Option<tempfile::TempDir>,
    path: PathBuf,
    scratch: Vec<PathBuf>,
}

impl RunContext {
    /// Allocate a fresh uniquely named run directory under
    /// `<temp root>/ffrender`, creating the root first when missing.
    pub fn create(config: &RenderConfig) -> FfrenderResult<Self> {
        let root = config
            .temp_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join(TEMP_NAMESPACE);
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create temp root '{}'", root.display()))?;
        let dir = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(&root)
            .with_context(|| format!("create run directory under '{}'", root.display()))?;
        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
            scratch: Vec::new(),
        })
    }

    /// The run directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `content` to a fresh scratch file inside the run directory and
    /// return its path. Files are numbered in creation order.
    pub fn create_text_file(&mut self, content: &str) -> FfrenderResult<PathBuf> {
        let path = self.path.join(format!("text-{}.txt", self.scratch.len()));
        std::fs::write(&path, content)
            .with_context(|| format!("write text scratch file '{}'", path.display()))?;
        self.scratch.push(path.clone());
        Ok(path)
    }

    /// Number of scratch files created so far.
    pub fn scratch_count(&self) -> usize {
        self.scratch.len()
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        for file in self.scratch.drain(..) {
            if let Err(err) = std::fs::remove_file(&file) {
                tracing::warn!(file = %file.display(), %err, "failed to remove scratch file");
            }
        }
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                tracing::warn!(dir = %path.display(), %err, "failed to remove run directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> (RenderConfig, PathBuf) {
        let root = std::env::temp_dir().join(format!(
            "ffrender_runctx_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let cfg = RenderConfig {
            temp_root: Some(root.clone()),
            ..RenderConfig::default()
        };
        (cfg, root)
    }

    #[test]
    fn run_dir_is_namespaced_and_removed_on_drop() {
        let (cfg, root) = test_config();
        let run = RunContext::create(&cfg).unwrap();
        let run_path = run.path().to_path_buf();
        assert!(run_path.starts_with(root.join("ffrender")));
        assert!(run_path.is_dir());
        drop(run);
        assert!(!run_path.exists());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn scratch_files_are_numbered_and_cleaned_up() {
        let (cfg, root) = test_config();
        let mut run = RunContext::create(&cfg).unwrap();
        let a = run.create_text_file("hello").unwrap();
        let b = run.create_text_file("world").unwrap();
        assert!(a.ends_with("text-0.txt"));
        assert!(b.ends_with("text-1.txt"));
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "hello");
        assert_eq!(run.scratch_count(), 2);
        drop(run);
        assert!(!a.exists());
        assert!(!b.exists());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn concurrent_runs_get_distinct_directories() {
        let (cfg, root) = test_config();
        let a = RunContext::create(&cfg).unwrap();
        let b = RunContext::create(&cfg).unwrap();
        assert_ne!(a.path(), b.path());
        drop(a);
        drop(b);
        std::fs::remove_dir_all(&root).unwrap();
    }
}
