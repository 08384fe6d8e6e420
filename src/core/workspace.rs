// src/core/workspace.rs — The mutable file set under refinement

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::core::types::EditBatch;
use crate::infra::errors::PipefixError;

/// Shared handle to a workspace. The run owns the workspace exclusively;
/// aliased handles exist only so per-subtask slots can fall back to the
/// experiment-level workspace under a single-writer discipline.
pub type SharedWorkspace = Arc<Mutex<Workspace>>;

/// Lock a shared workspace, surfacing poisoning as a typed error.
pub fn lock_workspace(ws: &SharedWorkspace) -> Result<MutexGuard<'_, Workspace>, PipefixError> {
    ws.lock().map_err(|_| PipefixError::WorkspaceLock)
}

/// A mapping from relative file path to content, optionally mirrored to a
/// directory on disk. Keys are stable across iterations: injection creates or
/// overwrites entries, never deletes them.
#[derive(Debug, Default)]
pub struct Workspace {
    root: Option<PathBuf>,
    files: BTreeMap<String, String>,
    running_duration: Option<Duration>,
}

impl Workspace {
    /// In-memory workspace from an initial file set.
    pub fn from_files(files: BTreeMap<String, String>) -> Self {
        Self {
            root: None,
            files,
            running_duration: None,
        }
    }

    /// Load a workspace from a directory on disk.
    ///
    /// Every UTF-8 regular file below `root` becomes an entry keyed by its
    /// `/`-separated relative path. Hidden files and non-text files are
    /// skipped; they are artifacts, not refinable sources.
    pub fn load(root: &Path) -> Result<Self, PipefixError> {
        let mut files = BTreeMap::new();
        collect_files(root, root, &mut files)?;
        Ok(Self {
            root: Some(root.to_path_buf()),
            files,
            running_duration: None,
        })
    }

    pub fn into_shared(self) -> SharedWorkspace {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Create or overwrite entries for every path in the batch, mirroring the
    /// change to disk when the workspace has a root.
    pub fn inject_files(&mut self, batch: &EditBatch) -> Result<(), PipefixError> {
        for (path, content) in batch {
            if let Some(ref root) = self.root {
                let target = root.join(path);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&target, content)?;
            }
            self.files.insert(path.clone(), content.clone());
        }
        Ok(())
    }

    /// All file contents rendered for a prompt, one fenced block per file.
    pub fn all_code(&self) -> String {
        let mut out = String::new();
        for (path, content) in &self.files {
            out.push_str(&format!("### {path}\n```\n{content}\n```\n\n"));
        }
        out
    }

    /// Content-addressable fingerprint over the sorted file set.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in &self.files {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update(content.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Read an artifact produced by executing the workspace.
    ///
    /// Disk wins over the in-memory map: artifacts are written by the sandbox,
    /// not injected through the refinement path.
    pub fn read_artifact(&self, rel: &str) -> Option<String> {
        if let Some(ref root) = self.root {
            if let Ok(text) = std::fs::read_to_string(root.join(rel)) {
                return Some(text);
            }
        }
        self.files.get(rel).cloned()
    }

    pub fn set_running_duration(&mut self, duration: Duration) {
        self.running_duration = Some(duration);
    }

    pub fn running_duration(&self) -> Option<Duration> {
        self.running_duration
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    files: &mut BTreeMap<String, String>,
) -> Result<(), PipefixError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(content) = std::fs::read_to_string(&path) {
            let rel = path
                .strip_prefix(root)
                .map_err(|e| PipefixError::Invariant(format!("path outside root: {e}")))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(rel, content);
        }
    }
    Ok(())
}
