use std::{
    fs,
    path::{Path, PathBuf},
};

use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Keeps every desired directory attached to the watcher.
///
/// Directories missing at startup are attached once they appear; roots that
/// vanish are dropped and re-attached when recreated.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    /// Attach roots that exist right now. Returns the ones still missing.
    pub(super) fn attach_existing<W: Watcher>(&mut self, watcher: &mut W) -> notify::Result<Vec<PathBuf>> {
        let mut missing = Vec::new();
        for path in &self.desired {
            if !path.is_dir() {
                missing.push(path.clone());
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive)?;
            self.attached.insert(path.clone());
        }

        Ok(missing)
    }

    /// Re-check missing roots. Returns the roots attached by this call.
    pub(super) fn maintain<W: Watcher>(&mut self, watcher: &mut W) -> Vec<PathBuf> {
        self.attached.retain(|path| path.is_dir());

        let mut attached = Vec::new();
        for path in &self.desired {
            if self.attached.contains(path) || !path.is_dir() {
                continue;
            }

            if watcher.watch(path, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "attached late directory: {}", path.display());
                attached.push(path.clone());
            }
        }

        attached
    }

    #[cfg(test)]
    pub(super) fn is_attached(&self, path: &Path) -> bool {
        self.attached.contains(path)
    }
}

/// Every regular file under `dir`, depth first, sorted per directory.
pub(super) fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        let mut entries: Vec<_> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
        entries.sort();

        for path in entries {
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }

    files
}
