//! Loaded theme module registry.
//!
//! Theme modules are parsed once and shared until the next rebuild purges
//! the registry. The watch session owns one cache and hands it to the
//! compiler, so invalidation and loading always see the same registry.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::theme::{ThemeDefinition, ThemeError};

#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: Mutex<FxHashMap<PathBuf, Arc<ThemeDefinition>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached module for `path`, loading it on a miss.
    pub fn load(&self, path: &Path) -> Result<Arc<ThemeDefinition>, ThemeError> {
        if let Some(hit) = self.modules.lock().get(path) {
            return Ok(Arc::clone(hit));
        }

        // Parse outside the lock; a concurrent loader of the same path just
        // overwrites with an equal value.
        let theme = Arc::new(ThemeDefinition::load(path)?);
        self.modules
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&theme));
        Ok(theme)
    }

    /// Drop every loaded module. Safe on an empty cache.
    pub fn invalidate(&self) {
        let mut modules = self.modules.lock();
        if !modules.is_empty() {
            crate::trace!("cache"; "invalidated {} module(s)", modules.len());
        }
        modules.clear();
    }

    pub fn len(&self) -> usize {
        self.modules.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.lock().is_empty()
    }
}
