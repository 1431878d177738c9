use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;

use super::elf::ElfSymbols;

const CAPACITY: usize = 256;

/// Symbol tables per object path. Failed loads are cached as `None`.
#[derive(Debug)]
pub struct ModuleCache(LruCache<String, Option<Arc<ElfSymbols>>>);

impl Default for ModuleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleCache {
    pub fn new() -> Self {
        Self(LruCache::new(NonZeroUsize::new(CAPACITY).unwrap_or(NonZeroUsize::MIN)))
    }

    pub fn resolve(&mut self, path: &str) -> Option<Arc<ElfSymbols>> {
        if let Some(ret) = self.0.get(path) {
            return ret.clone();
        }

        let ret = match ElfSymbols::from_path(path) {
            Ok(symbols) => Some(Arc::new(symbols)),
            Err(e) => {
                tracing::debug!("unable to load symbols from {path}: {e:#}");
                None
            }
        };
        self.0.put(path.to_string(), ret.clone());
        ret
    }
}
