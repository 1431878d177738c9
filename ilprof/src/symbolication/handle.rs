use std::{fmt::Debug, sync::Arc};

use fxhash::FxHashSet;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

/// Modules whose symbols could not be loaded. Lives for the whole process.
static MISSING_SYMBOLS: Lazy<RwLock<FxHashSet<Arc<str>>>> =
    Lazy::new(|| RwLock::new(FxHashSet::default()));

/// Resolves a code address inside a module to a method name
pub trait SymbolResolver: Send + Sync {
    /// Returns `None` when no symbol covers the address.
    fn resolve(&self, module: &str, address: u64) -> Option<String>;
}

pub fn is_module_missing(module: &str) -> bool {
    MISSING_SYMBOLS.read().contains(module)
}

/// Returns true if this call recorded the module as missing
pub fn mark_module_missing(module: &Arc<str>) -> bool {
    MISSING_SYMBOLS.write().insert(Arc::clone(module))
}

/// Deferred name lookup for a sampled address
#[derive(Clone)]
pub struct SymbolHandle {
    address: u64,
    hint: Arc<str>,
    module: Option<Arc<str>>,
    resolver: Option<Arc<dyn SymbolResolver>>,
    name: OnceCell<Arc<str>>,
}

impl Debug for SymbolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolHandle")
            .field("address", &format_args!("{:#x}", self.address))
            .field("hint", &self.hint)
            .field("module", &self.module)
            .finish()
    }
}

impl SymbolHandle {
    pub fn new(
        address: u64,
        hint: &str,
        module: Option<&str>,
        resolver: Option<Arc<dyn SymbolResolver>>,
    ) -> Self {
        Self {
            address,
            hint: Arc::from(hint),
            module: module.map(Arc::from),
            resolver,
            name: OnceCell::new(),
        }
    }

    /// handle that only ever reports its hint
    pub fn unresolved(address: u64, hint: &str) -> Self {
        Self::new(address, hint, None, None)
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Display name of the method, empty when nothing is known about it
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| self.lookup())
    }

    fn lookup(&self) -> Arc<str> {
        if !self.hint.is_empty() {
            return Arc::clone(&self.hint);
        }

        let (Some(module), Some(resolver)) = (&self.module, &self.resolver) else {
            return Arc::clone(&self.hint);
        };

        if is_module_missing(module) {
            return Arc::clone(&self.hint);
        }

        match resolver.resolve(module, self.address) {
            Some(name) => Arc::from(name),
            None => {
                if mark_module_missing(module) {
                    tracing::debug!("no symbols for module {module}");
                }
                Arc::clone(&self.hint)
            }
        }
    }
}
