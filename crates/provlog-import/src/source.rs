//! Module sources: the default finder at the end of the chain.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use provlog_core::value::ObjectRef;

use crate::error::ImportError;
use crate::resolver::{ModuleLoader, ModuleResolver};

pub type ModuleFactory = Arc<dyn Fn() -> Result<ObjectRef, ImportError> + Send + Sync>;

/// Builds modules from registered factories. Each load constructs a fresh
/// instance; caching is the import system's job.
#[derive(Default)]
pub struct ModuleSource {
    factories: RwLock<BTreeMap<String, ModuleFactory>>,
}

impl ModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, module: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<ObjectRef, ImportError> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.into(), Arc::new(factory));
    }

    pub fn with<F>(self, module: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<ObjectRef, ImportError> + Send + Sync + 'static,
    {
        self.register(module, factory);
        self
    }

    fn factory(&self, module: &str) -> Option<ModuleFactory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module)
            .cloned()
    }
}

impl ModuleResolver for ModuleSource {
    fn name(&self) -> &str {
        "module-source"
    }

    fn can_handle(&self, module: &str) -> bool {
        self.factory(module).is_some()
    }

    fn load(&self, module: &str, _next: &ModuleLoader<'_>) -> Result<ObjectRef, ImportError> {
        let factory = self
            .factory(module)
            .ok_or_else(|| ImportError::ModuleNotFound(module.to_string()))?;
        factory()
    }
}
