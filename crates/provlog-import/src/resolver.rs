//! Resolver chain and module cache.
//!
//! Ordering contract: `prepend_resolver` puts a resolver ahead of everything
//! registered so far (hooks go here), `append_resolver` puts it last (module
//! sources go here). A resolver that delegates is handed a `ModuleLoader`
//! over the part of the chain strictly after itself, so it can never be
//! asked to resolve its own module again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use provlog_core::value::ObjectRef;

use crate::error::ImportError;

pub trait ModuleResolver: Send + Sync {
    /// Stable name for diagnostics.
    fn name(&self) -> &str;

    /// Whether this resolver owns `module`.
    fn can_handle(&self, module: &str) -> bool;

    /// Produce the module. `next` continues resolution after this resolver.
    fn load(&self, module: &str, next: &ModuleLoader<'_>) -> Result<ObjectRef, ImportError>;

    /// Whether `module` has been instrumented by this resolver.
    fn is_patched(&self, _module: &str) -> bool {
        false
    }

    /// Called once when the resolver is inserted into a chain.
    fn on_registered(&self) {}
}

/// Resolution over a slice of the chain.
pub struct ModuleLoader<'a> {
    chain: &'a [Arc<dyn ModuleResolver>],
}

impl<'a> ModuleLoader<'a> {
    pub fn new(chain: &'a [Arc<dyn ModuleResolver>]) -> Self {
        Self { chain }
    }

    /// Ask each resolver in order; the first owner loads `module`.
    pub fn load(&self, module: &str) -> Result<ObjectRef, ImportError> {
        for (i, resolver) in self.chain.iter().enumerate() {
            if resolver.can_handle(module) {
                tracing::trace!(module, resolver = resolver.name(), "resolving");
                let rest = ModuleLoader::new(&self.chain[i + 1..]);
                return resolver.load(module, &rest);
            }
        }
        Err(ImportError::ModuleNotFound(module.to_string()))
    }
}

#[derive(Default)]
pub struct ImportSystem {
    resolvers: RwLock<Vec<Arc<dyn ModuleResolver>>>,
    cache: Mutex<HashMap<String, ObjectRef>>,
}

impl ImportSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend_resolver(&self, resolver: Arc<dyn ModuleResolver>) {
        resolver.on_registered();
        self.resolvers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, resolver);
    }

    pub fn append_resolver(&self, resolver: Arc<dyn ModuleResolver>) {
        resolver.on_registered();
        self.resolvers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(resolver);
    }

    pub fn resolver_names(&self) -> Vec<String> {
        self.resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Import `module`: cached instance if present, else resolve through the
    /// chain and cache the result. Failures leave the cache untouched.
    pub fn import(&self, module: &str) -> Result<ObjectRef, ImportError> {
        if let Some(m) = self.cached(module) {
            return Ok(m);
        }
        // Snapshot so resolvers may import (or register) without deadlocking.
        let chain: Vec<Arc<dyn ModuleResolver>> = self
            .resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let loaded = ModuleLoader::new(&chain).load(module)?;
        // A nested import of the same name may have cached an unpatched
        // instance meanwhile; the outermost result wins.
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.to_string(), loaded.clone());
        Ok(loaded)
    }

    pub fn cached(&self, module: &str) -> Option<ObjectRef> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module)
            .cloned()
    }

    /// Drop `module` from the cache. Hooks keep their patched instance, so a
    /// later import still returns it without re-patching.
    pub fn evict(&self, module: &str) -> Option<ObjectRef> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(module)
    }

    pub fn is_patched(&self, module: &str) -> bool {
        self.resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|r| r.is_patched(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ModuleSource;

    struct Fixed(&'static str);

    impl ModuleResolver for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn can_handle(&self, module: &str) -> bool {
            module == "shared"
        }
        fn load(&self, _module: &str, _next: &ModuleLoader<'_>) -> Result<ObjectRef, ImportError> {
            Ok(ObjectRef::module(self.0))
        }
    }

    #[test]
    fn first_owner_in_chain_wins() {
        let sys = ImportSystem::new();
        sys.append_resolver(Arc::new(Fixed("appended")));
        sys.prepend_resolver(Arc::new(Fixed("prepended")));
        assert_eq!(sys.resolver_names(), vec!["prepended", "appended"]);
        assert_eq!(sys.import("shared").unwrap().name(), "prepended");
    }

    #[test]
    fn unknown_modules_are_not_found() {
        let sys = ImportSystem::new();
        sys.append_resolver(Arc::new(ModuleSource::new()));
        assert_eq!(
            sys.import("nope").unwrap_err(),
            ImportError::ModuleNotFound("nope".into())
        );
        assert!(sys.cached("nope").is_none());
    }

    #[test]
    fn imports_are_cached() {
        let src = ModuleSource::new();
        src.register("m", || Ok(ObjectRef::module("m")));
        let sys = ImportSystem::new();
        sys.append_resolver(Arc::new(src));
        let a = sys.import("m").unwrap();
        let b = sys.import("m").unwrap();
        assert!(a.ptr_eq(&b));
        sys.evict("m");
        assert!(!sys.import("m").unwrap().ptr_eq(&a));
    }
}
