//! Typed engine registry.
//!
//! The harness owns a registry and asks it for a fresh engine per job.
//! Nothing registers itself implicitly; `with_builtin` lists the engines this
//! crate ships.

use std::collections::BTreeMap;

use super::net::{self, NetEngine};
use super::IoEngine;
use crate::error::{EngineError, EngineResult};

/// Constructor for a boxed engine instance.
pub type EngineFactory = fn() -> Box<dyn IoEngine>;

/// Name → factory map used to dispatch jobs to engines.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    factories: BTreeMap<&'static str, EngineFactory>,
}

fn new_net_engine() -> Box<dyn IoEngine> {
    Box::new(NetEngine::new())
}

impl EngineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the engines built into this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(net::NAME, new_net_engine);
        registry
    }

    /// Registers a factory, returning the one it replaced.
    pub fn register(&mut self, name: &'static str, factory: EngineFactory) -> Option<EngineFactory> {
        self.factories.insert(name, factory)
    }

    /// Removes a factory. Returns true if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    /// Returns true if an engine is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered engine names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Creates a fresh engine instance.
    ///
    /// # Errors
    /// `EngineError::UnknownEngine` if nothing is registered under `name`.
    pub fn create(&self, name: &str) -> EngineResult<Box<dyn IoEngine>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| EngineError::UnknownEngine {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineState;

    #[test]
    fn builtin_registry_has_net() {
        let registry = EngineRegistry::with_builtin();
        assert!(registry.contains("net"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["net"]);

        let engine = registry.create("net").unwrap();
        assert_eq!(engine.name(), "net");
        assert!(engine.flags().sync_io);
        assert!(engine.flags().net_io);
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn unknown_engine_is_an_error() {
        let registry = EngineRegistry::with_builtin();
        let err = registry.create("libaio").err().unwrap();
        assert!(matches!(err, EngineError::UnknownEngine { ref name } if name == "libaio"));
    }

    #[test]
    fn unregister_removes_engine() {
        let mut registry = EngineRegistry::with_builtin();
        assert!(registry.unregister("net"));
        assert!(!registry.unregister("net"));
        assert!(registry.create("net").is_err());
    }

    #[test]
    fn register_replaces_existing_factory() {
        let mut registry = EngineRegistry::new();
        assert!(registry.register("net", new_net_engine).is_none());
        assert!(registry.register("net", new_net_engine).is_some());
    }
}
