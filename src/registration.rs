//! Service registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::descriptors::ServiceSpec;
use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;

/// Registered specs keyed by `(provided type, name)`, in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    specs: HashMap<ServiceKey, Arc<ServiceSpec>>,
    order: Vec<ServiceKey>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a spec under its own slot. Nothing is stored on failure.
    pub(crate) fn insert(&mut self, spec: ServiceSpec) -> DiResult<()> {
        let key = spec.provides().clone();
        if let Some(var) = key.type_key().unbound_var() {
            return Err(DiError::TypeVarInGenericService {
                provides: key.type_key().clone(),
                var,
            });
        }
        if self.specs.contains_key(&key) {
            return Err(DiError::ServiceAlreadyRegistered(key));
        }
        self.order.push(key.clone());
        self.specs.insert(key, Arc::new(spec));
        Ok(())
    }

    /// Exact slot, or for a named request with no exact match, the default slot.
    ///
    /// The fallback is ambiguous, so it is reported when `warn_on_fallback` is set.
    pub(crate) fn get(&self, key: &ServiceKey, warn_on_fallback: bool) -> Option<Arc<ServiceSpec>> {
        if let Some(spec) = self.specs.get(key) {
            return Some(spec.clone());
        }
        let name = key.name()?;
        let fallback = self.specs.get(&key.unnamed())?;
        if warn_on_fallback {
            warn!(
                service = %key.type_key(),
                name,
                "no provider registered under this name; falling back to the default provider"
            );
        }
        Some(fallback.clone())
    }

    /// Whether [`get`](Self::get) would find a spec.
    pub(crate) fn contains(&self, key: &ServiceKey) -> bool {
        self.specs.contains_key(key) || (key.name().is_some() && self.specs.contains_key(&key.unnamed()))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<ServiceSpec>> {
        self.order.iter().filter_map(|key| self.specs.get(key))
    }

    pub(crate) fn len(&self) -> usize {
        self.specs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use crate::key::{TypeArg, TypeKey};
    use crate::scope::Scope;
    use tracing_test::traced_test;

    trait Storage: Send + Sync {}
    struct Disk;

    fn spec(key: ServiceKey) -> ServiceSpec {
        let factory = Factory::function("disk").build_blocking(|_| Ok(Disk));
        ServiceSpec::new(key, Scope::Singleton, factory, Vec::new().into(), None)
    }

    #[test]
    fn duplicate_slot_is_rejected_and_first_spec_kept() {
        let mut registry = Registry::new();
        registry.insert(spec(ServiceKey::named::<dyn Storage>("x"))).unwrap();
        registry.insert(spec(ServiceKey::named::<dyn Storage>("y"))).unwrap();

        let err = registry.insert(spec(ServiceKey::named::<dyn Storage>("x"))).unwrap_err();
        assert!(matches!(err, DiError::ServiceAlreadyRegistered(ref k) if k.name() == Some("x")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().count(), 2);
    }

    #[test]
    fn unbound_type_variable_is_rejected() {
        let mut registry = Registry::new();
        let generic = TypeKey::of::<dyn Storage>().with_args([TypeArg::var("T")]);
        let err = registry.insert(spec(ServiceKey::from(generic))).unwrap_err();
        assert!(matches!(err, DiError::TypeVarInGenericService { var: "T", .. }));
        assert_eq!(registry.len(), 0);
    }

    #[traced_test]
    #[test]
    fn named_lookup_falls_back_to_default_with_warning() {
        let mut registry = Registry::new();
        registry.insert(spec(ServiceKey::of::<dyn Storage>())).unwrap();

        let found = registry.get(&ServiceKey::named::<dyn Storage>("missing"), true).unwrap();
        assert_eq!(found.provides(), &ServiceKey::of::<dyn Storage>());
        assert!(logs_contain("falling back to the default provider"));
        assert!(registry.contains(&ServiceKey::named::<dyn Storage>("missing")));
    }

    #[test]
    fn unnamed_lookup_never_falls_back() {
        let mut registry = Registry::new();
        registry.insert(spec(ServiceKey::named::<dyn Storage>("x"))).unwrap();
        assert!(registry.get(&ServiceKey::of::<dyn Storage>(), true).is_none());
        assert!(registry.get(&ServiceKey::named::<dyn Storage>("y"), true).is_none());
    }
}
