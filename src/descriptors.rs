//! Service specifications for resolution and introspection.

use std::sync::Arc;

use crate::factory::{Factory, FactoryKind};
use crate::key::ServiceKey;
use crate::scope::Scope;
use crate::signature::Dependency;

/// Immutable description of how to build one service.
///
/// Built once at registration from the factory's parsed signature and never
/// mutated afterwards. [`Container::specs`](crate::Container::specs) exposes
/// the registered specs for diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, Factory, Param, Scope};
///
/// struct Config;
/// struct Greeter;
///
/// let container = Container::new();
/// container.register(Factory::function("config").build_blocking(|_| Ok(Config)), Scope::Singleton).unwrap();
/// container
///     .register(
///         Factory::function("greeter")
///             .param(Param::of::<Config>("config"))
///             .build_blocking(|_| Ok(Greeter)),
///         Scope::Singleton,
///     )
///     .unwrap();
///
/// let specs = container.specs();
/// let greeter = specs.iter().find(|s| s.provides().display_name().ends_with("Greeter")).unwrap();
/// assert_eq!(greeter.scope(), Scope::Singleton);
/// assert_eq!(greeter.dependencies().len(), 1);
/// assert_eq!(greeter.dependencies()[0].param(), "config");
/// ```
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    provides: ServiceKey,
    scope: Scope,
    factory: Factory,
    dependencies: Arc<[Dependency]>,
    initializer: Option<Arc<[Dependency]>>,
}

impl ServiceSpec {
    pub(crate) fn new(
        provides: ServiceKey,
        scope: Scope,
        factory: Factory,
        dependencies: Arc<[Dependency]>,
        initializer: Option<Arc<[Dependency]>>,
    ) -> Self {
        Self {
            provides,
            scope,
            factory,
            dependencies,
            initializer,
        }
    }

    /// The registry slot: provided type plus registered name.
    pub fn provides(&self) -> &ServiceKey {
        &self.provides
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Dependency edges in parameter order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Dependencies of the post-construction initializer, when one is declared.
    pub fn initializer_dependencies(&self) -> Option<&[Dependency]> {
        self.initializer.as_deref()
    }

    pub fn has_initializer(&self) -> bool {
        self.initializer.is_some()
    }

    pub fn has_finalizer(&self) -> bool {
        self.factory.has_finalizer()
    }

    /// Name of the implementation behind this slot.
    pub fn implementation(&self) -> &'static str {
        self.factory.name()
    }

    pub fn is_class(&self) -> bool {
        self.factory.kind() == FactoryKind::Class
    }
}
