//! Batch registration: module scanning and service modules.
//!
//! Factories announce themselves at link time by adding a [`ServiceEntry`] to
//! the [`SERVICES`] distributed slice, anywhere in the program:
//!
//! ```rust,ignore
//! use ferrous_inject::{Factory, Scope, ServiceEntry, SERVICES};
//!
//! #[linkme::distributed_slice(SERVICES)]
//! static GREETER: ServiceEntry = ServiceEntry {
//!     module: module_path!(),
//!     scope: Scope::Singleton,
//!     name: None,
//!     provides: None,
//!     factory: || Factory::class::<Greeter>(),
//! };
//! ```
//!
//! [`Container::scan`] then registers every entry whose module lies under one of
//! the given module paths, sub-modules included.

use tracing::debug;

use crate::container::Container;
use crate::error::DiResult;
use crate::factory::Factory;
use crate::key::TypeKey;
use crate::scope::Scope;

/// A factory announced for discovery by [`Container::scan`].
#[derive(Debug)]
pub struct ServiceEntry {
    /// Module that declared the entry, normally `module_path!()`.
    pub module: &'static str,
    pub scope: Scope,
    /// Registration name, `None` for the default provider.
    pub name: Option<&'static str>,
    /// Interface to register a class under instead of its own type.
    pub provides: Option<fn() -> TypeKey>,
    pub factory: fn() -> Factory,
}

impl ServiceEntry {
    /// Whether the entry was declared in `module` or one of its sub-modules.
    pub fn is_under(&self, module: &str) -> bool {
        let module = module.trim_end_matches("::");
        self.module == module
            || (self.module.starts_with(module) && self.module[module.len()..].starts_with("::"))
    }
}

/// Every [`ServiceEntry`] linked into the program.
#[linkme::distributed_slice]
pub static SERVICES: [ServiceEntry] = [..];

/// A reusable group of registrations.
///
/// # Example
///
/// ```rust
/// use ferrous_inject::{Container, DiResult, Factory, Scope, ServiceModule};
///
/// struct UserConfig;
///
/// struct UserModule;
///
/// impl ServiceModule for UserModule {
///     fn register_services(self, container: &Container) -> DiResult<()> {
///         container.register(
///             Factory::function("user_config").build_blocking(|_| Ok(UserConfig)),
///             Scope::Singleton,
///         )
///     }
/// }
///
/// # fn main() -> DiResult<()> {
/// let container = Container::new();
/// container.add_module(UserModule)?;
/// assert!(container.has::<UserConfig>());
/// # Ok(())
/// # }
/// ```
pub trait ServiceModule {
    /// Register this module's services with the container.
    fn register_services(self, container: &Container) -> DiResult<()>;
}

impl Container {
    /// Registers every [`SERVICES`] entry declared under one of `modules`.
    ///
    /// Returns how many services were registered. Stops at the first
    /// registration error.
    pub fn scan(&self, modules: &[&str]) -> DiResult<usize> {
        let mut registered = 0;
        for entry in SERVICES.iter().filter(|e| modules.iter().any(|m| e.is_under(m))) {
            let factory = (entry.factory)();
            let provides = entry.provides.map(|f| f());
            debug!(module = entry.module, factory = factory.name(), "registering scanned service");
            match (provides, entry.name) {
                (None, None) => self.register(factory, entry.scope)?,
                (None, Some(name)) => self.register_named(factory, entry.scope, name)?,
                (Some(provides), name) => self.register_as(factory, entry.scope, provides, name)?,
            }
            registered += 1;
        }
        Ok(registered)
    }

    /// Lets `module` register its services.
    pub fn add_module<M: ServiceModule>(&self, module: M) -> DiResult<&Self> {
        module.register_services(self)?;
        Ok(self)
    }
}
