//! Resolver traits for service resolution.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::ServiceKey;

/// One resolution request: the slot asked for and whether absence is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveRequest {
    key: ServiceKey,
    optional: bool,
}

impl ResolveRequest {
    pub fn new(key: ServiceKey) -> Self {
        Self { key, optional: false }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(ServiceKey::of::<T>())
    }

    pub fn named<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ServiceKey::named::<T>(name))
    }

    /// An unregistered service then yields `None` instead of `ServiceNotFound`.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub(crate) fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container), by the context-bound
/// resolver returned from [`Container::in_context`](crate::Container::in_context),
/// and by the [`Locator`](crate::Locator) handed to factories.
///
/// Most users should use the [`Resolver`] trait instead, which provides typed
/// methods built on top of this trait.
#[async_trait]
pub trait ResolverCore: Send + Sync {
    /// Resolves a single service.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(instance))` - The resolved service
    /// * `Ok(None)` - The request was optional and nothing is registered
    /// * `Err(DiError)` - Resolution error (not found, scope violation, loop, etc.)
    async fn resolve(&self, request: ResolveRequest) -> DiResult<Option<Instance>>;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Blanket-implemented for every [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Container, Factory, Resolver, Scope};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let container = Container::new();
/// container.define(Arc::new(42usize));
/// container
///     .register(
///         Factory::function("logger").build_shared(|_| async { Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>) }),
///         Scope::Singleton,
///     )
///     .unwrap();
///
/// assert_eq!(*container.get::<usize>().await.unwrap(), 42);
///
/// let logger = container.get::<dyn Logger>().await.unwrap();
/// assert_eq!(logger.log("resolved"), "LOG: resolved");
///
/// assert!(container.get_optional::<String>().await.unwrap().is_none());
/// # });
/// ```
#[async_trait]
pub trait Resolver: ResolverCore {
    /// Resolves the default provider of `T`. `T` may be a trait object.
    async fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get_key::<T>(ServiceKey::of::<T>()).await
    }

    /// Resolves the provider of `T` registered under `name`, falling back to
    /// the default provider with a warning.
    async fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.get_key::<T>(ServiceKey::named::<T>(name.to_owned())).await
    }

    /// Like [`get`](Self::get), but an unregistered service yields `None`.
    async fn get_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        let request = ResolveRequest::of::<T>().optional();
        match self.resolve(request).await? {
            Some(instance) => instance.downcast::<T>().map(Some),
            None => Ok(None),
        }
    }

    async fn get_named_optional<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> DiResult<Option<Arc<T>>> {
        let request = ResolveRequest::named::<T>(name.to_owned()).optional();
        match self.resolve(request).await? {
            Some(instance) => instance.downcast::<T>().map(Some),
            None => Ok(None),
        }
    }

    /// Resolves an explicit, possibly parametrized, slot.
    async fn get_key<T: ?Sized + Send + Sync + 'static>(&self, key: ServiceKey) -> DiResult<Arc<T>> {
        match self.resolve(ResolveRequest::new(key.clone())).await? {
            Some(instance) => instance.downcast::<T>(),
            None => Err(DiError::ServiceNotFound(key)),
        }
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
