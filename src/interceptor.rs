//! Post-construction interception of freshly built services.
//!
//! Interceptors see every instance the container builds, after its initializer
//! ran and before it is cached, in registration order. They add cross-cutting
//! behaviour (instrumentation, auditing, validation) without the services being
//! aware of it. An interceptor error aborts the resolution like a factory error.

use std::fmt;

use async_trait::async_trait;

use crate::error::DiResult;
use crate::instance::Instance;
use crate::key::ServiceKey;

/// Observes newly constructed services.
///
/// `instance` is the implementation as produced by the factory, before it is
/// upcast to the interface it is registered as; `key` is the registered slot.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Container, DiResult, Factory, Instance, Interceptor, Resolver, Scope, ServiceKey};
/// use async_trait::async_trait;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct CountBuilds(AtomicUsize);
///
/// #[async_trait]
/// impl Interceptor for CountBuilds {
///     async fn intercept(&self, _instance: &Instance, _key: &ServiceKey) -> DiResult<()> {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let counter = Arc::new(CountBuilds::default());
/// let container = Container::new();
/// container.add_interceptor(counter.clone());
/// container.register(Factory::function("n").build_blocking(|_| Ok(1u8)), Scope::Transient).unwrap();
///
/// container.get::<u8>().await.unwrap();
/// container.get::<u8>().await.unwrap();
/// assert_eq!(counter.0.load(Ordering::SeqCst), 2);
/// # });
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, instance: &Instance, key: &ServiceKey) -> DiResult<()>;
}

/// Adapts a synchronous closure into an [`Interceptor`].
///
/// ```
/// use ferrous_inject::{Container, FnInterceptor};
/// use std::sync::Arc;
///
/// let container = Container::new();
/// container.add_interceptor(Arc::new(FnInterceptor::new(|instance, key| {
///     println!("built {} for {}", instance.type_name(), key);
///     Ok(())
/// })));
/// ```
pub struct FnInterceptor<F> {
    f: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(&Instance, &ServiceKey) -> DiResult<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&Instance, &ServiceKey) -> DiResult<()> + Send + Sync,
{
    async fn intercept(&self, instance: &Instance, key: &ServiceKey) -> DiResult<()> {
        (self.f)(instance, key)
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").finish_non_exhaustive()
    }
}
