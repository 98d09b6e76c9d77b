//! The dependency injection container.
//!
//! [`Container`] owns the registry, the singleton store, one dependent store per
//! live [`Context`], the finalizer queues and the interceptor chain. It is a
//! cheap handle: clones share all of it.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn, Instrument};

use crate::config::ContainerOptions;
use crate::context::{Context, ContextId};
use crate::descriptors::ServiceSpec;
use crate::error::{DiError, DiResult};
use crate::factory::{CallArgs, Component, Factory, FactoryKind};
use crate::instance::Instance;
use crate::interceptor::Interceptor;
use crate::internal::{FinalizerQueue, Flight, FlightTable};
use crate::key::{ServiceKey, TypeKey};
use crate::registration::Registry;
use crate::scope::Scope;
use crate::signature::{ParseMode, SignatureParser};
use crate::traits::{ResolveRequest, ResolverCore};

mod resolve;

pub(crate) use resolve::{Frame, FrameSlot};

/// Instances, teardown and in-flight constructions of one context.
#[derive(Default)]
struct ContextStore {
    instances: HashMap<ServiceKey, Instance>,
    finalizers: FinalizerQueue,
    flights: HashMap<ServiceKey, Arc<Flight>>,
}

pub(crate) struct ContainerInner {
    options: ContainerOptions,
    registry: RwLock<Registry>,
    parser: SignatureParser,
    singletons: RwLock<HashMap<ServiceKey, Instance>>,
    defined: Mutex<HashSet<ServiceKey>>,
    singleton_flights: Mutex<HashMap<ServiceKey, Arc<Flight>>>,
    waits: FlightTable,
    contexts: Mutex<HashMap<ContextId, ContextStore>>,
    finalizers: Mutex<FinalizerQueue>,
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
}

/// Registers factories and resolves object graphs on demand.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, Factory, Param, Resolver, Scope};
///
/// struct Config { name: String }
/// struct Greeter { config: std::sync::Arc<Config> }
///
/// impl Greeter {
///     fn greet(&self, name: &str) -> String {
///         format!("Hello, {}!", name)
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let container = Container::new();
/// container
///     .register(
///         Factory::function("config").build(|_| async { Ok(Config { name: "World".into() }) }),
///         Scope::Singleton,
///     )
///     .unwrap();
/// container
///     .register(
///         Factory::function("greeter")
///             .param(Param::of::<Config>("config"))
///             .build(|mut args| async move { Ok(Greeter { config: args.take("config")? }) }),
///         Scope::Singleton,
///     )
///     .unwrap();
///
/// let first = container.get::<Greeter>().await.unwrap();
/// let second = container.get::<Greeter>().await.unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(first.config.name, "World");
/// assert_eq!(first.greet("Selva"), "Hello, Selva!");
///
/// container.run_finalizers(None).await;
/// # });
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                options,
                registry: RwLock::new(Registry::new()),
                parser: SignatureParser::new(),
                singletons: RwLock::new(HashMap::new()),
                defined: Mutex::new(HashSet::new()),
                singleton_flights: Mutex::new(HashMap::new()),
                waits: FlightTable::default(),
                contexts: Mutex::new(HashMap::new()),
                finalizers: Mutex::new(FinalizerQueue::default()),
                interceptors: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    // ----- Registration -----

    /// Registers `factory` as the default provider of its own type.
    pub fn register(&self, factory: Factory, scope: Scope) -> DiResult<()> {
        self.inner.register(factory, scope, None, None)
    }

    /// Registers `factory` under `name` for its own type.
    pub fn register_named(
        &self,
        factory: Factory,
        scope: Scope,
        name: impl Into<Cow<'static, str>>,
    ) -> DiResult<()> {
        self.inner.register(factory, scope, None, Some(name.into()))
    }

    /// Registers a class under an interface it declared, optionally named.
    ///
    /// `provides` is ignored, with a warning, for function factories: their
    /// declared return type is authoritative.
    pub fn register_as(
        &self,
        factory: Factory,
        scope: Scope,
        provides: TypeKey,
        name: Option<&str>,
    ) -> DiResult<()> {
        let name = name.map(|n| Cow::Owned(n.to_owned()));
        self.inner.register(factory, scope, Some(provides), name)
    }

    /// Whether `get::<T>()` would find a provider or a defined value.
    pub fn has<T: ?Sized + 'static>(&self) -> bool {
        self.has_key(&ServiceKey::of::<T>())
    }

    pub fn has_named<T: ?Sized + 'static>(&self, name: &str) -> bool {
        self.has_key(&ServiceKey::named::<T>(name.to_owned()))
    }

    /// Named keys fall back to the default provider or the default defined
    /// value, the same way [`resolve`](Self::resolve) does.
    pub fn has_key(&self, key: &ServiceKey) -> bool {
        self.inner.registry.read().contains(key)
            || self.inner.singletons.read().contains_key(key)
            || (key.name().is_some() && self.inner.defined.lock().contains(&key.unnamed()))
    }

    /// Registered specs in registration order.
    pub fn specs(&self) -> Vec<ServiceSpec> {
        self.inner.registry.read().iter().map(|s| (**s).clone()).collect()
    }

    /// The spec a request for `key` would use, default fallback included.
    pub fn spec(&self, key: &ServiceKey) -> Option<ServiceSpec> {
        self.inner.registry.read().get(key, false).map(|s| (*s).clone())
    }

    /// Adds a post-construction interceptor. Interceptors run in the order added.
    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.inner.interceptors.write().push(interceptor);
    }

    // ----- Defined values -----

    /// Stores a pre-built value as the default singleton of `T`, bypassing any
    /// factory. Defined values survive [`run_finalizers`](Self::run_finalizers).
    pub fn define<T: ?Sized + Send + Sync + 'static>(&self, value: Arc<T>) {
        self.define_key(ServiceKey::of::<T>(), Instance::from_arc(value));
    }

    pub fn define_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<Cow<'static, str>>,
        value: Arc<T>,
    ) {
        self.define_key(ServiceKey::named::<T>(name), Instance::from_arc(value));
    }

    pub fn define_key(&self, key: ServiceKey, instance: Instance) {
        debug!(service = %key, "defining singleton value");
        self.inner.defined.lock().insert(key.clone());
        let replaced = self.inner.singletons.write().insert(key, instance);
        drop(replaced);
    }

    /// Stores a pre-built value in the dependent store of `context`.
    pub fn define_in<T: ?Sized + Send + Sync + 'static>(&self, context: &Context, value: Arc<T>) {
        self.define_key_in(context, ServiceKey::of::<T>(), Instance::from_arc(value));
    }

    pub fn define_key_in(&self, context: &Context, key: ServiceKey, instance: Instance) {
        debug!(service = %key, context = %context.id(), "defining context value");
        let replaced = self
            .inner
            .with_context_store(context, |store| store.instances.insert(key, instance));
        drop(replaced);
    }

    // ----- Resolution -----

    /// Resolves `request`, against `context` when given.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
        context: Option<&Context>,
    ) -> DiResult<Option<Instance>> {
        let span = tracing::debug_span!("resolve", service = %request.key());
        self.inner
            .resolve_with(request, context, None)
            .instrument(span)
            .await
    }

    /// A resolver whose requests all use `context`.
    pub fn in_context(&self, context: &Context) -> ContextResolver {
        ContextResolver {
            container: self.clone(),
            context: context.clone(),
        }
    }

    /// Builds the product of `factory` without registering it: only its
    /// dependencies are looked up. The result is never cached.
    pub async fn create(&self, factory: &Factory, context: Option<&Context>) -> DiResult<Instance> {
        let span = tracing::debug_span!("create", factory = factory.name());
        self.inner.create(factory, context).instrument(span).await
    }

    /// [`create`](Self::create) for a class component.
    pub async fn create_component<T: Component>(&self) -> DiResult<Arc<T>> {
        self.create(&Factory::class::<T>(), None).await?.downcast::<T>()
    }

    /// Invokes a function or bound method, resolving each typed parameter that
    /// has a provider and taking the rest from `args`. Caller-supplied
    /// arguments win over resolved ones.
    pub async fn call(
        &self,
        factory: &Factory,
        context: Option<&Context>,
        args: CallArgs,
    ) -> DiResult<Instance> {
        let span = tracing::debug_span!("call", factory = factory.name());
        self.inner.call(factory, context, args).instrument(span).await
    }

    /// [`call`](Self::call) with a typed result.
    pub async fn call_as<R: ?Sized + Send + Sync + 'static>(
        &self,
        factory: &Factory,
        context: Option<&Context>,
        args: CallArgs,
    ) -> DiResult<Arc<R>> {
        self.call(factory, context, args).await?.downcast::<R>()
    }

    // ----- Teardown -----

    /// Drains finalizers in reverse construction order.
    ///
    /// Without a context this runs the container queue and evicts constructed
    /// singletons; defined values stay. With a context it runs that context's
    /// queue and drops its store.
    pub async fn run_finalizers(&self, context: Option<&Context>) {
        match context {
            None => {
                let pending = self.inner.finalizers.lock().take();
                let evicted = self.inner.evict_singletons();
                debug!(finalizers = pending.len(), evicted = evicted.len(), "finalizing container");
                drop(evicted);
                pending.run_reverse().await;
            }
            Some(context) => {
                let store = self.inner.contexts.lock().remove(&context.id());
                if let Some(store) = store {
                    debug!(context = %context.id(), finalizers = store.finalizers.len(), "finalizing context");
                    let ContextStore { instances, finalizers, .. } = store;
                    drop(instances);
                    finalizers.run_reverse().await;
                }
            }
        }
    }

    /// Finalizers waiting in the container queue, or in the queue of `context`.
    pub fn pending_finalizers(&self, context: Option<&Context>) -> usize {
        match context {
            None => self.inner.finalizers.lock().len(),
            Some(context) => self
                .inner
                .contexts
                .lock()
                .get(&context.id())
                .map_or(0, |s| s.finalizers.len()),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("services", &self.inner.registry.read().len())
            .field("singletons", &self.inner.singletons.read().len())
            .field("contexts", &self.inner.contexts.lock().len())
            .finish()
    }
}

#[async_trait]
impl ResolverCore for Container {
    async fn resolve(&self, request: ResolveRequest) -> DiResult<Option<Instance>> {
        Container::resolve(self, &request, None).await
    }
}

/// Resolver bound to one [`Context`], from [`Container::in_context`].
#[derive(Debug, Clone)]
pub struct ContextResolver {
    container: Container,
    context: Context,
}

impl ContextResolver {
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn container(&self) -> &Container {
        &self.container
    }
}

#[async_trait]
impl ResolverCore for ContextResolver {
    async fn resolve(&self, request: ResolveRequest) -> DiResult<Option<Instance>> {
        self.container.resolve(&request, Some(&self.context)).await
    }
}

impl ContainerInner {
    fn register(
        &self,
        factory: Factory,
        scope: Scope,
        provides: Option<TypeKey>,
        name: Option<Cow<'static, str>>,
    ) -> DiResult<()> {
        if factory.kind() == FactoryKind::BoundMethod {
            return Err(DiError::NonRegistrableObject {
                factory: factory.name(),
                reason: "a bound method's receiver is not owned by the container",
            });
        }

        let dependencies = self.parser.parse(&factory, ParseMode::Factory)?;
        let returns = factory
            .return_type()
            .cloned()
            .ok_or(DiError::FactoryMissingReturnType {
                factory: factory.name(),
            })?;

        let provided = match provides {
            Some(requested) if factory.kind() == FactoryKind::Function => {
                warn!(
                    factory = factory.name(),
                    provides = %requested,
                    returns = %returns,
                    "`provides` is ignored for function factories; the return type is used"
                );
                returns
            }
            Some(requested) => requested,
            None => returns,
        };

        if let Some(var) = provided.unbound_var() {
            return Err(DiError::TypeVarInGenericService { provides: provided, var });
        }
        factory.check_provides(&provided)?;

        let initializer = match factory.initializer_signature() {
            Some(_) => Some(self.parser.parse(&factory, ParseMode::Initializer)?),
            None => None,
        };

        let spec = ServiceSpec::new(ServiceKey::new(provided, name), scope, factory, dependencies, initializer);
        let key = spec.provides().clone();
        self.registry.write().insert(spec)?;
        debug!(service = %key, %scope, "registered service");
        Ok(())
    }

    /// Allocates the store of `context` on first use and ties its teardown to
    /// the context's own destruction.
    fn with_context_store<R>(self: &Arc<Self>, context: &Context, f: impl FnOnce(&mut ContextStore) -> R) -> R {
        let mut contexts = self.contexts.lock();
        let store = contexts.entry(context.id()).or_insert_with(|| {
            let container = Arc::downgrade(self);
            context.on_drop(Box::new(move |id| {
                if let Some(container) = container.upgrade() {
                    container.discard_context(id);
                }
            }));
            debug!(context = %context.id(), "allocated context store");
            ContextStore::default()
        });
        f(store)
    }

    /// Removes a dropped context's store; its pending finalizers are spawned on
    /// the current runtime when there is one.
    fn discard_context(&self, id: ContextId) {
        let store = self.contexts.lock().remove(&id);
        let Some(ContextStore { instances, finalizers, .. }) = store else {
            return;
        };
        drop(instances);
        if finalizers.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(context = %id, finalizers = finalizers.len(), "context dropped; scheduling finalizers");
                handle.spawn(finalizers.run_reverse());
            }
            Err(_) => warn!(
                context = %id,
                finalizers = finalizers.len(),
                "context dropped outside a tokio runtime; its finalizers will not run"
            ),
        }
    }

    fn evict_singletons(&self) -> Vec<Instance> {
        let defined = self.defined.lock();
        let mut singletons = self.singletons.write();
        let (kept, evicted): (HashMap<_, _>, HashMap<_, _>) =
            std::mem::take(&mut *singletons).into_iter().partition(|(k, _)| defined.contains(k));
        *singletons = kept;
        evicted.into_values().collect()
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let pending = self.finalizers.get_mut().len()
            + self
                .contexts
                .get_mut()
                .values()
                .map(|s| s.finalizers.len())
                .sum::<usize>();
        if pending > 0 {
            warn!(pending, "container dropped before run_finalizers; pending finalizers will not run");
        }
    }
}
