//! Factories: the uniform "construct or call" unit behind every registration.
//!
//! A [`Factory`] is one of three kinds:
//!
//! - **Function**: an async, blocking or resource-producing closure with a
//!   declared [`Signature`]. Built with [`Factory::function`].
//! - **Class**: a [`Component`] whose marked fields are injected, with optional
//!   initializer and finalizer hooks and declared interfaces. Built with
//!   [`Factory::class`] or [`ClassBuilder`].
//! - **BoundMethod**: a closure over a receiver the container does not own.
//!   Callable through [`Container::call`](crate::Container::call), never registrable.
//!
//! # Examples
//!
//! ```rust
//! use ferrous_inject::{Factory, Param, Resource};
//! use std::sync::Arc;
//!
//! struct Config { dsn: String }
//! struct Pool { dsn: String }
//!
//! // Two-phase resource: the release step runs when finalizers are drained.
//! let pool = Factory::function("open_pool")
//!     .param(Param::of::<Config>("config"))
//!     .build_resource(|mut args| async move {
//!         let config = args.take::<Config>("config")?;
//!         let pool = Pool { dsn: config.dsn.clone() };
//!         Ok(Resource::new(pool).on_release(|pool: Arc<Pool>| async move {
//!             drop(pool);
//!             Ok(())
//!         }))
//!     });
//!
//! assert_eq!(pool.name(), "open_pool");
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::internal::{BoxFuture, Finalizer};
use crate::key::TypeKey;
use crate::lazy::{Lazy, LazySource};
use crate::locator::Locator;
use crate::signature::{Param, Signature};
use crate::traits::{AsyncDispose, Dispose};

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a factory object. Clones of a [`Factory`] share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactoryId(u64);

impl FactoryId {
    fn mint() -> Self {
        FactoryId(NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The three factory shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    Function,
    Class,
    BoundMethod,
}

type AsyncBody = Arc<dyn Fn(Arguments) -> BoxFuture<'static, DiResult<Produced>> + Send + Sync>;
type BlockingBody = Arc<dyn Fn(Arguments) -> DiResult<Produced> + Send + Sync>;
type AssembleBody = Arc<dyn Fn(&mut Arguments) -> DiResult<Instance> + Send + Sync>;
type Upcast = Arc<dyn Fn(&Instance) -> DiResult<Instance> + Send + Sync>;
type InitHook = Arc<dyn Fn(Instance, Arguments) -> BoxFuture<'static, DiResult<()>> + Send + Sync>;
type FinalHook = Arc<dyn Fn(Instance) -> BoxFuture<'static, DiResult<()>> + Send + Sync>;

enum Body {
    Async(AsyncBody),
    Blocking(BlockingBody),
    Assemble(AssembleBody),
}

struct Interface {
    key: TypeKey,
    upcast: Upcast,
}

struct FactoryInner {
    id: FactoryId,
    name: &'static str,
    kind: FactoryKind,
    signature: Signature,
    body: Body,
    interfaces: Vec<Interface>,
    initializer: Option<(Signature, InitHook)>,
    finalizer: Option<FinalHook>,
}

/// A constructible: function, class component or bound method.
#[derive(Clone)]
pub struct Factory {
    inner: Arc<FactoryInner>,
}

/// What one invocation of a factory yields.
pub(crate) struct Produced {
    pub(crate) instance: Instance,
    pub(crate) release: Option<Finalizer>,
}

impl Produced {
    fn plain(instance: Instance) -> Self {
        Self {
            instance,
            release: None,
        }
    }
}

impl Factory {
    /// Starts a function factory named `name` (used in diagnostics).
    pub fn function(name: &'static str) -> FunctionBuilder {
        FunctionBuilder::new(name, FactoryKind::Function)
    }

    /// Starts a bound-method factory: a closure over a receiver owned elsewhere.
    pub fn bound_method(name: &'static str) -> FunctionBuilder {
        FunctionBuilder::new(name, FactoryKind::BoundMethod)
    }

    /// Class factory for `T` with no hooks and no declared interfaces.
    pub fn class<T: Component>() -> Factory {
        ClassBuilder::<T>::new().build()
    }

    pub fn id(&self) -> FactoryId {
        self.inner.id
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn kind(&self) -> FactoryKind {
        self.inner.kind
    }

    /// Declared parameters, or the injectable fields of a class.
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    pub fn return_type(&self) -> Option<&TypeKey> {
        self.inner.signature.return_type()
    }

    pub fn initializer_signature(&self) -> Option<&Signature> {
        self.inner.initializer.as_ref().map(|(sig, _)| sig)
    }

    pub fn has_finalizer(&self) -> bool {
        self.inner.finalizer.is_some()
    }

    /// Interfaces a class declared with [`ClassBuilder::implements`].
    pub fn interfaces(&self) -> impl Iterator<Item = &TypeKey> {
        self.inner.interfaces.iter().map(|i| &i.key)
    }

    /// Checks that instances of this factory can be served as `provides`.
    pub(crate) fn check_provides(&self, provides: &TypeKey) -> DiResult<()> {
        if self.return_type() == Some(provides) || self.interfaces().any(|k| k == provides) {
            return Ok(());
        }
        Err(DiError::IncompatibleTypes {
            implementation: self.name(),
            interface: provides.clone(),
        })
    }

    /// Invokes the factory with fully bound arguments.
    pub(crate) async fn produce(&self, mut args: Arguments, offload_blocking: bool) -> DiResult<Produced> {
        match &self.inner.body {
            Body::Async(body) => body(args).await,
            Body::Blocking(body) if offload_blocking => {
                let body = body.clone();
                tokio::task::spawn_blocking(move || body(args))
                    .await
                    .map_err(DiError::factory)?
            }
            Body::Blocking(body) => body(args),
            Body::Assemble(assemble) => {
                let instance = assemble(&mut args)?;
                let release = self.inner.finalizer.as_ref().map(|hook| {
                    let hook = hook.clone();
                    let bound = instance.clone();
                    Box::new(move || hook(bound)) as Finalizer
                });
                Ok(Produced { instance, release })
            }
        }
    }

    /// Runs the class initializer, if any, against a freshly built instance.
    pub(crate) async fn initialize(&self, instance: &Instance, args: Arguments) -> DiResult<()> {
        match &self.inner.initializer {
            Some((_, hook)) => hook(instance.clone(), args).await,
            None => Ok(()),
        }
    }

    /// Converts an instance of this factory into the shape stored under `provides`.
    pub(crate) fn upcast(&self, instance: Instance, provides: &TypeKey) -> DiResult<Instance> {
        if self.return_type() == Some(provides) || self.kind() != FactoryKind::Class {
            return Ok(instance);
        }
        match self.inner.interfaces.iter().find(|i| &i.key == provides) {
            Some(interface) => (interface.upcast)(&instance),
            None => Err(DiError::IncompatibleTypes {
                implementation: self.name(),
                interface: provides.clone(),
            }),
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .finish()
    }
}

/// Builder for function and bound-method factories.
///
/// The typed `build*` methods record their output type as the return type;
/// [`build_erased`](Self::build_erased) relies on [`returns`](Self::returns).
pub struct FunctionBuilder {
    name: &'static str,
    kind: FactoryKind,
    signature: Signature,
}

impl FunctionBuilder {
    fn new(name: &'static str, kind: FactoryKind) -> Self {
        Self {
            name,
            kind,
            signature: Signature::new(),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.signature = self.signature.param(param);
        self
    }

    /// Replaces the whole parameter list and return type.
    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn returns<T: ?Sized + 'static>(self) -> Self {
        self.returns_key(TypeKey::of::<T>())
    }

    /// Declares an explicit, possibly parametrized, return type.
    pub fn returns_key(mut self, key: TypeKey) -> Self {
        self.signature.set_return_type(key);
        self
    }

    /// Async factory producing an owned value.
    pub fn build<T, F, Fut>(self, f: F) -> Factory
    where
        T: Send + Sync + 'static,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        let body: AsyncBody = Arc::new(move |args: Arguments| -> BoxFuture<'static, DiResult<Produced>> {
            let fut = f(args);
            Box::pin(async move { Ok(Produced::plain(Instance::new(fut.await?))) })
        });
        self.finish(Some(TypeKey::of::<T>()), Body::Async(body))
    }

    /// Async factory producing a shared value, typically a trait object.
    pub fn build_shared<T, F, Fut>(self, f: F) -> Factory
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Arc<T>>> + Send + 'static,
    {
        let body: AsyncBody = Arc::new(move |args: Arguments| -> BoxFuture<'static, DiResult<Produced>> {
            let fut = f(args);
            Box::pin(async move { Ok(Produced::plain(Instance::from_arc(fut.await?))) })
        });
        self.finish(Some(TypeKey::of::<T>()), Body::Async(body))
    }

    /// Synchronous factory. Runs on the blocking pool when
    /// [`offload_blocking_factories`](crate::ContainerOptions::offload_blocking_factories) is set.
    pub fn build_blocking<T, F>(self, f: F) -> Factory
    where
        T: Send + Sync + 'static,
        F: Fn(Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        let body: BlockingBody =
            Arc::new(move |args: Arguments| -> DiResult<Produced> { Ok(Produced::plain(Instance::new(f(args)?))) });
        self.finish(Some(TypeKey::of::<T>()), Body::Blocking(body))
    }

    /// Two-phase factory: acquire now, release when finalizers run.
    pub fn build_resource<T, F, Fut>(self, f: F) -> Factory
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Resource<T>>> + Send + 'static,
    {
        let body: AsyncBody = Arc::new(move |args: Arguments| -> BoxFuture<'static, DiResult<Produced>> {
            let fut = f(args);
            Box::pin(async move {
                let resource = fut.await?;
                Ok(Produced {
                    instance: Instance::from_arc(resource.value),
                    release: resource.release,
                })
            })
        });
        self.finish(Some(TypeKey::of::<T>()), Body::Async(body))
    }

    /// Factory producing an already erased [`Instance`].
    ///
    /// The return type must be declared with [`returns`](Self::returns) or
    /// registration fails with `FactoryMissingReturnType`.
    pub fn build_erased<F, Fut>(self, f: F) -> Factory
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Instance>> + Send + 'static,
    {
        let body: AsyncBody = Arc::new(move |args: Arguments| -> BoxFuture<'static, DiResult<Produced>> {
            let fut = f(args);
            Box::pin(async move { Ok(Produced::plain(fut.await?)) })
        });
        self.finish(None, Body::Async(body))
    }

    fn finish(mut self, inferred: Option<TypeKey>, body: Body) -> Factory {
        if let (None, Some(key)) = (self.signature.return_type(), inferred) {
            self.signature.set_return_type(key);
        }
        Factory {
            inner: Arc::new(FactoryInner {
                id: FactoryId::mint(),
                name: self.name,
                kind: self.kind,
                signature: self.signature,
                body,
                interfaces: Vec::new(),
                initializer: None,
                finalizer: None,
            }),
        }
    }
}

/// A value plus the step that releases it.
///
/// The release step is queued as a finalizer the moment the value is built.
pub struct Resource<T: ?Sized> {
    value: Arc<T>,
    release: Option<Finalizer>,
}

impl<T: Send + Sync + 'static> Resource<T> {
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Resource<T> {
    pub fn from_arc(value: Arc<T>) -> Self {
        Self { value, release: None }
    }

    /// Sets the release step. It receives the value it tears down.
    pub fn on_release<F, Fut>(mut self, release: F) -> Self
    where
        F: FnOnce(Arc<T>) -> Fut + Send + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        let value = self.value.clone();
        self.release = Some(Box::new(move || -> BoxFuture<'static, DiResult<()>> {
            Box::pin(release(value))
        }));
        self
    }

    pub fn value(&self) -> &Arc<T> {
        &self.value
    }
}

/// A type whose marked fields are injected by the container.
///
/// `fields` declares the fields; `assemble` builds the value from the resolved
/// arguments. Unmarked fields in `fields` are documentation only and are left
/// to `assemble`.
///
/// ```rust
/// use ferrous_inject::{Arguments, Component, DiResult, Param, Signature};
/// use std::sync::Arc;
///
/// struct Config { greeting: String }
///
/// struct Greeter { config: Arc<Config> }
///
/// impl Component for Greeter {
///     fn fields() -> Signature {
///         Signature::new().param(Param::of::<Config>("config").injected())
///     }
///
///     fn assemble(args: &mut Arguments) -> DiResult<Self> {
///         Ok(Greeter { config: args.take("config")? })
///     }
/// }
/// ```
pub trait Component: Sized + Send + Sync + 'static {
    fn fields() -> Signature {
        Signature::new()
    }

    fn assemble(args: &mut Arguments) -> DiResult<Self>;
}

/// Builder for class factories.
pub struct ClassBuilder<T> {
    interfaces: Vec<Interface>,
    initializer: Option<(Signature, InitHook)>,
    finalizer: Option<FinalHook>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> ClassBuilder<T> {
    pub fn new() -> Self {
        Self {
            interfaces: Vec::new(),
            initializer: None,
            finalizer: None,
            _marker: PhantomData,
        }
    }

    /// Declares that `T` can be served as `I`.
    ///
    /// ```rust
    /// use ferrous_inject::{Arguments, ClassBuilder, Component, DiResult};
    /// use std::sync::Arc;
    ///
    /// trait Greeter: Send + Sync {}
    /// struct English;
    /// impl Greeter for English {}
    /// impl Component for English {
    ///     fn assemble(_: &mut Arguments) -> DiResult<Self> { Ok(English) }
    /// }
    ///
    /// let factory = ClassBuilder::<English>::new()
    ///     .implements::<dyn Greeter>(|e| e as Arc<dyn Greeter>)
    ///     .build();
    /// assert_eq!(factory.interfaces().count(), 1);
    /// ```
    pub fn implements<I>(self, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.implements_key(TypeKey::of::<I>(), upcast)
    }

    /// Like [`implements`](Self::implements) for a parametrized interface key.
    pub fn implements_key<I>(mut self, key: TypeKey, upcast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.interfaces.push(Interface {
            key,
            upcast: Arc::new(move |instance: &Instance| -> DiResult<Instance> {
                Ok(Instance::from_arc(upcast(instance.downcast::<T>()?)))
            }),
        });
        self
    }

    /// Post-construction hook with its own injected parameters.
    pub fn initializer<F, Fut>(mut self, signature: Signature, hook: F) -> Self
    where
        F: Fn(Arc<T>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        let hook: InitHook = Arc::new(move |instance: Instance, args: Arguments| -> BoxFuture<'static, DiResult<()>> {
            match instance.downcast::<T>() {
                Ok(this) => Box::pin(hook(this, args)),
                Err(err) => Box::pin(std::future::ready(Err(err))),
            }
        });
        self.initializer = Some((signature, hook));
        self
    }

    /// Teardown hook queued when an instance is built.
    pub fn finalizer<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<()>> + Send + 'static,
    {
        let hook: FinalHook = Arc::new(move |instance: Instance| -> BoxFuture<'static, DiResult<()>> {
            match instance.downcast::<T>() {
                Ok(this) => Box::pin(hook(this)),
                Err(err) => Box::pin(std::future::ready(Err(err))),
            }
        });
        self.finalizer = Some(hook);
        self
    }

    /// Uses [`Dispose::dispose`] as the finalizer.
    pub fn disposable(self) -> Self
    where
        T: Dispose,
    {
        self.finalizer(|this: Arc<T>| async move {
            Dispose::dispose(&*this);
            Ok(())
        })
    }

    /// Uses [`AsyncDispose::dispose`] as the finalizer.
    pub fn async_disposable(self) -> Self
    where
        T: AsyncDispose,
    {
        self.finalizer(|this: Arc<T>| async move {
            AsyncDispose::dispose(&*this).await;
            Ok(())
        })
    }

    pub fn build(self) -> Factory {
        let mut signature = T::fields();
        signature.set_return_type(TypeKey::of::<T>());
        let assemble: AssembleBody =
            Arc::new(|args: &mut Arguments| -> DiResult<Instance> { Ok(Instance::new(T::assemble(args)?)) });
        Factory {
            inner: Arc::new(FactoryInner {
                id: FactoryId::mint(),
                name: std::any::type_name::<T>(),
                kind: FactoryKind::Class,
                signature,
                body: Body::Assemble(assemble),
                interfaces: self.interfaces,
                initializer: self.initializer,
                finalizer: self.finalizer,
            }),
        }
    }
}

impl<T: Component> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One bound argument.
pub(crate) enum Argument {
    Value(Instance),
    /// An optional dependency that was not registered.
    Absent,
    Lazy(LazySource),
    Locator(Locator),
}

/// Resolved arguments handed to a factory body, keyed by parameter name.
pub struct Arguments {
    owner: &'static str,
    values: HashMap<Cow<'static, str>, Argument>,
}

impl Arguments {
    pub(crate) fn new(owner: &'static str) -> Self {
        Self {
            owner,
            values: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, param: Cow<'static, str>, argument: Argument) {
        self.values.insert(param, argument);
    }

    /// Name of the factory these arguments were bound for.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn contains(&self, param: &str) -> bool {
        matches!(self.values.get(param), Some(a) if !matches!(a, Argument::Absent))
    }

    /// Takes a required value.
    pub fn take<T: ?Sized + Send + Sync + 'static>(&mut self, param: &str) -> DiResult<Arc<T>> {
        self.take_value(param)?.downcast::<T>()
    }

    /// Takes an optional value; absent dependencies yield `None`.
    pub fn take_optional<T: ?Sized + Send + Sync + 'static>(&mut self, param: &str) -> DiResult<Option<Arc<T>>> {
        match self.values.remove(param) {
            Some(Argument::Value(instance)) => instance.downcast::<T>().map(Some),
            None | Some(Argument::Absent) => Ok(None),
            Some(_) => Err(DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }

    /// Takes the erased instance bound to `param`.
    pub fn take_value(&mut self, param: &str) -> DiResult<Instance> {
        match self.values.remove(param) {
            Some(Argument::Value(instance)) => Ok(instance),
            Some(Argument::Lazy(_)) | Some(Argument::Locator(_)) => {
                Err(DiError::TypeMismatch(std::any::type_name::<Instance>()))
            }
            None | Some(Argument::Absent) => Err(self.missing(param)),
        }
    }

    pub fn take_lazy<T: ?Sized + Send + Sync + 'static>(&mut self, param: &str) -> DiResult<Lazy<T>> {
        match self.values.remove(param) {
            Some(Argument::Lazy(source)) => Ok(Lazy::new(source)),
            Some(_) => Err(DiError::TypeMismatch(std::any::type_name::<Lazy<T>>())),
            None => Err(self.missing(param)),
        }
    }

    pub fn take_locator(&mut self, param: &str) -> DiResult<Locator> {
        match self.values.remove(param) {
            Some(Argument::Locator(locator)) => Ok(locator),
            Some(_) => Err(DiError::TypeMismatch(std::any::type_name::<Locator>())),
            None => Err(self.missing(param)),
        }
    }

    fn missing(&self, param: &str) -> DiError {
        DiError::MissingArgument {
            owner: self.owner,
            param: Cow::Owned(param.to_owned()),
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Arguments")
            .field("owner", &self.owner)
            .field("params", &names)
            .finish()
    }
}

/// Caller-supplied arguments for [`Container::call`](crate::Container::call).
///
/// They always take precedence over container-resolved values of the same name.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: Vec<(Cow<'static, str>, Instance)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<T: Send + Sync + 'static>(self, param: impl Into<Cow<'static, str>>, value: T) -> Self {
        self.arg_instance(param, Instance::new(value))
    }

    pub fn arg_shared<T: ?Sized + Send + Sync + 'static>(
        self,
        param: impl Into<Cow<'static, str>>,
        value: Arc<T>,
    ) -> Self {
        self.arg_instance(param, Instance::from_arc(value))
    }

    pub fn arg_instance(mut self, param: impl Into<Cow<'static, str>>, value: Instance) -> Self {
        self.values.push((param.into(), value));
        self
    }

    pub fn contains(&self, param: &str) -> bool {
        self.values.iter().any(|(name, _)| name == param)
    }

    pub(crate) fn into_values(self) -> impl Iterator<Item = (Cow<'static, str>, Instance)> {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> u8;
    }

    struct Square;

    impl Shape for Square {
        fn sides(&self) -> u8 {
            4
        }
    }

    impl Component for Square {
        fn assemble(_: &mut Arguments) -> DiResult<Self> {
            Ok(Square)
        }
    }

    #[tokio::test]
    async fn class_upcasts_only_to_declared_interfaces() {
        let factory = ClassBuilder::<Square>::new()
            .implements::<dyn Shape>(|s| s as Arc<dyn Shape>)
            .build();

        let produced = factory.produce(Arguments::new("test"), false).await.unwrap();
        let shape = factory
            .upcast(produced.instance.clone(), &TypeKey::of::<dyn Shape>())
            .unwrap();
        assert_eq!(shape.downcast::<dyn Shape>().unwrap().sides(), 4);

        assert!(factory.check_provides(&TypeKey::of::<Square>()).is_ok());
        assert!(matches!(
            factory.check_provides(&TypeKey::of::<String>()),
            Err(DiError::IncompatibleTypes { .. })
        ));
    }

    #[tokio::test]
    async fn blocking_body_runs_inline_or_offloaded() {
        let factory = Factory::function("answer").build_blocking(|_| Ok(42u64));
        for offload in [false, true] {
            let produced = factory.produce(Arguments::new("answer"), offload).await.unwrap();
            assert_eq!(*produced.instance.downcast::<u64>().unwrap(), 42);
        }
        assert_eq!(factory.return_type(), Some(&TypeKey::of::<u64>()));
    }

    #[tokio::test]
    async fn resource_release_receives_the_value() {
        let released = Arc::new(parking_lot::Mutex::new(None));
        let sink = released.clone();
        let factory = Factory::function("conn").build_resource(move |_| {
            let sink = sink.clone();
            async move {
                Ok(Resource::new(7u8).on_release(move |v: Arc<u8>| async move {
                    *sink.lock() = Some(*v);
                    Ok(())
                }))
            }
        });

        let produced = factory.produce(Arguments::new("conn"), false).await.unwrap();
        let release = produced.release.expect("release step");
        assert!(released.lock().is_none());
        release().await.unwrap();
        assert_eq!(*released.lock(), Some(7));
    }

    #[test]
    fn missing_and_absent_arguments() {
        let mut args = Arguments::new("owner");
        args.insert("present".into(), Argument::Value(Instance::new(1i32)));
        args.insert("absent".into(), Argument::Absent);

        assert!(args.contains("present"));
        assert!(!args.contains("absent"));
        assert_eq!(args.take_optional::<i32>("absent").unwrap(), None);
        assert!(matches!(
            args.take::<i32>("nope"),
            Err(DiError::MissingArgument { owner: "owner", .. })
        ));
        assert_eq!(*args.take::<i32>("present").unwrap(), 1);
    }
}
