//! The resolution algorithm.
//!
//! For one request: cached instance, registry lookup, scope check, loop check,
//! single-flight, dependencies in order, factory, finalizer registration,
//! initializer, interceptors, upcast, cache. Every consumer narrows the
//! requesting scope for its own dependencies, so a captive dependency is caught
//! at whatever depth it appears.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::ContainerInner;
use crate::context::Context;
use crate::descriptors::ServiceSpec;
use crate::error::{DiError, DiResult};
use crate::factory::{Argument, Arguments, CallArgs, Factory, FactoryKind};
use crate::instance::Instance;
use crate::internal::{BoxFuture, CallStack, Finalizer, Flight};
use crate::key::ServiceKey;
use crate::lazy::LazySource;
use crate::locator::Locator;
use crate::scope::Scope;
use crate::signature::{Dependency, DependencyKind, ParseMode};
use crate::traits::ResolveRequest;

/// The consumer on whose behalf dependencies are being resolved.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    stack: CallStack,
    scope: Scope,
    requester: String,
}

impl Frame {
    fn root(requester: String) -> Self {
        Self {
            stack: CallStack::root(),
            scope: Scope::Transient,
            requester,
        }
    }

    fn check_scope(&self, slot: &ServiceKey, scope: Scope) -> DiResult<()> {
        if scope.can_be_injected_into(self.scope) {
            return Ok(());
        }
        Err(DiError::InvalidScope {
            service: slot.clone(),
            service_scope: scope,
            requester: self.requester.clone(),
            requester_scope: self.scope,
            chain: self.stack.chain_to(slot.to_string()),
        })
    }
}

/// Frame shared with the locators of one construction; cleared when it ends.
pub(crate) type FrameSlot = Arc<Mutex<Option<Frame>>>;

// Clears the slot on every exit path.
struct FrameLease(FrameSlot);

impl Drop for FrameLease {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

impl ContainerInner {
    pub(crate) fn resolve_with<'a>(
        self: &'a Arc<Self>,
        request: &'a ResolveRequest,
        context: Option<&'a Context>,
        frame: Option<&'a Frame>,
    ) -> BoxFuture<'a, DiResult<Option<Instance>>> {
        Box::pin(async move {
            let key = request.key();

            if let Some(instance) = self.cached(key, context, frame)? {
                trace!(service = %key, "cache hit");
                return Ok(Some(instance));
            }

            let spec = self.registry.read().get(key, self.options.warn_on_default_fallback);
            let Some(spec) = spec else {
                if let Some(instance) = self.defined_default(key) {
                    return Ok(Some(instance));
                }
                if request.is_optional() {
                    trace!(service = %key, "optional dependency not registered");
                    return Ok(None);
                }
                return Err(DiError::ServiceNotFound(key.clone()));
            };

            let slot = spec.provides();
            if slot != key {
                if let Some(instance) = self.cached(slot, context, frame)? {
                    return Ok(Some(instance));
                }
            }

            if let Some(frame) = frame {
                frame.check_scope(slot, spec.scope())?;
            }
            if spec.scope() == Scope::Dependent && context.is_none() {
                return Err(DiError::MissingContext(slot.clone()));
            }

            let stack = match frame {
                Some(frame) => frame.stack.enter(slot, self.options.max_depth)?,
                None => CallStack::root().enter(slot, self.options.max_depth)?,
            };

            let _flight = if spec.scope().is_cached() && self.options.single_flight {
                let flight = self.flight(slot, spec.scope(), context);
                let guard = self.waits.acquire(flight, slot, &stack).await?;
                // Someone else may have finished while we waited.
                if let Some(instance) = self.cached(slot, context, None)? {
                    return Ok(Some(instance));
                }
                Some(guard)
            } else {
                None
            };

            let instance = self.construct(&spec, context, stack).await?;
            Ok(Some(self.store(&spec, context, instance)))
        })
    }

    /// Cache lookup. A hit in the dependent store still has to respect the
    /// requesting scope.
    fn cached(
        self: &Arc<Self>,
        key: &ServiceKey,
        context: Option<&Context>,
        frame: Option<&Frame>,
    ) -> DiResult<Option<Instance>> {
        if let Some(instance) = self.singletons.read().get(key) {
            return Ok(Some(instance.clone()));
        }
        let Some(context) = context else {
            return Ok(None);
        };
        let hit = self
            .contexts
            .lock()
            .get(&context.id())
            .and_then(|store| store.instances.get(key).cloned());
        match (hit, frame) {
            (Some(instance), Some(frame)) => {
                frame.check_scope(key, Scope::Dependent)?;
                Ok(Some(instance))
            }
            (hit, _) => Ok(hit),
        }
    }

    /// For a named request with no provider at all, the value defined under
    /// the default name, if any.
    pub(super) fn defined_default(&self, key: &ServiceKey) -> Option<Instance> {
        let name = key.name()?;
        let unnamed = key.unnamed();
        if !self.defined.lock().contains(&unnamed) {
            return None;
        }
        let instance = self.singletons.read().get(&unnamed).cloned()?;
        if self.options.warn_on_default_fallback {
            warn!(
                service = %key.type_key(),
                name,
                "no provider registered under this name; falling back to the default defined value"
            );
        }
        Some(instance)
    }

    fn flight(self: &Arc<Self>, slot: &ServiceKey, scope: Scope, context: Option<&Context>) -> Arc<Flight> {
        match (scope, context) {
            (Scope::Dependent, Some(context)) => self.with_context_store(context, |store| {
                store.flights.entry(slot.clone()).or_default().clone()
            }),
            _ => self.singleton_flights.lock().entry(slot.clone()).or_default().clone(),
        }
    }

    async fn construct(
        self: &Arc<Self>,
        spec: &ServiceSpec,
        context: Option<&Context>,
        stack: CallStack,
    ) -> DiResult<Instance> {
        let slot = spec.provides();
        let factory = spec.factory();
        let frame = Frame {
            stack,
            scope: spec.scope(),
            requester: slot.to_string(),
        };
        let lease = FrameLease(Arc::new(Mutex::new(Some(frame.clone()))));

        let args = self
            .bind(factory.name(), spec.dependencies(), context, &frame, &lease.0, None)
            .await?;

        debug!(service = %slot, scope = %spec.scope(), depth = frame.stack.depth(), "constructing");
        let produced = factory
            .produce(args, self.options.offload_blocking_factories)
            .await
            .map_err(|e| e.attributed_to(slot))?;

        // Queued before anything else can fail, so partial progress is finalizable.
        if let Some(release) = produced.release {
            self.enqueue_finalizer(spec.scope(), context, slot.to_string(), release);
        }
        let instance = produced.instance;

        if let Some(deps) = spec.initializer_dependencies() {
            let args = self.bind(factory.name(), deps, context, &frame, &lease.0, None).await?;
            factory
                .initialize(&instance, args)
                .await
                .map_err(|e| e.attributed_to(slot))?;
        }
        drop(lease);

        self.intercept(&instance, slot).await?;
        factory.upcast(instance, slot.type_key())
    }

    /// Resolves `deps` in order into named arguments.
    async fn bind(
        self: &Arc<Self>,
        owner: &'static str,
        deps: &[Dependency],
        context: Option<&Context>,
        frame: &Frame,
        locator_frame: &FrameSlot,
        supplied: Option<&CallArgs>,
    ) -> DiResult<Arguments> {
        let mut args = Arguments::new(owner);
        for dep in deps {
            if supplied.map_or(false, |s| s.contains(dep.param())) {
                continue;
            }
            let request = ResolveRequest::new(dep.key()).with_optional(dep.is_optional());
            let argument = match dep.kind() {
                DependencyKind::Service => match self.resolve_with(&request, context, Some(frame)).await? {
                    Some(instance) => Argument::Value(instance),
                    None => Argument::Absent,
                },
                DependencyKind::Lazy => Argument::Lazy(LazySource::new(
                    Arc::downgrade(self),
                    context.map(Context::downgrade),
                    locator_frame.clone(),
                    request,
                )),
                DependencyKind::Locator => Argument::Locator(Locator::new(
                    Arc::downgrade(self),
                    context.map(Context::downgrade),
                    locator_frame.clone(),
                )),
            };
            args.insert(dep.param_cow().clone(), argument);
        }
        Ok(args)
    }

    fn enqueue_finalizer(
        self: &Arc<Self>,
        scope: Scope,
        context: Option<&Context>,
        service: String,
        finalizer: Finalizer,
    ) {
        match (scope, context) {
            (Scope::Singleton, _) | (_, None) => self.finalizers.lock().push(service, finalizer),
            (_, Some(context)) => {
                self.with_context_store(context, |store| store.finalizers.push(service, finalizer))
            }
        }
    }

    async fn intercept(&self, instance: &Instance, slot: &ServiceKey) -> DiResult<()> {
        let interceptors = self.interceptors.read().clone();
        for interceptor in interceptors {
            interceptor.intercept(instance, slot).await?;
        }
        Ok(())
    }

    /// Caches by scope. When two unsynchronized constructions race, the first
    /// stored instance wins and is returned to both.
    fn store(self: &Arc<Self>, spec: &ServiceSpec, context: Option<&Context>, instance: Instance) -> Instance {
        let slot = spec.provides().clone();
        let (winner, loser) = match (spec.scope(), context) {
            (Scope::Singleton, _) => keep_first(self.singletons.write().entry(slot), instance),
            (Scope::Dependent, Some(context)) => {
                self.with_context_store(context, |store| keep_first(store.instances.entry(slot), instance))
            }
            _ => (instance, None),
        };
        if loser.is_some() {
            debug!(service = %spec.provides(), "discarding concurrently built instance");
        }
        winner
    }

    pub(super) async fn create(self: &Arc<Self>, factory: &Factory, context: Option<&Context>) -> DiResult<Instance> {
        let dependencies = self.parser.parse(factory, ParseMode::Factory)?;
        let returns = factory.return_type().cloned().ok_or(DiError::FactoryMissingReturnType {
            factory: factory.name(),
        })?;
        let initializer = match factory.initializer_signature() {
            Some(_) => Some(self.parser.parse(factory, ParseMode::Initializer)?),
            None => None,
        };
        let spec = ServiceSpec::new(
            ServiceKey::from(returns),
            Scope::Transient,
            factory.clone(),
            dependencies,
            initializer,
        );
        self.construct(&spec, context, CallStack::root()).await
    }

    pub(super) async fn call(
        self: &Arc<Self>,
        factory: &Factory,
        context: Option<&Context>,
        supplied: CallArgs,
    ) -> DiResult<Instance> {
        if factory.kind() == FactoryKind::Class {
            return Err(DiError::NotCallable {
                factory: factory.name(),
                reason: "class components are built with `create`",
            });
        }

        let dependencies = self.parser.parse(factory, ParseMode::Call)?;
        let frame = Frame::root(factory.name().to_string());
        let lease = FrameLease(Arc::new(Mutex::new(Some(frame.clone()))));

        let mut args = self
            .bind(factory.name(), &dependencies, context, &frame, &lease.0, Some(&supplied))
            .await?;
        for (param, value) in supplied.into_values() {
            args.insert(param, Argument::Value(value));
        }

        let produced = factory
            .produce(args, self.options.offload_blocking_factories)
            .await
            .map_err(|e| e.attributed_to(&factory.name()))?;
        drop(lease);

        if let Some(release) = produced.release {
            self.enqueue_finalizer(Scope::Transient, context, factory.name().to_string(), release);
        }
        Ok(produced.instance)
    }
}

fn keep_first(entry: Entry<'_, ServiceKey, Instance>, instance: Instance) -> (Instance, Option<Instance>) {
    match entry {
        Entry::Occupied(existing) => (existing.get().clone(), Some(instance)),
        Entry::Vacant(slot) => (slot.insert(instance).clone(), None),
    }
}
