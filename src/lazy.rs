//! Deferred resolution handles.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use tokio::sync::OnceCell;

use crate::container::{ContainerInner, FrameSlot};
use crate::context::WeakContext;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::ServiceKey;
use crate::traits::ResolveRequest;

/// What a lazy handle resolves, and against which container and context.
///
/// `frame` is the construction the handle was handed to. While that
/// construction runs the handle resolves inside it, so loops and scope rules
/// are enforced; afterwards it resolves as a fresh root.
#[derive(Clone)]
pub(crate) struct LazySource {
    container: Weak<ContainerInner>,
    context: Option<WeakContext>,
    frame: FrameSlot,
    request: ResolveRequest,
}

impl LazySource {
    pub(crate) fn new(
        container: Weak<ContainerInner>,
        context: Option<WeakContext>,
        frame: FrameSlot,
        request: ResolveRequest,
    ) -> Self {
        Self {
            container,
            context,
            frame,
            request,
        }
    }

    async fn resolve(&self) -> DiResult<Option<Instance>> {
        let container = self.container.upgrade().ok_or(DiError::ContainerDropped)?;
        let context = match &self.context {
            Some(weak) => Some(
                weak.upgrade()
                    .ok_or_else(|| DiError::MissingContext(self.request.key().clone()))?,
            ),
            None => None,
        };
        let frame = self.frame.lock().clone();
        container.resolve_with(&self.request, context.as_ref(), frame.as_ref()).await
    }
}

/// A dependency resolved on first use and memoized by the handle itself.
///
/// Declared with [`Inject::lazy`](crate::Inject::lazy) or obtained from a
/// [`Locator`](crate::Locator). Awaited after the owning service finished
/// construction, it resolves as a fresh root, which is what lets two services
/// refer to each other. Awaited while the owner is still being built, it joins
/// that construction, so a loop back to the owner is a `DependencyLoop`.
/// Clones share the memoized value.
///
/// ```rust
/// use ferrous_inject::{Container, Factory, Inject, Param, Resolver, Scope};
///
/// struct Clock(u64);
/// struct Report(ferrous_inject::Lazy<Clock>);
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let container = Container::new();
/// container.register(Factory::function("clock").build_blocking(|_| Ok(Clock(7))), Scope::Singleton).unwrap();
/// container
///     .register(
///         Factory::function("report")
///             .param(Param::of::<Clock>("clock").inject(Inject::new().lazy()))
///             .build_blocking(|mut args| Ok(Report(args.take_lazy("clock")?))),
///         Scope::Transient,
///     )
///     .unwrap();
///
/// let report = container.get::<Report>().await.unwrap();
/// assert!(!report.0.is_resolved());
/// assert_eq!(report.0.get().await.unwrap().0, 7);
/// assert!(report.0.is_resolved());
/// # });
/// ```
pub struct Lazy<T: ?Sized> {
    state: Arc<LazyState>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

struct LazyState {
    source: LazySource,
    cell: OnceCell<Option<Instance>>,
}

impl<T: ?Sized + Send + Sync + 'static> Lazy<T> {
    pub(crate) fn new(source: LazySource) -> Self {
        Self {
            state: Arc::new(LazyState {
                source,
                cell: OnceCell::new(),
            }),
            _marker: PhantomData,
        }
    }

    /// Resolves on first call; later calls return the memoized instance.
    ///
    /// Fails with `ServiceNotFound` when the handle is optional and nothing is
    /// registered; use [`try_get`](Self::try_get) to observe absence.
    pub async fn get(&self) -> DiResult<Arc<T>> {
        match self.try_get().await? {
            Some(value) => Ok(value),
            None => Err(DiError::ServiceNotFound(self.key().clone())),
        }
    }

    /// Like [`get`](Self::get), but absence of an optional dependency is `None`.
    ///
    /// Failures are not memoized; the next call retries.
    pub async fn try_get(&self) -> DiResult<Option<Arc<T>>> {
        let slot = self
            .state
            .cell
            .get_or_try_init(|| self.state.source.resolve())
            .await?;
        slot.as_ref().map(|instance| instance.downcast::<T>()).transpose()
    }

    pub fn key(&self) -> &ServiceKey {
        self.state.source.request.key()
    }

    pub fn is_optional(&self) -> bool {
        self.state.source.request.is_optional()
    }

    pub fn is_resolved(&self) -> bool {
        self.state.cell.initialized()
    }
}

impl<T: ?Sized> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("key", self.state.source.request.key())
            .field("resolved", &self.state.cell.initialized())
            .finish()
    }
}
