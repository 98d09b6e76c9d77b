//! Resolver facade handed to factories.

use std::borrow::Cow;
use std::fmt;
use std::sync::Weak;

use async_trait::async_trait;

use crate::container::{ContainerInner, FrameSlot};
use crate::context::WeakContext;
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::lazy::{Lazy, LazySource};
use crate::traits::{ResolveRequest, ResolverCore};

/// Least-privilege view of the container: resolve now, or resolve lazily.
///
/// A locator received as a factory parameter ([`Param::locator`](crate::Param::locator))
/// belongs to the resolution in progress while the factory and its initializer
/// run, so asking it for a service already under construction is reported as a
/// dependency loop and scope rules apply to what it returns. Used afterwards,
/// for example from a callback, each request starts a fresh resolution.
///
/// All typed accessors come from [`Resolver`](crate::Resolver).
#[derive(Clone)]
pub struct Locator {
    container: Weak<ContainerInner>,
    context: Option<WeakContext>,
    frame: FrameSlot,
}

impl Locator {
    pub(crate) fn new(container: Weak<ContainerInner>, context: Option<WeakContext>, frame: FrameSlot) -> Self {
        Self {
            container,
            context,
            frame,
        }
    }

    /// Lazy handle for the default provider of `T`.
    pub fn lazy<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        self.lazy_request(ResolveRequest::of::<T>())
    }

    pub fn lazy_named<T: ?Sized + Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>) -> Lazy<T> {
        self.lazy_request(ResolveRequest::named::<T>(name))
    }

    pub fn lazy_request<T: ?Sized + Send + Sync + 'static>(&self, request: ResolveRequest) -> Lazy<T> {
        Lazy::new(LazySource::new(
            self.container.clone(),
            self.context.clone(),
            self.frame.clone(),
            request,
        ))
    }

    /// Whether this locator is still bound to a resolution in progress.
    pub fn in_resolution(&self) -> bool {
        self.frame.lock().is_some()
    }
}

#[async_trait]
impl ResolverCore for Locator {
    async fn resolve(&self, request: ResolveRequest) -> DiResult<Option<Instance>> {
        let container = self.container.upgrade().ok_or(DiError::ContainerDropped)?;
        let context = match &self.context {
            Some(weak) => Some(
                weak.upgrade()
                    .ok_or_else(|| DiError::MissingContext(request.key().clone()))?,
            ),
            None => None,
        };
        let frame = self.frame.lock().clone();
        container.resolve_with(&request, context.as_ref(), frame.as_ref()).await
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("context", &self.context.as_ref().map(WeakContext::id))
            .field("in_resolution", &self.in_resolution())
            .finish()
    }
}

