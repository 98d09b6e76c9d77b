//! Externally owned contexts that anchor dependent-scoped instances.
//!
//! A [`Context`] stands for one unit of outside work, typically one inbound
//! request. Dependent services are cached per context identity, and the cache is
//! torn down when the context is finalized or when its last handle is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

type DropHook = Box<dyn FnOnce(ContextId) + Send>;

/// Handle to an externally owned context.
///
/// Clones share identity; two separately created contexts never compare equal.
///
/// ```rust
/// use ferrous_inject::Context;
///
/// let request = Context::new();
/// let same = request.clone();
/// let other = Context::new();
///
/// assert_eq!(request, same);
/// assert_ne!(request, other);
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: ContextId,
    hooks: Mutex<Vec<DropHook>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Runs `hook` when the last handle to this context is dropped.
    pub(crate) fn on_drop(&self, hook: DropHook) {
        self.inner.hooks.lock().push(hook);
    }

    pub(crate) fn downgrade(&self) -> WeakContext {
        WeakContext {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.inner.id).finish()
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        for hook in self.hooks.get_mut().drain(..) {
            hook(self.id);
        }
    }
}

/// Non-owning context handle held by lazy handles and locators, so they never
/// keep a finished request alive.
#[derive(Clone)]
pub(crate) struct WeakContext {
    id: ContextId,
    inner: Weak<ContextInner>,
}

impl WeakContext {
    pub(crate) fn upgrade(&self) -> Option<Context> {
        self.inner.upgrade().map(|inner| Context { inner })
    }

    pub(crate) fn id(&self) -> ContextId {
        self.id
    }
}
