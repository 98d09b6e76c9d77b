//! Internal implementation details.

use std::future::Future;
use std::pin::Pin;

pub(crate) mod call_stack;
pub(crate) mod finalizers;
pub(crate) mod flight;

/// Boxed future used wherever an async body is stored type-erased.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) use call_stack::CallStack;
pub(crate) use finalizers::{Finalizer, FinalizerQueue};
pub(crate) use flight::{Flight, FlightTable};
