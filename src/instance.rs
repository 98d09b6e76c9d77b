//! Type-erased service instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// A resolved service instance with its concrete type erased.
///
/// Every instance is held as an `Arc<T>`, so sized types and trait objects share
/// one storage shape. Cloning an `Instance` is cheap and keeps identity.
///
/// ```rust
/// use ferrous_inject::Instance;
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct English;
/// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
///
/// let instance = Instance::from_arc(Arc::new(English) as Arc<dyn Greeter>);
/// let greeter = instance.downcast::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// assert!(instance.downcast::<English>().is_err());
/// ```
#[derive(Clone)]
pub struct Instance {
    value: AnyArc,
    type_name: &'static str,
}

impl Instance {
    /// Wraps an owned value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value. `T` may be a trait object.
    pub fn from_arc<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Recovers the typed `Arc<T>`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Whether this instance holds an `Arc<T>`.
    pub fn is<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.value.is::<Arc<T>>()
    }

    /// Name of the type this instance was created from.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Identity comparison: both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("type", &self.type_name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let a = Instance::new(5u32);
        let b = a.clone();
        let c = Instance::new(5u32);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert!(Arc::ptr_eq(&a.downcast::<u32>().unwrap(), &b.downcast::<u32>().unwrap()));
    }

    #[test]
    fn wrong_downcast_is_type_mismatch() {
        let a = Instance::new(String::from("x"));
        assert!(a.is::<String>());
        match a.downcast::<u64>() {
            Err(DiError::TypeMismatch(name)) => assert_eq!(name, "u64"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
