//! Service key types for the dependency injection container.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a provided type.
///
/// A `TypeKey` is the `TypeId` of the type a consumer asks for, plus an optional
/// list of type arguments. Concrete Rust generics (`Repository<User>`) already get
/// their own `TypeId`, so the argument list is only needed for interfaces that are
/// parametrized at registration time, e.g. one `dyn Handler` implementation per
/// message type:
///
/// ```rust
/// use ferrous_inject::{TypeKey, TypeArg};
///
/// trait Handler: Send + Sync {}
/// struct Ping;
///
/// let origin = TypeKey::of::<dyn Handler>();
/// let ping = TypeKey::of::<dyn Handler>().with_args([TypeArg::of::<Ping>()]);
///
/// assert_ne!(origin, ping);
/// assert_eq!(ping.origin(), origin);
/// assert!(ping.to_string().ends_with("Ping>"));
/// ```
///
/// The type name is carried for diagnostics only and takes no part in equality.
#[derive(Debug, Clone)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    args: Vec<TypeArg>,
}

/// A type argument of a parametrized [`TypeKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArg {
    /// A concrete type.
    Type(TypeKey),
    /// An unbound type variable. Never valid in a registration.
    Var(&'static str),
}

impl TypeArg {
    /// Concrete type argument.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeArg::Type(TypeKey::of::<T>())
    }

    /// Unbound type variable placeholder.
    pub fn var(name: &'static str) -> Self {
        TypeArg::Var(name)
    }
}

impl TypeKey {
    /// Key for `T`, which may be unsized (`dyn Trait`).
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            args: Vec::new(),
        }
    }

    /// Parametrizes this key. The result is a distinct key from its origin.
    pub fn with_args(mut self, args: impl IntoIterator<Item = TypeArg>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.name
    }

    pub fn args(&self) -> &[TypeArg] {
        &self.args
    }

    pub fn is_parametrized(&self) -> bool {
        !self.args.is_empty()
    }

    /// The unparametrized origin of this key.
    pub fn origin(&self) -> TypeKey {
        Self {
            id: self.id,
            name: self.name,
            args: Vec::new(),
        }
    }

    /// First unbound type variable found in the argument tree, if any.
    pub fn unbound_var(&self) -> Option<&'static str> {
        self.args.iter().find_map(|arg| match arg {
            TypeArg::Var(name) => Some(*name),
            TypeArg::Type(inner) => inner.unbound_var(),
        })
    }

    /// Whether this key names `T` exactly, without type arguments.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>() && self.args.is_empty()
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.args == other.args
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.args.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("<")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match arg {
                TypeArg::Type(key) => write!(f, "{}", key)?,
                TypeArg::Var(name) => write!(f, "?{}", name)?,
            }
        }
        f.write_str(">")
    }
}

/// Key for service storage and lookup: a provided type plus an optional name.
///
/// Several implementations may share one provided type as long as each has a
/// distinct name; at most one may be registered without a name (the default).
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::ServiceKey;
///
/// trait Storage: Send + Sync {}
///
/// let default = ServiceKey::of::<dyn Storage>();
/// let named = ServiceKey::named::<dyn Storage>("s3");
///
/// assert_eq!(default.name(), None);
/// assert_eq!(named.name(), Some("s3"));
/// assert_eq!(named.unnamed(), default);
/// assert!(named.to_string().ends_with("#s3"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    ty: TypeKey,
    name: Option<Cow<'static, str>>,
}

impl ServiceKey {
    pub fn new(ty: TypeKey, name: Option<Cow<'static, str>>) -> Self {
        Self { ty, name }
    }

    /// Unnamed key for `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), None)
    }

    /// Named key for `T`.
    pub fn named<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(TypeKey::of::<T>(), Some(name.into()))
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.ty
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The type name, for diagnostics.
    pub fn display_name(&self) -> &'static str {
        self.ty.type_name()
    }

    /// The default (unnamed) slot for the same provided type.
    pub fn unnamed(&self) -> ServiceKey {
        Self::new(self.ty.clone(), None)
    }

    pub(crate) fn name_cow(&self) -> Option<&Cow<'static, str>> {
        self.name.as_ref()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}#{}", self.ty, name),
            None => write!(f, "{}", self.ty),
        }
    }
}

impl From<TypeKey> for ServiceKey {
    fn from(ty: TypeKey) -> Self {
        Self::new(ty, None)
    }
}

// Helper function for creating unnamed keys
#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> ServiceKey {
    ServiceKey::of::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Handler {}
    struct Ping;
    struct Pong;

    #[test]
    fn parametrized_keys_are_distinct_from_origin_and_each_other() {
        let origin = TypeKey::of::<dyn Handler>();
        let ping = origin.clone().with_args([TypeArg::of::<Ping>()]);
        let pong = origin.clone().with_args([TypeArg::of::<Pong>()]);

        let set: HashSet<_> = [origin.clone(), ping.clone(), pong.clone()].into_iter().collect();
        assert_eq!(set.len(), 3);
        assert_eq!(ping.origin(), origin);
        assert!(ping.is_parametrized());
        assert!(!origin.is_parametrized());
    }

    #[test]
    fn unbound_var_is_found_in_nested_arguments() {
        let nested = TypeKey::of::<dyn Handler>()
            .with_args([TypeArg::Type(TypeKey::of::<Vec<u8>>().with_args([TypeArg::var("T")]))]);
        assert_eq!(nested.unbound_var(), Some("T"));

        let bound = TypeKey::of::<dyn Handler>().with_args([TypeArg::of::<Ping>()]);
        assert_eq!(bound.unbound_var(), None);
        assert_eq!(nested.to_string().matches("?T").count(), 1);
    }

    #[test]
    fn service_keys_compare_by_type_and_name() {
        assert_eq!(ServiceKey::of::<Ping>(), key_of_type::<Ping>());
        assert_ne!(ServiceKey::of::<Ping>(), ServiceKey::named::<Ping>("a"));
        assert_ne!(ServiceKey::named::<Ping>("a"), ServiceKey::named::<Ping>("b"));
        assert_eq!(ServiceKey::named::<Ping>("a").unnamed(), ServiceKey::of::<Ping>());
        assert!(ServiceKey::of::<Ping>().display_name().ends_with("Ping"));
    }
}
