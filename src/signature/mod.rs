//! Declared signatures of factories and the dependency edges parsed from them.
//!
//! A [`Signature`] is the explicit, registration-time description of what a
//! factory accepts: every parameter with its name, its type annotation, an
//! optional [`Inject`] marker and whether it carries a default value. The
//! [`SignatureParser`] turns it into the ordered [`Dependency`] list the
//! container resolves.

use std::borrow::Cow;

use crate::key::{ServiceKey, TypeKey};
use crate::locator::Locator;

mod parser;

pub use parser::{ParseMode, SignatureParser};

/// Marker telling the parser "inject this parameter".
///
/// ```rust
/// use ferrous_inject::{Inject, Param};
///
/// struct Storage;
///
/// // Resolve the storage registered under the name "s3", but only on first use.
/// let param = Param::of::<Storage>("storage").inject(Inject::named("s3").lazy());
/// assert!(param.marker().unwrap().is_lazy());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inject {
    name: Option<Cow<'static, str>>,
    lazy: bool,
}

impl Inject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker selecting a named provider.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: Some(name.into()),
            lazy: false,
        }
    }

    /// Inject a [`Lazy`](crate::Lazy) handle instead of the instance.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }
}

/// One declared parameter of a factory, initializer or callable.
#[derive(Debug, Clone)]
pub struct Param {
    name: Cow<'static, str>,
    annotation: Option<TypeKey>,
    marker: Option<Inject>,
    has_default: bool,
}

impl Param {
    /// A parameter with neither annotation nor marker.
    pub fn untyped(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            marker: None,
            has_default: false,
        }
    }

    /// A parameter annotated with `T`.
    pub fn of<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::typed(name, TypeKey::of::<T>())
    }

    /// A parameter annotated with an explicit, possibly parametrized, type key.
    pub fn typed(name: impl Into<Cow<'static, str>>, annotation: TypeKey) -> Self {
        Self {
            annotation: Some(annotation),
            ..Self::untyped(name)
        }
    }

    /// A parameter receiving a [`Locator`].
    pub fn locator(name: impl Into<Cow<'static, str>>) -> Self {
        Self::of::<Locator>(name)
    }

    pub fn inject(mut self, marker: Inject) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Shorthand for `inject(Inject::new())`.
    pub fn injected(self) -> Self {
        self.inject(Inject::new())
    }

    /// Marks the parameter as having a default value.
    ///
    /// Injected parameters with a default become optional dependencies;
    /// un-injected ones are plain data left to the caller.
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotation(&self) -> Option<&TypeKey> {
        self.annotation.as_ref()
    }

    pub fn marker(&self) -> Option<&Inject> {
        self.marker.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }
}

/// Ordered parameters plus the declared return type.
///
/// ```rust
/// use ferrous_inject::{Param, Signature};
///
/// struct Config;
/// struct Greeter;
///
/// let sig = Signature::new()
///     .param(Param::of::<Config>("config"))
///     .param(Param::of::<String>("punctuation").with_default())
///     .returns::<Greeter>();
///
/// assert_eq!(sig.params().len(), 2);
/// assert!(sig.return_type().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Param>,
    returns: Option<TypeKey>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns<T: ?Sized + 'static>(self) -> Self {
        self.returns_key(TypeKey::of::<T>())
    }

    pub fn returns_key(mut self, key: TypeKey) -> Self {
        self.returns = Some(key);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn return_type(&self) -> Option<&TypeKey> {
        self.returns.as_ref()
    }

    pub(crate) fn set_return_type(&mut self, key: TypeKey) {
        self.returns = Some(key);
    }
}

/// How a dependency is delivered to the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// The resolved instance itself.
    Service,
    /// A [`Lazy`](crate::Lazy) handle resolved on first use.
    Lazy,
    /// A [`Locator`] bound to the resolution in progress.
    Locator,
}

/// One dependency edge: parameter name, target type, optional name, optionality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    param: Cow<'static, str>,
    target: TypeKey,
    name: Option<Cow<'static, str>>,
    optional: bool,
    kind: DependencyKind,
}

impl Dependency {
    pub(crate) fn new(
        param: Cow<'static, str>,
        target: TypeKey,
        name: Option<Cow<'static, str>>,
        optional: bool,
        kind: DependencyKind,
    ) -> Self {
        Self {
            param,
            target,
            name,
            optional,
            kind,
        }
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn target(&self) -> &TypeKey {
        &self.target
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// The registry slot this edge asks for.
    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(self.target.clone(), self.name.clone())
    }

    pub(crate) fn param_cow(&self) -> &Cow<'static, str> {
        &self.param
    }
}
