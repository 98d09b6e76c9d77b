//! Error types for the dependency injection container.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::key::{ServiceKey, TypeKey};
use crate::scope::Scope;

/// Dependency injection errors
///
/// Three kinds of failure are reported:
///
/// - **Registration** errors abort `register` before anything is stored.
/// - **Resolution** errors surface from `get`/`call`/`create` and are never retried.
/// - **Usage** errors report a container API used the wrong way.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, DiError, Resolver};
///
/// # tokio_test_block_on(async {
/// let container = Container::new();
/// match container.get::<String>().await {
///     Err(DiError::ServiceNotFound(key)) => {
///         assert_eq!(key.display_name(), "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    // ----- Registration -----
    /// A parameter carries neither a type annotation nor an injection marker.
    #[error("parameter `{param}` of {factory} has neither a type annotation nor an injection marker")]
    ServiceWithUntypedDependency {
        factory: &'static str,
        param: Cow<'static, str>,
    },
    /// A function factory does not declare what it returns.
    #[error("factory {factory} does not declare the type it returns")]
    FactoryMissingReturnType { factory: &'static str },
    /// The same provided type and name were registered twice.
    #[error("Service already registered: {0}")]
    ServiceAlreadyRegistered(ServiceKey),
    /// The implementation does not declare the interface it is registered as.
    #[error("{implementation} is not compatible with {interface}")]
    IncompatibleTypes {
        implementation: &'static str,
        interface: TypeKey,
    },
    /// A generic registration names an unbound type variable.
    #[error("generic service {provides} uses unbound type variable `{var}`")]
    TypeVarInGenericService { provides: TypeKey, var: &'static str },
    /// The factory kind cannot back a registration.
    #[error("{factory} cannot be registered: {reason}")]
    NonRegistrableObject {
        factory: &'static str,
        reason: &'static str,
    },

    // ----- Resolution -----
    /// No registration for a required dependency.
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceKey),
    /// A longer-lived consumer would capture a shorter-lived dependency.
    #[error("{service} ({service_scope}) cannot be injected into {requester} ({requester_scope}): {chain}")]
    InvalidScope {
        service: ServiceKey,
        service_scope: Scope,
        requester: String,
        requester_scope: Scope,
        chain: Chain,
    },
    /// A live resolution revisited a service already on its call stack.
    #[error("Dependency loop: {0}")]
    DependencyLoop(Chain),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// A factory or function read an argument nobody supplied.
    #[error("argument `{param}` of {owner} was not supplied")]
    MissingArgument {
        owner: &'static str,
        param: Cow<'static, str>,
    },
    /// A factory body, initializer or finalizer failed.
    #[error("{service} failed: {source}")]
    Factory {
        service: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    // ----- Usage -----
    /// `call` was handed something that is not a function.
    #[error("{factory} is not callable: {reason}")]
    NotCallable {
        factory: &'static str,
        reason: &'static str,
    },
    /// A dependent service was resolved without a context.
    #[error("dependent service {0} requires a context")]
    MissingContext(ServiceKey),
    /// A lazy handle or locator outlived its container.
    #[error("the container behind this handle has been dropped")]
    ContainerDropped,
    /// Invalid container options.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DiError {
    /// Wraps an error raised inside a factory body.
    ///
    /// The container fills in which service failed.
    pub fn factory<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DiError::Factory {
            service: String::new(),
            source: Arc::new(error),
        }
    }

    /// Factory failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::factory(Message(message.into()))
    }

    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            DiError::ServiceWithUntypedDependency { .. }
                | DiError::FactoryMissingReturnType { .. }
                | DiError::ServiceAlreadyRegistered(_)
                | DiError::IncompatibleTypes { .. }
                | DiError::TypeVarInGenericService { .. }
                | DiError::NonRegistrableObject { .. }
        )
    }

    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            DiError::ServiceNotFound(_)
                | DiError::InvalidScope { .. }
                | DiError::DependencyLoop(_)
                | DiError::DepthExceeded(_)
                | DiError::TypeMismatch(_)
                | DiError::MissingArgument { .. }
                | DiError::Factory { .. }
        )
    }

    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            DiError::NotCallable { .. }
                | DiError::MissingContext(_)
                | DiError::ContainerDropped
                | DiError::Config(_)
        )
    }

    // Attributes an anonymous factory failure to the service being built.
    pub(crate) fn attributed_to(self, service: &dyn fmt::Display) -> Self {
        match self {
            DiError::Factory { service: name, source } if name.is_empty() => DiError::Factory {
                service: service.to_string(),
                source,
            },
            other => other,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

/// An ordered chain of services, rendered so the offending edge stands out.
///
/// The last link is the one that broke the rule: the revisited service of a loop,
/// or the captive dependency of a scope violation.
///
/// ```rust
/// use ferrous_inject::Chain;
///
/// let chain = Chain::new(vec!["A".into(), "B".into(), "A".into()]);
/// assert_eq!(chain.to_string(), "A -> B -> [A]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    links: Vec<String>,
}

impl Chain {
    pub fn new(links: Vec<String>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Whether some link mentions `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.links.iter().any(|l| l.contains(needle))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((last, head)) = self.links.split_last() else {
            return Ok(());
        };
        for link in head {
            write!(f, "{} -> ", link)?;
        }
        write!(f, "[{}]", last)
    }
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
