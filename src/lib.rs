//! # ferrous-inject
//!
//! Async runtime dependency injection for Rust.
//!
//! ## Features
//!
//! - **Scoped lifetimes**: Singleton, Dependent (per [`Context`]) and Transient
//! - **Captive-dependency checks**: a longer-lived service can never capture a shorter-lived one
//! - **Dependency loop detection** with the offending chain in the error
//! - **Resources and finalizers**: release steps run in reverse construction order
//! - **Lazy handles and locators** for deferred and dynamic resolution
//! - **Named providers** with fallback to the default provider
//! - **Link-time service discovery** through [`SERVICES`] and [`Container::scan`]
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_inject::{Container, Factory, Param, Resolver, Scope};
//! use std::sync::Arc;
//!
//! struct Config {
//!     greeting: String,
//! }
//!
//! struct Greeter {
//!     config: Arc<Config>,
//! }
//!
//! impl Greeter {
//!     fn greet(&self, name: &str) -> String {
//!         format!("{}, {}!", self.config.greeting, name)
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let container = Container::new();
//! container
//!     .register(
//!         Factory::function("config").build(|_| async { Ok(Config { greeting: "Hello".into() }) }),
//!         Scope::Singleton,
//!     )
//!     .unwrap();
//! container
//!     .register(
//!         Factory::function("greeter")
//!             .param(Param::of::<Config>("config"))
//!             .build(|mut args| async move { Ok(Greeter { config: args.take("config")? }) }),
//!         Scope::Transient,
//!     )
//!     .unwrap();
//!
//! let greeter = container.get::<Greeter>().await.unwrap();
//! assert_eq!(greeter.greet("World"), "Hello, World!");
//! # });
//! ```
//!
//! ## Service Scopes
//!
//! - **Singleton**: built once per container, torn down by [`Container::run_finalizers`]
//! - **Dependent**: built once per [`Context`], torn down with that context
//! - **Transient**: built on every resolution
//!
//! Scopes are ordered `Singleton < Dependent < Transient`; a service may only
//! depend on services of the same or a lower scope.
//!
//! ## Contexts
//!
//! ```rust
//! use ferrous_inject::{Container, Context, Factory, Resolver, Scope};
//! use std::sync::Arc;
//!
//! struct RequestId(u64);
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let container = Container::new();
//! container
//!     .register(
//!         Factory::function("request_id").build_blocking(|_| Ok(RequestId(1))),
//!         Scope::Dependent,
//!     )
//!     .unwrap();
//!
//! let request = Context::new();
//! let scoped = container.in_context(&request);
//! let a = scoped.get::<RequestId>().await.unwrap();
//! let b = scoped.get::<RequestId>().await.unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! // Without a context, dependent services cannot be resolved.
//! assert!(container.get::<RequestId>().await.is_err());
//!
//! container.run_finalizers(Some(&request)).await;
//! # });
//! ```

pub mod config;
pub mod container;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod factory;
pub mod instance;
pub mod interceptor;
pub mod key;
pub mod lazy;
pub mod locator;
pub mod scan;
pub mod scope;
pub mod signature;
pub mod traits;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use config::{ContainerOptions, DEFAULT_MAX_DEPTH};
pub use container::{Container, ContextResolver};
pub use context::{Context, ContextId};
pub use descriptors::ServiceSpec;
pub use error::{Chain, DiError, DiResult};
pub use factory::{Arguments, CallArgs, ClassBuilder, Component, Factory, FactoryId, FactoryKind, FunctionBuilder, Resource};
pub use instance::Instance;
pub use interceptor::{FnInterceptor, Interceptor};
pub use key::{key_of_type, ServiceKey, TypeArg, TypeKey};
pub use lazy::Lazy;
pub use locator::Locator;
pub use scan::{ServiceEntry, ServiceModule, SERVICES};
pub use scope::Scope;
pub use signature::{Dependency, DependencyKind, Inject, Param, ParseMode, Signature, SignatureParser};
pub use traits::{AsyncDispose, Dispose, ResolveRequest, Resolver, ResolverCore};

/// Re-exported so `#[distributed_slice(SERVICES)]` resolves without a direct dependency.
pub use linkme;
