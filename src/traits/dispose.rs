//! Disposal traits for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Class components opt in with [`ClassBuilder::disposable`](crate::ClassBuilder::disposable);
/// `dispose` then runs as the component's finalizer.
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Arguments, ClassBuilder, Component, DiResult, Dispose};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Component for Cache {
///     fn assemble(_: &mut Arguments) -> DiResult<Self> {
///         Ok(Cache { name: "user_cache".to_string() })
///     }
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("Flushing cache: {}", self.name);
///     }
/// }
///
/// let factory = ClassBuilder::<Cache>::new().disposable().build();
/// assert!(factory.has_finalizer());
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal.
///
/// Opted in with [`ClassBuilder::async_disposable`](crate::ClassBuilder::async_disposable).
///
/// # Examples
///
/// ```
/// use ferrous_inject::{Arguments, AsyncDispose, ClassBuilder, Component, DiResult};
/// use async_trait::async_trait;
///
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// impl Component for DatabaseClient {
///     fn assemble(_: &mut Arguments) -> DiResult<Self> {
///         Ok(DatabaseClient { connection_id: "conn_123".to_string() })
///     }
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose(&self) {
///         println!("Closing database connection: {}", self.connection_id);
///     }
/// }
///
/// let factory = ClassBuilder::<DatabaseClient>::new().async_disposable().build();
/// assert!(factory.has_finalizer());
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
