//! Signature parsing with per-factory memoization.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{Dependency, DependencyKind, Param, Signature};
use crate::error::{DiError, DiResult};
use crate::factory::{Factory, FactoryId, FactoryKind};
use crate::locator::Locator;

/// What the parsed dependency list will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseMode {
    /// Building a service: `register` and `create`.
    Factory,
    /// Invoking a function through `call`: every typed parameter is resolved
    /// optionally and untyped ones are left to the caller.
    Call,
    /// The post-construction initializer of a class component.
    Initializer,
}

/// Parses factory signatures into dependency lists, memoized per factory object.
///
/// ```rust
/// use ferrous_inject::{Factory, ParseMode, Param, SignatureParser};
///
/// struct Config;
/// struct Greeter;
///
/// let factory = Factory::function("make_greeter")
///     .param(Param::of::<Config>("config"))
///     .build_blocking(|_args| Ok(Greeter));
///
/// let parser = SignatureParser::new();
/// let first = parser.parse(&factory, ParseMode::Factory).unwrap();
/// let again = parser.parse(&factory, ParseMode::Factory).unwrap();
///
/// assert_eq!(first.len(), 1);
/// assert!(std::sync::Arc::ptr_eq(&first, &again));
/// assert_eq!(parser.misses(), 1);
/// ```
#[derive(Default)]
pub struct SignatureParser {
    memo: Mutex<HashMap<(FactoryId, ParseMode), Arc<[Dependency]>>>,
    misses: AtomicUsize,
}

impl SignatureParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependency list of `factory` under `mode`.
    ///
    /// For [`ParseMode::Initializer`] a factory without an initializer yields an
    /// empty list.
    pub fn parse(&self, factory: &Factory, mode: ParseMode) -> DiResult<Arc<[Dependency]>> {
        let memo_key = (factory.id(), mode);
        if let Some(hit) = self.memo.lock().get(&memo_key) {
            return Ok(hit.clone());
        }

        // Parsing is pure, so a concurrent miss on the same key is harmless.
        self.misses.fetch_add(1, Ordering::Relaxed);
        let parsed: Arc<[Dependency]> = parse_uncached(factory, mode)?.into();
        trace!(factory = factory.name(), ?mode, deps = parsed.len(), "parsed signature");

        Ok(self.memo.lock().entry(memo_key).or_insert(parsed).clone())
    }

    /// Number of parses that were not served from the memo.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

fn parse_uncached(factory: &Factory, mode: ParseMode) -> DiResult<Vec<Dependency>> {
    match mode {
        ParseMode::Factory => {
            if matches!(factory.kind(), FactoryKind::Function | FactoryKind::BoundMethod)
                && factory.signature().return_type().is_none()
            {
                return Err(DiError::FactoryMissingReturnType {
                    factory: factory.name(),
                });
            }
            let fields_only = factory.kind() == FactoryKind::Class;
            parse_params(factory.name(), factory.signature(), fields_only)
        }
        ParseMode::Initializer => match factory.initializer_signature() {
            Some(sig) => parse_params(factory.name(), sig, false),
            None => Ok(Vec::new()),
        },
        ParseMode::Call => parse_call(factory.name(), factory.signature()),
    }
}

fn parse_params(owner: &'static str, sig: &Signature, fields_only: bool) -> DiResult<Vec<Dependency>> {
    let mut deps = Vec::with_capacity(sig.params().len());
    for param in sig.params() {
        if let Some(dep) = locator_dependency(param) {
            deps.push(dep);
            continue;
        }
        match (param.marker(), param.annotation()) {
            (Some(marker), Some(ty)) => deps.push(Dependency::new(
                param.name.clone(),
                ty.clone(),
                marker.name.clone(),
                param.has_default(),
                if marker.is_lazy() {
                    DependencyKind::Lazy
                } else {
                    DependencyKind::Service
                },
            )),
            // Plain field of a component, or a data parameter with a default.
            (None, Some(_)) if fields_only || param.has_default() => {}
            (None, Some(ty)) => deps.push(Dependency::new(
                param.name.clone(),
                ty.clone(),
                None,
                false,
                DependencyKind::Service,
            )),
            (_, None) => return Err(untyped(owner, param)),
        }
    }
    Ok(deps)
}

fn parse_call(owner: &'static str, sig: &Signature) -> DiResult<Vec<Dependency>> {
    let mut deps = Vec::with_capacity(sig.params().len());
    for param in sig.params() {
        if let Some(dep) = locator_dependency(param) {
            deps.push(dep);
            continue;
        }
        match (param.marker(), param.annotation()) {
            (Some(marker), Some(ty)) => deps.push(Dependency::new(
                param.name.clone(),
                ty.clone(),
                marker.name.clone(),
                true,
                if marker.is_lazy() {
                    DependencyKind::Lazy
                } else {
                    DependencyKind::Service
                },
            )),
            (None, Some(ty)) => deps.push(Dependency::new(
                param.name.clone(),
                ty.clone(),
                None,
                true,
                DependencyKind::Service,
            )),
            (Some(_), None) => return Err(untyped(owner, param)),
            // Left to the caller.
            (None, None) => {}
        }
    }
    Ok(deps)
}

fn locator_dependency(param: &Param) -> Option<Dependency> {
    let ty = param.annotation()?;
    ty.is::<Locator>().then(|| {
        Dependency::new(param.name.clone(), ty.clone(), None, false, DependencyKind::Locator)
    })
}

fn untyped(owner: &'static str, param: &Param) -> DiError {
    DiError::ServiceWithUntypedDependency {
        factory: owner,
        param: param.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{Arguments, Component};
    use crate::signature::Inject;

    struct Config;
    struct Cache;
    struct Greeter;

    struct Widget;

    impl Component for Widget {
        fn fields() -> Signature {
            Signature::new()
                .param(Param::of::<Config>("config").injected())
                .param(Param::of::<Cache>("cache").inject(Inject::named("hot")).with_default())
                .param(Param::of::<u32>("counter"))
        }

        fn assemble(_args: &mut Arguments) -> DiResult<Self> {
            Ok(Widget)
        }
    }

    #[test]
    fn function_parameters_follow_marker_annotation_and_default() {
        let factory = Factory::function("make_greeter")
            .param(Param::of::<Config>("config"))
            .param(Param::of::<Cache>("cache").injected().with_default())
            .param(Param::of::<Greeter>("lazy_self").inject(Inject::new().lazy()))
            .param(Param::of::<String>("greeting").with_default())
            .param(Param::locator("locator"))
            .build_blocking(|_| Ok(Greeter));

        let deps = SignatureParser::new().parse(&factory, ParseMode::Factory).unwrap();
        let summary: Vec<_> = deps
            .iter()
            .map(|d| (d.param(), d.is_optional(), d.kind()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("config", false, DependencyKind::Service),
                ("cache", true, DependencyKind::Service),
                ("lazy_self", false, DependencyKind::Lazy),
                ("locator", false, DependencyKind::Locator),
            ]
        );
    }

    #[test]
    fn component_only_injects_marked_fields() {
        let factory = Factory::class::<Widget>();
        let deps = SignatureParser::new().parse(&factory, ParseMode::Factory).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[1].name(), Some("hot"));
        assert!(deps[1].is_optional());
    }

    #[test]
    fn untyped_parameter_fails_fast() {
        let factory = Factory::function("handler")
            .param(Param::untyped("request"))
            .build_blocking(|_| Ok(Greeter));

        let err = SignatureParser::new().parse(&factory, ParseMode::Factory).unwrap_err();
        assert!(matches!(
            err,
            DiError::ServiceWithUntypedDependency { ref param, .. } if param == "request"
        ));

        // The caller supplies untyped parameters to `call`.
        let call = SignatureParser::new().parse(&factory, ParseMode::Call).unwrap();
        assert!(call.is_empty());
    }

    #[test]
    fn erased_function_without_return_type_is_rejected() {
        let factory = Factory::function("anonymous")
            .build_erased(|_| async { Ok(crate::Instance::new(1u8)) });
        let err = SignatureParser::new().parse(&factory, ParseMode::Factory).unwrap_err();
        assert!(matches!(err, DiError::FactoryMissingReturnType { factory: "anonymous" }));
    }

    #[test]
    fn modes_are_memoized_separately() {
        let factory = Factory::function("make")
            .param(Param::of::<Config>("config"))
            .param(Param::of::<u8>("retries").with_default())
            .build_blocking(|_| Ok(Greeter));

        let parser = SignatureParser::new();
        let build = parser.parse(&factory, ParseMode::Factory).unwrap();
        let call = parser.parse(&factory, ParseMode::Call).unwrap();
        parser.parse(&factory.clone(), ParseMode::Call).unwrap();

        assert_eq!(build.len(), 1);
        assert_eq!(call.len(), 2);
        assert!(call.iter().all(|d| d.is_optional()));
        assert_eq!(parser.misses(), 2);
    }
}
