/// Unit tests for DiError display and classification

use ferrous_inject::{Chain, DiError, ServiceKey, Scope, TypeKey};
use std::error::Error;

#[derive(Debug)]
struct Refused;

impl std::fmt::Display for Refused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connection refused")
    }
}

impl Error for Refused {}

#[test]
fn test_error_display_not_found() {
    let error = DiError::ServiceNotFound(ServiceKey::of::<String>());
    assert_eq!(error.to_string(), "Service not found: alloc::string::String");
}

#[test]
fn test_error_display_not_found_named() {
    let error = DiError::ServiceNotFound(ServiceKey::named::<u16>("admin"));
    assert_eq!(error.to_string(), "Service not found: u16#admin");
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::TypeMismatch("alloc::string::String");
    assert_eq!(error.to_string(), "Type mismatch for: alloc::string::String");
}

#[test]
fn test_chain_marks_the_last_link() {
    let chain = Chain::new(vec!["ServiceA".into(), "ServiceB".into(), "ServiceA".into()]);
    assert_eq!(chain.to_string(), "ServiceA -> ServiceB -> [ServiceA]");
    assert_eq!(chain.len(), 3);
    assert!(chain.mentions("ServiceB"));
    assert!(!chain.mentions("ServiceC"));

    let single = Chain::new(vec!["Only".into()]);
    assert_eq!(single.to_string(), "[Only]");

    let empty = Chain::new(Vec::new());
    assert!(empty.is_empty());
    assert_eq!(empty.to_string(), "");
}

#[test]
fn test_error_display_dependency_loop() {
    let chain = Chain::new(vec!["Left".into(), "Right".into(), "Left".into()]);
    let error = DiError::DependencyLoop(chain);
    assert_eq!(error.to_string(), "Dependency loop: Left -> Right -> [Left]");
}

#[test]
fn test_error_display_invalid_scope() {
    let error = DiError::InvalidScope {
        service: ServiceKey::of::<u32>(),
        service_scope: Scope::Transient,
        requester: "Cache".into(),
        requester_scope: Scope::Singleton,
        chain: Chain::new(vec!["Cache".into(), "u32".into()]),
    };
    assert_eq!(
        error.to_string(),
        "u32 (transient) cannot be injected into Cache (singleton): Cache -> [u32]"
    );
}

#[test]
fn test_error_display_depth_exceeded() {
    assert_eq!(DiError::DepthExceeded(64).to_string(), "Max depth 64 exceeded");
}

#[test]
fn test_error_display_registration_errors() {
    let untyped = DiError::ServiceWithUntypedDependency {
        factory: "make_client",
        param: "timeout".into(),
    };
    assert!(untyped.to_string().contains("`timeout`"));
    assert!(untyped.to_string().contains("make_client"));

    let incompatible = DiError::IncompatibleTypes {
        implementation: "Disk",
        interface: TypeKey::of::<u8>(),
    };
    assert_eq!(incompatible.to_string(), "Disk is not compatible with u8");

    let missing = DiError::FactoryMissingReturnType { factory: "erased" };
    assert!(missing.to_string().contains("erased"));
}

#[test]
fn test_factory_error_keeps_its_source() {
    let error = DiError::factory(Refused);
    assert!(error.to_string().ends_with("failed: connection refused"));
    assert_eq!(error.source().unwrap().to_string(), "connection refused");

    let message = DiError::msg("bad input");
    assert!(message.source().unwrap().to_string().contains("bad input"));
}

#[test]
fn test_error_classification_is_exclusive() {
    let errors = [
        DiError::ServiceAlreadyRegistered(ServiceKey::of::<u8>()),
        DiError::NonRegistrableObject { factory: "m", reason: "bound" },
        DiError::ServiceNotFound(ServiceKey::of::<u8>()),
        DiError::DepthExceeded(1),
        DiError::msg("x"),
        DiError::NotCallable { factory: "c", reason: "class" },
        DiError::MissingContext(ServiceKey::of::<u8>()),
        DiError::ContainerDropped,
        DiError::Config("max_depth".into()),
    ];

    for error in &errors {
        let kinds = [
            error.is_registration_error(),
            error.is_resolution_error(),
            error.is_usage_error(),
        ];
        assert_eq!(kinds.iter().filter(|k| **k).count(), 1, "{error}");
    }

    assert!(errors[0].is_registration_error());
    assert!(errors[2].is_resolution_error());
    assert!(errors[6].is_usage_error());
}

#[test]
fn test_error_clone_matches_original() {
    let error = DiError::ServiceNotFound(ServiceKey::named::<u16>("admin"));
    let cloned = error.clone();
    assert_eq!(error.to_string(), cloned.to_string());
    assert!(matches!(cloned, DiError::ServiceNotFound(ref k) if k.name() == Some("admin")));
}
