//! Batch registration: link-time scanning and service modules.

use ferrous_inject::{
    Arguments, ClassBuilder, Component, Container, DiError, DiResult, Factory, Param, Resolver, Scope, ServiceEntry,
    ServiceModule, TypeKey, SERVICES,
};
use linkme::distributed_slice;
use std::sync::Arc;

mod billing {
    use super::*;

    pub struct Ledger;

    impl Component for Ledger {
        fn assemble(_: &mut Arguments) -> DiResult<Self> {
            Ok(Ledger)
        }
    }

    pub trait Invoicer: Send + Sync {
        fn prefix(&self) -> &'static str;
    }

    pub struct PdfInvoicer {
        pub ledger: Arc<Ledger>,
    }

    impl Invoicer for PdfInvoicer {
        fn prefix(&self) -> &'static str {
            "pdf"
        }
    }

    impl Component for PdfInvoicer {
        fn fields() -> ferrous_inject::Signature {
            ferrous_inject::Signature::new().param(Param::of::<Ledger>("ledger").injected())
        }

        fn assemble(args: &mut Arguments) -> DiResult<Self> {
            Ok(PdfInvoicer { ledger: args.take("ledger")? })
        }
    }

    fn ledger() -> Factory {
        Factory::class::<Ledger>()
    }

    fn pdf_invoicer() -> Factory {
        ClassBuilder::<PdfInvoicer>::new()
            .implements::<dyn Invoicer>(|i| i as Arc<dyn Invoicer>)
            .build()
    }

    fn invoicer_key() -> TypeKey {
        TypeKey::of::<dyn Invoicer>()
    }

    #[distributed_slice(SERVICES)]
    static LEDGER: ServiceEntry = ServiceEntry {
        module: module_path!(),
        scope: Scope::Singleton,
        name: None,
        provides: None,
        factory: ledger,
    };

    #[distributed_slice(SERVICES)]
    static PDF_INVOICER: ServiceEntry = ServiceEntry {
        module: module_path!(),
        scope: Scope::Transient,
        name: Some("pdf"),
        provides: Some(invoicer_key),
        factory: pdf_invoicer,
    };
}

mod shipping {
    use super::*;

    pub struct Carrier;

    fn carrier() -> Factory {
        Factory::function("carrier").build_blocking(|_| Ok(Carrier))
    }

    #[distributed_slice(SERVICES)]
    static CARRIER: ServiceEntry = ServiceEntry {
        module: module_path!(),
        scope: Scope::Singleton,
        name: None,
        provides: None,
        factory: carrier,
    };
}

#[tokio::test]
async fn scan_registers_only_the_requested_modules() {
    let container = Container::new();
    let registered = container.scan(&["modules::billing"]).unwrap();

    assert_eq!(registered, 2);
    assert!(container.has::<billing::Ledger>());
    assert!(container.has_named::<dyn billing::Invoicer>("pdf"));
    assert!(!container.has::<shipping::Carrier>());

    let invoicer = container.get_named::<dyn billing::Invoicer>("pdf").await.unwrap();
    assert_eq!(invoicer.prefix(), "pdf");
}

#[tokio::test]
async fn scanning_the_crate_root_finds_everything() {
    let container = Container::new();
    assert_eq!(container.scan(&["modules"]).unwrap(), 3);
    assert!(container.get::<shipping::Carrier>().await.is_ok());
}

#[test]
fn scanning_twice_is_a_duplicate_registration() {
    let container = Container::new();
    container.scan(&["modules::shipping"]).unwrap();
    let err = container.scan(&["modules::shipping"]).unwrap_err();
    assert!(matches!(err, DiError::ServiceAlreadyRegistered(_)));
}

struct AppConfig {
    name: &'static str,
}

struct Greeter {
    config: Arc<AppConfig>,
}

struct ConfigModule;

impl ServiceModule for ConfigModule {
    fn register_services(self, container: &Container) -> DiResult<()> {
        container.register(
            Factory::function("app_config").build_blocking(|_| Ok(AppConfig { name: "modules" })),
            Scope::Singleton,
        )
    }
}

struct GreeterModule {
    scope: Scope,
}

impl ServiceModule for GreeterModule {
    fn register_services(self, container: &Container) -> DiResult<()> {
        container.register(
            Factory::function("greeter")
                .param(Param::of::<AppConfig>("config"))
                .build(|mut args| async move { Ok(Greeter { config: args.take("config")? }) }),
            self.scope,
        )
    }
}

#[tokio::test]
async fn modules_chain_their_registrations() {
    let container = Container::new();
    container
        .add_module(ConfigModule)
        .unwrap()
        .add_module(GreeterModule { scope: Scope::Transient })
        .unwrap();

    let greeter = container.get::<Greeter>().await.unwrap();
    assert_eq!(greeter.config.name, "modules");
}

#[test]
fn failing_module_reports_its_error() {
    let container = Container::new();
    container.add_module(ConfigModule).unwrap();
    let err = container.add_module(ConfigModule).err().unwrap();
    assert!(err.is_registration_error());
}
