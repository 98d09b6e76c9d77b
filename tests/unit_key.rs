/// Unit tests for TypeKey and ServiceKey

use ferrous_inject::{key_of_type, ServiceKey, TypeArg, TypeKey};
use std::collections::HashMap;

trait Repository<T>: Send + Sync {
    fn get(&self) -> Option<T>;
}

struct User;

#[test]
fn test_type_key_display_name() {
    let key = TypeKey::of::<String>();
    assert_eq!(key.type_name(), "alloc::string::String");
    assert_eq!(key.to_string(), "alloc::string::String");
    assert!(key.is::<String>());
    assert!(!key.is::<&str>());
}

#[test]
fn test_type_key_with_arguments_display() {
    let key = TypeKey::of::<dyn Repository<User>>().with_args([TypeArg::of::<User>()]);
    let shown = key.to_string();
    assert!(shown.ends_with("unit_key::User>"), "{shown}");
    assert_eq!(key.args().len(), 1);

    let open = TypeKey::of::<dyn Repository<User>>().with_args([TypeArg::var("T")]);
    assert!(open.to_string().ends_with("<?T>"));
    assert_eq!(open.unbound_var(), Some("T"));
}

#[test]
fn test_type_key_equality_includes_arguments() {
    let a = TypeKey::of::<u32>();
    let b = TypeKey::of::<u32>();
    assert_eq!(a, b);
    assert_ne!(a, TypeKey::of::<u64>());
    assert_ne!(a.clone(), a.clone().with_args([TypeArg::of::<u8>()]));
}

#[test]
fn test_service_key_display_with_name() {
    assert_eq!(ServiceKey::of::<u32>().to_string(), "u32");
    assert_eq!(ServiceKey::named::<u32>("database_port").to_string(), "u32#database_port");
    assert_eq!(ServiceKey::named::<u32>("database_port").display_name(), "u32");
}

#[test]
fn test_service_key_from_type_key_is_unnamed() {
    let key: ServiceKey = TypeKey::of::<u8>().into();
    assert_eq!(key, key_of_type::<u8>());
    assert_eq!(key.name(), None);
    assert_eq!(key.type_key(), &TypeKey::of::<u8>());
}

#[test]
fn test_service_keys_work_as_map_keys() {
    let mut map = HashMap::new();
    map.insert(ServiceKey::of::<u32>(), "default");
    map.insert(ServiceKey::named::<u32>("admin"), "admin");
    map.insert(ServiceKey::of::<u64>(), "wide");

    assert_eq!(map.len(), 3);
    assert_eq!(map[&ServiceKey::named::<u32>("admin")], "admin");
    assert_eq!(map[&ServiceKey::named::<u32>("admin").unnamed()], "default");
}
