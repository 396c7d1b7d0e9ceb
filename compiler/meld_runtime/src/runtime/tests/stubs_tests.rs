use pretty_assertions::assert_eq;

use super::{category, class, define, message, module, send, send_str};
use crate::errors::ErrorCategory;
use crate::method::{Arity, MethodBody};
use crate::runtime::{MethodResolution, Runtime, StubRegistry};
use crate::value::{NativeKind, Value};

#[test]
fn test_registry_keeps_first_registration_order() {
    let rt = Runtime::new();
    let (a, b) = (rt.intern("a"), rt.intern("b"));
    let mut registry = StubRegistry::default();
    assert!(registry.is_empty());
    assert!(registry.register(b));
    assert!(registry.register(a));
    assert!(!registry.register(b));
    assert_eq!(registry.names(), &[b, a]);
    assert_eq!(registry.len(), 2);
    assert!(registry.contains(a));
}

#[test]
fn test_bridged_ints_answer_messages() {
    let mut rt = Runtime::new();
    let integer = class(&mut rt, "Integer", None);
    let double = rt.intern("double");
    rt.define_method(
        integer,
        double,
        Arity::Exact(0),
        MethodBody::native(|_, inv| Ok(Value::Int(inv.receiver.as_int().unwrap_or(0) * 2))),
    )
    .unwrap();
    rt.bridge_native_type(NativeKind::Int, integer).unwrap();

    assert_eq!(rt.dispatch(&Value::Int(21), double, &[], None).unwrap(), Value::Int(42));
    assert_eq!(rt.class_of(&Value::Int(1)), integer);
    assert_eq!(rt.bridges().class_for(NativeKind::Int), Some(integer));
    assert_eq!(rt.bridges().len(), 1);
}

#[test]
fn test_bridge_sees_later_changes() {
    let mut rt = Runtime::new();
    let comparable = module(&mut rt, "Comparable");
    let numeric = class(&mut rt, "Numeric", None);
    let integer = class(&mut rt, "Integer", Some(numeric));
    rt.bridge_native_type(NativeKind::Int, integer).unwrap();
    let one = Value::Int(1);

    define(&mut rt, numeric, "kind", "numeric");
    assert_eq!(send_str(&mut rt, &one, "kind"), "numeric");

    define(&mut rt, comparable, "between", "yes");
    rt.include_module(comparable, numeric).unwrap();
    assert_eq!(send_str(&mut rt, &one, "between"), "yes");
    assert!(rt.is_a(&one, comparable).unwrap());
    assert!(rt.is_a(&one, numeric).unwrap());

    define(&mut rt, integer, "kind", "integer");
    assert_eq!(send_str(&mut rt, &one, "kind"), "integer");

    let kind = rt.intern("kind");
    rt.remove_method(integer, kind).unwrap();
    assert_eq!(send_str(&mut rt, &one, "kind"), "numeric");
    rt.undef_method(integer, kind).unwrap();
    assert!(matches!(rt.resolve(&one, kind).unwrap(), MethodResolution::Undefined));
}

#[test]
fn test_duplicate_bridge_is_rejected() {
    let mut rt = Runtime::new();
    let integer = class(&mut rt, "Integer", None);
    let other = class(&mut rt, "Other", None);
    rt.bridge_native_type(NativeKind::Int, integer).unwrap();

    let result = rt.bridge_native_type(NativeKind::Int, other);
    assert_eq!(category(&result), Some(ErrorCategory::ContractViolation));
    assert_eq!(message(result), "native type int is already bridged");

    let m = module(&mut rt, "M");
    let result = rt.bridge_native_type(NativeKind::Str, m);
    assert_eq!(message(result), "M is not a class");
}

#[test]
fn test_unbridged_natives_use_object() {
    let mut rt = Runtime::new();
    let object = rt.object_class();
    define(&mut rt, object, "inspect_me", "object");
    assert_eq!(send_str(&mut rt, &Value::string("s"), "inspect_me"), "object");
    assert_eq!(send_str(&mut rt, &Value::Nil, "inspect_me"), "object");

    let result = send(&mut rt, &Value::Nil, "x");
    assert_eq!(message(result), "undefined method 'x' for nil");
}

#[test]
fn test_bridged_miss_goes_to_method_missing() {
    let mut rt = Runtime::new();
    let string = class(&mut rt, "String", None);
    define(&mut rt, string, "method_missing", "caught");
    rt.bridge_native_type(NativeKind::Str, string).unwrap();

    assert_eq!(send_str(&mut rt, &Value::string("s"), "shout"), "caught");
    let result = send(&mut rt, &Value::Int(1), "shout");
    assert_eq!(category(&result), Some(ErrorCategory::LookupFailure));
}
