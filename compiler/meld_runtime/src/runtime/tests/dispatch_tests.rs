use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::{category, class, define, instance, log, message, module, send, send_str};
use crate::errors::{self, ErrorCategory, ErrorKind};
use crate::method::{Arity, MethodBody};
use crate::runtime::{escape, MethodResolution, Runtime};
use crate::value::Value;
use meld_ir::well_known;

#[test]
fn test_method_missing_receives_name_and_args() {
    let mut rt = Runtime::new();
    let ghost = class(&mut rt, "Ghost", None);
    rt.define_method(
        ghost,
        well_known::METHOD_MISSING,
        Arity::AtLeast(1),
        MethodBody::native(|_, inv| Ok(Value::array(inv.args.to_vec()))),
    )
    .unwrap();
    let g = instance(&mut rt, ghost);
    let boo = rt.intern("boo");

    let result = rt.dispatch(&g, boo, &[Value::Int(1), Value::Int(2)], None).unwrap();
    assert_eq!(
        result,
        Value::array(vec![Value::Symbol(boo), Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn test_unknown_method_is_lookup_failure() {
    let mut rt = Runtime::new();
    let animal = class(&mut rt, "Animal", None);
    let a = instance(&mut rt, animal);

    let result = send(&mut rt, &a, "fly");
    assert_eq!(category(&result), Some(ErrorCategory::LookupFailure));
    assert_eq!(message(result), "undefined method 'fly' for an instance of Animal");

    let result = send(&mut rt, &Value::Nil, "x");
    assert_eq!(message(result), "undefined method 'x' for nil");
    let result = send(&mut rt, &Value::Class(animal), "fly");
    assert_eq!(message(result), "undefined method 'fly' for class Animal");
}

#[test]
fn test_undef_method_stops_lookup() {
    let mut rt = Runtime::new();
    let base = class(&mut rt, "Base", None);
    let sub = class(&mut rt, "Sub", Some(base));
    define(&mut rt, base, "speak", "base");
    let speak = rt.intern("speak");

    rt.undef_method(sub, speak).unwrap();
    let s = instance(&mut rt, sub);
    let b = instance(&mut rt, base);
    assert!(matches!(rt.resolve(&s, speak).unwrap(), MethodResolution::Undefined));
    assert_eq!(category(&send(&mut rt, &s, "speak")), Some(ErrorCategory::LookupFailure));
    assert_eq!(send_str(&mut rt, &b, "speak"), "base");
    assert!(!rt.respond_to(&s, speak).unwrap());

    // Already undefined along the chain.
    let result = rt.undef_method(sub, speak);
    assert_eq!(message(result), "undefined method 'speak' for class 'Sub'");
    let nothing = rt.intern("nothing");
    let result = rt.undef_method(sub, nothing);
    assert!(matches!(
        result.as_ref().err().and_then(|e| e.kind()),
        Some(ErrorKind::UndefinedName { .. })
    ));
}

#[test]
fn test_undefined_method_goes_to_method_missing() {
    let mut rt = Runtime::new();
    let base = class(&mut rt, "Base", None);
    define(&mut rt, base, "speak", "base");
    rt.define_method(
        base,
        well_known::METHOD_MISSING,
        Arity::AtLeast(1),
        MethodBody::native(|_, _| Ok(Value::string("missing"))),
    )
    .unwrap();
    let speak = rt.intern("speak");
    rt.undef_method(base, speak).unwrap();

    let b = instance(&mut rt, base);
    assert_eq!(send_str(&mut rt, &b, "speak"), "missing");
}

#[test]
fn test_arity_is_checked() {
    let mut rt = Runtime::new();
    let point = class(&mut rt, "Point", None);
    let mv = rt.intern("move");
    rt.define_method(point, mv, Arity::Exact(2), MethodBody::native(|_, _| Ok(Value::Nil)))
        .unwrap();
    let p = instance(&mut rt, point);

    let result = rt.dispatch(&p, mv, &[Value::Int(1)], None);
    assert_eq!(category(&result), Some(ErrorCategory::ContractViolation));
    assert_eq!(
        message(result),
        "wrong number of arguments calling Point#move (given 1, expected 2)"
    );
    assert!(rt.dispatch(&p, mv, &[Value::Int(1), Value::Int(2)], None).is_ok());
}

#[test]
fn test_super_walks_the_chain() {
    let mut rt = Runtime::new();
    let greet = module(&mut rt, "Greet");
    let base = class(&mut rt, "Base", None);
    let sub = class(&mut rt, "Sub", Some(base));
    rt.include_module(greet, sub).unwrap();
    let who = rt.intern("who");

    define(&mut rt, base, "who", "base");
    let layered = |label: &'static str| {
        MethodBody::native(move |rt, inv| {
            let inner = rt.super_dispatch(inv.receiver, inv.name(), inv.method, None, inv.args, None)?;
            Ok(Value::string(format!("{label}>{}", inner.as_str().unwrap_or("?"))))
        })
    };
    rt.define_method(greet, who, Arity::Any, layered("greet")).unwrap();
    rt.define_method(sub, who, Arity::Any, layered("sub")).unwrap();

    let s = instance(&mut rt, sub);
    assert_eq!(send_str(&mut rt, &s, "who"), "sub>greet>base");
}

#[test]
fn test_super_from_module_method_without_parent() {
    let mut rt = Runtime::new();
    let m = module(&mut rt, "M");
    let c = class(&mut rt, "C", None);
    rt.include_module(m, c).unwrap();
    let hi = rt.intern("hi");
    rt.define_method(
        m,
        hi,
        Arity::Any,
        MethodBody::native(|rt, inv| {
            rt.super_dispatch(inv.receiver, inv.name(), inv.method, None, inv.args, None)
        }),
    )
    .unwrap();
    let obj = instance(&mut rt, c);

    let result = send(&mut rt, &obj, "hi");
    assert_eq!(category(&result), Some(ErrorCategory::LookupFailure));
    assert_eq!(message(result), "super: no superclass method 'hi' for an instance of C");

    let object = rt.object_class();
    define(&mut rt, object, "hi", "object");
    assert_eq!(send_str(&mut rt, &obj, "hi"), "object");
}

#[test]
fn test_super_miss_goes_to_method_missing() {
    let mut rt = Runtime::new();
    let c = class(&mut rt, "C", None);
    let hi = rt.intern("hi");
    rt.define_method(
        c,
        hi,
        Arity::Any,
        MethodBody::native(|rt, inv| {
            rt.super_dispatch(inv.receiver, inv.name(), inv.method, None, inv.args, None)
        }),
    )
    .unwrap();
    rt.define_method(
        c,
        well_known::METHOD_MISSING,
        Arity::AtLeast(1),
        MethodBody::native(|_, inv| Ok(inv.arg(0))),
    )
    .unwrap();
    let obj = instance(&mut rt, c);
    assert_eq!(send(&mut rt, &obj, "hi").unwrap(), Value::Symbol(hi));
}

#[test]
fn test_super_with_explicit_owner() {
    let mut rt = Runtime::new();
    let base = class(&mut rt, "Base", None);
    let mid = class(&mut rt, "Mid", Some(base));
    let leaf = class(&mut rt, "Leaf", Some(mid));
    define(&mut rt, base, "name", "base");
    define(&mut rt, mid, "name", "mid");
    let current = define(&mut rt, leaf, "name", "leaf");
    let obj = instance(&mut rt, leaf);

    let name = rt.intern("name");
    let from_leaf = rt.super_dispatch(&obj, name, &current, None, &[], None).unwrap();
    assert_eq!(from_leaf, Value::string("mid"));
    let from_mid = rt.super_dispatch(&obj, name, &current, Some(mid), &[], None).unwrap();
    assert_eq!(from_mid, Value::string("base"));
}

#[test]
fn test_runaway_recursion_overflows() {
    let mut rt = Runtime::builder().max_call_depth(16).build();
    let c = class(&mut rt, "C", None);
    let down = rt.intern("down");
    rt.define_method(
        c,
        down,
        Arity::Any,
        MethodBody::native(|rt, inv| rt.dispatch(inv.receiver, inv.name(), &[], None)),
    )
    .unwrap();
    let obj = instance(&mut rt, c);

    let result = rt.dispatch(&obj, down, &[], None);
    assert_eq!(category(&result), Some(ErrorCategory::Raised));
    assert_eq!(message(result), "stack level too deep (limit: 16)");
    assert_eq!(rt.depth(), 0);
}

#[test]
fn test_introspection() {
    let mut rt = Runtime::new();
    let greet = module(&mut rt, "Greet");
    let base = class(&mut rt, "Base", None);
    let sub = class(&mut rt, "Sub", Some(base));
    define(&mut rt, greet, "hi", "hi");
    define(&mut rt, base, "walk", "walk");
    define(&mut rt, sub, "run", "run");
    rt.include_module(greet, sub).unwrap();
    let obj = instance(&mut rt, sub);

    let (hi, walk, run, fly) = (rt.intern("hi"), rt.intern("walk"), rt.intern("run"), rt.intern("fly"));
    assert_eq!(rt.method_owner(&obj, hi).unwrap(), Some(greet));
    assert_eq!(rt.method_owner(&obj, walk).unwrap(), Some(base));
    assert_eq!(rt.method_owner(&obj, fly).unwrap(), None);
    assert!(rt.respond_to(&obj, run).unwrap());
    assert!(!rt.respond_to(&obj, fly).unwrap());

    assert_eq!(rt.instance_methods(sub, false).unwrap(), vec![run]);
    assert_eq!(rt.instance_methods(sub, true).unwrap(), vec![run, hi, walk]);
    assert_eq!(rt.own_method(sub, hi).map(|m| m.owner), None);
    assert_eq!(rt.own_method(sub, run).map(|m| m.owner), Some(sub));
}

#[test]
fn test_module_function_defines_on_singleton() {
    let mut rt = Runtime::new();
    let util = module(&mut rt, "Util");
    define(&mut rt, util, "before", "before");
    rt.set_module_function(util, true).unwrap();
    define(&mut rt, util, "helper", "helped");
    rt.set_module_function(util, false).unwrap();
    define(&mut rt, util, "after", "after");

    let util_value = Value::Class(util);
    assert_eq!(send_str(&mut rt, &util_value, "helper"), "helped");
    assert_eq!(
        category(&send(&mut rt, &util_value, "before")),
        Some(ErrorCategory::LookupFailure)
    );
    assert_eq!(
        category(&send(&mut rt, &util_value, "after")),
        Some(ErrorCategory::LookupFailure)
    );

    let c = class(&mut rt, "C", None);
    let result = rt.set_module_function(c, true);
    assert_eq!(category(&result), Some(ErrorCategory::ContractViolation));
}

#[test]
fn test_class_methods_are_inherited() {
    let mut rt = Runtime::new();
    let base = class(&mut rt, "Base", None);
    let sub = class(&mut rt, "Sub", Some(base));
    let create = rt.intern("create");
    rt.define_singleton_method(
        &Value::Class(base),
        create,
        Arity::Any,
        MethodBody::native(|rt, inv| match inv.receiver {
            Value::Class(id) => rt.new_instance(*id, &[], None),
            _ => Ok(Value::Nil),
        }),
    )
    .unwrap();

    let made = rt.dispatch(&Value::Class(sub), create, &[], None).unwrap();
    assert_eq!(rt.class_of(&made), sub);
    let base_instance = instance(&mut rt, base);
    assert_eq!(
        category(&rt.dispatch(&base_instance, create, &[], None)),
        Some(ErrorCategory::LookupFailure)
    );
}

#[test]
fn test_stub_registration_follows_config() {
    let mut rt = Runtime::new();
    let c = class(&mut rt, "C", None);
    define(&mut rt, c, "known", "k");
    let known = rt.intern("known");
    let other = class(&mut rt, "Other", None);
    let obj = instance(&mut rt, other);
    assert!(rt.known_stubs().contains(&known));
    assert!(matches!(rt.resolve(&obj, known).unwrap(), MethodResolution::Undefined));

    let never = rt.intern("never");
    assert!(matches!(rt.resolve(&obj, never).unwrap(), MethodResolution::NotFound));

    let mut quiet = Runtime::builder().auto_register_stubs(false).build();
    let c = class(&mut quiet, "C", None);
    define(&mut quiet, c, "known", "k");
    assert!(quiet.known_stubs().is_empty());
    let other = class(&mut quiet, "Other", None);
    let obj = instance(&mut quiet, other);
    let known = quiet.intern("known");
    assert!(matches!(quiet.resolve(&obj, known).unwrap(), MethodResolution::NotFound));

    quiet.register_stub(known);
    assert!(matches!(quiet.resolve(&obj, known).unwrap(), MethodResolution::Undefined));
}

#[test]
fn test_escape_stops_hash_iteration() {
    let mut rt = Runtime::new();
    let hash = Value::hash(Default::default());
    for n in 0..5 {
        rt.hash_put(&hash, Value::Int(n), Value::Int(n * 10)).unwrap();
    }
    let visited = log();
    let sink = Rc::clone(&visited);

    let found = rt
        .catch_escape(|rt, tag| {
            rt.hash_each(&hash, |_, key, value| {
                sink.borrow_mut().push(format!("{key:?}"));
                if key == &Value::Int(2) {
                    return Err(escape(tag, value.clone()));
                }
                Ok(())
            })?;
            Ok(Value::Nil)
        })
        .unwrap();
    assert_eq!(found, Value::Int(20));
    assert_eq!(visited.borrow().len(), 3);
}

#[test]
fn test_escape_passes_foreign_boundaries() {
    let mut rt = Runtime::new();
    let result = rt
        .catch_escape(|rt, outer| {
            let inner = rt.catch_escape(|_, _| Err(escape(outer, Value::Int(7))));
            assert!(matches!(inner, Err(crate::errors::Unwind::Escape(_))));
            inner
        })
        .unwrap();
    assert_eq!(result, Value::Int(7));

    // Errors are not caught.
    let result = rt.catch_escape(|_, _| Err(errors::raise("RuntimeError", "boom")));
    assert_eq!(message(result), "boom");
}

#[test]
fn test_block_reaches_method_body() {
    let mut rt = Runtime::new();
    let c = class(&mut rt, "C", None);
    let each = rt.intern("each_twice");
    rt.define_method(
        c,
        each,
        Arity::Exact(0),
        MethodBody::native(|rt, inv| {
            let Some(block) = inv.block else {
                return Err(errors::raise("ArgumentError", "no block given"));
            };
            let first = block.call(rt, &[Value::Int(1)])?;
            let second = block.call(rt, &[Value::Int(2)])?;
            Ok(Value::array(vec![first, second]))
        }),
    )
    .unwrap();
    let obj = instance(&mut rt, c);

    let doubled = rt.new_proc(|_, args| Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2)));
    let Value::Proc(block) = doubled else {
        panic!("expected a proc");
    };
    let result = rt.dispatch(&obj, each, &[], Some(&block)).unwrap();
    assert_eq!(result, Value::array(vec![Value::Int(2), Value::Int(4)]));

    let result = rt.dispatch(&obj, each, &[], None);
    assert_eq!(message(result), "no block given");
}
