//! End-to-end object-model scenarios through the public API.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use meld_runtime::{
    Arity, CallResult, ErrorCategory, HashTable, MetaId, MethodBody, Runtime, Value,
};

fn runtime() -> Runtime {
    meld_runtime::init_tracing();
    Runtime::new()
}

fn class(rt: &mut Runtime, name: &str, superclass: Option<MetaId>) -> MetaId {
    let name = rt.intern(name);
    let object = rt.object_class();
    rt.define_class(object, superclass, name, None).unwrap()
}

fn module(rt: &mut Runtime, name: &str) -> MetaId {
    let name = rt.intern(name);
    let object = rt.object_class();
    rt.define_module(object, name).unwrap()
}

fn define(rt: &mut Runtime, owner: MetaId, name: &str, text: &'static str) {
    let name = rt.intern(name);
    rt.define_method(owner, name, Arity::Any, MethodBody::native(move |_, _| Ok(Value::string(text))))
        .unwrap();
}

fn send(rt: &mut Runtime, receiver: &Value, name: &str) -> CallResult {
    let name = rt.intern(name);
    rt.dispatch(receiver, name, &[], None)
}

fn text(result: CallResult) -> String {
    match result {
        Ok(Value::Str(s)) => s.to_string(),
        other => panic!("expected a string, got {other:?}"),
    }
}

fn ancestor_names(rt: &mut Runtime, meta: MetaId) -> Vec<String> {
    let chain = rt.ancestors_of(meta).unwrap();
    chain.iter().map(|id| rt.display_name(*id)).collect()
}

#[test]
fn animal_speaks() {
    let mut rt = runtime();
    let animal = class(&mut rt, "Animal", None);
    define(&mut rt, animal, "speak", "...");
    let a = rt.new_instance(animal, &[], None).unwrap();
    assert_eq!(text(send(&mut rt, &a, "speak")), "...");
}

#[test]
fn module_methods_reach_instances() {
    let mut rt = runtime();
    let animal = class(&mut rt, "Animal", None);
    let greet = module(&mut rt, "Greet");
    define(&mut rt, greet, "hi", "hello");
    rt.include_module(greet, animal).unwrap();

    let a = rt.new_instance(animal, &[], None).unwrap();
    assert_eq!(text(send(&mut rt, &a, "hi")), "hello");
    assert_eq!(ancestor_names(&mut rt, animal), vec!["Animal", "Greet", "Object"]);
}

#[test]
fn own_definition_beats_module() {
    let mut rt = runtime();
    let animal = class(&mut rt, "Animal", None);
    let greet = module(&mut rt, "Greet");
    define(&mut rt, animal, "hi", "own");
    define(&mut rt, greet, "hi", "module");
    rt.include_module(greet, animal).unwrap();

    let a = rt.new_instance(animal, &[], None).unwrap();
    assert_eq!(text(send(&mut rt, &a, "hi")), "own");
}

#[test]
fn later_module_wins_even_for_later_definitions() {
    let mut rt = runtime();
    let c = class(&mut rt, "C", None);
    let g1 = module(&mut rt, "G1");
    let g2 = module(&mut rt, "G2");
    rt.include_module(g1, c).unwrap();
    rt.include_module(g2, c).unwrap();
    define(&mut rt, g2, "hi", "g2");
    define(&mut rt, g1, "hi", "g1");

    let obj = rt.new_instance(c, &[], None).unwrap();
    assert_eq!(text(send(&mut rt, &obj, "hi")), "g2");
    assert_eq!(ancestor_names(&mut rt, c), vec!["C", "G2", "G1", "Object"]);
}

#[test]
fn including_twice_changes_nothing() {
    let mut rt = runtime();
    let c = class(&mut rt, "C", None);
    let m = module(&mut rt, "M");
    rt.include_module(m, c).unwrap();
    let before = ancestor_names(&mut rt, c);
    rt.include_module(m, c).unwrap();
    assert_eq!(ancestor_names(&mut rt, c), before);
}

#[test]
fn super_from_module_method() {
    let mut rt = runtime();
    let c = class(&mut rt, "C", None);
    let m = module(&mut rt, "M");
    rt.include_module(m, c).unwrap();
    let hi = rt.intern("hi");
    rt.define_method(
        m,
        hi,
        Arity::Any,
        MethodBody::native(|rt, inv| {
            let up = rt.super_dispatch(inv.receiver, inv.name(), inv.method, None, inv.args, None)?;
            Ok(Value::string(format!("m+{}", up.as_str().unwrap_or(""))))
        }),
    )
    .unwrap();
    let obj = rt.new_instance(c, &[], None).unwrap();

    let result = send(&mut rt, &obj, "hi");
    assert_eq!(
        result.as_ref().err().and_then(|e| e.category()),
        Some(ErrorCategory::LookupFailure)
    );

    let object = rt.object_class();
    define(&mut rt, object, "hi", "object");
    assert_eq!(text(send(&mut rt, &obj, "hi")), "m+object");
}

#[test]
fn singletons_are_stable() {
    let mut rt = runtime();
    let animal = class(&mut rt, "Animal", None);
    let a = rt.new_instance(animal, &[], None).unwrap();
    let first = rt.singleton_of(&a).unwrap();
    assert_eq!(rt.singleton_of(&a).unwrap(), first);

    let s = rt.singleton_of(&Value::Class(animal)).unwrap();
    let object = rt.object_class();
    let s_object = rt.singleton_of(&Value::Class(object)).unwrap();
    assert_eq!(rt.superclass_of(s), Some(s_object));
}

#[test]
fn hash_keeps_first_insertion_position() {
    let mut rt = runtime();
    let hash = Value::hash(HashTable::new());
    rt.hash_put(&hash, Value::string("b"), Value::Int(1)).unwrap();
    rt.hash_put(&hash, Value::string("a"), Value::Int(2)).unwrap();
    rt.hash_put(&hash, Value::string("b"), Value::Int(3)).unwrap();

    let mut seen = Vec::new();
    rt.hash_each(&hash, |_, key, value| {
        seen.push((key.as_str().unwrap_or("").to_owned(), value.as_int()));
        Ok(())
    })
    .unwrap();
    assert_eq!(
        seen,
        vec![("b".to_owned(), Some(3)), ("a".to_owned(), Some(2))]
    );
}

#[test]
fn builder_shares_interner() {
    let interner = meld_runtime::SharedInterner::default();
    let early = interner.intern("early");
    let mut rt = Runtime::builder().interner(interner).build();
    assert_eq!(rt.intern("early"), early);
    let c = class(&mut rt, "C", None);
    define(&mut rt, c, "early", "ok");
    let obj = rt.new_instance(c, &[], None).unwrap();
    assert_eq!(rt.dispatch(&obj, early, &[], None).unwrap(), Value::string("ok"));
}

#[test]
fn reinserted_key_moves_to_end() {
    let mut rt = runtime();
    let hash = Value::hash(HashTable::new());
    let (a, b) = (Value::string("a"), Value::string("b"));
    rt.hash_put(&hash, a.clone(), Value::Int(1)).unwrap();
    rt.hash_put(&hash, b.clone(), Value::Int(2)).unwrap();
    assert_eq!(rt.hash_delete(&hash, &a).unwrap(), Some(Value::Int(1)));
    assert_eq!(rt.hash_get(&hash, &a).unwrap(), None);
    rt.hash_put(&hash, a.clone(), Value::Int(3)).unwrap();

    let mut order = Vec::new();
    rt.hash_each(&hash, |_, key, _| {
        order.push(key.clone());
        Ok(())
    })
    .unwrap();
    assert_eq!(order, vec![b, a]);
}

#[test]
fn tracing_installs_at_most_once() {
    let _ = runtime();
    assert!(!meld_runtime::init_tracing());
}
