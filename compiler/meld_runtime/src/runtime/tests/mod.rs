//! Runtime tests, one file per concern.

mod dispatch_tests;
mod stubs_tests;

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::{CallResult, ErrorCategory, Unwind};
use crate::ids::MetaId;
use crate::method::{Arity, MethodBody, MethodRef};
use crate::runtime::Runtime;
use crate::value::Value;

/// Body that returns a fixed string.
pub(super) fn returns(text: &'static str) -> MethodBody {
    MethodBody::native(move |_, _| Ok(Value::string(text)))
}

/// Define `name` on `owner` returning `text`.
pub(super) fn define(rt: &mut Runtime, owner: MetaId, name: &str, text: &'static str) -> MethodRef {
    let name = rt.intern(name);
    rt.define_method(owner, name, Arity::Any, returns(text))
        .unwrap_or_else(|e| panic!("define_method failed: {e}"))
}

pub(super) fn class(rt: &mut Runtime, name: &str, superclass: Option<MetaId>) -> MetaId {
    let name = rt.intern(name);
    let object = rt.object_class();
    rt.define_class(object, superclass, name, None)
        .unwrap_or_else(|e| panic!("define_class failed: {e}"))
}

pub(super) fn module(rt: &mut Runtime, name: &str) -> MetaId {
    let name = rt.intern(name);
    let object = rt.object_class();
    rt.define_module(object, name)
        .unwrap_or_else(|e| panic!("define_module failed: {e}"))
}

pub(super) fn instance(rt: &mut Runtime, class: MetaId) -> Value {
    rt.new_instance(class, &[], None)
        .unwrap_or_else(|e| panic!("new_instance failed: {e}"))
}

/// Send a zero-argument message.
pub(super) fn send(rt: &mut Runtime, receiver: &Value, name: &str) -> CallResult {
    let name = rt.intern(name);
    rt.dispatch(receiver, name, &[], None)
}

/// Send and expect a string back.
pub(super) fn send_str(rt: &mut Runtime, receiver: &Value, name: &str) -> String {
    match send(rt, receiver, name) {
        Ok(Value::Str(s)) => s.to_string(),
        Ok(other) => panic!("expected a string, got {other:?}"),
        Err(e) => panic!("dispatch failed: {e}"),
    }
}

pub(super) fn category<T>(result: &CallResult<T>) -> Option<ErrorCategory> {
    match result {
        Err(unwind) => unwind.category(),
        Ok(_) => None,
    }
}

pub(super) fn message<T>(result: CallResult<T>) -> String {
    match result {
        Err(Unwind::Error(err)) => err.to_string(),
        Err(Unwind::Escape(escape)) => panic!("unexpected escape {escape:?}"),
        Ok(_) => panic!("expected an error"),
    }
}

pub(super) fn names(rt: &Runtime, ids: &[MetaId]) -> Vec<String> {
    ids.iter().map(|id| rt.display_name(*id)).collect()
}

/// Shared log a test body can append to.
pub(super) type Log = Rc<RefCell<Vec<String>>>;

pub(super) fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}
