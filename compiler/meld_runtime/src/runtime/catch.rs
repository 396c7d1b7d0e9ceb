//! Non-local exit.
//!
//! `catch_escape` hands its body a fresh tag. Returning `Err(escape(tag, v))`
//! from anywhere below unwinds through `?` like an error until it reaches the
//! boundary that owns `tag`, which turns it back into `Ok(v)`. Boundaries
//! with other tags pass it through untouched.

use super::Runtime;
use crate::errors::{CallResult, Unwind};
use crate::value::Value;

/// Identifies one `catch_escape` boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EscapeTag(u64);

/// An escape in flight.
#[derive(Debug)]
pub struct Escape {
    pub tag: EscapeTag,
    pub value: Value,
}

/// Unwind to the boundary owning `tag` with `value`.
pub fn escape(tag: EscapeTag, value: Value) -> Unwind {
    Unwind::Escape(Escape { tag, value })
}

impl Runtime {
    /// Run `body` inside a new escape boundary.
    pub fn catch_escape<F>(&mut self, body: F) -> CallResult
    where
        F: FnOnce(&mut Runtime, EscapeTag) -> CallResult,
    {
        let tag = EscapeTag(self.ids.next_id());
        match body(self, tag) {
            Err(Unwind::Escape(caught)) if caught.tag == tag => {
                tracing::trace!(?tag, "escape caught");
                Ok(caught.value)
            }
            other => other,
        }
    }
}
