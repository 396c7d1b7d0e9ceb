//! Meld IR - shared identifier types for the Meld runtime.
//!
//! Every method name, constant name and symbol in the runtime is an interned
//! [`Name`]. Interning keeps method tables keyed by a 32-bit integer, so a
//! dispatch lookup never hashes or compares string contents.
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: message and constant names → `Name(u32)`
//! - **Well-known names at fixed ids**: hook names (`initialize`,
//!   `method_missing`, `inherited`, ...) are pre-interned in a fixed order so
//!   the runtime compares against constants in [`well_known`] instead of
//!   interning on the hot path.

mod interner;
mod name;

pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::{well_known, Name};
