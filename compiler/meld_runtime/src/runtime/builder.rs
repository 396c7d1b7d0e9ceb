//! `RuntimeBuilder` and runtime configuration.

use meld_ir::SharedInterner;

use super::Runtime;

/// Default bound on nested method invocations.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Tunables fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Nested invocations beyond this raise `StackOverflow`.
    pub max_call_depth: usize,
    /// Register every defined method name as a known message.
    pub auto_register_stubs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            auto_register_stubs: true,
        }
    }
}

/// Builder for [`Runtime`].
///
/// Host code that interns names before the runtime exists passes its
/// interner in, so both sides agree on every `Name`.
#[derive(Default)]
pub struct RuntimeBuilder {
    interner: Option<SharedInterner>,
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing interner.
    #[must_use]
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    #[must_use]
    pub fn auto_register_stubs(mut self, enabled: bool) -> Self {
        self.config.auto_register_stubs = enabled;
        self
    }

    /// Build the runtime and boot `Object`, `Module` and `Class`.
    pub fn build(self) -> Runtime {
        let interner = self.interner.unwrap_or_default();
        Runtime::boot(interner, self.config)
    }
}
