//! Explicit, process-wide-free translator configuration.
//!
//! Per §9's "Option plumbing" design note, the four booleans of §6 are
//! carried in a value passed into `CfgBuilder::new` rather than as global
//! mutable state, so multiple configurations can coexist in one process.

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct TranslatorOptions {
    pub simplify_cfg: bool,
    pub print_cfg: bool,
    pub disable_pointer_arith: bool,
    pub include_havoc: bool,
}

impl TranslatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simplify_cfg(mut self, v: bool) -> Self {
        self.simplify_cfg = v;
        self
    }

    pub fn with_print_cfg(mut self, v: bool) -> Self {
        self.print_cfg = v;
        self
    }

    pub fn with_disable_pointer_arith(mut self, v: bool) -> Self {
        self.disable_pointer_arith = v;
        self
    }

    pub fn with_include_havoc(mut self, v: bool) -> Self {
        self.include_havoc = v;
        self
    }
}
