//! The per-function translation context, threaded through
//! `InstructionLowering` and `CfgBuilder`.
//!
//! Bundling these borrows avoids an eight-argument function signature on
//! every lowering helper; `ConditionLowering` and `PhiLowering` stay on
//! their original narrower signatures since they only ever need a subset.

use crate::config::TranslatorOptions;
use crate::ir;
use crate::memory::MemoryOracle;
use crate::sym_eval::SymEval;
use crate::uses::UseCounts;

pub struct Ctx<'f> {
    pub function: &'f ir::Function,
    pub se: SymEval<'f>,
    pub mem: &'f dyn MemoryOracle,
    pub opts: TranslatorOptions,
    pub uses: &'f UseCounts,
    pub layout: Option<&'f ir::DataLayout>,
    /// Whether calls are modeled with full actual-parameter construction
    /// (`true`) or always conservatively havocked (`false`). Orthogonal to
    /// the four `TranslatorOptions` booleans: this is a property of how
    /// the caller assembled the whole-program translation, not a per-run
    /// debugging knob.
    pub inter_procedural: bool,
}
