//! `MemoryOracle`: the translator's other external collaborator.
//!
//! The memory-region analysis itself (array identification, singleton
//! detection, call-site ref/mod/new sets) is out of scope for this crate;
//! this module only defines the narrow capability surface the translator
//! consumes, per §6, plus a `TestMemoryOracle` for exercising the
//! translator without a real analysis attached.

use crate::ir;
use cranelift_entity::entity_impl;
use std::collections::HashMap;

/// A handle to a memory region, issued by the memory-region analysis.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ArrayId(u32);
entity_impl!(ArrayId, "arr");

/// How much of memory the translator is asked to model.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum TrackLevel {
    /// No memory reasoning: pointers are always untracked.
    #[default]
    None,
    /// Pointers are tracked as opaque numeric values, but loads/stores are
    /// not modeled (always havocked).
    Registers,
    /// Full array-smashing: loads/stores resolve through `array_id`.
    Arrays,
}

/// The ref/mod/new sets of a call site (or, for the per-function "new"
/// query, of a whole function).
#[derive(Clone, Debug, Default)]
pub struct RefModNew {
    pub refs: Vec<ArrayId>,
    pub mods: Vec<ArrayId>,
    pub news: Vec<ArrayId>,
}

/// The capability set `InstructionLowering` and `CfgBuilder` need from the
/// memory-region analysis. An alternative memory abstraction (type-based,
/// Steensgaard, region-based) only needs to implement this trait to be
/// substitutable, per the "Memory analysis coupling" design note.
pub trait MemoryOracle {
    fn track_level(&self) -> TrackLevel;

    /// The array id of the region `ptr` points into, within `function`.
    /// `None` means the pointer escapes the abstraction.
    fn array_id(&self, function: &str, ptr: ir::Value) -> Option<ArrayId>;

    /// The array id of a global variable's storage.
    fn array_id_for_global(&self, global: &str) -> Option<ArrayId>;

    /// True if `array` is provably a single scalar cell rather than an
    /// indexable region.
    fn is_singleton(&self, array: ArrayId) -> bool;

    /// The ref/mod/new sets of the call instruction `call` in `function`.
    fn ref_mod_new(&self, function: &str, call: ir::Inst) -> RefModNew;

    /// The regions this function itself introduces ("new" set used by the
    /// per-function prelude, step 5 of `CfgBuilder`'s orchestration).
    fn new_regions(&self, function: &str) -> Vec<ArrayId>;

    /// The ref/mod/new sets of `function` itself, as seen from the
    /// perspective of one of its callers (used to build its
    /// `FunctionDecl`'s ref-in/ref-out/new formals in inter-procedural
    /// mode). `news` here is the same set `new_regions` returns.
    fn function_ref_mod(&self, function: &str) -> RefModNew;
}

/// A minimal, explicit `MemoryOracle` for tests: every pointer value is
/// pre-registered with an array id (or left unmapped), and ref/mod/new sets
/// are supplied per call instruction.
#[derive(Default)]
pub struct TestMemoryOracle {
    pub track_level: TrackLevel,
    pub pointer_arrays: HashMap<(String, ir::Value), ArrayId>,
    pub global_arrays: HashMap<String, ArrayId>,
    pub singletons: std::collections::HashSet<ArrayId>,
    pub call_sets: HashMap<(String, ir::Inst), RefModNew>,
    pub new_sets: HashMap<String, Vec<ArrayId>>,
    pub function_sets: HashMap<String, RefModNew>,
}

impl TestMemoryOracle {
    pub fn new(track_level: TrackLevel) -> Self {
        TestMemoryOracle {
            track_level,
            ..Default::default()
        }
    }

    pub fn map_pointer(&mut self, function: &str, ptr: ir::Value, array: ArrayId) -> &mut Self {
        self.pointer_arrays
            .insert((function.to_string(), ptr), array);
        self
    }

    pub fn mark_singleton(&mut self, array: ArrayId) -> &mut Self {
        self.singletons.insert(array);
        self
    }

    pub fn set_call(&mut self, function: &str, call: ir::Inst, rmn: RefModNew) -> &mut Self {
        self.call_sets.insert((function.to_string(), call), rmn);
        self
    }

    pub fn set_function_ref_mod(&mut self, function: &str, rmn: RefModNew) -> &mut Self {
        self.function_sets.insert(function.to_string(), rmn);
        self
    }
}

impl MemoryOracle for TestMemoryOracle {
    fn track_level(&self) -> TrackLevel {
        self.track_level
    }

    fn array_id(&self, function: &str, ptr: ir::Value) -> Option<ArrayId> {
        self.pointer_arrays
            .get(&(function.to_string(), ptr))
            .copied()
    }

    fn array_id_for_global(&self, global: &str) -> Option<ArrayId> {
        self.global_arrays.get(global).copied()
    }

    fn is_singleton(&self, array: ArrayId) -> bool {
        self.singletons.contains(&array)
    }

    fn ref_mod_new(&self, function: &str, call: ir::Inst) -> RefModNew {
        self.call_sets
            .get(&(function.to_string(), call))
            .cloned()
            .unwrap_or_default()
    }

    fn new_regions(&self, function: &str) -> Vec<ArrayId> {
        self.new_sets.get(function).cloned().unwrap_or_default()
    }

    fn function_ref_mod(&self, function: &str) -> RefModNew {
        self.function_sets.get(function).cloned().unwrap_or_default()
    }
}
