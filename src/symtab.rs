//! Symbol names and the `VariableFactory` capability.
//!
//! `VariableFactory` is one of the translator's two external collaborators
//! (the other is `MemoryOracle`, in `memory.rs`): the translator never
//! invents symbol names itself, it only asks for one deterministically and
//! remembers the answer.

use crate::ir;
use crate::memory::ArrayId;
use cranelift_entity::{entity_impl, EntityRef};
use std::collections::HashMap;

/// An opaque, totally-ordered symbolic variable name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SymbolName(u32);
entity_impl!(SymbolName, "sym");

/// Issues symbol names for IR values, array ids, functions, and anonymous
/// temporaries, and remembers the mapping so repeated lookups of the same
/// entity are stable for the lifetime of the owning CFG.
///
/// Implementations must be deterministic: given the same sequence of calls,
/// two `VariableFactory`s must hand out the same names, so that re-running
/// the translator on identical input yields byte-identical output (§5).
pub trait VariableFactory {
    /// A brand new name with no upstream entity behind it, used for the
    /// phi-lowering snapshot temporaries.
    fn fresh(&mut self) -> SymbolName;

    /// The stable name for an SSA value. Must return the same name on
    /// every call with the same `value`.
    fn name_for_value(&mut self, function: &str, value: ir::Value) -> SymbolName;

    /// The stable name for a memory region. In `ARRAYS` mode this is the
    /// array-smashing summary variable; for a singleton region it is the
    /// scalar cell's variable, which is exactly the same name (the
    /// distinction is made by the caller based on `MemoryOracle::is_singleton`,
    /// not by the name itself).
    fn name_for_array(&mut self, array: ArrayId) -> SymbolName;

    /// The stable name bound to a function (used for call-graph prelude
    /// assignments, and nowhere else in this translator).
    fn name_for_function(&mut self, function: &str) -> SymbolName;
}

/// The reference `VariableFactory`: a monotonically increasing counter, so
/// two runs over identical input produce byte-identical names.
#[derive(Default)]
pub struct SequentialVariableFactory {
    next: u32,
    values: HashMap<(String, ir::Value), SymbolName>,
    arrays: HashMap<ArrayId, SymbolName>,
    functions: HashMap<String, SymbolName>,
}

impl SequentialVariableFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_name(&mut self) -> SymbolName {
        let n = SymbolName::new(self.next as usize);
        self.next += 1;
        n
    }
}

impl VariableFactory for SequentialVariableFactory {
    fn fresh(&mut self) -> SymbolName {
        self.next_name()
    }

    fn name_for_value(&mut self, function: &str, value: ir::Value) -> SymbolName {
        if let Some(n) = self.values.get(&(function.to_string(), value)) {
            return *n;
        }
        let n = self.next_name();
        self.values.insert((function.to_string(), value), n);
        n
    }

    fn name_for_array(&mut self, array: ArrayId) -> SymbolName {
        if let Some(n) = self.arrays.get(&array) {
            return *n;
        }
        let n = self.next_name();
        self.arrays.insert(array, n);
        n
    }

    fn name_for_function(&mut self, function: &str) -> SymbolName {
        if let Some(n) = self.functions.get(function) {
            return *n;
        }
        let n = self.next_name();
        self.functions.insert(function.to_string(), n);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable_across_repeated_lookups() {
        let mut vf = SequentialVariableFactory::new();
        let v = ir::Value::new(3);
        let a = vf.name_for_value("f", v);
        let b = vf.name_for_value("f", v);
        assert_eq!(a, b);
    }

    #[test]
    fn fresh_names_are_monotonic_and_distinct() {
        let mut vf = SequentialVariableFactory::new();
        let a = vf.fresh();
        let b = vf.fresh();
        assert_ne!(a, b);
    }
}
