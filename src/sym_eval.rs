//! `SymEval`: the pure lookup layer between IR operands and linear
//! expressions.
//!
//! `SymEval` has no side effects of its own; it delegates name issuance to
//! the `VariableFactory` it borrows (which does memoize, so that repeated
//! lookups of the same value are stable).

use crate::ir::{self, Operand, Type};
use crate::memory::TrackLevel;
use crate::symtab::{SymbolName, VariableFactory};
use crate::expr::LinearExpression;
use num_bigint::BigInt;
use std::collections::HashMap;

/// The three-way type lattice `SymEval::get_type` reports.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TypeKind {
    Int,
    Ptr,
    Unk,
}

pub struct SymEval<'a> {
    function: &'a str,
    track_level: TrackLevel,
    value_types: &'a HashMap<ir::Value, Type>,
    vars: &'a mut dyn VariableFactory,
}

impl<'a> SymEval<'a> {
    pub fn new(
        function: &'a str,
        track_level: TrackLevel,
        value_types: &'a HashMap<ir::Value, Type>,
        vars: &'a mut dyn VariableFactory,
    ) -> Self {
        SymEval {
            function,
            track_level,
            value_types,
            vars,
        }
    }

    pub fn vars(&mut self) -> &mut dyn VariableFactory {
        self.vars
    }

    pub fn get_type(&self, ty: Type) -> TypeKind {
        match ty {
            Type::Int(_) => TypeKind::Int,
            Type::Ptr => TypeKind::Ptr,
            Type::Unknown => TypeKind::Unk,
        }
    }

    fn is_tracked_type(&self, ty: Type) -> bool {
        match self.get_type(ty) {
            TypeKind::Int => true,
            TypeKind::Ptr => self.track_level != TrackLevel::None,
            TypeKind::Unk => false,
        }
    }

    /// True if `value`'s type participates in numeric reasoning.
    pub fn is_tracked(&self, value: ir::Value) -> bool {
        match self.value_types.get(&value) {
            Some(ty) => self.is_tracked_type(*ty),
            None => false,
        }
    }

    pub fn type_of(&self, value: ir::Value) -> Option<Type> {
        self.value_types.get(&value).copied()
    }

    /// Deterministic mapping from an SSA value to its symbolic name.
    /// Callers should only invoke this on tracked values.
    pub fn sym_var(&mut self, value: ir::Value) -> SymbolName {
        self.vars.name_for_value(self.function, value)
    }

    /// A constant expression, a variable expression, or `None` for
    /// untracked values and refused constants (`undef`).
    pub fn lookup(&mut self, operand: &Operand) -> Option<LinearExpression> {
        match operand {
            Operand::ConstInt(v) => Some(LinearExpression::constant(v.clone())),
            Operand::ConstBool(b) => Some(LinearExpression::constant(bool_to_bigint(*b))),
            Operand::Undef => None,
            Operand::Value(v) => {
                if self.is_tracked(*v) {
                    Some(LinearExpression::var(self.sym_var(*v)))
                } else {
                    None
                }
            }
        }
    }

    /// Is this expression a single variable with coefficient 1 and zero
    /// constant?
    pub fn is_var(expr: &LinearExpression) -> bool {
        expr.is_var().is_some()
    }
}

fn bool_to_bigint(b: bool) -> BigInt {
    BigInt::from(if b { 1 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::SequentialVariableFactory;
    use cranelift_entity::EntityRef;

    #[test]
    fn untracked_pointer_lookup_is_none_at_track_level_none() {
        let mut vf = SequentialVariableFactory::new();
        let v = ir::Value::new(0);
        let mut types = HashMap::new();
        types.insert(v, Type::Ptr);
        let mut se = SymEval::new("f", TrackLevel::None, &types, &mut vf);
        assert!(!se.is_tracked(v));
        assert_eq!(se.lookup(&Operand::Value(v)), None);
    }

    #[test]
    fn integer_constant_lookups_to_itself() {
        let mut vf = SequentialVariableFactory::new();
        let types = HashMap::new();
        let mut se = SymEval::new("f", TrackLevel::None, &types, &mut vf);
        let e = se.lookup(&Operand::ConstInt(BigInt::from(42))).unwrap();
        assert_eq!(e.as_constant(), Some(&BigInt::from(42)));
    }

    #[test]
    fn undef_is_refused() {
        let mut vf = SequentialVariableFactory::new();
        let types = HashMap::new();
        let mut se = SymEval::new("f", TrackLevel::None, &types, &mut vf);
        assert_eq!(se.lookup(&Operand::Undef), None);
    }
}
