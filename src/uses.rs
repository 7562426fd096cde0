//! Per-function use counting.
//!
//! `ConditionLowering`'s "compare has ≥ 2 uses" rule and its short-circuit
//! fallback ("the boolean itself ... has additional non-branch uses") both
//! need to know how many places in the function reference a given value.
//! This is computed once per function and handed to every lowering pass as
//! a read-only table.

use crate::ir::{self, InstData, Operand, Terminator};
use std::collections::HashMap;

#[derive(Default)]
pub struct UseCounts(HashMap<ir::Value, usize>);

impl UseCounts {
    pub fn compute(function: &ir::Function) -> Self {
        let mut counts: HashMap<ir::Value, usize> = HashMap::new();
        let mut bump = |op: &Operand| {
            if let Operand::Value(v) = op {
                *counts.entry(*v).or_insert(0) += 1;
            }
        };
        for block in function.blocks.values() {
            for phi in &block.phis {
                for incoming in &phi.incoming {
                    bump(incoming);
                }
            }
            for inst in &block.insts {
                visit_operands(&inst.data, &mut bump);
            }
            match &block.terminator {
                Some(Terminator::Return(Some(op))) => bump(op),
                Some(Terminator::Brif { cond, .. }) => bump(&Operand::Value(*cond)),
                _ => {}
            }
        }
        UseCounts(counts)
    }

    pub fn count(&self, value: ir::Value) -> usize {
        self.0.get(&value).copied().unwrap_or(0)
    }
}

fn visit_operands(data: &InstData, bump: &mut impl FnMut(&Operand)) {
    match data {
        InstData::Arith { lhs, rhs, .. }
        | InstData::Shift { lhs, rhs, .. }
        | InstData::Bitwise { lhs, rhs, .. }
        | InstData::Icmp { lhs, rhs, .. }
        | InstData::BoolOp { lhs, rhs, .. } => {
            bump(lhs);
            bump(rhs);
        }
        InstData::Cast { src, .. } => bump(src),
        InstData::Gep { base, indices } => {
            bump(base);
            for idx in indices {
                if let ir::GepIndex::Element { index, .. } = idx {
                    bump(index);
                }
            }
        }
        InstData::Load { ptr } => bump(ptr),
        InstData::Store { ptr, value } => {
            bump(ptr);
            bump(value);
        }
        InstData::Alloca => {}
        InstData::Select {
            cond,
            if_true,
            if_false,
        } => {
            bump(cond);
            bump(if_true);
            bump(if_false);
        }
        InstData::Call { args, .. } => {
            for a in args {
                bump(a);
            }
        }
    }
}
