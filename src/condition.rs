//! `ConditionLowering`: turns a boolean-producing instruction and a
//! polarity flag into a conjunctive set of `assume` statements.

use crate::cfg::Statement;
use crate::expr::{LinearConstraint, LinearExpression, RelOp};
use crate::ir::{self, BoolOp, InstData, IntCC, Operand};
use crate::sym_eval::SymEval;
use crate::uses::UseCounts;
use num_bigint::BigInt;

/// Appends statements semantically equivalent to `(polarity ? !cond : cond)`
/// for the boolean-producing `inst`, restricted to the conjunctive
/// fragment this translator can express.
pub fn lower_condition(
    function: &ir::Function,
    se: &mut SymEval,
    uses: &UseCounts,
    inst: &ir::Instruction,
    polarity: bool,
) -> Vec<Statement> {
    match &inst.data {
        InstData::Icmp { pred, lhs, rhs } => {
            let dst = inst
                .dst
                .expect("a compare instruction always produces a value");
            lower_compare_value(se, uses, dst, *pred, lhs, rhs, polarity)
        }
        InstData::BoolOp { op, lhs, rhs } => {
            // AND decomposes on its true edge; OR decomposes on its false
            // edge (De Morgan). The deliberate asymmetry is the point:
            // decomposing the other combination would require disjunctive
            // reasoning at the join, which is out of scope (§1).
            let decomposable =
                matches!((op, polarity), (BoolOp::And, false) | (BoolOp::Or, true));
            if decomposable {
                if let (Some(l), Some(r)) =
                    (defining_icmp(function, lhs), defining_icmp(function, rhs))
                {
                    let mut stmts = lower_condition(function, se, uses, l, polarity);
                    stmts.extend(lower_condition(function, se, uses, r, polarity));
                    return stmts;
                }
            }
            conservative_fallback(se, uses, inst.dst, polarity)
        }
        _ => conservative_fallback(se, uses, inst.dst, polarity),
    }
}

fn lower_compare_value(
    se: &mut SymEval,
    uses: &UseCounts,
    dst: ir::Value,
    pred: IntCC,
    lhs: &Operand,
    rhs: &Operand,
    polarity: bool,
) -> Vec<Statement> {
    let mut stmts = Vec::new();
    let (npred, nlhs, nrhs) = normalize_compare(pred, lhs, rhs);
    let a = se.lookup(&nlhs);
    let b = se.lookup(&nrhs);
    if let (Some(a), Some(b)) = (&a, &b) {
        // Deliberate fall-through, preserved from the source design: the
        // unsigned non-negativity constraints and the signed-form
        // constraints are both emitted, regardless of polarity.
        if npred.is_unsigned() {
            if a.is_var().is_some() {
                stmts.push(Statement::Assume {
                    constraint: ge_zero(a),
                });
            }
            if b.is_var().is_some() {
                stmts.push(Statement::Assume {
                    constraint: ge_zero(b),
                });
            }
        }
        let signed_pred = to_signed_equivalent(npred);
        stmts.push(Statement::Assume {
            constraint: signed_constraint(a, signed_pred, b, polarity),
        });
    }
    if let Some(extra) = extra_uses_assignment(se, uses, dst, polarity) {
        stmts.push(extra);
    }
    stmts
}

/// After emitting compare constraints, if the compare (or boolean) has
/// two or more uses, also pin its own symbolic variable to a consistent
/// 0/1 value, so code depending on the boolean directly (not just via the
/// branch) sees the value the branch assumed.
fn extra_uses_assignment(
    se: &mut SymEval,
    uses: &UseCounts,
    dst: ir::Value,
    polarity: bool,
) -> Option<Statement> {
    if se.is_tracked(dst) && uses.count(dst) >= 2 {
        let v = se.sym_var(dst);
        let value = if polarity { 0 } else { 1 };
        Some(Statement::Assign {
            dst: v,
            expr: LinearExpression::constant(BigInt::from(value)),
        })
    } else {
        None
    }
}

fn conservative_fallback(
    se: &mut SymEval,
    uses: &UseCounts,
    dst: Option<ir::Value>,
    polarity: bool,
) -> Vec<Statement> {
    let Some(dst) = dst else {
        return Vec::new();
    };
    extra_uses_assignment(se, uses, dst, polarity)
        .into_iter()
        .collect()
}

pub(crate) fn defining_icmp<'f>(
    function: &'f ir::Function,
    operand: &Operand,
) -> Option<&'f ir::Instruction> {
    let Operand::Value(v) = operand else {
        return None;
    };
    match function.defining_instruction(*v) {
        Some(i) if matches!(i.data, InstData::Icmp { .. }) => Some(i),
        _ => None,
    }
}

/// A single linear constraint equivalent to `pred(lhs, rhs)`, or `None` if
/// the predicate can't be reduced to one constraint (unsigned predicates
/// need the extra non-negativity bounds too, so they're excluded here) or
/// either operand fails `lookup`. Used by `Select`'s native conditional-move
/// case, which wants exactly one constraint to hand to a cmov primitive.
pub(crate) fn single_constraint_for_compare(
    se: &mut SymEval,
    pred: IntCC,
    lhs: &Operand,
    rhs: &Operand,
) -> Option<LinearConstraint> {
    if pred.is_unsigned() {
        return None;
    }
    let (npred, nlhs, nrhs) = normalize_compare(pred, lhs, rhs);
    let a = se.lookup(&nlhs)?;
    let b = se.lookup(&nrhs)?;
    Some(signed_constraint(&a, to_signed_equivalent(npred), &b, false))
}

fn normalize_compare(pred: IntCC, lhs: &Operand, rhs: &Operand) -> (IntCC, Operand, Operand) {
    match pred {
        IntCC::Sgt | IntCC::Sge | IntCC::Ugt | IntCC::Uge => {
            (pred.swap_operands(), rhs.clone(), lhs.clone())
        }
        _ => (pred, lhs.clone(), rhs.clone()),
    }
}

fn to_signed_equivalent(pred: IntCC) -> IntCC {
    match pred {
        IntCC::Ult => IntCC::Slt,
        IntCC::Ule => IntCC::Sle,
        other => other,
    }
}

fn signed_constraint(
    a: &LinearExpression,
    pred: IntCC,
    b: &LinearExpression,
    polarity: bool,
) -> LinearConstraint {
    match (pred, polarity) {
        (IntCC::Eq, false) => LinearConstraint::binary(a, RelOp::Eq, b),
        (IntCC::Eq, true) => LinearConstraint::binary(a, RelOp::Ne, b),
        (IntCC::Ne, false) => LinearConstraint::binary(a, RelOp::Ne, b),
        (IntCC::Ne, true) => LinearConstraint::binary(a, RelOp::Eq, b),
        (IntCC::Slt, false) => LinearConstraint::binary(a, RelOp::Le, &b.add_constant(-1)),
        (IntCC::Slt, true) => LinearConstraint::binary(a, RelOp::Ge, b),
        (IntCC::Sle, false) => LinearConstraint::binary(a, RelOp::Le, b),
        (IntCC::Sle, true) => LinearConstraint::binary(a, RelOp::Ge, &b.add_constant(1)),
        _ => unreachable!("compare predicate already normalized to Eq/Ne/Slt/Sle"),
    }
}

fn ge_zero(e: &LinearExpression) -> LinearConstraint {
    LinearConstraint::binary(&LinearExpression::zero(), RelOp::Le, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TrackLevel;
    use crate::symtab::SequentialVariableFactory;
    use cranelift_entity::EntityRef;
    use ir::{Instruction, Type};
    use std::collections::HashMap;

    fn slt(a: ir::Value, b: ir::Value, dst: ir::Value) -> ir::Instruction {
        Instruction {
            inst: ir::Inst::new(0),
            dst: Some(dst),
            ty: Type::Int(1),
            data: InstData::Icmp {
                pred: IntCC::Slt,
                lhs: Operand::Value(a),
                rhs: Operand::Value(b),
            },
        }
    }

    #[test]
    fn slt_true_edge_yields_le_minus_one() {
        let a = ir::Value::new(0);
        let b = ir::Value::new(1);
        let cmp = ir::Value::new(2);
        let inst = slt(a, b, cmp);
        let mut vf = SequentialVariableFactory::new();
        let mut types = HashMap::new();
        types.insert(a, Type::Int(32));
        types.insert(b, Type::Int(32));
        types.insert(cmp, Type::Int(1));
        let mut se = SymEval::new("f", TrackLevel::None, &types, &mut vf);
        let uses = UseCounts::default();
        let stmts = lower_condition_test(&mut se, &uses, &inst, false);
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Statement::Assume { constraint } => assert_eq!(constraint.op, RelOp::Le),
            _ => panic!("expected an assume"),
        }
    }

    #[test]
    fn negation_is_a_duality() {
        let a = ir::Value::new(0);
        let b = ir::Value::new(1);
        let cmp = ir::Value::new(2);
        let inst = slt(a, b, cmp);
        let mut types = HashMap::new();
        types.insert(a, Type::Int(32));
        types.insert(b, Type::Int(32));
        types.insert(cmp, Type::Int(1));

        let mut vf1 = SequentialVariableFactory::new();
        let mut se1 = SymEval::new("f", TrackLevel::None, &types, &mut vf1);
        let uses = UseCounts::default();
        let pos = lower_condition_test(&mut se1, &uses, &inst, false);

        let mut vf2 = SequentialVariableFactory::new();
        let mut se2 = SymEval::new("f", TrackLevel::None, &types, &mut vf2);
        let neg = lower_condition_test(&mut se2, &uses, &inst, true);

        let Statement::Assume { constraint: c1 } = &pos[0] else {
            panic!()
        };
        let Statement::Assume { constraint: c2 } = &neg[0] else {
            panic!()
        };
        assert_eq!(&c1.negate(), c2);
    }

    // A tiny stand-in for `defining_icmp`'s function lookup, since these
    // unit tests don't build a whole `ir::Function`.
    fn lower_condition_test(
        se: &mut SymEval,
        uses: &UseCounts,
        inst: &ir::Instruction,
        polarity: bool,
    ) -> Vec<Statement> {
        match &inst.data {
            InstData::Icmp { pred, lhs, rhs } => {
                lower_compare_value(se, uses, inst.dst.unwrap(), *pred, lhs, rhs, polarity)
            }
            _ => unreachable!(),
        }
    }
}
