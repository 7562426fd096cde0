//! `PhiLowering`: replaces a successor block's phi nodes with a parallel
//! assignment emitted on the predecessor edge block.

use crate::cfg::Statement;
use crate::config::TranslatorOptions;
use crate::expr::LinearExpression;
use crate::ir::{self, Operand, Type};
use crate::sym_eval::SymEval;
use crate::symtab::SymbolName;
use std::collections::HashMap;

/// Lowers every phi at the head of `succ` for the edge coming from `pred`,
/// returning the statements to append to that edge's CFG block (or to
/// `pred`'s own block, when the edge is unconditional and has no
/// synthetic block of its own).
pub fn lower_phis(
    function: &ir::Function,
    se: &mut SymEval,
    opts: TranslatorOptions,
    succ: ir::Block,
    pred: ir::Block,
) -> Vec<Statement> {
    let block = function.block(succ);
    let Some(pred_idx) = block.preds.iter().position(|&p| p == pred) else {
        panic!("{pred:?} is not a predecessor of {succ:?}");
    };

    let mut stmts = Vec::new();
    let mut scratch: HashMap<ir::Value, SymbolName> = HashMap::new();

    // First pass: snapshot any same-block phi referenced by another phi's
    // incoming value, before the second pass can overwrite it.
    for phi in &block.phis {
        let Operand::Value(src_v) = phi.incoming[pred_idx] else {
            continue;
        };
        if !block.phis.iter().any(|q| q.dst == src_v) {
            continue;
        }
        if let Some(expr) = se.lookup(&Operand::Value(src_v)) {
            let fresh = se.vars().fresh();
            stmts.push(Statement::Assign {
                dst: fresh,
                expr,
            });
            scratch.insert(src_v, fresh);
        }
    }

    // Second pass: the actual parallel assignment, scratch-mapping first.
    for phi in &block.phis {
        if opts.disable_pointer_arith && !matches!(phi.ty, Type::Int(_)) {
            continue;
        }
        let incoming = &phi.incoming[pred_idx];
        let expr = match incoming {
            Operand::Value(v) if scratch.contains_key(v) => {
                Some(LinearExpression::var(scratch[v]))
            }
            other => se.lookup(other),
        };
        let dst = se.sym_var(phi.dst);
        match expr {
            Some(expr) => stmts.push(Statement::Assign { dst, expr }),
            None => stmts.push(Statement::Havoc { dst }),
        }
    }

    stmts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TrackLevel;
    use crate::symtab::SequentialVariableFactory;
    use cranelift_entity::{EntityRef, PrimaryMap};
    use ir::{BasicBlock, Function, PhiNode};
    use std::collections::HashMap as StdHashMap;

    fn swap_fixture() -> Function {
        let pred = ir::Block::new(0);
        let succ = ir::Block::new(1);
        let p1 = ir::Value::new(0);
        let p2 = ir::Value::new(1);

        let mut blocks = PrimaryMap::new();
        let pred_block = blocks.push(BasicBlock {
            name: "pred".into(),
            preds: vec![],
            phis: vec![],
            insts: vec![],
            terminator: Some(ir::Terminator::Br(succ)),
        });
        let succ_block = blocks.push(BasicBlock {
            name: "succ".into(),
            preds: vec![pred_block],
            phis: vec![
                PhiNode {
                    dst: p1,
                    ty: Type::Int(32),
                    incoming: vec![Operand::Value(p2)],
                },
                PhiNode {
                    dst: p2,
                    ty: Type::Int(32),
                    incoming: vec![Operand::Value(p1)],
                },
            ],
            insts: vec![],
            terminator: Some(ir::Terminator::Return(None)),
        });
        assert_eq!(pred_block, pred);
        assert_eq!(succ_block, succ);

        Function {
            name: "swap".into(),
            params: vec![],
            return_type: Type::Unknown,
            is_main: false,
            is_variadic: false,
            blocks,
            entry: pred,
        }
    }

    #[test]
    fn cyclic_phi_swap_snapshots_before_overwriting() {
        let func = swap_fixture();
        let mut vf = SequentialVariableFactory::new();
        let mut types = StdHashMap::new();
        types.insert(ir::Value::new(0), Type::Int(32));
        types.insert(ir::Value::new(1), Type::Int(32));
        let mut se = SymEval::new("swap", TrackLevel::None, &types, &mut vf);
        let opts = TranslatorOptions::new();

        let stmts = lower_phis(&func, &mut se, opts, ir::Block::new(1), ir::Block::new(0));

        // Two snapshots, then two assignments, in declaration order.
        assert_eq!(stmts.len(), 4);
        let snapshot_names: Vec<SymbolName> = stmts[0..2]
            .iter()
            .map(|s| match s {
                Statement::Assign { dst, .. } => *dst,
                _ => panic!("expected assign"),
            })
            .collect();

        match (&stmts[2], &stmts[3]) {
            (
                Statement::Assign { dst: d1, expr: e1 },
                Statement::Assign { dst: d2, expr: e2 },
            ) => {
                // p1 ends up with the snapshot of p2's old value, and
                // vice versa: a true swap, not a clobber.
                assert_eq!(e1.is_var(), Some(snapshot_names[0]));
                assert_eq!(e2.is_var(), Some(snapshot_names[1]));
                assert_ne!(d1, d2);
            }
            _ => panic!("expected two assigns"),
        }
    }
}
