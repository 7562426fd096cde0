//! `CfgBuilder`: orchestrates whole-function translation by driving
//! `InstructionLowering`, `ConditionLowering` and `PhiLowering` over every
//! block of an `ir::Function`, per the seven-step sequence in §4.5.

use crate::cfg::{ControlFlowGraph, FunctionDecl, Statement};
use crate::config::TranslatorOptions;
use crate::condition;
use crate::ctx::Ctx;
use crate::error::TranslateError;
use crate::expr::LinearExpression;
use crate::ir::{self, Operand, Terminator, Type};
use crate::memory::{MemoryOracle, TrackLevel};
use crate::phi;
use crate::sym_eval::SymEval;
use crate::symtab::VariableFactory;
use crate::uses::UseCounts;
use cranelift_entity::EntityRef;
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::HashMap;

pub struct CfgBuilder<'m> {
    mem: &'m dyn MemoryOracle,
    opts: TranslatorOptions,
    inter_procedural: bool,
}

impl<'m> CfgBuilder<'m> {
    pub fn new(mem: &'m dyn MemoryOracle, opts: TranslatorOptions, inter_procedural: bool) -> Self {
        CfgBuilder {
            mem,
            opts,
            inter_procedural,
        }
    }

    /// Translates one function into a standalone `ControlFlowGraph`.
    pub fn translate_function(
        &self,
        function: &ir::Function,
        module: &ir::Module,
        vars: &mut dyn VariableFactory,
    ) -> Result<ControlFlowGraph, TranslateError> {
        if function.blocks.is_empty() {
            return Err(TranslateError::EmptyFunction(function.name.clone()));
        }
        if self.mem.track_level() == TrackLevel::None {
            for block in function.blocks.values() {
                for inst in &block.insts {
                    if let ir::InstData::Load { ptr: Operand::Value(p) } = &inst.data {
                        if let Some(a) = self.mem.array_id(&function.name, *p) {
                            return Err(TranslateError::OracleTrackLevelMismatch {
                                function: function.name.clone(),
                                array: a.index() as u32,
                            });
                        }
                    }
                }
            }
        }

        log::debug!(
            "translating `{}`: {} block(s)",
            function.name,
            function.blocks.len()
        );

        let value_types = compute_value_types(function);
        let uses = UseCounts::compute(function);
        let mut cfg = ControlFlowGraph::new();

        let mut labels: HashMap<ir::Block, crate::cfg::CfgLabel> = HashMap::new();
        for (block, data) in function.blocks.iter() {
            labels.insert(block, cfg.new_node(Some(data.name.clone())));
        }
        cfg.set_entry(labels[&function.entry]);

        let mut return_labels = Vec::new();

        for (block, data) in function.blocks.iter() {
            let label = labels[&block];
            let mut ctx = Ctx {
                function,
                se: SymEval::new(&function.name, self.mem.track_level(), &value_types, &mut *vars),
                mem: self.mem,
                opts: self.opts,
                uses: &uses,
                layout: module.layout.as_ref(),
                inter_procedural: self.inter_procedural,
            };
            for inst in &data.insts {
                for stmt in crate::instruction::lower_instruction(&mut ctx, inst) {
                    cfg.push(label, stmt);
                }
            }

            match data.terminator.as_ref().expect("block has no terminator") {
                Terminator::Return(op) => {
                    let value = if self.inter_procedural && !function.is_main {
                        match op {
                            Some(Operand::Value(v)) if ctx.se.is_tracked(*v) => {
                                Some((ctx.se.sym_var(*v), ctx.se.type_of(*v).unwrap()))
                            }
                            _ => None,
                        }
                    } else {
                        None
                    };
                    cfg.push(label, Statement::Return { value });
                    return_labels.push(label);
                }
                Terminator::Unreachable => {
                    cfg.push(label, Statement::Unreachable);
                }
                Terminator::Br(target) => {
                    let stmts = phi::lower_phis(function, &mut ctx.se, self.opts, *target, block);
                    for s in stmts {
                        cfg.push(label, s);
                    }
                    cfg.add_edge(label, labels[target]);
                }
                Terminator::Brif {
                    cond,
                    true_block,
                    false_block,
                } => {
                    for &(target, polarity) in
                        &[(*true_block, false), (*false_block, true)]
                    {
                        let edge = cfg.new_node(None);
                        cfg.add_edge(label, edge);

                        // `cond` is a bare SSA value here, not an `Operand`:
                        // unlike `lhs`/`rhs` on `Arith`/`Icmp`/etc., a branch
                        // condition can never carry an inline immediate, so
                        // there is no statically-constant-condition case for
                        // this translator to prune as `Unreachable` — a
                        // constant condition would already have been
                        // canonicalized to an unconditional `Br` upstream.
                        if let Some(def) = function.defining_instruction(*cond) {
                            let stmts =
                                condition::lower_condition(function, &mut ctx.se, &uses, def, polarity);
                            for s in stmts {
                                cfg.push(edge, s);
                            }
                        }

                        let phi_stmts =
                            phi::lower_phis(function, &mut ctx.se, self.opts, target, block);
                        for s in phi_stmts {
                            cfg.push(edge, s);
                        }
                        cfg.add_edge(edge, labels[&target]);
                    }
                }
            }
        }

        match return_labels.len() {
            0 => {}
            1 => cfg.set_exit(return_labels[0]),
            _ => {
                let exit = cfg.new_node(None);
                for r in return_labels {
                    cfg.add_edge(r, exit);
                }
                cfg.set_exit(exit);
            }
        }

        let entry = cfg.entry().expect("entry was set above");

        // Step 5 before step 4 in code: `prepend` always inserts at index
        // 0, so the batch prepended *last* ends up frontmost. Running the
        // new-region prelude first and the global-initializer prelude
        // second yields the declared order (globals, then new-regions,
        // then the block's own content).
        if function.is_main && self.mem.track_level() == TrackLevel::Arrays {
            let new_region_stmts: Vec<Statement> = self
                .mem
                .new_regions(&function.name)
                .into_iter()
                .map(|a| Statement::AssumeArray {
                    array: a,
                    value: BigInt::zero(),
                })
                .collect();
            prepend_all(&mut cfg, entry, new_region_stmts);

            let global_stmts: Vec<Statement> = module
                .globals
                .iter()
                .filter_map(|g| {
                    let init = g.init.as_ref()?;
                    let array = self.mem.array_id_for_global(&g.name)?;
                    Some(match init {
                        ir::GlobalInit::Zero => Statement::AssumeArray {
                            array,
                            value: BigInt::zero(),
                        },
                        ir::GlobalInit::Data(values) => Statement::ArrayInit {
                            array,
                            values: values.clone(),
                        },
                    })
                })
                .collect();
            prepend_all(&mut cfg, entry, global_stmts);
        } else if self.mem.track_level() == TrackLevel::Arrays {
            // Non-`main` functions still get the per-function new-region
            // prelude (step 5); the global-initializer prelude is `main`-only.
            let new_region_stmts: Vec<Statement> = self
                .mem
                .new_regions(&function.name)
                .into_iter()
                .map(|a| Statement::AssumeArray {
                    array: a,
                    value: BigInt::zero(),
                })
                .collect();
            prepend_all(&mut cfg, entry, new_region_stmts);
        }

        if self.inter_procedural {
            let mut se = SymEval::new(&function.name, self.mem.track_level(), &value_types, &mut *vars);
            let scalar_formals: Vec<_> = function
                .params
                .iter()
                .filter(|(v, _)| se.is_tracked(*v))
                .map(|(v, _)| se.sym_var(*v))
                .collect();

            let rmn = self.mem.function_ref_mod(&function.name);
            let mut ref_in_formals = Vec::new();
            let mut ref_out_formals = Vec::new();
            let mut binding_stmts = Vec::new();
            for &array in &rmn.refs {
                let a_in = se.vars().fresh();
                let a_out = se.vars().name_for_array(array);
                ref_in_formals.push(a_in);
                ref_out_formals.push(a_out);
                binding_stmts.push(Statement::Assign {
                    dst: a_out,
                    expr: LinearExpression::var(a_in),
                });
            }
            prepend_all(&mut cfg, entry, binding_stmts);

            let new_formals: Vec<_> = self
                .mem
                .new_regions(&function.name)
                .into_iter()
                .map(|a| se.vars().name_for_array(a))
                .collect();

            cfg.set_decl(FunctionDecl {
                name: function.name.clone(),
                scalar_formals,
                ref_in_formals,
                ref_out_formals,
                new_formals,
                return_type: match function.return_type {
                    Type::Unknown => None,
                    ty => Some(ty),
                },
            });
        }

        if self.opts.print_cfg {
            println!("{cfg:?}");
        }

        log::debug!(
            "finished `{}`: {} CFG node(s)",
            function.name,
            cfg.num_nodes()
        );

        Ok(cfg)
    }
}

fn prepend_all(cfg: &mut ControlFlowGraph, label: crate::cfg::CfgLabel, stmts: Vec<Statement>) {
    for stmt in stmts.into_iter().rev() {
        cfg.prepend(label, stmt);
    }
}

fn compute_value_types(function: &ir::Function) -> HashMap<ir::Value, Type> {
    let mut types = HashMap::new();
    for (v, ty) in &function.params {
        types.insert(*v, *ty);
    }
    for block in function.blocks.values() {
        for phi in &block.phis {
            types.insert(phi.dst, phi.ty);
        }
        for inst in &block.insts {
            if let Some(dst) = inst.dst {
                types.insert(dst, inst.ty);
            }
        }
    }
    types
}
