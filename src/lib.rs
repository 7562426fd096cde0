//! Translates an SSA intermediate representation into a simplified
//! control-flow graph suited to numeric (and, in `ARRAYS` mode, array)
//! abstract interpretation.
//!
//! The crate is organized around two external collaborators the caller
//! supplies — [`MemoryOracle`] (memory-region analysis) and
//! [`VariableFactory`] (symbol naming) — and a pipeline of per-instruction,
//! per-condition, and per-phi lowering passes driven by [`CfgBuilder`].
//! Everything upstream of the IR in [`ir`] (parsing, the memory-region
//! analysis itself, the CFG's own simplifier) is out of scope.

pub mod cfg;
pub mod condition;
pub mod config;
pub mod ctx;
pub mod error;
pub mod expr;
pub mod instruction;
pub mod ir;
pub mod memory;
pub mod phi;
pub mod sym_eval;
pub mod symtab;
pub mod uses;

mod builder;

pub use builder::CfgBuilder;
pub use cfg::{CfgLabel, ControlFlowGraph, FunctionDecl, SelectCond, Statement};
pub use config::TranslatorOptions;
pub use error::TranslateError;
pub use memory::{ArrayId, MemoryOracle, RefModNew, TrackLevel};
pub use symtab::{SymbolName, VariableFactory};

/// Translates every function in `module` into its own [`ControlFlowGraph`],
/// in declaration order. A single function's failure (an empty body, or an
/// oracle/track-level mismatch) aborts the whole batch; callers that want
/// partial results should drive [`CfgBuilder::translate_function`]
/// themselves instead.
///
/// In inter-procedural mode, once every function has been translated this
/// also cross-checks each `Callsite`'s ref/new array counts against the
/// callee's own declared formals, since a single function's translation has
/// no visibility into any other function's `FunctionDecl`.
pub fn translate_module(
    module: &ir::Module,
    mem: &dyn MemoryOracle,
    opts: TranslatorOptions,
    inter_procedural: bool,
    vars: &mut dyn VariableFactory,
) -> Result<Vec<(String, ControlFlowGraph)>, TranslateError> {
    let builder = CfgBuilder::new(mem, opts, inter_procedural);
    let results: Vec<(String, ControlFlowGraph)> = module
        .functions
        .iter()
        .map(|f| {
            builder
                .translate_function(f, module, vars)
                .map(|cfg| (f.name.clone(), cfg))
        })
        .collect::<Result<_, _>>()?;

    if inter_procedural {
        check_callsite_arities(&results)?;
    }

    Ok(results)
}

fn check_callsite_arities(results: &[(String, ControlFlowGraph)]) -> Result<(), TranslateError> {
    use std::collections::HashMap;

    let decls: HashMap<&str, &FunctionDecl> = results
        .iter()
        .filter_map(|(name, cfg)| cfg.decl().map(|d| (name.as_str(), d)))
        .collect();

    for (caller, cfg) in results {
        for label in cfg.labels() {
            for stmt in &cfg.node(label).stmts {
                let Statement::Callsite { callee, ref_arrays, new_arrays, .. } = stmt else {
                    continue;
                };
                let Some(decl) = decls.get(callee.as_str()) else {
                    continue;
                };
                if ref_arrays.len() != decl.ref_in_formals.len() {
                    return Err(TranslateError::ArityMismatch {
                        caller: caller.clone(),
                        callee: callee.clone(),
                        actual: ref_arrays.len(),
                        formal: decl.ref_in_formals.len(),
                    });
                }
                if new_arrays.len() != decl.new_formals.len() {
                    return Err(TranslateError::ArityMismatch {
                        caller: caller.clone(),
                        callee: callee.clone(),
                        actual: new_arrays.len(),
                        formal: decl.new_formals.len(),
                    });
                }
            }
        }
    }
    Ok(())
}
