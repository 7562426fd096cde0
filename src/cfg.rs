//! The output control-flow graph: labels, statements, and the graph
//! container itself.
//!
//! The CFG's own internal invariants (its simplifier, its printer) are out
//! of scope for this crate (§1); this module carries only the data the
//! translator must populate, plus the bookkeeping (`add_edge`, fresh
//! synthetic labels) needed to populate it correctly.

use crate::expr::{LinearConstraint, LinearExpression};
use crate::ir;
use crate::memory::ArrayId;
use crate::symtab::SymbolName;
use cranelift_entity::{entity_impl, PrimaryMap};
use num_bigint::BigInt;
use smallvec::SmallVec;

/// A CFG node's label. Distinct from `ir::Block`: every IR block gets one,
/// but synthetic edge blocks and the unified exit block get one too, and
/// none of the synthetic labels collide with an IR block's.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct CfgLabel(u32);
entity_impl!(CfgLabel, "cfg_bb");

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SelectCond {
    /// A single linear constraint was derivable from the compare driving
    /// the select: a native conditional-move primitive can use it
    /// directly.
    Constraint,
    /// No single constraint could be derived; select keyed on the
    /// boolean's own symbolic variable.
    Var(SymbolName),
}

/// One statement of straight-line code. Appended once during translation,
/// never mutated, per §3's CFG Statement invariant.
#[derive(Clone, Debug)]
pub enum Statement {
    Assign {
        dst: SymbolName,
        expr: LinearExpression,
    },
    Arith {
        op: ir::ArithOp,
        dst: SymbolName,
        lhs: LinearExpression,
        rhs: LinearExpression,
    },
    Bitwise {
        op: ir::BitwiseOp,
        dst: SymbolName,
        lhs: LinearExpression,
        rhs: LinearExpression,
    },
    Havoc {
        dst: SymbolName,
    },
    Assume {
        constraint: LinearConstraint,
    },
    /// `cond == Constraint` carries the constraint inline via the
    /// `constraint` field so a conditional-move primitive can consume it
    /// directly; `cond == Var(b)` is a plain select keyed on `b`.
    Select {
        dst: SymbolName,
        cond: SelectCond,
        constraint: Option<LinearConstraint>,
        if_true: LinearExpression,
        if_false: LinearExpression,
    },
    ArrayLoad {
        dst: SymbolName,
        array: ArrayId,
        index: LinearExpression,
        elem_size: u64,
    },
    ArrayStore {
        array: ArrayId,
        index: LinearExpression,
        value: LinearExpression,
        elem_size: u64,
    },
    /// The "initialization hook": sets an entire array's summary value.
    AssumeArray {
        array: ArrayId,
        value: BigInt,
    },
    /// A constant-data global initializer.
    ArrayInit {
        array: ArrayId,
        values: Vec<BigInt>,
    },
    /// The whole-array-summary copy `dst := src`, used by the `memcpy`
    /// intrinsic.
    ArrayAssign {
        dst: ArrayId,
        src: ArrayId,
    },
    Callsite {
        callee: String,
        dst: Option<SymbolName>,
        scalar_args: SmallVec<[LinearExpression; 4]>,
        /// `(formal-in-copy, ref-array-out)` pairs, in the order the
        /// callee's ref-array formals expect them.
        ref_arrays: SmallVec<[(SymbolName, ArrayId); 4]>,
        new_arrays: SmallVec<[ArrayId; 2]>,
    },
    Return {
        value: Option<(SymbolName, ir::Type)>,
    },
    Unreachable,
}

/// A node in the output CFG: one per IR block, plus one per synthetic edge
/// block and (when needed) one unified exit block.
#[derive(Clone, Debug, Default)]
pub struct CfgNode {
    /// `Some(name)` for nodes that mirror an IR block; `None` for
    /// synthetic nodes, so a printer can tell them apart.
    pub ir_name: Option<String>,
    pub stmts: Vec<Statement>,
    pub successors: Vec<CfgLabel>,
}

/// The formal-parameter list of a translated function, used only in
/// inter-procedural mode.
#[derive(Clone, Debug, Default)]
pub struct FunctionDecl {
    pub name: String,
    pub scalar_formals: Vec<SymbolName>,
    pub ref_in_formals: Vec<SymbolName>,
    pub ref_out_formals: Vec<SymbolName>,
    pub new_formals: Vec<SymbolName>,
    pub return_type: Option<ir::Type>,
}

#[derive(Debug)]
pub struct ControlFlowGraph {
    nodes: PrimaryMap<CfgLabel, CfgNode>,
    entry: Option<CfgLabel>,
    exit: Option<CfgLabel>,
    decl: Option<FunctionDecl>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        ControlFlowGraph {
            nodes: PrimaryMap::new(),
            entry: None,
            exit: None,
            decl: None,
        }
    }

    pub fn new_node(&mut self, ir_name: Option<String>) -> CfgLabel {
        self.nodes.push(CfgNode {
            ir_name,
            stmts: Vec::new(),
            successors: Vec::new(),
        })
    }

    pub fn push(&mut self, label: CfgLabel, stmt: Statement) {
        self.nodes[label].stmts.push(stmt);
    }

    pub fn prepend(&mut self, label: CfgLabel, stmt: Statement) {
        self.nodes[label].stmts.insert(0, stmt);
    }

    /// Adds `from -> to` and removes any pre-existing direct `from -> to`
    /// edge is the caller's responsibility (edge materialization replaces
    /// edges rather than adding to them); this only appends.
    pub fn add_edge(&mut self, from: CfgLabel, to: CfgLabel) {
        self.nodes[from].successors.push(to);
    }

    pub fn remove_edge(&mut self, from: CfgLabel, to: CfgLabel) {
        self.nodes[from].successors.retain(|&s| s != to);
    }

    pub fn set_entry(&mut self, label: CfgLabel) {
        self.entry = Some(label);
    }

    pub fn set_exit(&mut self, label: CfgLabel) {
        self.exit = Some(label);
    }

    pub fn set_decl(&mut self, decl: FunctionDecl) {
        self.decl = Some(decl);
    }

    pub fn entry(&self) -> Option<CfgLabel> {
        self.entry
    }

    pub fn exit(&self) -> Option<CfgLabel> {
        self.exit
    }

    pub fn decl(&self) -> Option<&FunctionDecl> {
        self.decl.as_ref()
    }

    pub fn node(&self, label: CfgLabel) -> &CfgNode {
        &self.nodes[label]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = CfgLabel> {
        self.nodes.keys()
    }

    pub fn successors(&self, label: CfgLabel) -> &[CfgLabel] {
        &self.nodes[label].successors
    }
}

impl Default for ControlFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}
