//! The input SSA intermediate representation.
//!
//! Everything in this module is produced by an upstream loader/parser (out of
//! scope for this crate, per the translator's design) and is treated as
//! immutable by the rest of the crate. The shapes here are deliberately
//! narrow: only the information the translator actually consumes survives.

use cranelift_entity::{entity_impl, PrimaryMap};
use num_bigint::BigInt;
use std::collections::HashMap;

/// An SSA value: an instruction result, a block parameter is not modeled
/// (this IR uses LLVM-style per-block phi instructions instead of
/// block arguments), or a function formal parameter.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// A basic block in the input function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Block(u32);
entity_impl!(Block, "bb");

/// A non-terminator instruction.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// The tracked-vs-untracked type lattice the translator cares about.
///
/// Everything that is not an integer or a pointer (floats, vectors,
/// aggregates passed by value, opaque handles) is `Unknown`, which is
/// always untracked.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    /// An integer of the given bit width, including the `i1` booleans
    /// produced by compares.
    Int(u16),
    /// A pointer.
    Ptr,
    /// Anything else.
    Unknown,
}

impl Type {
    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Int(1))
    }

    /// Storage size in bytes, used for GEP strides. Only meaningful for
    /// `Int`/`Ptr`; struct/array element sizes come from `DataLayout`.
    pub fn storage_size(&self, layout: &DataLayout) -> u64 {
        match self {
            Type::Int(bits) => u64::from(*bits).div_ceil(8),
            Type::Ptr => u64::from(layout.pointer_width_bits) / 8,
            Type::Unknown => 0,
        }
    }
}

/// An operand: either a reference to a previously-defined SSA value, or an
/// immediate produced by the upstream constant-folder.
#[derive(Clone, Debug)]
pub enum Operand {
    Value(Value),
    ConstInt(BigInt),
    ConstBool(bool),
    /// LLVM `undef`-style "don't care" constant.
    Undef,
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IntCC {
    Eq,
    Ne,
    /// Signed less-than.
    Slt,
    /// Signed less-or-equal.
    Sle,
    /// Signed greater-than (normalized away by `ConditionLowering`).
    Sgt,
    /// Signed greater-or-equal (normalized away).
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl IntCC {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, IntCC::Ult | IntCC::Ule | IntCC::Ugt | IntCC::Uge)
    }

    /// Swap operand order, producing the complementary predicate that
    /// compares `(rhs, lhs)` instead of `(lhs, rhs)`.
    pub fn swap_operands(&self) -> IntCC {
        match self {
            IntCC::Eq => IntCC::Eq,
            IntCC::Ne => IntCC::Ne,
            IntCC::Slt => IntCC::Sgt,
            IntCC::Sgt => IntCC::Slt,
            IntCC::Sle => IntCC::Sge,
            IntCC::Sge => IntCC::Sle,
            IntCC::Ult => IntCC::Ugt,
            IntCC::Ugt => IntCC::Ult,
            IntCC::Ule => IntCC::Uge,
            IntCC::Uge => IntCC::Ule,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Sdiv,
    Udiv,
    Srem,
    Urem,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ShiftOp {
    Shl,
    Ashr,
    Lshr,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CastKind {
    Zext,
    Sext,
    Trunc,
    Bitcast,
    PtrToInt,
    IntToPtr,
}

/// One step of a GEP-style address computation.
#[derive(Clone, Debug)]
pub enum GepIndex {
    /// A constant struct-field index; `offset` is resolved from
    /// `DataLayout` at translation time.
    Field { struct_name: String, field: usize },
    /// An array/pointer step: `index * element_size`.
    Element { index: Operand, element_size: u64 },
}

#[derive(Clone, Debug)]
pub enum Callee {
    Direct(String),
    Indirect,
}

/// The opcode-specific payload of an instruction.
#[derive(Clone, Debug)]
pub enum InstData {
    Arith {
        op: ArithOp,
        lhs: Operand,
        rhs: Operand,
    },
    Shift {
        op: ShiftOp,
        lhs: Operand,
        rhs: Operand,
    },
    Bitwise {
        op: BitwiseOp,
        lhs: Operand,
        rhs: Operand,
    },
    Icmp {
        pred: IntCC,
        lhs: Operand,
        rhs: Operand,
    },
    BoolOp {
        op: BoolOp,
        lhs: Operand,
        rhs: Operand,
    },
    Cast {
        kind: CastKind,
        src: Operand,
        src_ty: Type,
    },
    Gep {
        base: Operand,
        indices: Vec<GepIndex>,
    },
    Load {
        ptr: Operand,
    },
    Store {
        ptr: Operand,
        value: Operand,
    },
    Alloca,
    Select {
        cond: Operand,
        if_true: Operand,
        if_false: Operand,
    },
    Call {
        callee: Callee,
        args: Vec<Operand>,
        variadic: bool,
    },
}

/// A non-terminator instruction.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub inst: Inst,
    /// `None` for void instructions (store, non-returning call).
    pub dst: Option<Value>,
    pub ty: Type,
    pub data: InstData,
}

/// A phi instruction at the head of a block.
#[derive(Clone, Debug)]
pub struct PhiNode {
    pub dst: Value,
    pub ty: Type,
    /// Incoming value per predecessor, in the same order as the owning
    /// block's `preds`.
    pub incoming: Vec<Operand>,
}

#[derive(Clone, Debug)]
pub enum Terminator {
    Return(Option<Operand>),
    Br(Block),
    Brif {
        cond: Value,
        true_block: Block,
        false_block: Block,
    },
    Unreachable,
}

#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    /// The original IR block name, e.g. `"bb3"` or `"entry"`.
    pub name: String,
    pub preds: Vec<Block>,
    pub phis: Vec<PhiNode>,
    pub insts: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

#[derive(Clone, Debug)]
pub struct StructLayout {
    pub field_offsets: Vec<u64>,
    pub size: u64,
}

/// Pointer width and struct layouts, supplied by the loader's data-layout
/// computation.
#[derive(Clone, Debug)]
pub struct DataLayout {
    pub pointer_width_bits: u32,
    pub struct_layouts: HashMap<String, StructLayout>,
}

impl DataLayout {
    pub fn field_offset(&self, struct_name: &str, field: usize) -> u64 {
        self.struct_layouts
            .get(struct_name)
            .unwrap_or_else(|| panic!("unknown struct layout `{struct_name}`"))
            .field_offsets[field]
    }
}

/// An initializer for a global variable: either an all-zero aggregate or an
/// explicit sequence of integer words.
#[derive(Clone, Debug)]
pub enum GlobalInit {
    Zero,
    Data(Vec<BigInt>),
}

#[derive(Clone, Debug)]
pub struct Global {
    pub name: String,
    pub init: Option<GlobalInit>,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<(Value, Type)>,
    pub return_type: Type,
    pub is_main: bool,
    pub is_variadic: bool,
    pub blocks: PrimaryMap<Block, BasicBlock>,
    pub entry: Block,
}

impl Function {
    pub fn block(&self, b: Block) -> &BasicBlock {
        &self.blocks[b]
    }

    /// The instruction that defines `v`, if any (phi-node definitions and
    /// function parameters are not instructions and are not returned
    /// here).
    pub fn defining_instruction(&self, v: Value) -> Option<&Instruction> {
        self.blocks
            .values()
            .find_map(|b| b.insts.iter().find(|i| i.dst == Some(v)))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Module {
    pub layout: Option<DataLayout>,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}
