//! `InstructionLowering`: turns one non-terminator IR instruction into zero
//! or more CFG statements.
//!
//! Phi nodes and terminators are handled by `phi` and `builder`
//! respectively and never reach this module. A bare compare (`Icmp`) only
//! ever gets here as the input to `Select`'s native-cmov case or as dead
//! code (if its result has no use other than a branch, `builder` never
//! calls this on it); this module otherwise leaves `Icmp` alone.

use crate::cfg::{SelectCond, Statement};
use crate::condition;
use crate::ctx::Ctx;
use crate::expr::LinearExpression;
use crate::ir::{self, CastKind, InstData, Operand, Type};
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use smallvec::SmallVec;

const SHADOW_MEM_PREFIX: &str = "shadow.mem.";
const FUNCTION_ENTRY_MARKER: &str = "seahorn.fn.enter";
const ALLOC_NAMES: [&str; 4] = ["malloc", "calloc", "valloc", "palloc"];

/// Lowers `inst`, appending its statements to the returned vector. `ctx`'s
/// `se` is mutated (fresh names, memoized symbol lookups) regardless of
/// whether a statement is actually emitted.
pub fn lower_instruction(ctx: &mut Ctx, inst: &ir::Instruction) -> Vec<Statement> {
    if ctx.opts.include_havoc {
        log::trace!("lowering inst {:?}: {:?}", inst.inst, inst.data);
    }
    match &inst.data {
        InstData::Arith { op, lhs, rhs } => lower_arith(ctx, inst, *op, lhs, rhs),
        InstData::Shift { op, lhs, rhs } => lower_shift(ctx, inst, *op, lhs, rhs),
        InstData::Bitwise { op, lhs, rhs } => lower_bitwise(ctx, inst, *op, lhs, rhs),
        InstData::Icmp { .. } => Vec::new(),
        InstData::BoolOp { .. } => Vec::new(),
        InstData::Cast { kind, src, src_ty } => lower_cast(ctx, inst, *kind, src, *src_ty),
        InstData::Gep { base, indices } => lower_gep(ctx, inst, base, indices),
        InstData::Load { ptr } => lower_load(ctx, inst, ptr),
        InstData::Store { ptr, value } => lower_store(ctx, ptr, value),
        InstData::Alloca => lower_alloca(ctx, inst),
        InstData::Select {
            cond,
            if_true,
            if_false,
        } => lower_select(ctx, inst, cond, if_true, if_false),
        InstData::Call {
            callee,
            args,
            variadic,
        } => lower_call(ctx, inst, callee, args, *variadic),
    }
}

fn havoc_dst(ctx: &mut Ctx, inst: &ir::Instruction) -> Vec<Statement> {
    match inst.dst {
        Some(v) if ctx.se.is_tracked(v) => vec![Statement::Havoc {
            dst: ctx.se.sym_var(v),
        }],
        _ => Vec::new(),
    }
}

/// A destination left unconstrained because an operand failed to resolve
/// (as opposed to a case this module can never model, which always
/// havocs via `havoc_dst`). Per §6/§4.4, `include_havoc` decides whether
/// that gap is made explicit: set, it emits `Havoc`; unset, it emits
/// nothing and `dst` stays implicitly unconstrained.
fn unconstrained_dst(ctx: &mut Ctx, dst: ir::Value) -> Vec<Statement> {
    if ctx.opts.include_havoc {
        vec![Statement::Havoc {
            dst: ctx.se.sym_var(dst),
        }]
    } else {
        Vec::new()
    }
}

// ---------------------------------------------------------------------
// Binary arithmetic
// ---------------------------------------------------------------------

fn lower_arith(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    op: ir::ArithOp,
    lhs: &Operand,
    rhs: &Operand,
) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if !ctx.se.is_tracked(dst) {
        return Vec::new();
    }
    let (Some(l), Some(r)) = (ctx.se.lookup(lhs), ctx.se.lookup(rhs)) else {
        return unconstrained_dst(ctx, dst);
    };
    if matches!(op, ir::ArithOp::Udiv | ir::ArithOp::Urem)
        && l.as_constant().is_some()
        && r.as_constant().is_some()
    {
        log::warn!("unsound constant pattern: {op:?} over two constants, havocking dst");
        return vec![Statement::Havoc {
            dst: ctx.se.sym_var(dst),
        }];
    }
    let dst_sym = ctx.se.sym_var(dst);
    if l.as_constant().is_some() {
        // The primitive's left operand can't be a bare constant: materialize
        // it first, then reissue with `dst` on the left.
        vec![
            Statement::Assign { dst: dst_sym, expr: l },
            Statement::Arith {
                op,
                dst: dst_sym,
                lhs: LinearExpression::var(dst_sym),
                rhs: r,
            },
        ]
    } else {
        vec![Statement::Arith {
            op,
            dst: dst_sym,
            lhs: l,
            rhs: r,
        }]
    }
}

fn lower_shift(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    op: ir::ShiftOp,
    lhs: &Operand,
    rhs: &Operand,
) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if !ctx.se.is_tracked(dst) {
        return Vec::new();
    }
    let shift_amount = match rhs {
        Operand::ConstInt(k) if !k.is_negative() => k.clone(),
        _ => return havoc_dst(ctx, inst),
    };
    let arith_op = match op {
        ir::ShiftOp::Shl => ir::ArithOp::Mul,
        ir::ShiftOp::Ashr => ir::ArithOp::Sdiv,
        ir::ShiftOp::Lshr => return havoc_dst(ctx, inst),
    };
    let Some(l) = ctx.se.lookup(lhs) else {
        return unconstrained_dst(ctx, dst);
    };
    let scale = BigInt::from(2).pow(shift_amount.to_u32().unwrap_or(u32::MAX));
    let dst_sym = ctx.se.sym_var(dst);
    vec![Statement::Arith {
        op: arith_op,
        dst: dst_sym,
        lhs: l,
        rhs: LinearExpression::constant(scale),
    }]
}

fn lower_bitwise(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    op: ir::BitwiseOp,
    lhs: &Operand,
    rhs: &Operand,
) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if !ctx.se.is_tracked(dst) {
        return Vec::new();
    }
    let (Some(l), Some(r)) = (ctx.se.lookup(lhs), ctx.se.lookup(rhs)) else {
        return havoc_dst(ctx, inst);
    };
    let dst_sym = ctx.se.sym_var(dst);
    vec![Statement::Bitwise {
        op,
        dst: dst_sym,
        lhs: l,
        rhs: r,
    }]
}

// ---------------------------------------------------------------------
// Cast
// ---------------------------------------------------------------------

fn lower_cast(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    kind: CastKind,
    src: &Operand,
    src_ty: Type,
) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if !ctx.se.is_tracked(dst) {
        return Vec::new();
    }
    if ctx.opts.disable_pointer_arith && !matches!(inst.ty, Type::Int(_)) {
        return Vec::new();
    }
    if matches!(kind, CastKind::Zext | CastKind::Sext) && is_address_index_only(ctx, dst) {
        return Vec::new();
    }
    if all_uses_are_non_track_memory(ctx.function, dst) {
        return Vec::new();
    }
    let dst_sym = ctx.se.sym_var(dst);
    match ctx.se.lookup(src) {
        Some(expr) => vec![Statement::Assign { dst: dst_sym, expr }],
        None if src_ty.is_bool() => {
            let zero = LinearExpression::constant(BigInt::zero());
            let one = LinearExpression::constant(BigInt::one());
            vec![
                Statement::Assume {
                    constraint: crate::expr::LinearConstraint::binary(
                        &zero,
                        crate::expr::RelOp::Le,
                        &LinearExpression::var(dst_sym),
                    ),
                },
                Statement::Assume {
                    constraint: crate::expr::LinearConstraint::binary(
                        &LinearExpression::var(dst_sym),
                        crate::expr::RelOp::Le,
                        &one,
                    ),
                },
            ]
        }
        None => Vec::new(),
    }
}

/// True if every use of `v` is, itself, an index operand of a `Gep`'s
/// `Element` step (the array-indexing case cast results are elided for).
/// A conservative, syntactic stand-in for the "used exclusively to compute
/// an address" criterion named alongside the cast rule.
fn is_address_index_only(ctx: &Ctx, v: ir::Value) -> bool {
    let mut any = false;
    for block in ctx.function.blocks.values() {
        for inst in &block.insts {
            if let InstData::Gep { base, indices } = &inst.data {
                if operand_is(base, v) {
                    return false;
                }
                for idx in indices {
                    if let ir::GepIndex::Element { index, .. } = idx {
                        if operand_is(index, v) {
                            any = true;
                        }
                    }
                }
            }
            if instruction_uses(inst, v) && !matches!(inst.data, InstData::Gep { .. }) {
                return false;
            }
        }
        if let Some(term) = &block.terminator {
            if terminator_uses(term, v) {
                return false;
            }
        }
        for phi in &block.phis {
            if phi.incoming.iter().any(|op| operand_is(op, v)) {
                return false;
            }
        }
    }
    any
}

// ---------------------------------------------------------------------
// Address computation (GEP)
// ---------------------------------------------------------------------

fn lower_gep(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    base: &Operand,
    indices: &[ir::GepIndex],
) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if !ctx.se.is_tracked(dst) {
        return Vec::new();
    }
    let dst_sym = ctx.se.sym_var(dst);
    if ctx.opts.disable_pointer_arith || all_uses_are_non_track_memory(ctx.function, dst) {
        return vec![Statement::Havoc { dst: dst_sym }];
    }
    let Some(base_expr) = ctx.se.lookup(base) else {
        return vec![Statement::Havoc { dst: dst_sym }];
    };
    let Some(layout) = ctx.layout else {
        return vec![Statement::Havoc { dst: dst_sym }];
    };

    if let Some(const_offset) = constant_offset(layout, indices) {
        return vec![Statement::Assign {
            dst: dst_sym,
            expr: base_expr.add_constant(const_offset),
        }];
    }

    let mut stmts = vec![Statement::Assign {
        dst: dst_sym,
        expr: base_expr,
    }];
    let mut pending_const = BigInt::zero();
    for idx in indices {
        match idx {
            ir::GepIndex::Field { struct_name, field } => {
                pending_const += layout.field_offset(struct_name, *field);
            }
            ir::GepIndex::Element { index, element_size } => {
                let Some(index_expr) = ctx.se.lookup(index) else {
                    return vec![Statement::Havoc { dst: dst_sym }];
                };
                if !pending_const.is_zero() {
                    stmts.push(Statement::Arith {
                        op: ir::ArithOp::Add,
                        dst: dst_sym,
                        lhs: LinearExpression::var(dst_sym),
                        rhs: LinearExpression::constant(pending_const.clone()),
                    });
                    pending_const = BigInt::zero();
                }
                let scaled = index_expr.scale(&BigInt::from(*element_size));
                stmts.push(Statement::Arith {
                    op: ir::ArithOp::Add,
                    dst: dst_sym,
                    lhs: LinearExpression::var(dst_sym),
                    rhs: scaled,
                });
            }
        }
    }
    if !pending_const.is_zero() {
        stmts.push(Statement::Arith {
            op: ir::ArithOp::Add,
            dst: dst_sym,
            lhs: LinearExpression::var(dst_sym),
            rhs: LinearExpression::constant(pending_const),
        });
    }
    stmts
}

/// `Some(total)` if every step's contribution is known at translation
/// time (struct-field offsets always are; array/pointer steps only when
/// the index operand is itself a constant).
fn constant_offset(layout: &ir::DataLayout, indices: &[ir::GepIndex]) -> Option<BigInt> {
    let mut total = BigInt::zero();
    for idx in indices {
        match idx {
            ir::GepIndex::Field { struct_name, field } => {
                total += layout.field_offset(struct_name, *field);
            }
            ir::GepIndex::Element { index, element_size } => match index {
                Operand::ConstInt(v) => total += v * element_size,
                _ => return None,
            },
        }
    }
    Some(total)
}

// ---------------------------------------------------------------------
// Load / Store
// ---------------------------------------------------------------------

fn lower_load(ctx: &mut Ctx, inst: &ir::Instruction, ptr: &Operand) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if ctx.mem.track_level() != crate::memory::TrackLevel::Arrays || !matches!(inst.ty, Type::Int(_))
    {
        return havoc_dst(ctx, inst);
    }
    let Operand::Value(ptr_v) = ptr else {
        return havoc_dst(ctx, inst);
    };
    let Some(array) = ctx.mem.array_id(&ctx.function.name, *ptr_v) else {
        return havoc_dst(ctx, inst);
    };
    let dst_sym = ctx.se.sym_var(dst);
    let Some(index) = ctx.se.lookup(ptr) else {
        // Open question (resolved defensively): havoc the enclosing array,
        // not just the destination.
        let array_sym = ctx.se.vars().name_for_array(array);
        return vec![
            Statement::Havoc { dst: array_sym },
            Statement::Havoc { dst: dst_sym },
        ];
    };
    if ctx.mem.is_singleton(array) {
        let scalar = ctx.se.vars().name_for_array(array);
        vec![Statement::Assign {
            dst: dst_sym,
            expr: LinearExpression::var(scalar),
        }]
    } else {
        let elem_size = inst.ty.storage_size(layout_or_default(ctx));
        vec![Statement::ArrayLoad {
            dst: dst_sym,
            array,
            index,
            elem_size,
        }]
    }
}

fn lower_store(ctx: &mut Ctx, ptr: &Operand, value: &Operand) -> Vec<Statement> {
    if ctx.mem.track_level() != crate::memory::TrackLevel::Arrays {
        return Vec::new();
    }
    let Some(value_ty) = operand_type(ctx, value) else {
        return Vec::new();
    };
    if !matches!(value_ty, Type::Int(_)) {
        return Vec::new();
    }
    let Operand::Value(ptr_v) = ptr else {
        return Vec::new();
    };
    let Some(array) = ctx.mem.array_id(&ctx.function.name, *ptr_v) else {
        return Vec::new();
    };
    let Some(index) = ctx.se.lookup(ptr) else {
        let array_sym = ctx.se.vars().name_for_array(array);
        return vec![Statement::Havoc { dst: array_sym }];
    };
    let Some(val) = ctx.se.lookup(value) else {
        return Vec::new();
    };
    if ctx.mem.is_singleton(array) {
        let scalar = ctx.se.vars().name_for_array(array);
        vec![Statement::Assign { dst: scalar, expr: val }]
    } else {
        let elem_size = value_ty.storage_size(layout_or_default(ctx));
        vec![Statement::ArrayStore {
            array,
            index,
            value: val,
            elem_size,
        }]
    }
}

fn layout_or_default<'f>(ctx: &Ctx<'f>) -> &'f ir::DataLayout {
    ctx.layout
        .expect("ARRAYS-mode load/store requires a data layout")
}

fn operand_type(ctx: &Ctx, op: &Operand) -> Option<Type> {
    match op {
        Operand::Value(v) => ctx.se.type_of(*v),
        Operand::ConstInt(_) => Some(Type::Int(64)),
        Operand::ConstBool(_) => Some(Type::Int(1)),
        Operand::Undef => None,
    }
}

// ---------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------

fn lower_alloca(ctx: &mut Ctx, inst: &ir::Instruction) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if ctx.mem.track_level() != crate::memory::TrackLevel::Arrays {
        return Vec::new();
    }
    let Some(array) = ctx.mem.array_id(&ctx.function.name, dst) else {
        return Vec::new();
    };
    vec![Statement::AssumeArray {
        array,
        value: BigInt::zero(),
    }]
}

// ---------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------

fn lower_select(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    cond: &Operand,
    if_true: &Operand,
    if_false: &Operand,
) -> Vec<Statement> {
    let Some(dst) = inst.dst else {
        return Vec::new();
    };
    if !ctx.se.is_tracked(dst) {
        return Vec::new();
    }
    let dst_sym = ctx.se.sym_var(dst);

    let constant_branch = match cond {
        Operand::ConstBool(b) => Some(*b),
        Operand::ConstInt(v) => Some(!v.is_zero()),
        _ => None,
    };
    if let Some(taken) = constant_branch {
        let chosen = if taken { if_true } else { if_false };
        return match ctx.se.lookup(chosen) {
            Some(expr) => vec![Statement::Assign { dst: dst_sym, expr }],
            None => vec![Statement::Havoc { dst: dst_sym }],
        };
    }

    if let Operand::Value(cond_v) = cond {
        if let Some(cmp) = condition::defining_icmp(ctx.function, &Operand::Value(*cond_v)) {
            if let InstData::Icmp { pred, lhs, rhs } = &cmp.data {
                if let Some(constraint) =
                    condition::single_constraint_for_compare(&mut ctx.se, *pred, lhs, rhs)
                {
                    if let (Some(t), Some(f)) = (ctx.se.lookup(if_true), ctx.se.lookup(if_false)) {
                        return vec![Statement::Select {
                            dst: dst_sym,
                            cond: SelectCond::Constraint,
                            constraint: Some(constraint),
                            if_true: t,
                            if_false: f,
                        }];
                    }
                }
            }
        }
        if ctx.se.is_tracked(*cond_v) {
            let cond_sym = ctx.se.sym_var(*cond_v);
            if let (Some(t), Some(f)) = (ctx.se.lookup(if_true), ctx.se.lookup(if_false)) {
                return vec![Statement::Select {
                    dst: dst_sym,
                    cond: SelectCond::Var(cond_sym),
                    constraint: None,
                    if_true: t,
                    if_false: f,
                }];
            }
        }
    }
    vec![Statement::Havoc { dst: dst_sym }]
}

// ---------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------

fn lower_call(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    callee: &ir::Callee,
    args: &[Operand],
    variadic: bool,
) -> Vec<Statement> {
    let name = match callee {
        ir::Callee::Indirect => return havoc_dst(ctx, inst),
        ir::Callee::Direct(name) => name,
    };
    if name.starts_with(SHADOW_MEM_PREFIX) || name == FUNCTION_ENTRY_MARKER {
        return Vec::new();
    }
    if ctx.function.is_main && ALLOC_NAMES.contains(&name.as_str()) {
        if let Some(dst) = inst.dst {
            if let Some(array) = ctx.mem.array_id(&ctx.function.name, dst) {
                return vec![Statement::AssumeArray {
                    array,
                    value: BigInt::zero(),
                }];
            }
        }
        return havoc_dst(ctx, inst);
    }
    match name.as_str() {
        "memset" => return lower_memset(ctx, args),
        "memcpy" => return lower_memcpy(ctx, args),
        "memmove" => return Vec::new(),
        "verifier.assume" => return lower_verifier_assume(ctx, args, false),
        "verifier.assume.not" => return lower_verifier_assume(ctx, args, true),
        _ => {}
    }
    if variadic || !ctx.inter_procedural {
        return havoc_dst(ctx, inst);
    }
    lower_general_call(ctx, inst, name, args)
}

fn lower_memset(ctx: &mut Ctx, args: &[Operand]) -> Vec<Statement> {
    let (Some(ptr_op), Some(val_op)) = (args.first(), args.get(1)) else {
        return Vec::new();
    };
    let Operand::Value(ptr_v) = ptr_op else {
        return Vec::new();
    };
    let Operand::ConstInt(val) = val_op else {
        return Vec::new();
    };
    let Some(array) = ctx.mem.array_id(&ctx.function.name, *ptr_v) else {
        return Vec::new();
    };
    let array_sym = ctx.se.vars().name_for_array(array);
    vec![
        Statement::Havoc { dst: array_sym },
        Statement::AssumeArray {
            array,
            value: val.clone(),
        },
    ]
}

fn lower_memcpy(ctx: &mut Ctx, args: &[Operand]) -> Vec<Statement> {
    let (Some(Operand::Value(dst_ptr)), Some(Operand::Value(src_ptr))) =
        (args.first(), args.get(1))
    else {
        return Vec::new();
    };
    let (Some(dst_arr), Some(src_arr)) = (
        ctx.mem.array_id(&ctx.function.name, *dst_ptr),
        ctx.mem.array_id(&ctx.function.name, *src_ptr),
    ) else {
        return Vec::new();
    };
    let dst_sym = ctx.se.vars().name_for_array(dst_arr);
    vec![
        Statement::Havoc { dst: dst_sym },
        Statement::ArrayAssign {
            dst: dst_arr,
            src: src_arr,
        },
    ]
}

fn lower_verifier_assume(ctx: &mut Ctx, args: &[Operand], polarity: bool) -> Vec<Statement> {
    let Some(Operand::Value(mut cond_v)) = args.first().cloned() else {
        return Vec::new();
    };
    if let Some(def) = ctx.function.defining_instruction(cond_v) {
        if let InstData::Cast {
            kind: CastKind::Zext,
            src: Operand::Value(src_v),
            ..
        } = &def.data
        {
            cond_v = *src_v;
        }
    }
    let Some(def) = ctx.function.defining_instruction(cond_v) else {
        return Vec::new();
    };
    condition::lower_condition(ctx.function, &mut ctx.se, ctx.uses, def, polarity)
}

fn lower_general_call(
    ctx: &mut Ctx,
    inst: &ir::Instruction,
    name: &str,
    args: &[Operand],
) -> Vec<Statement> {
    let mut stmts = Vec::new();
    let scalar_args: SmallVec<[LinearExpression; 4]> =
        args.iter().filter_map(|a| ctx.se.lookup(a)).collect();

    let rmn = ctx.mem.ref_mod_new(&ctx.function.name, inst.inst);
    let mut ref_arrays: SmallVec<[(crate::symtab::SymbolName, crate::memory::ArrayId); 4]> =
        SmallVec::new();
    for &array in &rmn.refs {
        let array_sym = ctx.se.vars().name_for_array(array);
        let in_name = ctx.se.vars().fresh();
        stmts.push(Statement::Assign {
            dst: in_name,
            expr: LinearExpression::var(array_sym),
        });
        stmts.push(Statement::Havoc { dst: array_sym });
        ref_arrays.push((in_name, array));
    }

    let dst_sym = inst
        .dst
        .filter(|&v| ctx.se.is_tracked(v))
        .map(|v| ctx.se.sym_var(v));

    stmts.push(Statement::Callsite {
        callee: name.to_string(),
        dst: dst_sym,
        scalar_args,
        ref_arrays,
        new_arrays: rmn.news.iter().copied().collect(),
    });

    for &array in &rmn.mods {
        let array_sym = ctx.se.vars().name_for_array(array);
        stmts.push(Statement::Havoc { dst: array_sym });
    }
    stmts
}

// ---------------------------------------------------------------------
// Shared use-site helpers
// ---------------------------------------------------------------------

fn operand_is(op: &Operand, v: ir::Value) -> bool {
    matches!(op, Operand::Value(vv) if *vv == v)
}

fn instruction_uses(inst: &ir::Instruction, v: ir::Value) -> bool {
    match &inst.data {
        InstData::Arith { lhs, rhs, .. }
        | InstData::Shift { lhs, rhs, .. }
        | InstData::Bitwise { lhs, rhs, .. }
        | InstData::Icmp { lhs, rhs, .. }
        | InstData::BoolOp { lhs, rhs, .. } => operand_is(lhs, v) || operand_is(rhs, v),
        InstData::Cast { src, .. } => operand_is(src, v),
        InstData::Gep { base, indices } => {
            operand_is(base, v)
                || indices.iter().any(|idx| match idx {
                    ir::GepIndex::Element { index, .. } => operand_is(index, v),
                    ir::GepIndex::Field { .. } => false,
                })
        }
        InstData::Load { ptr } => operand_is(ptr, v),
        InstData::Store { ptr, value } => operand_is(ptr, v) || operand_is(value, v),
        InstData::Alloca => false,
        InstData::Select {
            cond,
            if_true,
            if_false,
        } => operand_is(cond, v) || operand_is(if_true, v) || operand_is(if_false, v),
        InstData::Call { args, .. } => args.iter().any(|a| operand_is(a, v)),
    }
}

fn terminator_uses(term: &ir::Terminator, v: ir::Value) -> bool {
    match term {
        ir::Terminator::Return(Some(op)) => operand_is(op, v),
        ir::Terminator::Brif { cond, .. } => *cond == v,
        _ => false,
    }
}

/// True iff every use of `v` is a load/store whose value-type is
/// non-integer, a call to a shadow-memory/debug function, or a cast whose
/// own result transitively satisfies this same property. A value with no
/// uses at all is vacuously true (nothing downstream cares, so eliding the
/// defining work is safe).
fn all_uses_are_non_track_memory(function: &ir::Function, v: ir::Value) -> bool {
    let mut found_any = false;
    for block in function.blocks.values() {
        for inst in &block.insts {
            if !instruction_uses(inst, v) {
                continue;
            }
            found_any = true;
            if !use_is_non_track_memory(function, inst, v) {
                return false;
            }
        }
        for phi in &block.phis {
            if phi.incoming.iter().any(|op| operand_is(op, v)) {
                return false;
            }
        }
        if let Some(term) = &block.terminator {
            if terminator_uses(term, v) {
                return false;
            }
        }
    }
    found_any
}

fn use_is_non_track_memory(function: &ir::Function, inst: &ir::Instruction, v: ir::Value) -> bool {
    match &inst.data {
        InstData::Load { ptr } if operand_is(ptr, v) => !matches!(inst.ty, Type::Int(_)),
        InstData::Store { ptr, value } if operand_is(ptr, v) => {
            !value_is_int(function, value)
        }
        InstData::Call { callee, .. } => matches!(
            callee,
            ir::Callee::Direct(name) if name.starts_with(SHADOW_MEM_PREFIX) || name == FUNCTION_ENTRY_MARKER
        ),
        InstData::Cast { src, .. } if operand_is(src, v) => inst
            .dst
            .map(|d| all_uses_are_non_track_memory(function, d))
            .unwrap_or(true),
        _ => false,
    }
}

fn value_is_int(function: &ir::Function, op: &Operand) -> bool {
    match op {
        Operand::Value(v) => function
            .defining_instruction(*v)
            .map(|i| matches!(i.ty, Type::Int(_)))
            .unwrap_or(true),
        Operand::ConstInt(_) | Operand::ConstBool(_) => true,
        Operand::Undef => false,
    }
}
