//! IR Instructions
//!
//! An instruction is an opcode, its ordered operands and its result type.
//! Operand conventions per opcode are listed on [`Opcode`].

use crate::ids::{TypeId, ValueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction opcodes
///
/// Operand layout:
/// - binary ops: `[lhs, rhs]`; unary ops and casts: `[value]`
/// - `Alloca`: `[]`, result is a pointer to the slot
/// - `Load`: `[ptr]`; `Store`: `[value, ptr]`
/// - `Gep`: `[base, index]`, address `base + index * size_of(pointee(base))`
/// - `FieldPtr`: `[base, const index]`, address of a struct field
/// - `ExtractValue`: `[aggregate, const index]`; `InsertValue`: `[aggregate, value, const index]`
/// - `Call`: `[callee, args...]`
/// - `Br`: `[cond, then_block, else_block]`; `Jmp`: `[target]`
/// - `Switch`: `[value, default_block, case_value_0, case_block_0, ...]`
/// - `Ret`: `[]` or `[value]`; `Unreachable`: `[]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Integer arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,

    // Float arithmetic
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,

    // Integer comparisons (signedness from operand type)
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Float comparisons
    FEq,
    FNe,
    FLt,
    FLe,
    FGt,
    FGe,

    // Unary
    Neg,
    FNeg,
    Not,

    // Conversions
    Trunc,
    ZExt,
    SExt,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    FpExt,
    FpTrunc,
    PtrToInt,
    IntToPtr,
    Bitcast,

    // Memory
    Alloca,
    Load,
    Store,
    Gep,
    FieldPtr,

    // Aggregates
    ExtractValue,
    InsertValue,

    Call,

    // Terminators
    Br,
    Jmp,
    Switch,
    Ret,
    Unreachable,
}

impl Opcode {
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Br | Opcode::Jmp | Opcode::Switch | Opcode::Ret | Opcode::Unreachable
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Opcode::Eq
                | Opcode::Ne
                | Opcode::Lt
                | Opcode::Le
                | Opcode::Gt
                | Opcode::Ge
                | Opcode::FEq
                | Opcode::FNe
                | Opcode::FLt
                | Opcode::FLe
                | Opcode::FGt
                | Opcode::FGe
        )
    }

    pub fn is_cast(self) -> bool {
        matches!(
            self,
            Opcode::Trunc
                | Opcode::ZExt
                | Opcode::SExt
                | Opcode::FpToSi
                | Opcode::FpToUi
                | Opcode::SiToFp
                | Opcode::UiToFp
                | Opcode::FpExt
                | Opcode::FpTrunc
                | Opcode::PtrToInt
                | Opcode::IntToPtr
                | Opcode::Bitcast
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Rem => "rem",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::FAdd => "fadd",
            Opcode::FSub => "fsub",
            Opcode::FMul => "fmul",
            Opcode::FDiv => "fdiv",
            Opcode::FRem => "frem",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Lt => "lt",
            Opcode::Le => "le",
            Opcode::Gt => "gt",
            Opcode::Ge => "ge",
            Opcode::FEq => "feq",
            Opcode::FNe => "fne",
            Opcode::FLt => "flt",
            Opcode::FLe => "fle",
            Opcode::FGt => "fgt",
            Opcode::FGe => "fge",
            Opcode::Neg => "neg",
            Opcode::FNeg => "fneg",
            Opcode::Not => "not",
            Opcode::Trunc => "trunc",
            Opcode::ZExt => "zext",
            Opcode::SExt => "sext",
            Opcode::FpToSi => "fptosi",
            Opcode::FpToUi => "fptoui",
            Opcode::SiToFp => "sitofp",
            Opcode::UiToFp => "uitofp",
            Opcode::FpExt => "fpext",
            Opcode::FpTrunc => "fptrunc",
            Opcode::PtrToInt => "ptrtoint",
            Opcode::IntToPtr => "inttoptr",
            Opcode::Bitcast => "bitcast",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::Gep => "gep",
            Opcode::FieldPtr => "fieldptr",
            Opcode::ExtractValue => "extractvalue",
            Opcode::InsertValue => "insertvalue",
            Opcode::Call => "call",
            Opcode::Br => "br",
            Opcode::Jmp => "jmp",
            Opcode::Switch => "switch",
            Opcode::Ret => "ret",
            Opcode::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// IR Instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    pub op: Opcode,
    pub operands: Vec<ValueId>,
    pub ty: TypeId,
}

impl Instr {
    pub fn new(op: Opcode, operands: Vec<ValueId>, ty: TypeId) -> Self {
        Self { op, operands, ty }
    }

    pub fn is_terminator(&self) -> bool {
        self.op.is_terminator()
    }

    /// Operands naming successor blocks, in terminator order
    pub fn target_operands(&self) -> &[ValueId] {
        match self.op {
            Opcode::Br => self.operands.get(1..).unwrap_or(&[]),
            Opcode::Jmp => &self.operands,
            // Switch targets are interleaved with case values; see `switch_targets`
            _ => &[],
        }
    }

    /// Default block followed by the case blocks of a switch
    pub fn switch_targets(&self) -> Vec<ValueId> {
        if self.op != Opcode::Switch {
            return Vec::new();
        }
        let mut targets = Vec::new();
        if let Some(default) = self.operands.get(1) {
            targets.push(*default);
        }
        targets.extend(self.operands.iter().skip(3).step_by(2).copied());
        targets
    }
}
