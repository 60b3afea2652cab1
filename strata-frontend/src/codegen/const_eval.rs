//! Compile-time constant evaluation
//!
//! Folds literal arithmetic, bitwise and shift operators, negation and
//! complement, casts, parentheses, `sizeof`, enum values and references to
//! constants that are already folded. Evaluation never fails loudly: anything
//! that does not fold yields `None` and the caller decides on a fallback.

use super::types::{builtin_scalar, Scalar};
use super::{ConstValue, IrGenerator, Symbol, SymbolKey};
use crate::ast::{BinaryOp, Expr, ExprKind, Pos, TypeExpr, UnaryOp};
use crate::env::CheckedType;

/// Nesting limit for on-demand evaluation of other constants' initializers
const MAX_EVAL_DEPTH: u32 = 32;

/// Constant evaluator for expressions of one translation unit
pub struct ConstEval<'g, 'a> {
    gen: &'g IrGenerator<'a>,
    file: usize,
    /// Evaluate initializers of not-yet-folded constants instead of giving up
    on_demand: bool,
    depth: u32,
    /// Enum that `.member` refers to when the checker has no type for it
    enum_hint: Option<SymbolKey>,
}

impl<'g, 'a> ConstEval<'g, 'a> {
    pub fn new(gen: &'g IrGenerator<'a>, file: usize) -> Self {
        Self {
            gen,
            file,
            on_demand: false,
            depth: 0,
            enum_hint: None,
        }
    }

    pub fn on_demand(mut self) -> Self {
        self.on_demand = true;
        self
    }

    pub fn with_enum_hint(mut self, hint: Option<SymbolKey>) -> Self {
        self.enum_hint = hint;
        self
    }

    /// Fold to the first representation that works: string, integer, float
    pub fn const_value(&self, expr: &Expr) -> Option<ConstValue> {
        if let Some(s) = self.try_eval_const_string(expr) {
            return Some(ConstValue::Str(s));
        }
        if let Some(v) = self.try_eval_const_int(expr) {
            return Some(ConstValue::Int(v));
        }
        self.try_eval_const_float(expr).map(ConstValue::Float)
    }

    pub fn try_eval_const_int(&self, expr: &Expr) -> Option<i64> {
        match &expr.kind {
            ExprKind::IntLit(v) => Some(*v),
            ExprKind::BoolLit(b) => Some(i64::from(*b)),
            ExprKind::CharLit(c) => Some(i64::from(u32::from(*c))),
            ExprKind::Paren(inner) => self.try_eval_const_int(inner),
            ExprKind::Unary { op, operand } => {
                let v = self.try_eval_const_int(operand)?;
                Some(match op {
                    UnaryOp::Neg => v.wrapping_neg(),
                    UnaryOp::BitNot => !v,
                    UnaryOp::Not => i64::from(v == 0),
                })
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.try_eval_const_int(lhs)?;
                let r = self.try_eval_const_int(rhs)?;
                fold_int(*op, l, r)
            }
            ExprKind::Cast { ty, expr: inner } => match self.scalar_of(ty)? {
                Scalar::Int { width, signed } => {
                    let v = self
                        .try_eval_const_int(inner)
                        .or_else(|| self.try_eval_const_float(inner).map(|f| f as i64))?;
                    Some(truncate(v, width, signed))
                }
                Scalar::Bool => Some(i64::from(self.try_eval_const_int(inner)? != 0)),
                _ => None,
            },
            ExprKind::Ident(name) => match self.lookup(name)? {
                ConstValue::Int(v) => Some(v),
                _ => None,
            },
            ExprKind::Selector { base, field } => match self.lookup_selector(base, field)? {
                ConstValue::Int(v) => Some(v),
                _ => None,
            },
            ExprKind::EnumVal { enum_name, member } => {
                self.enum_value(expr.pos, enum_name.as_deref(), member)
            }
            ExprKind::SizeOf(ty) => self.size_of_type(ty).and_then(|s| i64::try_from(s).ok()),
            _ => None,
        }
    }

    pub fn try_eval_const_float(&self, expr: &Expr) -> Option<f64> {
        match &expr.kind {
            ExprKind::FloatLit(v) => Some(*v),
            ExprKind::IntLit(v) => Some(*v as f64),
            ExprKind::Paren(inner) => self.try_eval_const_float(inner),
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Some(-self.try_eval_const_float(operand)?),
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.try_eval_const_float(lhs)?;
                let r = self.try_eval_const_float(rhs)?;
                match op {
                    BinaryOp::Add => Some(l + r),
                    BinaryOp::Sub => Some(l - r),
                    BinaryOp::Mul => Some(l * r),
                    BinaryOp::Div => Some(l / r),
                    _ => None,
                }
            }
            ExprKind::Cast { ty, expr: inner } => match self.scalar_of(ty)? {
                Scalar::Float { width: 32 } => Some(f64::from(self.try_eval_const_float(inner)? as f32)),
                Scalar::Float { .. } => self.try_eval_const_float(inner),
                _ => None,
            },
            ExprKind::Ident(name) => match self.lookup(name)? {
                ConstValue::Float(v) => Some(v),
                ConstValue::Int(v) => Some(v as f64),
                ConstValue::Str(_) => None,
            },
            ExprKind::Selector { base, field } => match self.lookup_selector(base, field)? {
                ConstValue::Float(v) => Some(v),
                ConstValue::Int(v) => Some(v as f64),
                ConstValue::Str(_) => None,
            },
            _ => None,
        }
    }

    pub fn try_eval_const_string(&self, expr: &Expr) -> Option<String> {
        match &expr.kind {
            ExprKind::StringLit(s) => Some(s.clone()),
            ExprKind::Paren(inner) => self.try_eval_const_string(inner),
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } => {
                let mut l = self.try_eval_const_string(lhs)?;
                l.push_str(&self.try_eval_const_string(rhs)?);
                Some(l)
            }
            ExprKind::Ident(name) => match self.lookup(name)? {
                ConstValue::Str(s) => Some(s),
                _ => None,
            },
            ExprKind::Selector { base, field } => match self.lookup_selector(base, field)? {
                ConstValue::Str(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    fn scalar_of(&self, ty: &TypeExpr) -> Option<Scalar> {
        match ty {
            TypeExpr::Named { module: None, name } => builtin_scalar(name, self.gen.options.int_width),
            _ => None,
        }
    }

    fn lookup(&self, name: &str) -> Option<ConstValue> {
        let module = self.gen.module_name(self.file);
        let (symbol, _) = self.gen.lookup_symbol(module, name)?;
        self.symbol_value(symbol)
    }

    /// `module.name` references
    fn lookup_selector(&self, base: &Expr, field: &str) -> Option<ConstValue> {
        let ExprKind::Ident(alias) = &base.kind else {
            return None;
        };
        if !self.gen.is_module(self.file, alias) {
            return None;
        }
        let symbol = self.gen.lookup_qualified(self.file, alias, field)?;
        self.symbol_value(symbol)
    }

    fn symbol_value(&self, symbol: Symbol) -> Option<ConstValue> {
        let Symbol::Const(key) = symbol else {
            return None;
        };
        if let Some(entry) = self.gen.consts.get(&key) {
            if entry.placeholder || entry.global.is_some() {
                return None;
            }
            return Some(entry.value.clone());
        }
        if !self.on_demand || self.depth >= MAX_EVAL_DEPTH {
            return None;
        }
        let (file, init) = self.gen.const_decls.get(&key)?;
        let nested = ConstEval {
            gen: self.gen,
            file: *file,
            on_demand: true,
            depth: self.depth + 1,
            enum_hint: None,
        };
        nested.const_value(init)
    }

    fn enum_value(&self, pos: Pos, enum_name: Option<&str>, member: &str) -> Option<i64> {
        let key = match enum_name {
            Some(name) => {
                let symbol = match name.rsplit_once('.') {
                    Some((alias, short)) => self.gen.lookup_qualified(self.file, alias, short)?,
                    None => {
                        let module = self.gen.module_name(self.file);
                        self.gen.lookup_symbol(module, name)?.0
                    }
                };
                match symbol {
                    Symbol::Enum(key) => key,
                    _ => return None,
                }
            }
            None => match self.gen.env.type_of(pos) {
                Some(CheckedType::Enum { module, name }) => (module.clone(), name.clone()),
                _ => self.enum_hint.clone()?,
            },
        };
        self.gen.enums.get(&key)?.value(member)
    }

    fn size_of_type(&self, ty: &TypeExpr) -> Option<u64> {
        let gen = self.gen;
        let types = &gen.module.types;
        match ty {
            TypeExpr::Named { module: None, name } if builtin_scalar(name, gen.options.int_width).is_some() => {
                match builtin_scalar(name, gen.options.int_width)? {
                    Scalar::Void => Some(0),
                    Scalar::Bool => Some(1),
                    Scalar::Int { width, .. } | Scalar::Float { width } => Some(u64::from(width) / 8),
                    Scalar::BytePtr => Some(types.pointer_size()),
                    Scalar::String => Some(types.size_of(gen.runtime.string)),
                }
            }
            TypeExpr::Named { module, name } => {
                let symbol = match module {
                    Some(alias) => gen.lookup_qualified(self.file, alias, name)?,
                    None => gen.lookup_symbol(gen.module_name(self.file), name)?.0,
                };
                match symbol {
                    Symbol::Struct(id) | Symbol::SumType(id) => Some(types.size_of(id)),
                    Symbol::Enum(key) => Some(types.size_of(gen.enums.get(&key)?.ty)),
                    _ => None,
                }
            }
            TypeExpr::Ptr(_) | TypeExpr::Fn { .. } => Some(types.pointer_size()),
            TypeExpr::Array { elem, len } => {
                let len = u64::try_from(self.try_eval_const_int(len)?).ok()?;
                Some(self.size_of_type(elem)? * len)
            }
            TypeExpr::DynArray(_) => Some(types.size_of(gen.runtime.array)),
            TypeExpr::Tuple(_) => None,
        }
    }
}

/// Fold an integer binary operation; division by zero and oversized shifts do not fold
pub(crate) fn fold_int(op: BinaryOp, l: i64, r: i64) -> Option<i64> {
    Some(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => l.checked_div(r)?,
        BinaryOp::Rem => l.checked_rem(r)?,
        BinaryOp::BitAnd => l & r,
        BinaryOp::BitOr => l | r,
        BinaryOp::BitXor => l ^ r,
        BinaryOp::Shl => l.checked_shl(u32::try_from(r).ok()?)?,
        BinaryOp::Shr => l.checked_shr(u32::try_from(r).ok()?)?,
        BinaryOp::Eq => i64::from(l == r),
        BinaryOp::Ne => i64::from(l != r),
        BinaryOp::Lt => i64::from(l < r),
        BinaryOp::Le => i64::from(l <= r),
        BinaryOp::Gt => i64::from(l > r),
        BinaryOp::Ge => i64::from(l >= r),
        BinaryOp::LogicalAnd => i64::from(l != 0 && r != 0),
        BinaryOp::LogicalOr => i64::from(l != 0 || r != 0),
    })
}

/// Wrap `v` to an integer of `width` bits
pub(crate) fn truncate(v: i64, width: u16, signed: bool) -> i64 {
    if width == 0 || width >= 64 {
        return v;
    }
    let mask = (1i64 << width) - 1;
    let bits = v & mask;
    if signed && (bits >> (width - 1)) & 1 == 1 {
        bits | !mask
    } else {
        bits
    }
}
