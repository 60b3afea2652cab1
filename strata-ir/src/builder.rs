//! IR Builder
//!
//! Instruction construction helpers on [`Module`]. Every helper names the
//! block it appends to explicitly; the caller owns the insertion cursor.

use crate::error::IrError;
use crate::ids::{BlockId, InstrId, TypeId, ValueId};
use crate::instructions::{Instr, Opcode};
use crate::module::Module;
use crate::values::ValueKind;

impl Module {
    /// Append an instruction to the end of `block` and return its result value
    pub fn add_instr(&mut self, block: BlockId, instr: Instr) -> Result<ValueId, IrError> {
        if self.block(block).is_none() {
            return Err(IrError::InvalidBlock(block));
        }
        if self.is_terminated(block) {
            return Err(IrError::BlockTerminated(block));
        }
        let value = self.push_instr(instr);
        if let Some(b) = self.block_mut(block) {
            b.instrs.push(value);
        }
        Ok(value)
    }

    /// Insert an instruction at position `pos` of `block` (clamped to its length)
    pub fn insert_instr(
        &mut self,
        block: BlockId,
        pos: usize,
        instr: Instr,
    ) -> Result<ValueId, IrError> {
        if self.block(block).is_none() {
            return Err(IrError::InvalidBlock(block));
        }
        let value = self.push_instr(instr);
        if let Some(b) = self.block_mut(block) {
            let pos = pos.min(b.instrs.len());
            b.instrs.insert(pos, value);
        }
        Ok(value)
    }

    fn push_instr(&mut self, instr: Instr) -> ValueId {
        let id = InstrId::new(self.instrs.len());
        let ty = instr.ty;
        self.instrs.push(instr);
        self.add_value(ValueKind::Instr(id), ty)
    }

    fn check_value(&self, value: ValueId) -> Result<TypeId, IrError> {
        self.value(value)
            .map(|v| v.ty)
            .ok_or(IrError::InvalidValue(value))
    }

    /// Stack slot for one value of type `ty`; the result is a pointer to it
    pub fn build_alloca(&mut self, block: BlockId, ty: TypeId) -> Result<ValueId, IrError> {
        let ptr = self.types.get_ptr(ty);
        self.add_instr(block, Instr::new(Opcode::Alloca, vec![], ptr))
    }

    /// Stack slot inserted at `pos` instead of appended
    pub fn insert_alloca(
        &mut self,
        block: BlockId,
        pos: usize,
        ty: TypeId,
    ) -> Result<ValueId, IrError> {
        let ptr = self.types.get_ptr(ty);
        self.insert_instr(block, pos, Instr::new(Opcode::Alloca, vec![], ptr))
    }

    pub fn build_load(&mut self, block: BlockId, ptr: ValueId, ty: TypeId) -> Result<ValueId, IrError> {
        self.check_value(ptr)?;
        self.add_instr(block, Instr::new(Opcode::Load, vec![ptr], ty))
    }

    pub fn build_store(&mut self, block: BlockId, value: ValueId, ptr: ValueId) -> Result<ValueId, IrError> {
        self.check_value(value)?;
        self.check_value(ptr)?;
        let void = self.types.get_void();
        self.add_instr(block, Instr::new(Opcode::Store, vec![value, ptr], void))
    }

    /// Binary operation; comparisons yield bool, everything else the lhs type
    pub fn build_binary(
        &mut self,
        block: BlockId,
        op: Opcode,
        lhs: ValueId,
        rhs: ValueId,
    ) -> Result<ValueId, IrError> {
        let lhs_ty = self.check_value(lhs)?;
        self.check_value(rhs)?;
        let ty = if op.is_comparison() {
            self.types.get_bool()
        } else {
            lhs_ty
        };
        self.add_instr(block, Instr::new(op, vec![lhs, rhs], ty))
    }

    pub fn build_unary(&mut self, block: BlockId, op: Opcode, value: ValueId) -> Result<ValueId, IrError> {
        let ty = self.check_value(value)?;
        self.add_instr(block, Instr::new(op, vec![value], ty))
    }

    pub fn build_cast(
        &mut self,
        block: BlockId,
        op: Opcode,
        value: ValueId,
        ty: TypeId,
    ) -> Result<ValueId, IrError> {
        self.check_value(value)?;
        self.add_instr(block, Instr::new(op, vec![value], ty))
    }

    /// Address `base + index * size_of(pointee(base))`
    pub fn build_gep(&mut self, block: BlockId, base: ValueId, index: ValueId) -> Result<ValueId, IrError> {
        let ty = self.check_value(base)?;
        self.check_value(index)?;
        self.add_instr(block, Instr::new(Opcode::Gep, vec![base, index], ty))
    }

    /// Address of field `index` of the struct `base` points to
    pub fn build_field_ptr(
        &mut self,
        block: BlockId,
        base: ValueId,
        index: usize,
    ) -> Result<ValueId, IrError> {
        let base_ty = self.check_value(base)?;
        let field_ty = self
            .types
            .pointee(base_ty)
            .and_then(|st| self.types.element_type(st, index))
            .ok_or(IrError::InvalidType(base_ty))?;
        let ptr = self.types.get_ptr(field_ty);
        let i32_ty = self.types.get_int(32);
        let idx = self.const_int(i32_ty, index as i64);
        self.add_instr(block, Instr::new(Opcode::FieldPtr, vec![base, idx], ptr))
    }

    /// Element `index` of a struct or tuple value
    pub fn build_extract(
        &mut self,
        block: BlockId,
        aggregate: ValueId,
        index: usize,
    ) -> Result<ValueId, IrError> {
        let agg_ty = self.check_value(aggregate)?;
        let ty = self
            .types
            .element_type(agg_ty, index)
            .ok_or(IrError::InvalidType(agg_ty))?;
        let i32_ty = self.types.get_int(32);
        let idx = self.const_int(i32_ty, index as i64);
        self.add_instr(block, Instr::new(Opcode::ExtractValue, vec![aggregate, idx], ty))
    }

    /// Copy of `aggregate` with element `index` replaced by `value`
    pub fn build_insert(
        &mut self,
        block: BlockId,
        aggregate: ValueId,
        value: ValueId,
        index: usize,
    ) -> Result<ValueId, IrError> {
        let ty = self.check_value(aggregate)?;
        self.check_value(value)?;
        let i32_ty = self.types.get_int(32);
        let idx = self.const_int(i32_ty, index as i64);
        self.add_instr(
            block,
            Instr::new(Opcode::InsertValue, vec![aggregate, value, idx], ty),
        )
    }

    pub fn build_call(
        &mut self,
        block: BlockId,
        callee: ValueId,
        args: &[ValueId],
        ret: TypeId,
    ) -> Result<ValueId, IrError> {
        self.check_value(callee)?;
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(callee);
        for arg in args {
            self.check_value(*arg)?;
            operands.push(*arg);
        }
        self.add_instr(block, Instr::new(Opcode::Call, operands, ret))
    }

    /// Conditional branch
    pub fn build_br(
        &mut self,
        block: BlockId,
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<ValueId, IrError> {
        self.check_value(cond)?;
        let then_ref = self.block_ref(then_block);
        let else_ref = self.block_ref(else_block);
        let void = self.types.get_void();
        self.add_instr(block, Instr::new(Opcode::Br, vec![cond, then_ref, else_ref], void))
    }

    /// Unconditional jump
    pub fn build_jmp(&mut self, block: BlockId, target: BlockId) -> Result<ValueId, IrError> {
        let target_ref = self.block_ref(target);
        let void = self.types.get_void();
        self.add_instr(block, Instr::new(Opcode::Jmp, vec![target_ref], void))
    }

    /// Multiway branch on `value`; `cases` pairs a constant with its target
    pub fn build_switch(
        &mut self,
        block: BlockId,
        value: ValueId,
        default: BlockId,
        cases: &[(ValueId, BlockId)],
    ) -> Result<ValueId, IrError> {
        self.check_value(value)?;
        let default_ref = self.block_ref(default);
        let mut operands = vec![value, default_ref];
        for (case_value, target) in cases {
            self.check_value(*case_value)?;
            let target_ref = self.block_ref(*target);
            operands.push(*case_value);
            operands.push(target_ref);
        }
        let void = self.types.get_void();
        self.add_instr(block, Instr::new(Opcode::Switch, operands, void))
    }

    pub fn build_ret(&mut self, block: BlockId, value: Option<ValueId>) -> Result<ValueId, IrError> {
        let operands = match value {
            Some(v) => {
                self.check_value(v)?;
                vec![v]
            }
            None => vec![],
        };
        let void = self.types.get_void();
        self.add_instr(block, Instr::new(Opcode::Ret, operands, void))
    }

    pub fn build_unreachable(&mut self, block: BlockId) -> Result<ValueId, IrError> {
        let void = self.types.get_void();
        self.add_instr(block, Instr::new(Opcode::Unreachable, vec![], void))
    }
}
