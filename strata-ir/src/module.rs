//! Module and Global Variables
//!
//! The module is the arena that owns everything: the type store, values,
//! instructions, blocks, functions and globals live in flat arrays and are
//! addressed by their ids.

use crate::blocks::Block;
use crate::error::IrError;
use crate::function::Function;
use crate::ids::{BlockId, FuncId, GlobalId, InstrId, TypeId, ValueId};
use crate::instructions::Instr;
use crate::types::TypeStore;
use crate::values::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Global variable definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalVar {
    pub name: String,
    pub ty: TypeId,
    pub is_mutable: bool,
    /// Serialized bytes for compile-time folded data; `None` means zero
    /// initialised or filled in by the runtime initializer
    pub init: Option<Vec<u8>>,
}

/// IR Module - the whole program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub types: TypeStore,
    pub values: Vec<Value>,
    pub instrs: Vec<Instr>,
    pub blocks: Vec<Block>,
    pub funcs: Vec<Function>,
    pub globals: Vec<GlobalVar>,
    #[serde(skip)]
    func_names: HashMap<String, FuncId>,
    #[serde(skip)]
    global_names: HashMap<String, GlobalId>,
}

impl Module {
    pub fn new(name: String, pointer_size: u64) -> Self {
        Self {
            name,
            types: TypeStore::new(pointer_size),
            values: Vec::new(),
            instrs: Vec::new(),
            blocks: Vec::new(),
            funcs: Vec::new(),
            globals: Vec::new(),
            func_names: HashMap::new(),
            global_names: HashMap::new(),
        }
    }

    pub fn add_value(&mut self, kind: ValueKind, ty: TypeId) -> ValueId {
        let id = ValueId::new(self.values.len());
        self.values.push(Value::new(kind, ty));
        id
    }

    /// Add a function with one parameter value per parameter type
    pub fn add_function(
        &mut self,
        name: &str,
        param_types: &[TypeId],
        ret: TypeId,
        is_variadic: bool,
    ) -> FuncId {
        let id = FuncId::new(self.funcs.len());
        let mut function = Function::new(name.to_string(), ret);
        function.is_variadic = is_variadic;
        for (index, ty) in param_types.iter().enumerate() {
            let param = self.add_value(
                ValueKind::Param {
                    func: id,
                    index: index as u32,
                },
                *ty,
            );
            function.params.push(param);
        }
        self.funcs.push(function);
        self.func_names.insert(name.to_string(), id);
        id
    }

    pub fn add_block(&mut self, func: FuncId, name: &str) -> Result<BlockId, IrError> {
        if func.index() >= self.funcs.len() {
            return Err(IrError::InvalidFunction(func));
        }
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(Block::new(name.to_string(), func));
        self.funcs[func.index()].blocks.push(id);
        Ok(id)
    }

    pub fn add_global(&mut self, global: GlobalVar) -> GlobalId {
        let id = GlobalId::new(self.globals.len());
        self.global_names.insert(global.name.clone(), id);
        self.globals.push(global);
        id
    }

    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id.index())
    }

    /// Type of a value, void for unknown ids
    pub fn value_type(&self, id: ValueId) -> TypeId {
        self.value(id).map(|v| v.ty).unwrap_or(TypeId(0))
    }

    pub fn instr(&self, id: InstrId) -> Option<&Instr> {
        self.instrs.get(id.index())
    }

    /// The instruction producing `value`, if it is an instruction result
    pub fn instr_of(&self, value: ValueId) -> Option<&Instr> {
        self.instr(self.value(value)?.as_instr()?)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.index())
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.funcs.get(id.index())
    }

    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut Function> {
        self.funcs.get_mut(id.index())
    }

    pub fn global(&self, id: GlobalId) -> Option<&GlobalVar> {
        self.globals.get(id.index())
    }

    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.func_names.get(name).copied()
    }

    pub fn find_global(&self, name: &str) -> Option<GlobalId> {
        self.global_names.get(name).copied()
    }

    /// The block's terminator, if its last instruction is one
    pub fn terminator(&self, block: BlockId) -> Option<&Instr> {
        let last = self.block(block)?.last()?;
        self.instr_of(last).filter(|instr| instr.is_terminator())
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.terminator(block).is_some()
    }

    // Constants and references

    pub fn const_int(&mut self, ty: TypeId, value: i64) -> ValueId {
        self.add_value(ValueKind::ConstInt(value), ty)
    }

    pub fn const_float(&mut self, ty: TypeId, value: f64) -> ValueId {
        self.add_value(ValueKind::ConstFloat(value), ty)
    }

    pub fn const_str(&mut self, ty: TypeId, value: &str) -> ValueId {
        self.add_value(ValueKind::ConstStr(value.to_string()), ty)
    }

    pub fn const_null(&mut self, ty: TypeId) -> ValueId {
        self.add_value(ValueKind::ConstNull, ty)
    }

    pub fn const_zero(&mut self, ty: TypeId) -> ValueId {
        self.add_value(ValueKind::ConstZero, ty)
    }

    pub fn undef(&mut self, ty: TypeId) -> ValueId {
        self.add_value(ValueKind::Undef, ty)
    }

    pub fn block_ref(&mut self, block: BlockId) -> ValueId {
        let void = self.types.get_void();
        self.add_value(ValueKind::Block(block), void)
    }

    /// Reference to a function, typed with its signature
    pub fn func_ref(&mut self, func: FuncId) -> ValueId {
        let ty = match self.function(func) {
            Some(f) => {
                let params: Vec<TypeId> = f.params.iter().map(|p| self.value_type(*p)).collect();
                let (ret, variadic) = (f.ret, f.is_variadic);
                self.types.get_func(params, ret, variadic)
            }
            None => self.types.get_void(),
        };
        self.add_value(ValueKind::Func(func), ty)
    }

    /// Address of a global, typed as a pointer to the global's type
    pub fn global_ref(&mut self, global: GlobalId) -> ValueId {
        let base = self.global(global).map(|g| g.ty).unwrap_or(TypeId(0));
        let ty = self.types.get_ptr(base);
        self.add_value(ValueKind::Global(global), ty)
    }

    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_function_creates_params() {
        let mut module = Module::new("test".to_string(), 8);
        let i32_ty = module.types.get_int(32);
        let f = module.add_function("main__add", &[i32_ty, i32_ty], i32_ty, false);

        let function = module.function(f).unwrap();
        assert_eq!(function.params.len(), 2);
        assert_eq!(
            module.value(function.params[1]).unwrap().kind,
            ValueKind::Param { func: f, index: 1 }
        );
        assert_eq!(module.find_function("main__add"), Some(f));
        assert!(module.function(f).unwrap().is_declaration());
    }

    #[test]
    fn test_add_block_to_unknown_function() {
        let mut module = Module::new("test".to_string(), 8);
        assert_eq!(
            module.add_block(FuncId(3), "entry"),
            Err(IrError::InvalidFunction(FuncId(3)))
        );
    }

    #[test]
    fn test_global_ref_is_pointer() {
        let mut module = Module::new("test".to_string(), 8);
        let i64_ty = module.types.get_int(64);
        let g = module.add_global(GlobalVar {
            name: "main__counter".to_string(),
            ty: i64_ty,
            is_mutable: true,
            init: None,
        });
        let r = module.global_ref(g);
        assert_eq!(module.types.pointee(module.value_type(r)), Some(i64_ty));
        assert_eq!(module.find_global("main__counter"), Some(g));
    }
}
