//! Textual dump of a module, for debugging and test failure output

use crate::ids::{BlockId, FuncId, ValueId};
use crate::instructions::Opcode;
use crate::module::Module;
use crate::values::ValueKind;
use std::fmt::{self, Write};

impl Module {
    /// Render an operand the way it appears inside an instruction
    pub fn operand_name(&self, id: ValueId) -> String {
        let Some(value) = self.value(id) else {
            return format!("<invalid {id}>");
        };
        match &value.kind {
            ValueKind::ConstInt(v) => v.to_string(),
            ValueKind::ConstFloat(v) => format!("{v:?}"),
            ValueKind::ConstStr(s) => format!("{s:?}"),
            ValueKind::ConstNull => "null".to_string(),
            ValueKind::ConstZero => "zeroinit".to_string(),
            ValueKind::Undef => "undef".to_string(),
            ValueKind::Global(g) => match self.global(*g) {
                Some(global) => format!("@{}", global.name),
                None => format!("@{g}"),
            },
            ValueKind::Func(f) => match self.function(*f) {
                Some(function) => format!("@{}", function.name),
                None => format!("@{f}"),
            },
            ValueKind::Block(b) => b.to_string(),
            ValueKind::Param { .. } | ValueKind::Instr(_) => id.to_string(),
        }
    }

    /// Render one function with its blocks
    pub fn function_to_string(&self, func: FuncId) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_function(&mut out, func);
        out
    }

    fn write_function(&self, out: &mut impl Write, func: FuncId) -> fmt::Result {
        let Some(function) = self.function(func) else {
            return writeln!(out, "; invalid function {func}");
        };
        let params: Vec<String> = function
            .params
            .iter()
            .map(|p| format!("{p}: {}", self.types.display(self.value_type(*p))))
            .collect();
        let dots = if function.is_variadic { ", ..." } else { "" };
        let keyword = if function.is_extern { "extern fn" } else { "fn" };
        write!(
            out,
            "{keyword} {}({}{dots}) {}",
            function.name,
            params.join(", "),
            self.types.display(function.ret)
        )?;
        if function.is_declaration() {
            return writeln!(out);
        }
        writeln!(out, " {{")?;
        for block in &function.blocks {
            self.write_block(out, *block)?;
        }
        writeln!(out, "}}")
    }

    fn write_block(&self, out: &mut impl Write, id: BlockId) -> fmt::Result {
        let Some(block) = self.block(id) else {
            return writeln!(out, "; invalid block {id}");
        };
        write!(out, "{id} {}:", block.name)?;
        if !block.preds.is_empty() {
            let preds: Vec<String> = block.preds.iter().map(|p| p.to_string()).collect();
            write!(out, " ; preds {}", preds.join(", "))?;
        }
        if let Some(idom) = block.idom {
            write!(out, " ; idom {idom}")?;
        }
        writeln!(out)?;

        for value in &block.instrs {
            let Some(instr) = self.instr_of(*value) else {
                writeln!(out, "    ; dangling {value}")?;
                continue;
            };
            let operands: Vec<String> = instr.operands.iter().map(|o| self.operand_name(*o)).collect();
            let produces_value = !self.types.is_void(instr.ty) || instr.op == Opcode::Call;
            if produces_value && !instr.is_terminator() && instr.op != Opcode::Store {
                writeln!(
                    out,
                    "    {value} = {} {} {}",
                    instr.op,
                    self.types.display(instr.ty),
                    operands.join(", ")
                )?;
            } else {
                writeln!(out, "    {} {}", instr.op, operands.join(", "))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for (index, global) in self.globals.iter().enumerate() {
            let kind = if global.is_mutable { "global" } else { "const" };
            write!(
                f,
                "{kind} g{index} @{}: {}",
                global.name,
                self.types.display(global.ty)
            )?;
            match &global.init {
                Some(bytes) => writeln!(f, " = bytes[{}]", bytes.len())?,
                None => writeln!(f)?,
            }
        }
        for index in 0..self.funcs.len() {
            writeln!(f)?;
            self.write_function(f, FuncId::new(index))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::module::Module;
    use crate::instructions::Opcode;

    #[test]
    fn test_function_dump() {
        let mut module = Module::new("main".to_string(), 8);
        let i32_ty = module.types.get_int(32);
        let f = module.add_function("main__add", &[i32_ty, i32_ty], i32_ty, false);
        let entry = module.add_block(f, "entry").unwrap();
        let params = module.function(f).unwrap().params.clone();
        let sum = module.build_binary(entry, Opcode::Add, params[0], params[1]).unwrap();
        module.build_ret(entry, Some(sum)).unwrap();

        let text = module.function_to_string(f);
        assert!(text.starts_with("fn main__add(%0: i32, %1: i32) i32 {"));
        assert!(text.contains("%2 = add i32 %0, %1"));
        assert!(text.contains("ret %2"));
        assert!(format!("{module}").contains("; module main"));
    }
}
