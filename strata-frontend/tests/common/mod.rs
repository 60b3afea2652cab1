//! Shared helpers for the builder scenario tests: a one-call build and a
//! small interpreter that executes the generated IR directly.

#![allow(dead_code)]

use std::collections::HashMap;
use strata_frontend::ast::SourceFile;
use strata_frontend::{BuildOptions, Frontend, MemoryEnv};
use strata_ir::{BlockId, FuncId, GlobalId, Module, Opcode, Type, TypeId, ValueId, ValueKind};

const MAX_STEPS: usize = 100_000;

/// Build with default options and an empty type environment
pub fn build(files: Vec<SourceFile>) -> strata_frontend::BuildOutput {
    build_with(files, &MemoryEnv::new(), BuildOptions::default())
}

pub fn build_with(files: Vec<SourceFile>, env: &MemoryEnv, options: BuildOptions) -> strata_frontend::BuildOutput {
    Frontend::new(options).build(&files, env).unwrap()
}

/// Instructions of `func` with opcode `op`
pub fn count_ops(module: &Module, func: &str, op: Opcode) -> usize {
    let f = module.find_function(func).unwrap();
    module
        .function(f)
        .unwrap()
        .blocks
        .iter()
        .flat_map(|b| module.block(*b).unwrap().instrs.iter())
        .filter(|v| module.instr_of(**v).is_some_and(|i| i.op == op))
        .count()
}

/// Names of the functions `func` calls directly
pub fn callees(module: &Module, func: &str) -> Vec<String> {
    let f = module.find_function(func).unwrap();
    let mut names = Vec::new();
    for block in &module.function(f).unwrap().blocks {
        for v in &module.block(*block).unwrap().instrs {
            let instr = module.instr_of(*v).unwrap();
            if instr.op != Opcode::Call {
                continue;
            }
            if let Some(ValueKind::Func(callee)) = module.value(instr.operands[0]).map(|v| &v.kind) {
                names.push(module.function(*callee).unwrap().name.clone());
            }
        }
    }
    names
}

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Int(i64),
    Float(f64),
    Str(String),
    Null,
    Ptr(Addr),
    Func(FuncId),
    Agg(Vec<Val>),
}

impl Val {
    pub fn int(&self) -> i64 {
        match self {
            Val::Int(v) => *v,
            other => panic!("expected an integer, got {other:?}"),
        }
    }
}

/// A memory cell and the path of element indices inside it
#[derive(Debug, Clone, PartialEq)]
pub struct Addr {
    cell: usize,
    path: Vec<usize>,
}

pub struct Interp<'m> {
    module: &'m Module,
    memory: Vec<Val>,
    globals: HashMap<GlobalId, usize>,
    steps: usize,
    /// Bodiless functions called so far
    pub externs: Vec<String>,
}

/// Run `func` of `module` with `args`
pub fn run(module: &Module, func: &str, args: Vec<Val>) -> Result<Val, String> {
    let mut interp = Interp::new(module);
    let f = module.find_function(func).ok_or(format!("no function {func}"))?;
    interp.call(f, args)
}

impl<'m> Interp<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            memory: Vec::new(),
            globals: HashMap::new(),
            steps: 0,
            externs: Vec::new(),
        }
    }

    pub fn call(&mut self, func: FuncId, args: Vec<Val>) -> Result<Val, String> {
        let function = self.module.function(func).ok_or("bad function")?;
        let Some(entry) = function.entry() else {
            self.externs.push(function.name.clone());
            if function.name == "panic" {
                return Err("panic".to_string());
            }
            return Ok(self.zero(function.ret));
        };

        let mut frame: HashMap<ValueId, Val> = HashMap::new();
        let mut block = entry;
        loop {
            match self.run_block(func, block, &args, &mut frame)? {
                Flow::Jump(next) => block = next,
                Flow::Return(value) => return Ok(value),
            }
        }
    }

    fn run_block(
        &mut self,
        func: FuncId,
        block: BlockId,
        args: &[Val],
        frame: &mut HashMap<ValueId, Val>,
    ) -> Result<Flow, String> {
        let module = self.module;
        let instrs = module.block(block).ok_or("bad block")?.instrs.clone();
        for value in instrs {
            self.steps += 1;
            if self.steps > MAX_STEPS {
                return Err("step limit".to_string());
            }
            let instr = module.instr_of(value).ok_or("not an instruction")?;
            let ops = &instr.operands;
            let get = |this: &mut Self, i: usize| this.operand(ops[i], args, frame);
            let result = match instr.op {
                Opcode::Alloca => {
                    let pointee = module.types.pointee(instr.ty).ok_or("alloca of non-pointer")?;
                    let zero = self.zero(pointee);
                    self.memory.push(zero);
                    Val::Ptr(Addr {
                        cell: self.memory.len() - 1,
                        path: Vec::new(),
                    })
                }
                Opcode::Load => {
                    let Val::Ptr(addr) = get(self, 0)? else {
                        return Err("load through non-pointer".to_string());
                    };
                    self.load(&addr)?
                }
                Opcode::Store => {
                    let v = get(self, 0)?;
                    let Val::Ptr(addr) = get(self, 1)? else {
                        return Err("store through non-pointer".to_string());
                    };
                    *self.place(&addr)? = v;
                    continue;
                }
                Opcode::FieldPtr | Opcode::Gep => {
                    let Val::Ptr(mut addr) = get(self, 0)? else {
                        return Err("address of non-pointer".to_string());
                    };
                    let index = get(self, 1)?.int();
                    if instr.op == Opcode::FieldPtr {
                        addr.path.push(index as usize);
                    } else if let Some(last) = addr.path.last_mut() {
                        *last = (*last as i64 + index) as usize;
                    } else if index != 0 {
                        return Err("pointer arithmetic outside an array".to_string());
                    }
                    Val::Ptr(addr)
                }
                Opcode::Bitcast => {
                    let v = get(self, 0)?;
                    let from = module.value_type(ops[0]);
                    match (v, self.array_to_elem(from, instr.ty)) {
                        (Val::Ptr(mut addr), true) => {
                            addr.path.push(0);
                            Val::Ptr(addr)
                        }
                        (v, _) => v,
                    }
                }
                Opcode::Trunc | Opcode::ZExt | Opcode::SExt => {
                    let v = get(self, 0)?.int();
                    Val::Int(self.wrap(instr.ty, v))
                }
                Opcode::SiToFp | Opcode::UiToFp => Val::Float(get(self, 0)?.int() as f64),
                Opcode::FpToSi | Opcode::FpToUi => match get(self, 0)? {
                    Val::Float(f) => Val::Int(self.wrap(instr.ty, f as i64)),
                    other => return Err(format!("float conversion of {other:?}")),
                },
                Opcode::FpExt | Opcode::FpTrunc => get(self, 0)?,
                Opcode::Neg => {
                    let v = get(self, 0)?.int();
                    Val::Int(self.wrap(instr.ty, v.wrapping_neg()))
                }
                Opcode::Not => {
                    let v = get(self, 0)?.int();
                    Val::Int(self.wrap(instr.ty, !v))
                }
                Opcode::FNeg => match get(self, 0)? {
                    Val::Float(f) => Val::Float(-f),
                    other => return Err(format!("fneg of {other:?}")),
                },
                Opcode::ExtractValue => {
                    let Val::Agg(elems) = get(self, 0)? else {
                        return Err("extract from non-aggregate".to_string());
                    };
                    let index = get(self, 1)?.int() as usize;
                    elems.get(index).cloned().ok_or("extract out of range")?
                }
                Opcode::InsertValue => {
                    let Val::Agg(mut elems) = get(self, 0)? else {
                        return Err("insert into non-aggregate".to_string());
                    };
                    let v = get(self, 1)?;
                    let index = get(self, 2)?.int() as usize;
                    *elems.get_mut(index).ok_or("insert out of range")? = v;
                    Val::Agg(elems)
                }
                Opcode::Call => {
                    let Val::Func(callee) = get(self, 0)? else {
                        return Err("call of a non-function".to_string());
                    };
                    let mut call_args = Vec::with_capacity(ops.len() - 1);
                    for i in 1..ops.len() {
                        call_args.push(get(self, i)?);
                    }
                    self.call(callee, call_args)?
                }
                Opcode::Br => {
                    let cond = get(self, 0)?.int();
                    let target = if cond != 0 { ops[1] } else { ops[2] };
                    return Ok(Flow::Jump(self.block_of(target)?));
                }
                Opcode::Jmp => return Ok(Flow::Jump(self.block_of(ops[0])?)),
                Opcode::Switch => {
                    let v = get(self, 0)?.int();
                    let mut target = ops[1];
                    for pair in ops[2..].chunks(2) {
                        if get_const(module, pair[0]) == Some(v) {
                            target = pair[1];
                            break;
                        }
                    }
                    return Ok(Flow::Jump(self.block_of(target)?));
                }
                Opcode::Ret => {
                    let value = match ops.first() {
                        Some(_) => get(self, 0)?,
                        None => Val::Agg(Vec::new()),
                    };
                    return Ok(Flow::Return(value));
                }
                Opcode::Unreachable => return Err("unreachable".to_string()),
                Opcode::PtrToInt | Opcode::IntToPtr => return Err("pointer/integer casts".to_string()),
                op => {
                    let (l, r) = (get(self, 0)?, get(self, 1)?);
                    self.binary(op, module.value_type(ops[0]), instr.ty, l, r)?
                }
            };
            frame.insert(value, result);
        }
        Err(format!("{block} in {func} falls off its end"))
    }

    fn binary(&self, op: Opcode, operand_ty: TypeId, ty: TypeId, l: Val, r: Val) -> Result<Val, String> {
        if let (Val::Float(a), Val::Float(b)) = (&l, &r) {
            let (a, b) = (*a, *b);
            return Ok(match op {
                Opcode::FAdd => Val::Float(a + b),
                Opcode::FSub => Val::Float(a - b),
                Opcode::FMul => Val::Float(a * b),
                Opcode::FDiv => Val::Float(a / b),
                Opcode::FRem => Val::Float(a % b),
                Opcode::FEq => Val::Int(i64::from(a == b)),
                Opcode::FNe => Val::Int(i64::from(a != b)),
                Opcode::FLt => Val::Int(i64::from(a < b)),
                Opcode::FLe => Val::Int(i64::from(a <= b)),
                Opcode::FGt => Val::Int(i64::from(a > b)),
                Opcode::FGe => Val::Int(i64::from(a >= b)),
                other => return Err(format!("{other:?} on floats")),
            });
        }
        let (a, b) = (l.int(), r.int());
        let unsigned = !self.module.types.is_signed(operand_ty);
        let v = match op {
            Opcode::Add => a.wrapping_add(b),
            Opcode::Sub => a.wrapping_sub(b),
            Opcode::Mul => a.wrapping_mul(b),
            Opcode::Div | Opcode::Rem if b == 0 => return Err("division by zero".to_string()),
            Opcode::Div => a.wrapping_div(b),
            Opcode::Rem => a.wrapping_rem(b),
            Opcode::And => a & b,
            Opcode::Or => a | b,
            Opcode::Xor => a ^ b,
            Opcode::Shl => a.wrapping_shl(b as u32),
            Opcode::Shr => a.wrapping_shr(b as u32),
            Opcode::Eq => i64::from(a == b),
            Opcode::Ne => i64::from(a != b),
            Opcode::Lt if unsigned => i64::from((a as u64) < (b as u64)),
            Opcode::Le if unsigned => i64::from((a as u64) <= (b as u64)),
            Opcode::Gt if unsigned => i64::from((a as u64) > (b as u64)),
            Opcode::Ge if unsigned => i64::from((a as u64) >= (b as u64)),
            Opcode::Lt => i64::from(a < b),
            Opcode::Le => i64::from(a <= b),
            Opcode::Gt => i64::from(a > b),
            Opcode::Ge => i64::from(a >= b),
            other => return Err(format!("{other:?} on integers")),
        };
        Ok(Val::Int(self.wrap(ty, v)))
    }

    fn operand(&mut self, value: ValueId, args: &[Val], frame: &HashMap<ValueId, Val>) -> Result<Val, String> {
        let module = self.module;
        let v = module.value(value).ok_or("bad value")?;
        Ok(match &v.kind {
            ValueKind::ConstInt(i) => Val::Int(*i),
            ValueKind::ConstFloat(f) => Val::Float(*f),
            ValueKind::ConstStr(s) => Val::Str(s.clone()),
            ValueKind::ConstNull => Val::Null,
            ValueKind::ConstZero | ValueKind::Undef => self.zero(v.ty),
            ValueKind::Global(g) => Val::Ptr(Addr {
                cell: self.global_cell(*g),
                path: Vec::new(),
            }),
            ValueKind::Func(f) => Val::Func(*f),
            ValueKind::Block(_) => return Err("block used as a value".to_string()),
            ValueKind::Param { index, .. } => args.get(*index as usize).cloned().ok_or("missing argument")?,
            ValueKind::Instr(_) => frame.get(&value).cloned().ok_or(format!("{value} used before definition"))?,
        })
    }

    fn block_of(&self, value: ValueId) -> Result<BlockId, String> {
        match self.module.value(value).map(|v| &v.kind) {
            Some(ValueKind::Block(b)) => Ok(*b),
            _ => Err("branch target is not a block".to_string()),
        }
    }

    fn global_cell(&mut self, global: GlobalId) -> usize {
        if let Some(cell) = self.globals.get(&global) {
            return *cell;
        }
        let g = self.module.global(global).unwrap();
        let value = match &g.init {
            Some(bytes) => self.decode(g.ty, bytes),
            None => self.zero(g.ty),
        };
        self.memory.push(value);
        self.globals.insert(global, self.memory.len() - 1);
        self.memory.len() - 1
    }

    fn load(&mut self, addr: &Addr) -> Result<Val, String> {
        Ok(self.place(addr)?.clone())
    }

    fn place(&mut self, addr: &Addr) -> Result<&mut Val, String> {
        let mut current = self.memory.get_mut(addr.cell).ok_or("bad cell")?;
        for index in &addr.path {
            current = match current {
                Val::Agg(elems) => elems.get_mut(*index).ok_or("index out of bounds")?,
                _ => return Err("path into a scalar".to_string()),
            };
        }
        Ok(current)
    }

    fn array_to_elem(&self, from: TypeId, to: TypeId) -> bool {
        let types = &self.module.types;
        match (types.pointee(from).and_then(|p| types.get(p)), types.pointee(to)) {
            (Some(Type::Array { elem, .. }), Some(target)) => *elem == target,
            _ => false,
        }
    }

    fn wrap(&self, ty: TypeId, v: i64) -> i64 {
        match self.module.types.get(ty) {
            Some(Type::Int { width, signed }) if *width < 64 => {
                let shift = 64 - u32::from(*width);
                if *signed && *width > 1 {
                    (v << shift) >> shift
                } else {
                    ((v as u64) << shift >> shift) as i64
                }
            }
            _ => v,
        }
    }

    fn zero(&self, ty: TypeId) -> Val {
        let types = &self.module.types;
        match types.get(ty) {
            Some(Type::Int { .. }) => Val::Int(0),
            Some(Type::Float { .. }) => Val::Float(0.0),
            Some(Type::Ptr(_)) => Val::Null,
            Some(Type::Array { elem, len }) => Val::Agg((0..*len).map(|_| self.zero(*elem)).collect()),
            Some(Type::Struct(st)) => Val::Agg(st.fields.iter().map(|f| self.zero(*f)).collect()),
            Some(Type::Tuple(elems)) => Val::Agg(elems.iter().map(|e| self.zero(*e)).collect()),
            _ => Val::Agg(Vec::new()),
        }
    }

    fn decode(&self, ty: TypeId, bytes: &[u8]) -> Val {
        let types = &self.module.types;
        match types.get(ty) {
            Some(Type::Int { .. }) => {
                let mut buf = [0u8; 8];
                buf[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
                Val::Int(self.wrap(ty, i64::from_le_bytes(buf)))
            }
            Some(Type::Array { elem, .. }) => {
                let size = types.size_of(*elem) as usize;
                Val::Agg(bytes.chunks(size.max(1)).map(|c| self.decode(*elem, c)).collect())
            }
            _ => self.zero(ty),
        }
    }
}

enum Flow {
    Jump(BlockId),
    Return(Val),
}

fn get_const(module: &Module, value: ValueId) -> Option<i64> {
    match module.value(value)?.kind {
        ValueKind::ConstInt(v) => Some(v),
        _ => None,
    }
}
