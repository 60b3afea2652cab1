//! Per-function lowering cursor
//!
//! Everything that describes "where we are" while lowering one function body
//! lives here and is passed explicitly to every lowering call. A nested
//! anonymous function gets its own `FnCtx`, so the enclosing one is never
//! touched.

use super::errors::CodegenError;
use super::IrGenerator;
use crate::ast::Pos;
use log::trace;
use std::collections::{HashMap, HashSet};
use strata_ir::{BlockId, FuncId, TypeId, ValueId};

/// A declared variable: its stack slot and the type stored in it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Local {
    pub slot: ValueId,
    pub ty: TypeId,
}

/// Targets of `break` and `continue` for one enclosing loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopTarget {
    pub label: Option<String>,
    pub break_block: BlockId,
    pub continue_block: BlockId,
}

#[derive(Debug, Clone)]
pub struct FnCtx {
    pub func: FuncId,
    /// Translation unit the body comes from
    pub file: usize,
    pub entry: BlockId,
    /// Block instructions are appended to
    pub block: BlockId,
    pub ret: TypeId,
    /// Number of slots already placed at the top of the entry block
    alloca_count: usize,
    scopes: Vec<HashMap<String, Local>>,
    loops: Vec<LoopTarget>,
    labels: HashMap<String, BlockId>,
    /// Labels whose definition has been lowered
    defined_labels: HashSet<String>,
    /// Every `goto`, for reporting labels that never get defined
    gotos: Vec<(String, Pos)>,
    block_count: usize,
}

impl FnCtx {
    pub fn new(func: FuncId, file: usize, entry: BlockId, ret: TypeId) -> Self {
        Self {
            func,
            file,
            entry,
            block: entry,
            ret,
            alloca_count: 0,
            scopes: vec![HashMap::new()],
            loops: Vec::new(),
            labels: HashMap::new(),
            defined_labels: HashSet::new(),
            gotos: Vec::new(),
            block_count: 0,
        }
    }

    // Scopes

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn bind(&mut self, name: &str, local: Local) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), local);
        }
    }

    /// Innermost binding of `name`
    pub fn local(&self, name: &str) -> Option<Local> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    // Loops and labels

    pub fn push_loop(&mut self, target: LoopTarget) {
        self.loops.push(target);
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    /// The loop a `break`/`continue` refers to: the labelled one or the innermost
    pub fn find_loop(&self, label: Option<&str>) -> Option<&LoopTarget> {
        match label {
            Some(name) => self
                .loops
                .iter()
                .rev()
                .find(|l| l.label.as_deref() == Some(name)),
            None => self.loops.last(),
        }
    }

    // Blocks

    /// Create a block in the current function
    pub fn new_block(&mut self, gen: &mut IrGenerator<'_>, name: &str) -> Result<BlockId, CodegenError> {
        self.block_count += 1;
        let block = gen
            .module
            .add_block(self.func, &format!("{name}.{}", self.block_count))?;
        trace!("new block {block} ({name}) in {}", self.func);
        Ok(block)
    }

    /// Continue lowering in `block`, falling through from the current block
    /// if it is still open
    pub fn switch_to(&mut self, gen: &mut IrGenerator<'_>, block: BlockId) -> Result<(), CodegenError> {
        if !gen.module.is_terminated(self.block) {
            gen.module.build_jmp(self.block, block)?;
        }
        self.block = block;
        Ok(())
    }

    /// Make sure the current block can take more instructions. Code after a
    /// terminator goes to a fresh block with no predecessors.
    pub fn ensure_open(&mut self, gen: &mut IrGenerator<'_>) -> Result<(), CodegenError> {
        if gen.module.is_terminated(self.block) {
            self.block = self.new_block(gen, "dead")?;
        }
        Ok(())
    }

    /// Target of `goto name`; the block exists before the label is reached
    pub fn goto_target(&mut self, gen: &mut IrGenerator<'_>, name: &str, pos: Pos) -> Result<BlockId, CodegenError> {
        self.gotos.push((name.to_string(), pos));
        self.label_block(gen, name)
    }

    /// Block a label definition starts, or `None` if the label was already defined
    pub fn define_label(&mut self, gen: &mut IrGenerator<'_>, name: &str) -> Result<Option<BlockId>, CodegenError> {
        if !self.defined_labels.insert(name.to_string()) {
            return Ok(None);
        }
        self.label_block(gen, name).map(Some)
    }

    /// First `goto` of every label that was jumped to but never defined
    pub fn undefined_labels(&self) -> Vec<(String, Pos)> {
        let mut seen = HashSet::new();
        let mut undefined = Vec::new();
        for (name, pos) in &self.gotos {
            if !self.defined_labels.contains(name) && seen.insert(name.as_str()) {
                undefined.push((name.clone(), *pos));
            }
        }
        undefined
    }

    fn label_block(&mut self, gen: &mut IrGenerator<'_>, name: &str) -> Result<BlockId, CodegenError> {
        if let Some(block) = self.labels.get(name) {
            return Ok(*block);
        }
        let block = self.new_block(gen, &format!("label.{name}"))?;
        self.labels.insert(name.to_string(), block);
        Ok(block)
    }

    /// Stack slot at the top of the entry block, so every slot dominates its uses
    pub fn new_slot(&mut self, gen: &mut IrGenerator<'_>, ty: TypeId) -> Result<ValueId, CodegenError> {
        // A slot declared inside a loop body is still allocated once. Placing
        // it after the earlier slots keeps declaration order.
        let slot = gen.module.insert_alloca(self.entry, self.alloca_count, ty)?;
        self.alloca_count += 1;
        trace!("slot {slot}: {}", gen.module.types.display(ty));
        Ok(slot)
    }

    /// Number of slots at the top of the entry block
    pub fn alloca_count(&self) -> usize {
        self.alloca_count
    }
}
