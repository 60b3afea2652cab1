//! Type environment oracle
//!
//! The type checker runs before the IR builder and is consulted read-only:
//! it maps node positions to resolved types and module names to lexical
//! scopes. [`MemoryEnv`] is a plain in-memory implementation.

use crate::ast::Pos;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A type as resolved by the checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckedType {
    Void,
    Bool,
    Int { width: u16, signed: bool },
    Float { width: u16 },
    String,
    Ptr(Box<CheckedType>),
    Array { elem: Box<CheckedType>, len: u64 },
    DynArray(Box<CheckedType>),
    /// Structural view of a struct: field names in layout order
    Struct {
        module: String,
        name: String,
        fields: Vec<String>,
    },
    Enum { module: String, name: String },
    SumType { module: String, name: String },
    Tuple(Vec<CheckedType>),
    Fn {
        params: Vec<CheckedType>,
        ret: Box<CheckedType>,
    },
}

impl CheckedType {
    /// The type behind any number of pointers
    pub fn strip_pointers(&self) -> &CheckedType {
        let mut ty = self;
        while let CheckedType::Ptr(inner) = ty {
            ty = inner;
        }
        ty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// What a name in a scope refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeSymbol {
    /// A declaration, identified by the module it lives in
    Decl { module: String },
    /// An imported module alias
    Module(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub symbols: HashMap<String, ScopeSymbol>,
}

/// Read-only view of the type checker's results
pub trait TypeEnv {
    /// Checker-resolved type of the node at `pos`
    fn type_of(&self, pos: Pos) -> Option<&CheckedType>;

    /// Top-level scope of a module
    fn module_scope(&self, module: &str) -> Option<ScopeId>;

    fn scope(&self, id: ScopeId) -> Option<&Scope>;

    /// Whether `name` refers to a module rather than an ordinary identifier
    fn is_module_name(&self, name: &str) -> bool;

    /// Look `name` up in `scope` and then its parents
    fn lookup(&self, scope: ScopeId, name: &str) -> Option<&ScopeSymbol> {
        let mut current = Some(scope);
        // The chain is walked at most once per scope in case of a parent cycle
        let mut remaining = 1024;
        while let Some(id) = current {
            let scope = self.scope(id)?;
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            remaining -= 1;
            if remaining == 0 {
                return None;
            }
            current = scope.parent;
        }
        None
    }
}

/// In-memory type environment
#[derive(Debug, Clone, Default)]
pub struct MemoryEnv {
    types: HashMap<Pos, CheckedType>,
    scopes: Vec<Scope>,
    modules: HashMap<String, ScopeId>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the checked type of the node at `pos`
    pub fn set_type(&mut self, pos: Pos, ty: CheckedType) {
        self.types.insert(pos, ty);
    }

    pub fn add_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            symbols: HashMap::new(),
        });
        id
    }

    /// Register a module with its own top-level scope
    pub fn add_module(&mut self, name: &str, parent: Option<ScopeId>) -> ScopeId {
        let id = self.add_scope(parent);
        self.modules.insert(name.to_string(), id);
        id
    }

    pub fn define(&mut self, scope: ScopeId, name: &str, symbol: ScopeSymbol) {
        if let Some(s) = self.scopes.get_mut(scope.0 as usize) {
            s.symbols.insert(name.to_string(), symbol);
        }
    }
}

impl TypeEnv for MemoryEnv {
    fn type_of(&self, pos: Pos) -> Option<&CheckedType> {
        self.types.get(&pos)
    }

    fn module_scope(&self, module: &str) -> Option<ScopeId> {
        self.modules.get(module).copied()
    }

    fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    fn is_module_name(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let mut env = MemoryEnv::new();
        let builtin = env.add_module("builtin", None);
        let main = env.add_module("main", Some(builtin));
        env.define(builtin, "println", ScopeSymbol::Decl { module: "builtin".into() });
        env.define(main, "helper", ScopeSymbol::Decl { module: "util".into() });

        assert_eq!(
            env.lookup(main, "println"),
            Some(&ScopeSymbol::Decl { module: "builtin".into() })
        );
        assert_eq!(
            env.lookup(main, "helper"),
            Some(&ScopeSymbol::Decl { module: "util".into() })
        );
        assert_eq!(env.lookup(builtin, "helper"), None);
        assert!(env.is_module_name("main"));
        assert!(!env.is_module_name("helper"));
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let mut env = MemoryEnv::new();
        let a = env.add_scope(None);
        let b = env.add_scope(Some(a));
        env.scopes[a.0 as usize].parent = Some(b);
        assert_eq!(env.lookup(a, "missing"), None);
    }

    #[test]
    fn test_strip_pointers() {
        let ty = CheckedType::Ptr(Box::new(CheckedType::Ptr(Box::new(CheckedType::Bool))));
        assert_eq!(ty.strip_pointers(), &CheckedType::Bool);
    }
}
