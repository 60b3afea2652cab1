//! IR generation from the checked AST
//!
//! Lowering runs in six ordered phases over all translation units:
//!
//! 1. runtime globals and the core string/array layouts (`runtime`)
//! 2. struct, enum and sum-type registration in two passes (`types`)
//! 3. constants and globals, with forward-reference re-resolution (`consts`)
//! 4. function signatures and name mangling (`signatures`)
//! 5. function bodies (`functions`, `statements`, `expressions`)
//! 6. the runtime initializer for non-constant globals (`init`)
//!
//! Names that cannot be resolved fall back to a safe default and record a
//! warning diagnostic; in strict mode any such fallback fails the build.

mod const_eval;
mod consts;
mod context;
mod errors;
mod expressions;
mod functions;
mod init;
mod runtime;
mod signatures;
mod statements;
mod types;

pub use const_eval::ConstEval;
pub use context::FnCtx;
pub use errors::CodegenError;
pub use runtime::RuntimeTypes;

use crate::ast::{ConstDecl, Expr, Pos, SourceFile};
use crate::config::BuildOptions;
use crate::env::TypeEnv;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use strata_common::{CompilerError, Diagnostic, ErrorReporter, SourceLocation, SourceSpan};
use strata_ir::{FuncId, GlobalId, Module, TypeId};

/// `(module, name)`
pub type SymbolKey = (String, String);

/// Module-level declaration a qualified name resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Const(SymbolKey),
    Global(GlobalId),
    Fn(FuncId),
    Struct(TypeId),
    SumType(TypeId),
    Enum(SymbolKey),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumInfo {
    pub ty: TypeId,
    pub members: Vec<(String, i64)>,
    pub is_flag: bool,
}

impl EnumInfo {
    pub fn value(&self, member: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SumTypeInfo {
    pub ty: TypeId,
    /// Variant types; a variant's tag is its index plus one
    pub variants: Vec<TypeId>,
}

/// Folded value of a constant
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstEntry {
    pub value: ConstValue,
    pub ty: TypeId,
    /// Zero stand-in for a value that could not be folded yet
    pub placeholder: bool,
    /// Backing global for arrays and runtime-initialized constants
    pub global: Option<GlobalId>,
}

/// Global whose value is computed by the runtime initializer
#[derive(Debug, Clone)]
pub(crate) struct PendingInit<'a> {
    pub global: GlobalId,
    pub file: usize,
    pub expr: &'a Expr,
}

/// IR generator state shared by all phases
pub struct IrGenerator<'a> {
    pub(crate) files: &'a [SourceFile],
    pub(crate) env: &'a dyn TypeEnv,
    pub(crate) options: BuildOptions,
    pub(crate) module: Module,
    pub(crate) runtime: RuntimeTypes,
    reporter: ErrorReporter,
    /// Qualified symbol table; ordered so the last-resort scan is deterministic
    pub(crate) symbols: BTreeMap<SymbolKey, Symbol>,
    pub(crate) methods: HashMap<(TypeId, String), FuncId>,
    pub(crate) enums: HashMap<SymbolKey, EnumInfo>,
    pub(crate) sum_types: HashMap<TypeId, SumTypeInfo>,
    pub(crate) consts: HashMap<SymbolKey, ConstEntry>,
    /// Constant declarations in source order, for the re-resolution sweep
    pub(crate) const_order: Vec<(SymbolKey, usize, &'a ConstDecl)>,
    /// Constant initializers by name, for on-demand evaluation before phase 3
    pub(crate) const_decls: HashMap<SymbolKey, (usize, &'a Expr)>,
    /// Function of each `(file, item)` with a signature
    pub(crate) fn_ids: HashMap<(usize, usize), FuncId>,
    pub(crate) pending_inits: Vec<PendingInit<'a>>,
    pub(crate) anon_count: usize,
}

/// Build a module from all translation units.
///
/// Returns the module (without CFG edges or dominators) and the diagnostics
/// recorded along the way.
pub fn build(
    files: &[SourceFile],
    env: &dyn TypeEnv,
    options: &BuildOptions,
) -> Result<(Module, Vec<Diagnostic>), CompilerError> {
    options.validate()?;
    let mut gen = IrGenerator::new(files, env, options.clone());

    types::register_types(&mut gen)?;
    debug!("phase 2: {} types registered", gen.module.types.len());

    consts::register_consts_and_globals(&mut gen);
    debug!("phase 3: {} constants, {} globals", gen.consts.len(), gen.module.globals.len());

    signatures::register_signatures(&mut gen);
    debug!("phase 4: {} function signatures", gen.module.funcs.len());

    functions::lower_bodies(&mut gen)?;
    init::build_runtime_initializer(&mut gen)?;

    gen.finish()
}

impl<'a> IrGenerator<'a> {
    /// Create the generator and run phase 1
    pub fn new(files: &'a [SourceFile], env: &'a dyn TypeEnv, options: BuildOptions) -> Self {
        let mut module_name = options.entry_module.clone();
        if let Some(first) = files.first() {
            if !files.iter().any(|f| f.module == options.entry_module) {
                module_name = first.module.clone();
            }
        }
        let mut module = Module::new(module_name, options.pointer_size);
        let mut symbols = BTreeMap::new();
        let runtime = runtime::register_runtime(&mut module, &mut symbols);

        Self {
            files,
            env,
            options,
            module,
            runtime,
            reporter: ErrorReporter::new(),
            symbols,
            methods: HashMap::new(),
            enums: HashMap::new(),
            sum_types: HashMap::new(),
            consts: HashMap::new(),
            const_order: Vec::new(),
            const_decls: HashMap::new(),
            fn_ids: HashMap::new(),
            pending_inits: Vec::new(),
            anon_count: 0,
        }
    }

    fn finish(self) -> Result<(Module, Vec<Diagnostic>), CompilerError> {
        let fallbacks = self.reporter.warning_count();
        if self.options.strict && fallbacks > 0 {
            if let Some(first) = self.reporter.diagnostics().first() {
                return Err(CodegenError::UnresolvedSymbol {
                    count: fallbacks,
                    span: first.span.clone(),
                    message: first.message.clone(),
                }
                .into());
            }
        }
        debug!("build finished: {}", self.reporter.summary());
        Ok((self.module, self.reporter.into_diagnostics()))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.reporter.diagnostics()
    }

    pub(crate) fn module_name(&self, file: usize) -> &'a str {
        let files = self.files;
        files.get(file).map_or("main", |f| f.module.as_str())
    }

    pub(crate) fn span(&self, file: usize, pos: Pos) -> SourceSpan {
        let path = self.files.get(file).map_or("<unknown>", |f| f.path.as_str());
        SourceSpan::from_location(SourceLocation::new(path, pos.line, pos.col))
    }

    /// Record that a best-effort fallback was taken
    pub(crate) fn fallback(&mut self, file: usize, pos: Pos, message: String) {
        let span = self.span(file, pos);
        warn!("{span}: {message}");
        self.reporter.warning(message, span);
    }

    // Types used everywhere

    pub(crate) fn int_type(&mut self) -> TypeId {
        self.module.types.get_int(self.options.int_width)
    }

    pub(crate) fn fallback_int_type(&mut self) -> TypeId {
        self.module.types.get_int(self.options.fallback_int_width)
    }

    pub(crate) fn bool_type(&mut self) -> TypeId {
        self.module.types.get_bool()
    }

    pub(crate) fn byte_ptr_type(&mut self) -> TypeId {
        let u8_ty = self.module.types.get_uint(8);
        self.module.types.get_ptr(u8_ty)
    }

    // Name mangling

    /// Symbol name of a module-level declaration
    pub(crate) fn mangle(module: &str, name: &str) -> String {
        if module == runtime::BUILTIN_MODULE {
            name.to_string()
        } else {
            format!("{module}__{name}")
        }
    }

    // Name resolution

    /// Resolve a name used in `module`: qualified table, then the checker's
    /// scope chain, then the builtin module. The final scan over every
    /// module is reported as `true` in the second field.
    pub(crate) fn lookup_symbol(&self, module: &str, name: &str) -> Option<(Symbol, bool)> {
        let key = (module.to_string(), name.to_string());
        if let Some(symbol) = self.symbols.get(&key) {
            return Some((symbol.clone(), false));
        }

        if let Some(scope) = self.env.module_scope(module) {
            if let Some(crate::env::ScopeSymbol::Decl { module: owner }) = self.env.lookup(scope, name) {
                let key = (owner.clone(), name.to_string());
                if let Some(symbol) = self.symbols.get(&key) {
                    return Some((symbol.clone(), false));
                }
            }
        }

        let key = (runtime::BUILTIN_MODULE.to_string(), name.to_string());
        if let Some(symbol) = self.symbols.get(&key) {
            return Some((symbol.clone(), false));
        }

        self.symbols
            .iter()
            .find(|((_, n), _)| n == name)
            .map(|(_, symbol)| (symbol.clone(), true))
    }

    /// Resolve a name, recording a diagnostic when only the scan finds it
    pub(crate) fn resolve_symbol(&mut self, file: usize, pos: Pos, name: &str) -> Option<Symbol> {
        let module = self.module_name(file);
        let (symbol, scanned) = self.lookup_symbol(module, name)?;
        if scanned {
            self.fallback(
                file,
                pos,
                format!("`{name}` is not visible from module `{module}`; resolved by scanning all modules"),
            );
        }
        Some(symbol)
    }

    /// Real module name behind an import alias used in `file`
    pub(crate) fn module_alias(&self, file: usize, alias: &str) -> String {
        let module = self.module_name(file);
        if let Some(scope) = self.env.module_scope(module) {
            if let Some(crate::env::ScopeSymbol::Module(real)) = self.env.lookup(scope, alias) {
                return real.clone();
            }
        }
        alias.to_string()
    }

    /// `alias.name` where `alias` is a module
    pub(crate) fn lookup_qualified(&self, file: usize, alias: &str, name: &str) -> Option<Symbol> {
        let module = self.module_alias(file, alias);
        self.symbols.get(&(module, name.to_string())).cloned()
    }

    /// Whether `name` used in `file` denotes a module
    pub(crate) fn is_module(&self, file: usize, name: &str) -> bool {
        if self.env.is_module_name(name) {
            return true;
        }
        let module = self.module_name(file);
        self.env
            .module_scope(module)
            .and_then(|scope| self.env.lookup(scope, name))
            .is_some_and(|symbol| matches!(symbol, crate::env::ScopeSymbol::Module(_)))
    }
}
