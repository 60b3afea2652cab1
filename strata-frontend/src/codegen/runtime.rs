//! Phase 1: runtime support
//!
//! Registers the process-wide globals and the `string` and `array` layouts
//! before any user type, so struct fields of these types always resolve.
//! Runtime helpers the lowering calls into are declared here as externs.

use super::{Symbol, SymbolKey};
use log::trace;
use std::collections::BTreeMap;
use strata_ir::{FuncId, GlobalVar, Module, TypeId};

/// Module whose declarations are visible from everywhere and are not prefixed
pub const BUILTIN_MODULE: &str = "builtin";

/// Handles of the runtime layouts and helpers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeTypes {
    /// `{ str: *u8, len: i32, is_lit: i32 }`
    pub string: TypeId,
    /// `{ data: *u8, offset: i32, len: i32, cap: i32, element_size: i32 }`
    pub array: TypeId,
    /// `memdup(src: *u8, size: i32) *u8`
    pub memdup: FuncId,
    /// `string__plus(a: string, b: string) string`
    pub string_plus: FuncId,
    /// `string__eq(a: string, b: string) bool`
    pub string_eq: FuncId,
    /// `panic(msg: string)`
    pub panic: FuncId,
    /// `new_array_from_c_array(len: i32, cap: i32, elem_size: i32, data: *u8) array`
    pub new_array: FuncId,
}

/// Field index of the byte pointer in the string layout
pub const STRING_DATA_FIELD: usize = 0;
/// Field index of `len` in the string layout
pub const STRING_LEN_FIELD: usize = 1;
/// Field index of `data` in the array layout
pub const ARRAY_DATA_FIELD: usize = 0;
/// Field index of `len` in the array layout
pub const ARRAY_LEN_FIELD: usize = 2;

fn builtin(name: &str) -> SymbolKey {
    (BUILTIN_MODULE.to_string(), name.to_string())
}

pub(crate) fn register_runtime(
    module: &mut Module,
    symbols: &mut BTreeMap<SymbolKey, Symbol>,
) -> RuntimeTypes {
    let types = &mut module.types;
    let u8_ty = types.get_uint(8);
    let i32_ty = types.get_int(32);
    let bool_ty = types.get_bool();
    let void = types.get_void();
    let byte_ptr = types.get_ptr(u8_ty);

    let string = types.declare_struct("string", false);
    let array = types.declare_struct("array", false);
    // Both ids are fresh structs, so filling cannot fail or be a no-op
    let _ = types.fill_struct(
        string,
        vec![byte_ptr, i32_ty, i32_ty],
        vec!["str".into(), "len".into(), "is_lit".into()],
    );
    let _ = types.fill_struct(
        array,
        vec![byte_ptr, i32_ty, i32_ty, i32_ty, i32_ty],
        vec![
            "data".into(),
            "offset".into(),
            "len".into(),
            "cap".into(),
            "element_size".into(),
        ],
    );
    symbols.insert(builtin("string"), Symbol::Struct(string));
    symbols.insert(builtin("array"), Symbol::Struct(array));

    let argv_ty = module.types.get_ptr(byte_ptr);
    for (name, ty) in [("g_main_argc", i32_ty), ("g_main_argv", argv_ty)] {
        let global = module.add_global(GlobalVar {
            name: name.to_string(),
            ty,
            is_mutable: true,
            init: None,
        });
        symbols.insert(builtin(name), Symbol::Global(global));
    }

    let mut declare = |module: &mut Module, name: &str, params: &[TypeId], ret: TypeId| {
        let func = module.add_function(name, params, ret, false);
        if let Some(f) = module.function_mut(func) {
            f.is_extern = true;
        }
        symbols.insert(builtin(name), Symbol::Fn(func));
        trace!("runtime: declared {name}");
        func
    };

    let memdup = declare(module, "memdup", &[byte_ptr, i32_ty], byte_ptr);
    let string_plus = declare(module, "string__plus", &[string, string], string);
    let string_eq = declare(module, "string__eq", &[string, string], bool_ty);
    let panic = declare(module, "panic", &[string], void);
    let new_array = declare(
        module,
        "new_array_from_c_array",
        &[i32_ty, i32_ty, i32_ty, byte_ptr],
        array,
    );

    RuntimeTypes {
        string,
        array,
        memdup,
        string_plus,
        string_eq,
        panic,
        new_array,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_layouts() {
        let mut module = Module::new("main".to_string(), 8);
        let mut symbols = BTreeMap::new();
        let rt = register_runtime(&mut module, &mut symbols);

        assert_eq!(module.types.field_index(rt.string, "len"), Some(STRING_LEN_FIELD));
        assert_eq!(module.types.field_index(rt.array, "data"), Some(ARRAY_DATA_FIELD));
        assert_eq!(module.types.field_index(rt.array, "len"), Some(ARRAY_LEN_FIELD));
        assert_eq!(module.types.size_of(rt.string), 16);
        assert!(module.find_global("g_main_argc").is_some());
        assert_eq!(module.find_function("memdup"), Some(rt.memdup));
        assert!(module.function(rt.panic).unwrap().is_extern);
        assert_eq!(
            symbols.get(&builtin("string")),
            Some(&Symbol::Struct(rt.string))
        );
    }
}
