//! Phase 2: type registration, and type resolution for later phases
//!
//! Pass A declares every struct and sum type across all translation units as
//! an empty forward declaration and numbers enum members. Pass B fills in
//! field types once every name resolves, flattening embedded structs by
//! prepending their fields.

use super::const_eval::ConstEval;
use super::errors::CodegenError;
use super::{EnumInfo, IrGenerator, SumTypeInfo, Symbol};
use crate::ast::{EnumDecl, Item, Pos, StructDecl, TypeExpr};
use crate::env::CheckedType;
use log::trace;
use std::collections::HashMap;
use strata_ir::{Type, TypeId};

/// Builtin scalar type names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Void,
    Bool,
    Int { width: u16, signed: bool },
    Float { width: u16 },
    /// `voidptr` and friends, a pointer to bytes
    BytePtr,
    String,
}

pub fn builtin_scalar(name: &str, int_width: u16) -> Option<Scalar> {
    let int = |width, signed| Some(Scalar::Int { width, signed });
    match name {
        "void" => Some(Scalar::Void),
        "bool" => Some(Scalar::Bool),
        "i8" => int(8, true),
        "i16" => int(16, true),
        "i32" | "rune" => int(32, true),
        "int" => int(int_width, true),
        "i64" | "isize" => int(64, true),
        "u8" | "byte" | "char" => int(8, false),
        "u16" => int(16, false),
        "u32" => int(32, false),
        "u64" | "usize" => int(64, false),
        "f32" => Some(Scalar::Float { width: 32 }),
        "f64" => Some(Scalar::Float { width: 64 }),
        "voidptr" | "byteptr" | "charptr" => Some(Scalar::BytePtr),
        "string" => Some(Scalar::String),
        _ => None,
    }
}

pub(crate) fn register_types(gen: &mut IrGenerator<'_>) -> Result<(), CodegenError> {
    index_const_decls(gen);

    let files = gen.files;
    let mut struct_decls: HashMap<TypeId, Vec<(usize, &StructDecl)>> = HashMap::new();

    // Pass A: names
    for (file, source) in files.iter().enumerate() {
        for item in &source.items {
            match item {
                Item::Struct(decl) => {
                    let id = declare_struct(gen, file, &decl.name, decl.is_union, false);
                    struct_decls.entry(id).or_default().push((file, decl));
                }
                Item::SumType(decl) => {
                    let id = declare_struct(gen, file, &decl.name, false, true);
                    gen.sum_types.entry(id).or_insert(SumTypeInfo {
                        ty: id,
                        variants: Vec::new(),
                    });
                }
                _ => {}
            }
        }
    }
    for (file, source) in files.iter().enumerate() {
        for item in &source.items {
            if let Item::Enum(decl) = item {
                register_enum(gen, file, decl);
            }
        }
    }

    // Pass B: fields
    let mut ids: Vec<TypeId> = struct_decls.keys().copied().collect();
    ids.sort();
    let mut in_progress = Vec::new();
    for id in ids {
        fill_struct_decl(gen, &struct_decls, id, &mut in_progress)?;
    }

    for (file, source) in files.iter().enumerate() {
        for item in &source.items {
            if let Item::SumType(decl) = item {
                let module = gen.module_name(file);
                let Some(Symbol::SumType(id)) = gen
                    .symbols
                    .get(&(module.to_string(), decl.name.clone()))
                    .cloned()
                else {
                    continue;
                };
                let variants: Vec<TypeId> = decl
                    .variants
                    .iter()
                    .map(|v| gen.resolve_type(file, decl.pos, v))
                    .collect();
                let i32_ty = gen.module.types.get_int(32);
                let data = gen.byte_ptr_type();
                gen.module
                    .types
                    .fill_struct(id, vec![i32_ty, data], vec!["_typ".into(), "_data".into()])?;
                if let Some(info) = gen.sum_types.get_mut(&id) {
                    if info.variants.is_empty() {
                        info.variants = variants;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Make every constant's name and initializer known before any evaluation
fn index_const_decls(gen: &mut IrGenerator<'_>) {
    let files = gen.files;
    for (file, source) in files.iter().enumerate() {
        for item in &source.items {
            if let Item::Const(decl) = item {
                let key = (source.module.clone(), decl.name.clone());
                gen.symbols.insert(key.clone(), Symbol::Const(key.clone()));
                gen.const_decls.insert(key.clone(), (file, &decl.value));
                gen.const_order.push((key, file, decl));
            }
        }
    }
}

/// Forward-declare a struct, reusing an earlier declaration of the same name
fn declare_struct(gen: &mut IrGenerator<'_>, file: usize, name: &str, is_union: bool, is_sum: bool) -> TypeId {
    let module = gen.module_name(file);
    let key = (module.to_string(), name.to_string());
    if let Some(Symbol::Struct(id) | Symbol::SumType(id)) = gen.symbols.get(&key) {
        trace!("struct {module}.{name} declared again, reusing {id}");
        return *id;
    }
    let id = gen
        .module
        .types
        .declare_struct(&IrGenerator::mangle(module, name), is_union);
    let symbol = if is_sum {
        Symbol::SumType(id)
    } else {
        Symbol::Struct(id)
    };
    gen.symbols.insert(key, symbol);
    id
}

fn register_enum(gen: &mut IrGenerator<'_>, file: usize, decl: &EnumDecl) {
    let module = gen.module_name(file);
    let key = (module.to_string(), decl.name.clone());
    let ty = if decl.is_flag {
        gen.module.types.get_uint(64)
    } else {
        gen.int_type()
    };
    gen.enums.insert(
        key.clone(),
        EnumInfo {
            ty,
            members: Vec::new(),
            is_flag: decl.is_flag,
        },
    );
    gen.symbols.insert(key.clone(), Symbol::Enum(key.clone()));

    let mut next: i64 = if decl.is_flag { 1 } else { 0 };
    for member in &decl.members {
        let value = match &member.value {
            Some(expr) => {
                let folded = ConstEval::new(gen, file)
                    .on_demand()
                    .with_enum_hint(Some(key.clone()))
                    .try_eval_const_int(expr);
                match folded {
                    Some(v) => v,
                    None => {
                        gen.fallback(
                            file,
                            member.pos,
                            format!("value of `{}.{}` is not constant; using {next}", decl.name, member.name),
                        );
                        next
                    }
                }
            }
            None => next,
        };
        if let Some(info) = gen.enums.get_mut(&key) {
            info.members.push((member.name.clone(), value));
        }
        next = if decl.is_flag {
            next_flag(value)
        } else {
            value.wrapping_add(1)
        };
    }
    trace!("enum {}.{}: {} members", module, decl.name, decl.members.len());
}

/// Smallest power of two above `value`
fn next_flag(value: i64) -> i64 {
    if value <= 0 {
        return 1;
    }
    (value as u64)
        .checked_add(1)
        .and_then(u64::checked_next_power_of_two)
        .map_or(0, |v| v as i64)
}

fn fill_struct_decl(
    gen: &mut IrGenerator<'_>,
    decls: &HashMap<TypeId, Vec<(usize, &StructDecl)>>,
    id: TypeId,
    in_progress: &mut Vec<TypeId>,
) -> Result<(), CodegenError> {
    if gen.module.types.struct_type(id).is_some_and(|st| !st.is_empty()) {
        return Ok(());
    }
    let Some(sources) = decls.get(&id) else {
        return Ok(());
    };
    if in_progress.contains(&id) {
        if let Some((file, decl)) = sources.first() {
            gen.fallback(*file, decl.pos, format!("struct `{}` embeds itself", decl.name));
        }
        return Ok(());
    }
    in_progress.push(id);

    for (file, decl) in sources {
        let mut fields = Vec::new();
        let mut names = Vec::new();
        for embed in &decl.embeds {
            let embedded = gen.resolve_type(*file, decl.pos, embed);
            if decls.contains_key(&embedded) {
                fill_struct_decl(gen, decls, embedded, in_progress)?;
            }
            match gen.module.types.struct_type(embedded) {
                Some(st) => {
                    fields.extend(st.fields.iter().copied());
                    names.extend(st.field_names.iter().cloned());
                }
                None => gen.fallback(
                    *file,
                    decl.pos,
                    format!("`{}` embeds a type that is not a struct", decl.name),
                ),
            }
        }
        for field in &decl.fields {
            fields.push(gen.resolve_type(*file, field.pos, &field.ty));
            names.push(field.name.clone());
        }
        if gen.module.types.fill_struct(id, fields, names)? {
            trace!("filled struct {}", gen.module.types.display(id));
        } else {
            trace!("struct {} already filled, skipping {}", gen.module.types.display(id), decl.name);
        }
    }

    in_progress.retain(|t| *t != id);
    Ok(())
}

impl IrGenerator<'_> {
    pub(crate) fn scalar_type(&mut self, scalar: Scalar) -> TypeId {
        let types = &mut self.module.types;
        match scalar {
            Scalar::Void => types.get_void(),
            Scalar::Bool => types.get_bool(),
            Scalar::Int { width, signed: true } => types.get_int(width),
            Scalar::Int { width, signed: false } => types.get_uint(width),
            Scalar::Float { width } => types.get_float(width),
            Scalar::BytePtr => {
                let u8_ty = types.get_uint(8);
                types.get_ptr(u8_ty)
            }
            Scalar::String => self.runtime.string,
        }
    }

    /// IR type of a source type annotation; unknown names become the
    /// fallback integer
    pub(crate) fn resolve_type(&mut self, file: usize, pos: Pos, ty: &TypeExpr) -> TypeId {
        match ty {
            TypeExpr::Named { module: None, name } => {
                if let Some(scalar) = builtin_scalar(name, self.options.int_width) {
                    return self.scalar_type(scalar);
                }
                let symbol = self.resolve_symbol(file, pos, name);
                self.type_of_symbol(file, pos, name, symbol)
            }
            TypeExpr::Named {
                module: Some(alias),
                name,
            } => {
                let symbol = self.lookup_qualified(file, alias, name);
                self.type_of_symbol(file, pos, name, symbol)
            }
            TypeExpr::Ptr(inner) => {
                let base = self.resolve_type(file, pos, inner);
                self.module.types.get_ptr(base)
            }
            TypeExpr::Array { elem, len } => {
                let elem = self.resolve_type(file, pos, elem);
                let folded = ConstEval::new(self, file).on_demand().try_eval_const_int(len);
                let len = match folded.and_then(|n| u64::try_from(n).ok()) {
                    Some(n) => n,
                    None => {
                        self.fallback(file, pos, "array length is not a constant".to_string());
                        0
                    }
                };
                self.module.types.get_array(elem, len)
            }
            TypeExpr::DynArray(_) => self.runtime.array,
            TypeExpr::Tuple(elems) => {
                let elems: Vec<TypeId> = elems.iter().map(|e| self.resolve_type(file, pos, e)).collect();
                self.module.types.get_tuple(elems)
            }
            TypeExpr::Fn { params, ret } => {
                let params: Vec<TypeId> = params.iter().map(|p| self.resolve_type(file, pos, p)).collect();
                let ret = match ret {
                    Some(r) => self.resolve_type(file, pos, r),
                    None => self.module.types.get_void(),
                };
                self.module.types.get_func(params, ret, false)
            }
        }
    }

    fn type_of_symbol(&mut self, file: usize, pos: Pos, name: &str, symbol: Option<Symbol>) -> TypeId {
        let known = match symbol {
            Some(Symbol::Struct(id)) | Some(Symbol::SumType(id)) => Some(id),
            Some(Symbol::Enum(key)) => self.enums.get(&key).map(|e| e.ty),
            _ => None,
        };
        match known {
            Some(id) => id,
            None => {
                self.fallback(file, pos, format!("unknown type `{name}`"));
                self.fallback_int_type()
            }
        }
    }

    /// IR type of a checker-resolved type
    pub(crate) fn checked_to_ir(&mut self, file: usize, pos: Pos, ty: &CheckedType) -> TypeId {
        match ty {
            CheckedType::Void => self.module.types.get_void(),
            CheckedType::Bool => self.module.types.get_bool(),
            CheckedType::Int { width, signed: true } => self.module.types.get_int(*width),
            CheckedType::Int { width, signed: false } => self.module.types.get_uint(*width),
            CheckedType::Float { width } => self.module.types.get_float(*width),
            CheckedType::String => self.runtime.string,
            CheckedType::Ptr(inner) => {
                let base = self.checked_to_ir(file, pos, inner);
                self.module.types.get_ptr(base)
            }
            CheckedType::Array { elem, len } => {
                let elem = self.checked_to_ir(file, pos, elem);
                self.module.types.get_array(elem, *len)
            }
            CheckedType::DynArray(_) => self.runtime.array,
            CheckedType::Struct { module, name, .. } | CheckedType::SumType { module, name } => {
                let symbol = self.symbols.get(&(module.clone(), name.clone())).cloned();
                self.type_of_symbol(file, pos, name, symbol)
            }
            CheckedType::Enum { module, name } => {
                let symbol = self.symbols.get(&(module.clone(), name.clone())).cloned();
                self.type_of_symbol(file, pos, name, symbol)
            }
            CheckedType::Tuple(elems) => {
                let elems: Vec<TypeId> = elems.iter().map(|e| self.checked_to_ir(file, pos, e)).collect();
                self.module.types.get_tuple(elems)
            }
            CheckedType::Fn { params, ret } => {
                let params: Vec<TypeId> = params.iter().map(|p| self.checked_to_ir(file, pos, p)).collect();
                let ret = self.checked_to_ir(file, pos, ret);
                self.module.types.get_func(params, ret, false)
            }
        }
    }

    /// IR type the checker assigned to the node at `pos`
    pub(crate) fn oracle_type(&mut self, file: usize, pos: Pos) -> Option<TypeId> {
        let env = self.env;
        let checked = env.type_of(pos)?;
        Some(self.checked_to_ir(file, pos, checked))
    }

    pub(crate) fn is_string(&self, ty: TypeId) -> bool {
        ty == self.runtime.string
    }

    pub(crate) fn is_dyn_array(&self, ty: TypeId) -> bool {
        ty == self.runtime.array
    }

    pub(crate) fn is_struct(&self, ty: TypeId) -> bool {
        matches!(self.module.types.get(ty), Some(Type::Struct(_)))
    }

    /// Default value of a type: zero for scalars, all-zero for aggregates
    pub(crate) fn zero_value(&mut self, ty: TypeId) -> strata_ir::ValueId {
        let types = &self.module.types;
        if types.is_int(ty) {
            self.module.const_int(ty, 0)
        } else if types.is_float(ty) {
            self.module.const_float(ty, 0.0)
        } else if types.is_ptr(ty) {
            self.module.const_null(ty)
        } else {
            self.module.const_zero(ty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_flag() {
        assert_eq!(next_flag(0), 1);
        assert_eq!(next_flag(1), 2);
        assert_eq!(next_flag(2), 4);
        assert_eq!(next_flag(5), 8);
        assert_eq!(next_flag(8), 16);
    }

    #[test]
    fn test_builtin_scalars() {
        assert_eq!(builtin_scalar("int", 32), Some(Scalar::Int { width: 32, signed: true }));
        assert_eq!(builtin_scalar("int", 64), Some(Scalar::Int { width: 64, signed: true }));
        assert_eq!(builtin_scalar("byte", 32), Some(Scalar::Int { width: 8, signed: false }));
        assert_eq!(builtin_scalar("Point", 32), None);
    }
}
