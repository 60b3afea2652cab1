//! IR Type Store
//!
//! Interning registry for every IR-level type. Scalars, pointers, arrays,
//! tuples and function shapes are deduplicated structurally; aggregates
//! registered through [`TypeStore::register`] always get a fresh id, so two
//! structs with the same shape but different names stay distinct.

use crate::error::IrError;
use crate::ids::TypeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recursion limit for size computations over malformed (self-containing) structs
const MAX_LAYOUT_DEPTH: u32 = 64;

/// IR type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,

    /// Integer with bit width; width 1 is the boolean type
    Int { width: u16, signed: bool },

    Float { width: u16 },

    Ptr(TypeId),

    Array { elem: TypeId, len: u64 },

    Struct(StructType),

    Tuple(Vec<TypeId>),

    Func(FuncType),
}

/// Struct or union layout, identified by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<TypeId>,
    pub field_names: Vec<String>,
    pub is_union: bool,
}

impl StructType {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Function argument/return shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncType {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub is_variadic: bool,
}

/// Registry of all types in a module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeStore {
    types: Vec<Type>,
    #[serde(skip)]
    interned: HashMap<Type, TypeId>,
    pointer_size: u64,
}

impl TypeStore {
    pub fn new(pointer_size: u64) -> Self {
        let mut store = Self {
            types: Vec::new(),
            interned: HashMap::new(),
            pointer_size,
        };
        // void is always t0
        store.intern(Type::Void);
        store
    }

    fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(id) = self.interned.get(&ty) {
            return *id;
        }
        let id = TypeId::new(self.types.len());
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn get_void(&mut self) -> TypeId {
        self.intern(Type::Void)
    }

    pub fn get_bool(&mut self) -> TypeId {
        self.intern(Type::Int { width: 1, signed: false })
    }

    pub fn get_int(&mut self, width: u16) -> TypeId {
        self.intern(Type::Int { width, signed: true })
    }

    pub fn get_uint(&mut self, width: u16) -> TypeId {
        self.intern(Type::Int { width, signed: false })
    }

    pub fn get_float(&mut self, width: u16) -> TypeId {
        self.intern(Type::Float { width })
    }

    pub fn get_ptr(&mut self, base: TypeId) -> TypeId {
        self.intern(Type::Ptr(base))
    }

    pub fn get_array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.intern(Type::Array { elem, len })
    }

    pub fn get_tuple(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.intern(Type::Tuple(elems))
    }

    pub fn get_func(&mut self, params: Vec<TypeId>, ret: TypeId, is_variadic: bool) -> TypeId {
        self.intern(Type::Func(FuncType { params, ret, is_variadic }))
    }

    /// Register an aggregate. Always allocates a new id.
    pub fn register(&mut self, ty: Type) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.types.push(ty);
        id
    }

    /// Forward-declare a struct with no fields yet
    pub fn declare_struct(&mut self, name: &str, is_union: bool) -> TypeId {
        self.register(Type::Struct(StructType {
            name: name.to_string(),
            fields: Vec::new(),
            field_names: Vec::new(),
            is_union,
        }))
    }

    /// Populate a forward-declared struct.
    ///
    /// Returns `Ok(false)` without touching anything when the struct already
    /// has fields.
    pub fn fill_struct(
        &mut self,
        id: TypeId,
        fields: Vec<TypeId>,
        field_names: Vec<String>,
    ) -> Result<bool, IrError> {
        if fields.len() != field_names.len() {
            return Err(IrError::InvalidStructFill(
                id,
                format!("{} field types but {} names", fields.len(), field_names.len()),
            ));
        }
        match self.types.get_mut(id.index()) {
            Some(Type::Struct(st)) => {
                if !st.fields.is_empty() {
                    return Ok(false);
                }
                st.fields = fields;
                st.field_names = field_names;
                Ok(true)
            }
            Some(_) => Err(IrError::InvalidStructFill(id, "not a struct".to_string())),
            None => Err(IrError::InvalidType(id)),
        }
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types.iter().enumerate().map(|(i, ty)| (TypeId::new(i), ty))
    }

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.get(id), Some(Type::Void))
    }

    pub fn is_int(&self, id: TypeId) -> bool {
        matches!(self.get(id), Some(Type::Int { .. }))
    }

    pub fn is_bool(&self, id: TypeId) -> bool {
        matches!(self.get(id), Some(Type::Int { width: 1, .. }))
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(self.get(id), Some(Type::Float { .. }))
    }

    pub fn is_ptr(&self, id: TypeId) -> bool {
        matches!(self.get(id), Some(Type::Ptr(_)))
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        matches!(self.get(id), Some(Type::Int { signed: true, .. }))
    }

    /// Bit width of an integer or float type
    pub fn bit_width(&self, id: TypeId) -> Option<u16> {
        match self.get(id)? {
            Type::Int { width, .. } | Type::Float { width } => Some(*width),
            _ => None,
        }
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id)? {
            Type::Ptr(base) => Some(*base),
            _ => None,
        }
    }

    pub fn struct_type(&self, id: TypeId) -> Option<&StructType> {
        match self.get(id)? {
            Type::Struct(st) => Some(st),
            _ => None,
        }
    }

    pub fn func_type(&self, id: TypeId) -> Option<&FuncType> {
        match self.get(id)? {
            Type::Func(ft) => Some(ft),
            _ => None,
        }
    }

    /// Index of a named field in a struct layout
    pub fn field_index(&self, id: TypeId, name: &str) -> Option<usize> {
        self.struct_type(id)?.field_names.iter().position(|n| n == name)
    }

    /// Type of the element at `index` of a struct, tuple or array
    pub fn element_type(&self, id: TypeId, index: usize) -> Option<TypeId> {
        match self.get(id)? {
            Type::Struct(st) => st.fields.get(index).copied(),
            Type::Tuple(elems) => elems.get(index).copied(),
            Type::Array { elem, .. } => Some(*elem),
            _ => None,
        }
    }

    /// Size in bytes
    pub fn size_of(&self, id: TypeId) -> u64 {
        self.layout(id, 0).0
    }

    /// Alignment in bytes
    pub fn align_of(&self, id: TypeId) -> u64 {
        self.layout(id, 0).1
    }

    fn layout(&self, id: TypeId, depth: u32) -> (u64, u64) {
        if depth > MAX_LAYOUT_DEPTH {
            return (0, 1);
        }
        match self.get(id) {
            None | Some(Type::Void) => (0, 1),
            Some(Type::Int { width, .. }) | Some(Type::Float { width }) => {
                let bytes = (u64::from(*width)).div_ceil(8).max(1);
                (bytes, bytes)
            }
            Some(Type::Ptr(_)) | Some(Type::Func(_)) => (self.pointer_size, self.pointer_size),
            Some(Type::Array { elem, len }) => {
                let (size, align) = self.layout(*elem, depth + 1);
                (size * len, align)
            }
            Some(Type::Struct(st)) if st.is_union => {
                let mut size = 0;
                let mut align = 1;
                for field in &st.fields {
                    let (s, a) = self.layout(*field, depth + 1);
                    size = size.max(s);
                    align = align.max(a);
                }
                (size.next_multiple_of(align), align)
            }
            Some(Type::Struct(StructType { fields, .. })) | Some(Type::Tuple(fields)) => {
                let mut offset: u64 = 0;
                let mut align = 1;
                for field in fields {
                    let (s, a) = self.layout(*field, depth + 1);
                    offset = offset.next_multiple_of(a) + s;
                    align = align.max(a);
                }
                (offset.next_multiple_of(align), align)
            }
        }
    }

    /// Human readable rendering of a type
    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            None => format!("<invalid {id}>"),
            Some(Type::Void) => "void".to_string(),
            Some(Type::Int { width: 1, .. }) => "bool".to_string(),
            Some(Type::Int { width, signed: true }) => format!("i{width}"),
            Some(Type::Int { width, signed: false }) => format!("u{width}"),
            Some(Type::Float { width }) => format!("f{width}"),
            Some(Type::Ptr(base)) => format!("*{}", self.display(*base)),
            Some(Type::Array { elem, len }) => format!("[{len}]{}", self.display(*elem)),
            Some(Type::Struct(st)) => st.name.clone(),
            Some(Type::Tuple(elems)) => {
                let parts: Vec<String> = elems.iter().map(|e| self.display(*e)).collect();
                format!("({})", parts.join(", "))
            }
            Some(Type::Func(ft)) => {
                let parts: Vec<String> = ft.params.iter().map(|p| self.display(*p)).collect();
                let dots = if ft.is_variadic { ", ..." } else { "" };
                format!("fn({}{dots}) {}", parts.join(", "), self.display(ft.ret))
            }
        }
    }
}
