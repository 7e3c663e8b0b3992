//! What a type reference resolves to, and the declaration records the index
//! stores in its arenas.

use crate::descriptor::Identifier;
use crate::index::DeclarationIndex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Handle of a type declaration in [`DeclarationIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

/// Handle of a method declaration in [`DeclarationIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub(crate) u32);

/// The result of resolving a type reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSpec {
    /// Explicitly no type.
    Empty,
    /// A type of the universal scope.
    Builtin(BuiltinType),
    /// A type declared in one of the loaded packages.
    Named(TypeId),
}

impl TypeSpec {
    /// Human-readable description, for diagnostics only.
    pub fn describe(&self, index: &DeclarationIndex) -> String {
        match self {
            TypeSpec::Empty => "<empty type>".to_string(),
            TypeSpec::Builtin(builtin) => format!("<built-in type {}>", builtin),
            TypeSpec::Named(id) => {
                let decl = index.type_decl(*id);
                format!("<named type {} ({})>", decl.ident, decl.kind)
            }
        }
    }
}

/// Types of the universal scope: Rust primitives and `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Bool,
    Char,
    Str,
    String,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
}

impl BuiltinType {
    /// Looks a name up in the universal scope.
    pub fn from_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "bool" => BuiltinType::Bool,
            "char" => BuiltinType::Char,
            "str" => BuiltinType::Str,
            "String" => BuiltinType::String,
            "i8" => BuiltinType::I8,
            "i16" => BuiltinType::I16,
            "i32" => BuiltinType::I32,
            "i64" => BuiltinType::I64,
            "i128" => BuiltinType::I128,
            "isize" => BuiltinType::Isize,
            "u8" => BuiltinType::U8,
            "u16" => BuiltinType::U16,
            "u32" => BuiltinType::U32,
            "u64" => BuiltinType::U64,
            "u128" => BuiltinType::U128,
            "usize" => BuiltinType::Usize,
            "f32" => BuiltinType::F32,
            "f64" => BuiltinType::F64,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinType::Bool => "bool",
            BuiltinType::Char => "char",
            BuiltinType::Str => "str",
            BuiltinType::String => "String",
            BuiltinType::I8 => "i8",
            BuiltinType::I16 => "i16",
            BuiltinType::I32 => "i32",
            BuiltinType::I64 => "i64",
            BuiltinType::I128 => "i128",
            BuiltinType::Isize => "isize",
            BuiltinType::U8 => "u8",
            BuiltinType::U16 => "u16",
            BuiltinType::U32 => "u32",
            BuiltinType::U64 => "u64",
            BuiltinType::U128 => "u128",
            BuiltinType::Usize => "usize",
            BuiltinType::F32 => "f32",
            BuiltinType::F64 => "f64",
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of item a named type was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDeclKind {
    Struct,
    Enum,
    Union,
    Alias,
    Trait,
}

impl fmt::Display for TypeDeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeDeclKind::Struct => "struct",
            TypeDeclKind::Enum => "enum",
            TypeDeclKind::Union => "union",
            TypeDeclKind::Alias => "type alias",
            TypeDeclKind::Trait => "trait",
        };
        f.write_str(s)
    }
}

/// A declared named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub ident: Identifier,
    pub kind: TypeDeclKind,
    /// Source file holding the declaration
    pub file: PathBuf,
}

/// How a method takes `self`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverMode {
    /// `self`
    Value,
    /// `&self`
    Ref,
    /// `&mut self`
    RefMut,
    /// `self: Box<Self>` and friends
    Typed,
}

impl ReceiverMode {
    pub fn from_receiver(receiver: &syn::Receiver) -> Self {
        if receiver.colon_token.is_some() {
            ReceiverMode::Typed
        } else if receiver.reference.is_some() {
            if receiver.mutability.is_some() {
                ReceiverMode::RefMut
            } else {
                ReceiverMode::Ref
            }
        } else {
            ReceiverMode::Value
        }
    }
}

/// A declared method, keyed by its normalized receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    /// Normalized receiver type
    pub receiver: Identifier,
    pub name: String,
    /// Trait the method implements, for `impl Trait for T` blocks
    pub trait_name: Option<String>,
    pub receiver_mode: ReceiverMode,
    pub is_async: bool,
    pub file: PathBuf,
}

impl MethodDecl {
    /// `pkg::Receiver::method`
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.receiver, self.name)
    }

    /// `method` for inherent methods, `Trait::method` for trait methods.
    pub fn qualified_method(&self) -> String {
        match &self.trait_name {
            Some(trait_name) => format!("{}::{}", trait_name, self.name),
            None => self.name.clone(),
        }
    }
}
