//! Receiver normalization.
//!
//! Methods on `Widget`, `&Widget` and `&mut Widget` all belong to the method
//! set of `Widget`. Normalization strips the indirection so all of them are
//! indexed under the same `(package, name)` key.
//!
//! Impls whose self type has no name at all (`impl dyn Trait`, `impl Trait for
//! [T]`) are skipped before normalization. A path that names nothing the crate
//! or the prelude declares is still fatal.

use crate::descriptor::Identifier;
use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// The resolved shape of an impl block's self type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverType {
    /// A reference or raw pointer to another type.
    Pointer(Box<ReceiverType>),
    /// A declared named type.
    Named(Identifier),
    /// Anything else, with a short description of its shape.
    Unnamed(String),
}

impl fmt::Display for ReceiverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverType::Pointer(inner) => write!(f, "&{}", inner),
            ReceiverType::Named(ident) => write!(f, "{}", ident),
            ReceiverType::Unnamed(shape) => write!(f, "<{}>", shape),
        }
    }
}

/// Reduces a receiver type to the identity of the named type it belongs to.
///
/// # Errors
///
/// Returns [`Error::InvalidReceiver`] if the receiver is not a named type or a
/// pointer to one. `file` is only used to report where that happened.
pub fn normalize(receiver: &ReceiverType, file: &Path) -> Result<Identifier> {
    match receiver {
        ReceiverType::Pointer(inner) => normalize(inner, file),
        ReceiverType::Named(ident) => Ok(ident.clone()),
        ReceiverType::Unnamed(_) => Err(Error::InvalidReceiver {
            receiver: receiver.to_string(),
            file: file.to_path_buf(),
        }),
    }
}

/// Whether an impl block is a blanket impl over one of its own type
/// parameters, e.g. `impl<T: Display> Describe for T`.
pub fn is_blanket_impl(item_impl: &syn::ItemImpl) -> bool {
    let syn::Type::Path(type_path) = strip_references(&item_impl.self_ty) else {
        return false;
    };
    if type_path.qself.is_some() {
        return false;
    }
    let Some(ident) = type_path.path.get_ident() else {
        return false;
    };

    item_impl.generics.type_params().any(|param| param.ident == *ident)
}

/// Whether an impl block's self type is a path to a type, possibly behind
/// references or pointers.
///
/// Trait objects, slices, arrays, tuples and function pointers are legal
/// self types with no name to file methods under.
pub fn has_nominal_self_type(item_impl: &syn::ItemImpl) -> bool {
    matches!(
        strip_references(&item_impl.self_ty),
        syn::Type::Path(type_path) if type_path.qself.is_none()
    )
}

fn strip_references(ty: &syn::Type) -> &syn::Type {
    match ty {
        syn::Type::Reference(reference) => strip_references(&reference.elem),
        syn::Type::Ptr(ptr) => strip_references(&ptr.elem),
        syn::Type::Paren(paren) => strip_references(&paren.elem),
        syn::Type::Group(group) => strip_references(&group.elem),
        other => other,
    }
}
