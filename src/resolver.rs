//! Route resolution.
//!
//! Each route descriptor is folded through the [`DeclarationIndex`]
//! independently: the handler method, the request type and the response type
//! are looked up separately and every finding is kept, so one unresolved field
//! never hides another. The index is only read, which lets routes be resolved
//! in parallel.

use crate::descriptor::{Identifier, RouteDescriptor, TypeReference};
use crate::index::DeclarationIndex;
use crate::types::{MethodId, TypeSpec};
use log::debug;
use rayon::prelude::*;

/// Outcome of resolving a handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResolution {
    Resolved(MethodId),
    /// No method under these keys.
    Unresolved {
        pkg: String,
        receiver: String,
        method: String,
    },
    /// The descriptor names no receiver type, so there is no method set to
    /// search.
    MissingReceiver { pkg: String, method: String },
}

impl HandlerResolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, HandlerResolution::Resolved(_))
    }
}

/// Outcome of resolving a request or response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeResolution {
    Resolved(TypeSpec),
    /// The reference is the empty identifier: this side has no body.
    Absent,
    /// A non-empty reference that names nothing in the index.
    Unresolved(Identifier),
}

impl TypeResolution {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, TypeResolution::Unresolved(_))
    }

    /// The type spec, with `Absent` mapped to [`TypeSpec::Empty`].
    pub fn spec(&self) -> Option<TypeSpec> {
        match self {
            TypeResolution::Resolved(spec) => Some(*spec),
            TypeResolution::Absent => Some(TypeSpec::Empty),
            TypeResolution::Unresolved(_) => None,
        }
    }
}

/// Everything found out about one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResolution {
    pub path: String,
    pub http_method: String,
    pub handler: HandlerResolution,
    pub request: TypeResolution,
    pub response: TypeResolution,
}

impl RouteResolution {
    /// Number of fields that could not be resolved (0 to 3).
    pub fn unresolved_count(&self) -> usize {
        usize::from(!self.handler.is_resolved())
            + usize::from(self.request.is_unresolved())
            + usize::from(self.response.is_unresolved())
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved_count() == 0
    }
}

/// How many threads resolve routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    /// Use the global rayon pool.
    Parallel,
}

/// Resolves a request or response type reference.
pub fn resolve_type(index: &DeclarationIndex, reference: &TypeReference) -> TypeResolution {
    match index.lookup_type(reference) {
        Some(spec) => TypeResolution::Resolved(spec),
        None if reference.is_empty() => TypeResolution::Absent,
        None => TypeResolution::Unresolved(reference.ident.clone()),
    }
}

/// Resolves a handler method through its receiver's method set.
pub fn resolve_handler(index: &DeclarationIndex, descriptor: &RouteDescriptor) -> HandlerResolution {
    let handler = &descriptor.handler;
    let method = &handler.ident.name;

    let Some(receiver) = handler.receiver.as_ref() else {
        return HandlerResolution::MissingReceiver {
            pkg: handler.ident.pkg.clone(),
            method: method.clone(),
        };
    };

    let pkg = &receiver.ident.pkg;
    let receiver_name = &receiver.ident.name;

    match index.lookup_method(pkg, receiver_name, method) {
        Some(id) => HandlerResolution::Resolved(id),
        None => HandlerResolution::Unresolved {
            pkg: pkg.clone(),
            receiver: receiver_name.clone(),
            method: method.clone(),
        },
    }
}

/// Resolves every field of one route.
pub fn resolve_route(index: &DeclarationIndex, descriptor: &RouteDescriptor) -> RouteResolution {
    let resolution = RouteResolution {
        path: descriptor.path.clone(),
        http_method: descriptor.http_method.clone(),
        handler: resolve_handler(index, descriptor),
        request: resolve_type(index, &descriptor.req_type),
        response: resolve_type(index, &descriptor.resp_type),
    };

    debug!(
        "{} {}: {} unresolved field(s)",
        resolution.http_method,
        resolution.path,
        resolution.unresolved_count()
    );

    resolution
}

/// Resolves all routes. The output order matches `descriptors`.
pub fn resolve_routes(
    index: &DeclarationIndex,
    descriptors: &[RouteDescriptor],
    parallelism: Parallelism,
) -> Vec<RouteResolution> {
    match parallelism {
        Parallelism::Sequential => descriptors
            .iter()
            .map(|d| resolve_route(index, d))
            .collect(),
        Parallelism::Parallel => descriptors
            .par_iter()
            .map(|d| resolve_route(index, d))
            .collect(),
    }
}
