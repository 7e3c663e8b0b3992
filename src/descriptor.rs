//! Route descriptor model and loader.
//!
//! A route descriptor names an HTTP route and the declarations behind it: the
//! handler method (receiver type plus method name) and the request/response
//! types. Descriptors are produced by some other tool and handed to this crate
//! as a JSON (or YAML) array.

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// A declaration identity: the declaring package (module path) and the name.
///
/// An empty `pkg` denotes a name in the universal scope (`u32`, `String`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(default)]
    pub pkg: String,
    #[serde(default)]
    pub name: String,
}

impl Identifier {
    pub fn new(pkg: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pkg: pkg.into(),
            name: name.into(),
        }
    }

    /// Whether this is the zero identifier (no package, no name).
    pub fn is_zero(&self) -> bool {
        self.pkg.is_empty() && self.name.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pkg.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.pkg, self.name)
        }
    }
}

/// How a descriptor names a type. The flags are informational; lookups only
/// use `ident`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReference {
    #[serde(default)]
    pub ident: Identifier,
    #[serde(default)]
    pub is_ptr: bool,
    #[serde(default)]
    pub is_array: bool,
}

impl TypeReference {
    pub fn new(ident: Identifier) -> Self {
        Self {
            ident,
            is_ptr: false,
            is_array: false,
        }
    }

    /// An empty reference marks a route side that carries no body.
    pub fn is_empty(&self) -> bool {
        self.ident.is_zero()
    }
}

/// A handler method: `ident.name` is the method name, `receiver` names the
/// type whose method set declares it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodReference {
    #[serde(default)]
    pub receiver: Option<TypeReference>,
    #[serde(default)]
    pub ident: Identifier,
}

/// One route as described by the external descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub path: String,
    #[serde(rename = "func", default)]
    pub handler: MethodReference,
    pub http_method: String,
    #[serde(default)]
    pub req_format: String,
    #[serde(default)]
    pub req_type: TypeReference,
    #[serde(default)]
    pub resp_format: String,
    #[serde(default)]
    pub resp_type: TypeReference,
}

impl RouteDescriptor {
    fn validate(&self, index: usize) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::InvalidDescriptor {
                index,
                reason: "empty path".to_string(),
            });
        }
        if self.http_method.is_empty() {
            return Err(Error::InvalidDescriptor {
                index,
                reason: format!("empty HTTP method for path {}", self.path),
            });
        }
        Ok(())
    }
}

/// Reads route descriptors from a file.
///
/// The file holds an array of descriptor records. Files ending in `.yaml` or
/// `.yml` are decoded as YAML, everything else as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, or if a record has
/// an empty path or HTTP method.
pub fn read_descriptors(path: &Path) -> Result<Vec<RouteDescriptor>> {
    debug!("Reading route descriptors from {}", path.display());

    let content = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let descriptors = if is_yaml {
        parse_yaml(&content)?
    } else {
        parse_json(&content)?
    };

    debug!("Decoded {} route descriptors", descriptors.len());
    Ok(descriptors)
}

/// Decodes and validates a JSON descriptor array.
pub fn parse_json(content: &str) -> Result<Vec<RouteDescriptor>> {
    let descriptors: Vec<RouteDescriptor> = serde_json::from_str(content)?;
    validate_all(&descriptors)?;
    Ok(descriptors)
}

/// Decodes and validates a YAML descriptor sequence.
pub fn parse_yaml(content: &str) -> Result<Vec<RouteDescriptor>> {
    let descriptors: Vec<RouteDescriptor> = serde_yaml::from_str(content)?;
    validate_all(&descriptors)?;
    Ok(descriptors)
}

fn validate_all(descriptors: &[RouteDescriptor]) -> Result<()> {
    descriptors
        .iter()
        .enumerate()
        .try_for_each(|(i, d)| d.validate(i))
}

/// Collects the package paths that must be loaded to resolve `descriptors`.
///
/// Every non-empty package referenced by a handler, its receiver, a request
/// type or a response type is returned once, in sorted order.
pub fn gather_package_patterns(descriptors: &[RouteDescriptor]) -> Vec<String> {
    let mut seen = BTreeSet::new();

    for d in descriptors {
        let receiver_pkg = d.handler.receiver.as_ref().map(|r| &r.ident.pkg);
        let candidates = [
            Some(&d.handler.ident.pkg),
            receiver_pkg,
            Some(&d.req_type.ident.pkg),
            Some(&d.resp_type.ident.pkg),
        ];
        for pkg in candidates.into_iter().flatten() {
            // empty packages are builtins or empty types
            if !pkg.is_empty() {
                seen.insert(pkg.clone());
            }
        }
    }

    seen.into_iter().collect()
}
