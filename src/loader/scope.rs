//! Per-module name resolution.
//!
//! A [`TypeScope`] answers "which declaration does this type syntax refer to"
//! for code written inside one module. It knows the module's own type
//! declarations, its child modules, its `use` imports and the types brought in
//! by glob imports of other crate modules. This is the typed lookup the
//! declaration index relies on to place impl blocks under their receiver.

use crate::descriptor::Identifier;
use crate::index::receiver::ReceiverType;
use crate::loader::parser::CRATE_ROOT;
use crate::types::BuiltinType;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use syn::{Type, UseTree};

/// Prelude types that are not part of the universal scope.
const STD_PRELUDE: &[(&str, &str)] = &[
    ("Box", "std::boxed"),
    ("Option", "std::option"),
    ("Result", "std::result"),
    ("Vec", "std::vec"),
];

/// One binding introduced by a `use` item, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseBinding {
    /// `use a::b::C;` or `use a::b::C as D;`
    Named { local: String, path: Vec<String> },
    /// `use a::b::*;`
    Glob { path: Vec<String> },
}

/// Flattens a `use` tree into its bindings.
pub fn collect_use_bindings(tree: &UseTree, prefix: &mut Vec<String>, out: &mut Vec<UseBinding>) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            collect_use_bindings(&path.tree, prefix, out);
            prefix.pop();
        }
        UseTree::Group(group) => {
            for item in &group.items {
                collect_use_bindings(item, prefix, out);
            }
        }
        UseTree::Name(name) => {
            let ident = name.ident.to_string();
            // `use a::b::{self}` binds `b`
            if ident == "self" {
                if let Some(last) = prefix.last() {
                    out.push(UseBinding::Named {
                        local: last.clone(),
                        path: prefix.clone(),
                    });
                }
            } else {
                let mut path = prefix.clone();
                path.push(ident.clone());
                out.push(UseBinding::Named { local: ident, path });
            }
        }
        UseTree::Rename(rename) => {
            let local = rename.rename.to_string();
            if local == "_" {
                return;
            }
            let ident = rename.ident.to_string();
            let path = if ident == "self" {
                prefix.clone()
            } else {
                let mut path = prefix.clone();
                path.push(ident);
                path
            };
            out.push(UseBinding::Named { local, path });
        }
        UseTree::Glob(_) => out.push(UseBinding::Glob {
            path: prefix.clone(),
        }),
    }
}

/// What the whole crate looks like, as needed to build scopes.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    /// module path -> names of the types it declares
    pub declared_types: BTreeMap<String, BTreeSet<String>>,
    /// module path -> names of its child modules
    pub children: BTreeMap<String, BTreeSet<String>>,
    /// module path -> local name -> absolute path, from named `use` bindings
    pub imports: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl ModuleTable {
    fn is_module(&self, path: &str) -> bool {
        self.declared_types.contains_key(path) || self.children.contains_key(path)
    }

    fn declares(&self, module: &str, name: &str) -> bool {
        self.declared_types
            .get(module)
            .is_some_and(|names| names.contains(name))
    }

    fn import(&self, module: &str, name: &str) -> Option<&Vec<String>> {
        self.imports.get(module)?.get(name)
    }
}

/// Upper bound on `use` chains followed from one path.
const MAX_REEXPORT_HOPS: usize = 16;

/// Name resolution context of one module.
#[derive(Debug, Clone, Default)]
pub struct TypeScope {
    module_path: String,
    local_types: BTreeSet<String>,
    children: BTreeSet<String>,
    /// local name -> absolute path
    imports: BTreeMap<String, Vec<String>>,
    /// name -> absolute path, from glob imports
    glob_types: BTreeMap<String, Vec<String>>,
    table: Arc<ModuleTable>,
}

impl TypeScope {
    /// Builds the scope of `module_path` from its `use` bindings and the crate
    /// module table.
    ///
    /// A glob import brings in both the types the target module declares and
    /// the names it imports itself.
    pub fn new(module_path: &str, bindings: &[UseBinding], table: Arc<ModuleTable>) -> Self {
        let mut scope = TypeScope {
            module_path: module_path.to_string(),
            local_types: table
                .declared_types
                .get(module_path)
                .cloned()
                .unwrap_or_default(),
            children: table.children.get(module_path).cloned().unwrap_or_default(),
            table: Arc::clone(&table),
            ..Default::default()
        };

        for binding in bindings {
            if let UseBinding::Named { local, path } = binding {
                let absolute = scope.absolutize(path);
                scope.imports.insert(local.clone(), absolute);
            }
        }

        for binding in bindings {
            let UseBinding::Glob { path } = binding else {
                continue;
            };
            let target_segments = scope.absolutize(path);
            let target = target_segments.join("::");
            if !table.is_module(&target) {
                debug!("{}: glob import of external path {}", module_path, target);
                continue;
            }

            for name in table.declared_types.get(&target).into_iter().flatten() {
                let mut absolute = target_segments.clone();
                absolute.push(name.clone());
                scope.glob_types.entry(name.clone()).or_insert(absolute);
            }
            for (name, absolute) in table.imports.get(&target).into_iter().flatten() {
                scope
                    .glob_types
                    .entry(name.clone())
                    .or_insert_with(|| absolute.clone());
            }
        }

        scope
    }

    /// Absolute paths of this module's named `use` bindings.
    pub fn imports(&self) -> &BTreeMap<String, Vec<String>> {
        &self.imports
    }

    /// Resolves the syntax of a type to its declared identity.
    pub fn type_of(&self, ty: &Type) -> ReceiverType {
        match ty {
            Type::Reference(reference) => {
                ReceiverType::Pointer(Box::new(self.type_of(&reference.elem)))
            }
            Type::Ptr(ptr) => ReceiverType::Pointer(Box::new(self.type_of(&ptr.elem))),
            Type::Paren(paren) => self.type_of(&paren.elem),
            Type::Group(group) => self.type_of(&group.elem),
            Type::Path(type_path) if type_path.qself.is_none() => {
                self.resolve_path(&type_path.path)
            }
            Type::Path(_) => ReceiverType::Unnamed("qualified path".to_string()),
            Type::Slice(_) => ReceiverType::Unnamed("slice".to_string()),
            Type::Array(_) => ReceiverType::Unnamed("array".to_string()),
            Type::Tuple(_) => ReceiverType::Unnamed("tuple".to_string()),
            Type::TraitObject(_) => ReceiverType::Unnamed("trait object".to_string()),
            Type::ImplTrait(_) => ReceiverType::Unnamed("impl trait".to_string()),
            Type::BareFn(_) => ReceiverType::Unnamed("function pointer".to_string()),
            Type::Never(_) => ReceiverType::Unnamed("never type".to_string()),
            _ => ReceiverType::Unnamed("unsupported type syntax".to_string()),
        }
    }

    fn resolve_path(&self, path: &syn::Path) -> ReceiverType {
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();

        if path.leading_colon.is_some() {
            return self.named(segments);
        }

        if let [name] = segments.as_slice() {
            return self.resolve_name(name);
        }

        self.named(self.absolutize(&segments))
    }

    fn resolve_name(&self, name: &str) -> ReceiverType {
        if self.local_types.contains(name) {
            return ReceiverType::Named(Identifier::new(self.module_path.clone(), name));
        }
        if let Some(path) = self.imports.get(name) {
            return self.named(path.clone());
        }
        if let Some(path) = self.glob_types.get(name) {
            return self.named(path.clone());
        }
        if BuiltinType::from_name(name).is_some() {
            return ReceiverType::Named(Identifier::new("", name));
        }
        if let Some((_, pkg)) = STD_PRELUDE.iter().find(|(n, _)| *n == name) {
            return ReceiverType::Named(Identifier::new(*pkg, name));
        }
        ReceiverType::Unnamed(format!("unresolved name `{}`", name))
    }

    /// Turns an absolute path into the identity of the declaration it names,
    /// following `use` re-exports through crate modules.
    fn named(&self, mut segments: Vec<String>) -> ReceiverType {
        for _ in 0..MAX_REEXPORT_HOPS {
            let Some((name, pkg)) = segments.split_last() else {
                return ReceiverType::Unnamed("empty path".to_string());
            };
            let module = pkg.join("::");

            let next = match self.table.import(&module, name) {
                Some(target) if !self.table.declares(&module, name) => target.clone(),
                _ => return ReceiverType::Named(Identifier::new(module, name.clone())),
            };
            segments = next;
        }
        ReceiverType::Unnamed(format!("re-export cycle at `{}`", segments.join("::")))
    }

    /// Turns a path written in this module into an absolute one.
    ///
    /// Paths that start with neither `crate`, `self`, `super`, a child module
    /// nor an imported name are taken to be external crate paths.
    fn absolutize(&self, segments: &[String]) -> Vec<String> {
        let Some(first) = segments.first() else {
            return Vec::new();
        };

        match first.as_str() {
            CRATE_ROOT => segments.to_vec(),
            "self" => {
                let mut absolute = self.module_segments();
                absolute.extend_from_slice(&segments[1..]);
                absolute
            }
            "super" => {
                let mut absolute = self.module_segments();
                let mut rest = segments;
                while let Some(("super", tail)) = rest.split_first().map(|(h, t)| (h.as_str(), t)) {
                    if absolute.len() > 1 {
                        absolute.pop();
                    }
                    rest = tail;
                }
                absolute.extend_from_slice(rest);
                absolute
            }
            name if self.children.contains(name) => {
                let mut absolute = self.module_segments();
                absolute.extend_from_slice(segments);
                absolute
            }
            name if self.imports.contains_key(name) => {
                let mut absolute = self.imports[name].clone();
                absolute.extend_from_slice(&segments[1..]);
                absolute
            }
            _ => segments.to_vec(),
        }
    }

    fn module_segments(&self) -> Vec<String> {
        self.module_path.split("::").map(str::to_string).collect()
    }
}
