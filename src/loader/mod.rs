//! Source loading: from a crate directory to parsed packages.
//!
//! The declaration index does not read files itself. It consumes
//! [`ParsedPackage`]s: one per module, holding the module's top-level items
//! and a [`TypeScope`] able to resolve the type of an impl block's receiver.
//!
//! Loading happens in three steps:
//!
//! 1. [`scanner`] collects the `.rs` files below the module root
//! 2. [`parser`] parses them and derives each file's module path
//! 3. [`assemble`] splits inline `mod` blocks into their own packages, drops
//!    `#[cfg(test)]` items and builds the scopes
//!
//! Patterns decide whether a crate is needed at all. A needed crate is loaded
//! whole, since methods of a type can be declared in any of its modules.
//!
//! # Example
//!
//! ```no_run
//! use routes_from_source::loader::SourceLoader;
//! use std::path::PathBuf;
//!
//! let loader = SourceLoader::new(PathBuf::from("./my-service"));
//! let packages = loader.load(&["crate::api::...".to_string()]).unwrap();
//! println!("Loaded {} packages", packages.len());
//! ```

pub mod parser;
pub mod scanner;
pub mod scope;

use crate::index::receiver::ReceiverType;
use anyhow::Result;
use log::{debug, info, warn};
use parser::{AstParser, ParsedFile};
use scanner::FileScanner;
use scope::{collect_use_bindings, ModuleTable, TypeScope, UseBinding};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syn::Item;

/// Pattern suffix selecting a package and all of its descendants.
const RECURSIVE_SUFFIX: &str = "::...";

/// Top-level items of one module contributed by one source file.
#[derive(Debug)]
pub struct PackageFile {
    pub path: PathBuf,
    pub items: Vec<Item>,
}

/// One module of the analysed crate.
#[derive(Debug)]
pub struct ParsedPackage {
    /// Absolute module path, e.g. `crate::api`
    pub path: String,
    pub files: Vec<PackageFile>,
    scope: TypeScope,
}

impl ParsedPackage {
    /// Resolves type syntax written inside this package.
    pub fn type_of(&self, ty: &syn::Type) -> ReceiverType {
        self.scope.type_of(ty)
    }

    /// Number of top-level items across all files.
    pub fn item_count(&self) -> usize {
        self.files.iter().map(|f| f.items.len()).sum()
    }
}

/// Loads the packages of a crate that match a set of patterns.
pub struct SourceLoader {
    module_root: PathBuf,
}

impl SourceLoader {
    /// Creates a loader for the crate at `root`.
    ///
    /// If `root` has a `src` directory, that directory is the module root;
    /// otherwise `root` itself is.
    pub fn new(root: PathBuf) -> Self {
        let src = root.join("src");
        let module_root = if src.is_dir() { src } else { root };
        Self { module_root }
    }

    pub fn module_root(&self) -> &Path {
        &self.module_root
    }

    /// Loads the crate's packages, sorted by path.
    ///
    /// An `impl` block may sit in any module of the crate, not only in the one
    /// declaring its self type. So once any pattern selects a module, every
    /// module of the crate is returned. When no pattern selects anything the
    /// crate has nothing to contribute and the result is empty.
    ///
    /// Files that fail to parse are skipped with a warning; the declarations
    /// they hold will show up as unresolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the module root cannot be scanned.
    pub fn load(&self, patterns: &[String]) -> Result<Vec<ParsedPackage>> {
        info!("Loading sources from {}", self.module_root.display());

        let scan_result = FileScanner::new(self.module_root.clone()).scan()?;
        for warning in &scan_result.warnings {
            warn!("{}", warning);
        }
        debug!("Found {} source files", scan_result.source_files.len());

        let parsed_files: Vec<ParsedFile> =
            AstParser::parse_files(&self.module_root, &scan_result.source_files)
                .into_iter()
                .filter_map(Result::ok)
                .collect();

        let packages = assemble(parsed_files);
        debug!("Assembled {} packages", packages.len());

        let selected = count_selected(&packages, patterns);
        if selected == 0 {
            info!("No package selected");
            return Ok(Vec::new());
        }
        info!(
            "Selected {} packages, loading all {} for their impl blocks",
            selected,
            packages.len()
        );

        Ok(packages)
    }
}

/// Whether `pattern` selects the package at `package_path`.
pub fn pattern_matches(pattern: &str, package_path: &str) -> bool {
    match pattern.strip_suffix(RECURSIVE_SUFFIX) {
        Some(prefix) => {
            package_path == prefix
                || package_path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with("::"))
        }
        None => package_path == pattern,
    }
}

/// Number of packages matched by at least one pattern. Patterns matching
/// nothing are logged.
pub fn count_selected(packages: &[ParsedPackage], patterns: &[String]) -> usize {
    for pattern in patterns {
        if !packages.iter().any(|p| pattern_matches(pattern, &p.path)) {
            warn!("Package pattern {} matched no module", pattern);
        }
    }

    packages
        .iter()
        .filter(|p| patterns.iter().any(|pattern| pattern_matches(pattern, &p.path)))
        .count()
}

/// Builds packages from parsed files.
///
/// Inline `mod name { ... }` blocks become packages of their own, items gated
/// by `#[cfg(test)]` are dropped. The result is sorted by package path.
pub fn assemble(files: Vec<ParsedFile>) -> Vec<ParsedPackage> {
    let mut modules: BTreeMap<String, Vec<PackageFile>> = BTreeMap::new();
    let mut table = ModuleTable::default();

    for file in files {
        split_module(
            &file.module_path,
            &file.path,
            file.syntax_tree.items,
            &mut modules,
            &mut table,
        );
    }

    // file-based modules are children of their parent too
    for module_path in modules.keys() {
        if let Some((parent, child)) = module_path.rsplit_once("::") {
            table
                .children
                .entry(parent.to_string())
                .or_default()
                .insert(child.to_string());
        }
    }

    for (module_path, module_files) in &modules {
        let names = table.declared_types.entry(module_path.clone()).or_default();
        for item in module_files.iter().flat_map(|f| &f.items) {
            if let Some(name) = declared_type_name(item) {
                names.insert(name);
            }
        }
    }

    let bindings: BTreeMap<String, Vec<UseBinding>> = modules
        .iter()
        .map(|(path, files)| {
            let mut out = Vec::new();
            for item in files.iter().flat_map(|f| &f.items) {
                if let Item::Use(item_use) = item {
                    collect_use_bindings(&item_use.tree, &mut Vec::new(), &mut out);
                }
            }
            (path.clone(), out)
        })
        .collect();

    // named imports of every module, so globs and re-exports can see them
    let declared = Arc::new(table);
    let imports = bindings
        .iter()
        .map(|(path, module_bindings)| {
            let scope = TypeScope::new(path, module_bindings, Arc::clone(&declared));
            (path.clone(), scope.imports().clone())
        })
        .collect();
    let table = Arc::new(ModuleTable {
        imports,
        ..ModuleTable::clone(&declared)
    });

    modules
        .into_iter()
        .map(|(path, files)| {
            let scope = TypeScope::new(&path, &bindings[&path], Arc::clone(&table));
            ParsedPackage { path, files, scope }
        })
        .collect()
}

fn split_module(
    module_path: &str,
    file: &Path,
    items: Vec<Item>,
    modules: &mut BTreeMap<String, Vec<PackageFile>>,
    table: &mut ModuleTable,
) {
    let mut kept = Vec::with_capacity(items.len());

    for item in items {
        if is_test_only(item_attrs(&item)) {
            continue;
        }
        match item {
            Item::Mod(item_mod) => {
                let child = item_mod.ident.to_string();
                table
                    .children
                    .entry(module_path.to_string())
                    .or_default()
                    .insert(child.clone());
                if let Some((_, content)) = item_mod.content {
                    let child_path = format!("{}::{}", module_path, child);
                    split_module(&child_path, file, content, modules, table);
                }
            }
            other => kept.push(other),
        }
    }

    modules
        .entry(module_path.to_string())
        .or_default()
        .push(PackageFile {
            path: file.to_path_buf(),
            items: kept,
        });
}

fn declared_type_name(item: &Item) -> Option<String> {
    match item {
        Item::Struct(s) => Some(s.ident.to_string()),
        Item::Enum(e) => Some(e.ident.to_string()),
        Item::Union(u) => Some(u.ident.to_string()),
        Item::Type(t) => Some(t.ident.to_string()),
        Item::Trait(t) => Some(t.ident.to_string()),
        _ => None,
    }
}

fn item_attrs(item: &Item) -> &[syn::Attribute] {
    match item {
        Item::Struct(i) => &i.attrs,
        Item::Enum(i) => &i.attrs,
        Item::Union(i) => &i.attrs,
        Item::Type(i) => &i.attrs,
        Item::Trait(i) => &i.attrs,
        Item::Impl(i) => &i.attrs,
        Item::Fn(i) => &i.attrs,
        Item::Mod(i) => &i.attrs,
        Item::Use(i) => &i.attrs,
        _ => &[],
    }
}

/// Whether the attributes include `#[cfg(test)]`.
fn is_test_only(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .meta
                .require_list()
                .is_ok_and(|list| list.tokens.to_string() == "test")
    })
}

/// Package paths of `packages`, for logging.
pub fn package_paths(packages: &[ParsedPackage]) -> BTreeSet<&str> {
    packages.iter().map(|p| p.path.as_str()).collect()
}
