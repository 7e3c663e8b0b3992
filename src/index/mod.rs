//! Declaration index.
//!
//! Built once from the loaded packages, then read-only. Declarations are kept
//! in two arenas; the lookup maps only hold [`TypeId`] / [`MethodId`] handles:
//!
//! - `types`: package -> type name -> type handle
//! - `methods`: package -> receiver type name -> method name -> method handle
//! - `trait_methods`: package -> receiver type name -> method name -> trait
//!   name -> method handle
//!
//! Inherent methods and trait methods live in separate namespaces, so
//! `impl Display for Widget` and `impl Debug for Widget` can both declare
//! `fmt`. A key inserted twice is a fatal construction error. Nothing is ever
//! overwritten.

pub mod receiver;

use crate::descriptor::{Identifier, TypeReference};
use crate::error::{Error, Result};
use crate::loader::ParsedPackage;
use crate::types::{
    BuiltinType, MethodDecl, MethodId, ReceiverMode, TypeDecl, TypeDeclKind, TypeId, TypeSpec,
};
use log::debug;
use quote::ToTokens;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;
use syn::{ImplItem, Item};

type TypeMap = BTreeMap<String, BTreeMap<String, TypeId>>;
type MethodMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, MethodId>>>;
type TraitMethodMap =
    BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, MethodId>>>>;

/// Lookup index of every named type and method declared in a set of packages.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeclarationIndex {
    type_decls: Vec<TypeDecl>,
    method_decls: Vec<MethodDecl>,
    types: TypeMap,
    methods: MethodMap,
    trait_methods: TraitMethodMap,
}

impl DeclarationIndex {
    /// Builds the index from `packages`.
    ///
    /// Packages and their files are visited in path order, so the same set of
    /// packages always produces the same index.
    ///
    /// # Errors
    ///
    /// Fails on the first duplicate type or method key, and on an impl whose
    /// self type is a path that names no known type.
    pub fn build(packages: &[ParsedPackage]) -> Result<Self> {
        let mut ordered: Vec<&ParsedPackage> = packages.iter().collect();
        ordered.sort_by(|a, b| a.path.cmp(&b.path));

        let mut index = DeclarationIndex::default();

        for package in ordered {
            let mut files: Vec<_> = package.files.iter().collect();
            files.sort_by(|a, b| a.path.cmp(&b.path));

            for file in files {
                for item in &file.items {
                    index.record_item(package, &file.path, item)?;
                }
            }
        }

        debug!(
            "Indexed {} types and {} methods",
            index.type_decls.len(),
            index.method_decls.len()
        );

        Ok(index)
    }

    fn record_item(&mut self, package: &ParsedPackage, file: &Path, item: &Item) -> Result<()> {
        let (ident, kind) = match item {
            Item::Struct(s) => (&s.ident, TypeDeclKind::Struct),
            Item::Enum(e) => (&e.ident, TypeDeclKind::Enum),
            Item::Union(u) => (&u.ident, TypeDeclKind::Union),
            Item::Type(t) => (&t.ident, TypeDeclKind::Alias),
            Item::Trait(t) => (&t.ident, TypeDeclKind::Trait),
            Item::Impl(item_impl) => return self.record_impl(package, file, item_impl),
            // free functions have no receiver
            _ => return Ok(()),
        };

        self.add_type(TypeDecl {
            ident: Identifier::new(package.path.clone(), ident.to_string()),
            kind,
            file: file.to_path_buf(),
        })
    }

    fn record_impl(
        &mut self,
        package: &ParsedPackage,
        file: &Path,
        item_impl: &syn::ItemImpl,
    ) -> Result<()> {
        let methods: Vec<&syn::ImplItemFn> = item_impl
            .items
            .iter()
            .filter_map(|item| match item {
                ImplItem::Fn(f) if f.sig.receiver().is_some() => Some(f),
                _ => None,
            })
            .collect();

        if methods.is_empty() {
            return Ok(());
        }

        if receiver::is_blanket_impl(item_impl) {
            debug!(
                "Skipping blanket impl with {} methods in {}",
                methods.len(),
                file.display()
            );
            return Ok(());
        }

        if !receiver::has_nominal_self_type(item_impl) {
            debug!(
                "Skipping impl on {} with {} methods in {}",
                package.type_of(&item_impl.self_ty),
                methods.len(),
                file.display()
            );
            return Ok(());
        }

        let receiver_ident = receiver::normalize(&package.type_of(&item_impl.self_ty), file)?;
        let trait_name = item_impl
            .trait_
            .as_ref()
            .and_then(|(_, path, _)| path.segments.last())
            .map(trait_label);

        for method in methods {
            let Some(self_arg) = method.sig.receiver() else {
                continue;
            };
            self.add_method(MethodDecl {
                receiver: receiver_ident.clone(),
                name: method.sig.ident.to_string(),
                trait_name: trait_name.clone(),
                receiver_mode: ReceiverMode::from_receiver(self_arg),
                is_async: method.sig.asyncness.is_some(),
                file: file.to_path_buf(),
            })?;
        }

        Ok(())
    }

    fn add_type(&mut self, decl: TypeDecl) -> Result<()> {
        let id = TypeId(self.type_decls.len() as u32);
        let names = self.types.entry(decl.ident.pkg.clone()).or_default();

        match names.entry(decl.ident.name.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateType {
                pkg: decl.ident.pkg,
                name: decl.ident.name,
            }),
            Entry::Vacant(slot) => {
                slot.insert(id);
                self.type_decls.push(decl);
                Ok(())
            }
        }
    }

    fn add_method(&mut self, decl: MethodDecl) -> Result<()> {
        let id = MethodId(self.method_decls.len() as u32);
        let methods = match &decl.trait_name {
            None => self
                .methods
                .entry(decl.receiver.pkg.clone())
                .or_default()
                .entry(decl.receiver.name.clone())
                .or_default(),
            Some(_) => self
                .trait_methods
                .entry(decl.receiver.pkg.clone())
                .or_default()
                .entry(decl.receiver.name.clone())
                .or_default()
                .entry(decl.name.clone())
                .or_default(),
        };
        let key = decl.trait_name.clone().unwrap_or_else(|| decl.name.clone());

        match methods.entry(key) {
            Entry::Occupied(_) => Err(Error::DuplicateMethod {
                pkg: decl.receiver.pkg.clone(),
                receiver: decl.receiver.name.clone(),
                method: decl.qualified_method(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(id);
                self.method_decls.push(decl);
                Ok(())
            }
        }
    }

    /// Resolves a type reference.
    ///
    /// References without a package are looked up in the universal scope.
    /// Returns `None` when nothing is declared under the reference.
    pub fn lookup_type(&self, reference: &TypeReference) -> Option<TypeSpec> {
        let ident = &reference.ident;

        if ident.pkg.is_empty() {
            return BuiltinType::from_name(&ident.name).map(TypeSpec::Builtin);
        }

        self.types
            .get(&ident.pkg)?
            .get(&ident.name)
            .copied()
            .map(TypeSpec::Named)
    }

    /// Finds a method by exact package, receiver type name and method name.
    ///
    /// Inherent methods win. Otherwise `method` matches a trait method when
    /// exactly one trait implemented for the receiver declares it, or when it
    /// is written trait-qualified as `Trait::method`.
    pub fn lookup_method(&self, pkg: &str, receiver: &str, method: &str) -> Option<MethodId> {
        let inherent = self
            .methods
            .get(pkg)
            .and_then(|receivers| receivers.get(receiver))
            .and_then(|methods| methods.get(method));
        if let Some(id) = inherent {
            return Some(*id);
        }

        let by_trait = self.trait_methods.get(pkg)?.get(receiver)?;
        if let Some((trait_name, name)) = method.rsplit_once("::") {
            return by_trait.get(name)?.get(trait_name).copied();
        }

        let candidates = by_trait.get(method)?;
        match candidates.len() {
            1 => candidates.values().next().copied(),
            _ => {
                debug!(
                    "{}::{}::{} is ambiguous between traits {:?}",
                    pkg,
                    receiver,
                    method,
                    candidates.keys().collect::<Vec<_>>()
                );
                None
            }
        }
    }

    pub fn type_decl(&self, id: TypeId) -> &TypeDecl {
        &self.type_decls[id.0 as usize]
    }

    pub fn method_decl(&self, id: MethodId) -> &MethodDecl {
        &self.method_decls[id.0 as usize]
    }

    pub fn type_count(&self) -> usize {
        self.type_decls.len()
    }

    pub fn method_count(&self) -> usize {
        self.method_decls.len()
    }

    /// Number of packages that declare at least one type or method.
    pub fn package_count(&self) -> usize {
        let mut packages: Vec<&String> = self
            .types
            .keys()
            .chain(self.methods.keys())
            .chain(self.trait_methods.keys())
            .collect();
        packages.sort();
        packages.dedup();
        packages.len()
    }
}

/// Last segment of a trait path with its generic arguments, e.g.
/// `PartialEq<Gadget>`, so `PartialEq<A>` and `PartialEq<B>` stay apart.
fn trait_label(segment: &syn::PathSegment) -> String {
    segment
        .to_token_stream()
        .to_string()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::packages_from_sources;

    const WIDGETS: &str = r#"
        pub struct Widget {
            id: u64,
        }

        pub struct Result {
            items: Vec<Widget>,
        }

        pub enum Status { Active, Retired }

        pub type WidgetId = u64;

        pub trait Describe {
            fn describe(&self) -> String;
        }

        impl Widget {
            pub fn new(id: u64) -> Self { Widget { id } }

            pub async fn list(&self, limit: usize) -> Result {
                Result { items: vec![] }
            }
        }

        impl Widget {
            pub fn retire(self) {}
        }

        impl Describe for &Widget {
            fn describe(&self) -> String { String::new() }
        }

        pub fn free_function() {}
    "#;

    fn widget_index() -> DeclarationIndex {
        DeclarationIndex::build(&packages_from_sources(&[("p", WIDGETS)])).unwrap()
    }

    fn reference(pkg: &str, name: &str) -> TypeReference {
        TypeReference::new(Identifier::new(pkg, name))
    }

    #[test]
    fn test_indexes_types() {
        let index = widget_index();
        assert_eq!(index.type_count(), 5);

        for (name, kind) in [
            ("Widget", TypeDeclKind::Struct),
            ("Result", TypeDeclKind::Struct),
            ("Status", TypeDeclKind::Enum),
            ("WidgetId", TypeDeclKind::Alias),
            ("Describe", TypeDeclKind::Trait),
        ] {
            let Some(TypeSpec::Named(id)) = index.lookup_type(&reference("p", name)) else {
                panic!("{} should be a named type", name);
            };
            let decl = index.type_decl(id);
            assert_eq!(decl.ident, Identifier::new("p", name));
            assert_eq!(decl.kind, kind);
        }
    }

    #[test]
    fn test_indexes_only_methods_with_receivers() {
        let index = widget_index();
        assert_eq!(index.method_count(), 3);

        assert!(index.lookup_method("p", "Widget", "list").is_some());
        assert!(index.lookup_method("p", "Widget", "retire").is_some());
        assert!(index.lookup_method("p", "Widget", "new").is_none());
        assert!(index.lookup_method("p", "Widget", "free_function").is_none());
    }

    #[test]
    fn test_pointer_and_value_receivers_share_a_key() {
        let index = widget_index();

        let describe = index.lookup_method("p", "Widget", "describe").unwrap();
        let decl = index.method_decl(describe);
        assert_eq!(decl.receiver, Identifier::new("p", "Widget"));
        assert_eq!(decl.trait_name.as_deref(), Some("Describe"));

        let retire = index.method_decl(index.lookup_method("p", "Widget", "retire").unwrap());
        assert_eq!(retire.receiver_mode, ReceiverMode::Value);

        let list = index.method_decl(index.lookup_method("p", "Widget", "list").unwrap());
        assert!(list.is_async);
        assert_eq!(list.receiver_mode, ReceiverMode::Ref);
    }

    #[test]
    fn test_lookup_requires_exact_keys() {
        let index = widget_index();
        assert!(index.lookup_method("q", "Widget", "list").is_none());
        assert!(index.lookup_method("p", "Gadget", "list").is_none());
        assert!(index.lookup_method("p", "Widget", "List").is_none());
        assert!(index.lookup_type(&reference("q", "Widget")).is_none());
        assert!(index.lookup_type(&reference("p", "Missing")).is_none());
    }

    #[test]
    fn test_builtin_lookup() {
        let index = widget_index();
        assert_eq!(
            index.lookup_type(&reference("", "u64")),
            Some(TypeSpec::Builtin(BuiltinType::U64))
        );
        assert_eq!(index.lookup_type(&reference("", "Widget")), None);
        assert_eq!(index.lookup_type(&TypeReference::default()), None);
    }

    #[test]
    fn test_duplicate_type_is_fatal() {
        let packages = packages_from_sources(&[
            ("p", "pub struct Widget;"),
            ("p::extra", "pub struct Widget;"),
        ]);
        assert!(DeclarationIndex::build(&packages).is_ok());

        let packages = packages_from_sources(&[("p", "pub struct Widget; pub enum Widget {}")]);
        let err = DeclarationIndex::build(&packages).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateType { ref pkg, ref name } if pkg == "p" && name == "Widget"
        ));
    }

    #[test]
    fn test_duplicate_method_across_receiver_kinds_is_fatal() {
        let packages = packages_from_sources(&[(
            "p",
            r#"
            pub struct Widget;
            impl Widget { fn list(&self) {} }
            impl Widget { fn list(self) {} }
            "#,
        )]);

        let err = DeclarationIndex::build(&packages).unwrap_err();
        match err {
            Error::DuplicateMethod {
                pkg,
                receiver,
                method,
            } => {
                assert_eq!(pkg, "p");
                assert_eq!(receiver, "Widget");
                assert_eq!(method, "list");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_methods_are_keyed_by_receiver_package() {
        let packages = packages_from_sources(&[
            ("crate", "pub mod model; pub mod api;"),
            ("crate::model", "pub struct Gadget;"),
            (
                "crate::api",
                "use crate::model::Gadget; impl Gadget { pub fn show(&self) {} }",
            ),
        ]);

        let index = DeclarationIndex::build(&packages).unwrap();
        assert!(index.lookup_method("crate::model", "Gadget", "show").is_some());
        assert!(index.lookup_method("crate::api", "Gadget", "show").is_none());
    }

    #[test]
    fn test_unresolvable_receiver_name_is_fatal() {
        let packages = packages_from_sources(&[("p", "impl Nowhere { fn go(&self) {} }")]);

        let err = DeclarationIndex::build(&packages).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidReceiver { ref receiver, .. } if receiver.contains("Nowhere")
        ));
    }

    #[test]
    fn test_impls_on_unnamed_self_types_are_skipped() {
        let packages = packages_from_sources(&[(
            "p",
            r#"
            pub trait Handler { fn handle(&self); }
            impl dyn Handler { pub fn boxed(&self) {} }

            pub trait Sum { fn sum(&self) -> u32; }
            impl Sum for [u32] { fn sum(&self) -> u32 { 0 } }
            impl Sum for (u32, u32) { fn sum(&self) -> u32 { self.0 + self.1 } }
            impl Sum for fn(u32) { fn sum(&self) -> u32 { 0 } }
            "#,
        )]);

        let index = DeclarationIndex::build(&packages).unwrap();
        assert_eq!(index.method_count(), 0);
        assert_eq!(index.type_count(), 2);
    }

    #[test]
    fn test_trait_methods_with_the_same_name_coexist() {
        let packages = packages_from_sources(&[(
            "p",
            r#"
            use std::fmt;

            pub struct Widget;
            pub struct Gadget;

            impl fmt::Display for Widget {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { Ok(()) }
            }

            impl fmt::Debug for Widget {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { Ok(()) }
            }

            impl PartialEq<Gadget> for Widget {
                fn eq(&self, other: &Gadget) -> bool { true }
            }

            impl PartialEq<u32> for Widget {
                fn eq(&self, other: &u32) -> bool { false }
            }
            "#,
        )]);

        let index = DeclarationIndex::build(&packages).unwrap();
        assert_eq!(index.method_count(), 4);

        // ambiguous unless qualified by the trait
        assert!(index.lookup_method("p", "Widget", "fmt").is_none());
        let display = index.lookup_method("p", "Widget", "Display::fmt").unwrap();
        assert_eq!(index.method_decl(display).trait_name.as_deref(), Some("Display"));
        let debug = index.lookup_method("p", "Widget", "Debug::fmt").unwrap();
        assert_ne!(display, debug);

        let eq = index.lookup_method("p", "Widget", "PartialEq<Gadget>::eq").unwrap();
        assert_eq!(index.method_decl(eq).qualified_method(), "PartialEq<Gadget>::eq");
    }

    #[test]
    fn test_inherent_method_wins_over_trait_method() {
        let packages = packages_from_sources(&[(
            "p",
            r#"
            pub struct Widget;
            pub trait Render { fn render(&self); }
            impl Widget { pub fn render(&self) {} }
            impl Render for Widget { fn render(&self) {} }
            "#,
        )]);

        let index = DeclarationIndex::build(&packages).unwrap();
        let inherent = index.lookup_method("p", "Widget", "render").unwrap();
        assert_eq!(index.method_decl(inherent).trait_name, None);
        let via_trait = index.lookup_method("p", "Widget", "Render::render").unwrap();
        assert_ne!(inherent, via_trait);
    }

    #[test]
    fn test_duplicate_trait_impl_is_fatal() {
        let packages = packages_from_sources(&[(
            "p",
            r#"
            pub struct Widget;
            impl Clone for Widget { fn clone(&self) -> Self { Widget } }
            #[cfg(feature = "v2")]
            impl Clone for Widget { fn clone(&self) -> Self { Widget } }
            "#,
        )]);

        let err = DeclarationIndex::build(&packages).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateMethod { ref method, .. } if method == "Clone::clone"
        ));
    }

    #[test]
    fn test_glob_and_reexported_receivers() {
        let packages = packages_from_sources(&[
            ("crate", "pub mod model; pub mod api; pub mod ext;"),
            ("crate::model", "pub struct Gadget;"),
            ("crate::api", "pub mod widgets; pub use widgets::Widget;"),
            ("crate::api::widgets", "pub struct Widget;"),
            (
                "crate::ext",
                r#"
                use crate::model::Gadget;
                use crate::api::Widget;

                impl Widget { pub fn list(&self) {} }

                mod inner {
                    use super::*;
                    impl Gadget { pub fn show(&self) {} }
                }
                "#,
            ),
        ]);

        let index = DeclarationIndex::build(&packages).unwrap();
        assert!(index.lookup_method("crate::model", "Gadget", "show").is_some());
        assert!(index
            .lookup_method("crate::api::widgets", "Widget", "list")
            .is_some());
        assert!(index.lookup_method("crate::api", "Widget", "list").is_none());
    }

    #[test]
    fn test_blanket_impls_are_skipped() {
        let packages = packages_from_sources(&[(
            "p",
            r#"
            pub trait Describe { fn describe(&self) -> String; }
            impl<T: std::fmt::Debug> Describe for T {
                fn describe(&self) -> String { format!("{:?}", self) }
            }
            "#,
        )]);

        let index = DeclarationIndex::build(&packages).unwrap();
        assert_eq!(index.method_count(), 0);
        assert_eq!(index.type_count(), 1);
    }

    #[test]
    fn test_build_is_order_independent() {
        let sources = [
            ("crate", "pub mod a; pub mod b; pub struct Root; impl Root { fn go(&self) {} }"),
            ("crate::a", "pub struct A; impl A { fn run(&mut self) {} }"),
            ("crate::b", "pub struct B; pub enum C {} impl B { fn stop(self) {} }"),
        ];
        let forward = DeclarationIndex::build(&packages_from_sources(&sources)).unwrap();

        let mut reversed_packages = packages_from_sources(&sources);
        reversed_packages.reverse();
        let reversed = DeclarationIndex::build(&reversed_packages).unwrap();

        assert_eq!(forward, reversed);
        assert_eq!(forward.package_count(), 3);
    }
}
