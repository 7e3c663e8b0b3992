//! routes-from-source - resolve HTTP route descriptors against Rust source.
//!
//! Route descriptors name a handler (receiver type plus method) and the
//! request/response types of each HTTP route. This library checks those names
//! against what a crate actually declares, so documentation can be generated
//! from real code instead of hand-maintained annotations.
//!
//! # Architecture
//!
//! 1. [`descriptor`] - the route descriptor model and its file loader
//! 2. [`loader`] - scans, parses and splits a crate into per-module packages
//! 3. [`index`] - the declaration index of named types and methods
//! 4. [`resolver`] - resolves each route against the index
//! 5. [`report`] - renders the results as text, YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use routes_from_source::{
//!     descriptor::{gather_package_patterns, read_descriptors},
//!     index::DeclarationIndex,
//!     loader::SourceLoader,
//!     resolver::{resolve_routes, Parallelism},
//! };
//! use std::path::{Path, PathBuf};
//!
//! let descriptors = read_descriptors(Path::new("routes.json")).unwrap();
//! let patterns = gather_package_patterns(&descriptors);
//!
//! let packages = SourceLoader::new(PathBuf::from("./my-service"))
//!     .load(&patterns)
//!     .unwrap();
//! let index = DeclarationIndex::build(&packages).unwrap();
//!
//! for route in resolve_routes(&index, &descriptors, Parallelism::Parallel) {
//!     println!("{} {}: {} unresolved", route.http_method, route.path, route.unresolved_count());
//! }
//! ```

pub mod cli;
pub mod descriptor;
pub mod error;
pub mod index;
pub mod loader;
pub mod report;
pub mod resolver;
pub mod types;
