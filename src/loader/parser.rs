use crate::error::Error;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Module path of a crate root file.
pub const CRATE_ROOT: &str = "crate";

/// Parses source files with `syn` and places each one in the module tree.
pub struct AstParser;

/// A parsed source file together with the module it defines.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Absolute module path, e.g. `crate::api::widgets`
    pub module_path: String,
    /// The parsed syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses a single file located below `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid Rust, or is
    /// not located below `root`.
    pub fn parse_file(root: &Path, path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let module_path = module_path_for(root, path).with_context(|| {
            format!(
                "File {} is not below source root {}",
                path.display(),
                root.display()
            )
        })?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let syntax_tree = syn::parse_file(&content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!("Parsed {} as module {}", path.display(), module_path);

        Ok(ParsedFile {
            path: path.to_path_buf(),
            module_path,
            syntax_tree,
        })
    }

    /// Parses every file, keeping going past failures.
    ///
    /// Failures are logged and returned in place so the caller decides whether
    /// a broken file is fatal.
    pub fn parse_files(root: &Path, paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(root, path).inspect_err(|e| {
                    warn!("Failed to parse {}: {:#}", path.display(), e);
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

/// Derives the module path a file defines from its location below `root`.
///
/// `lib.rs` and `main.rs` at the root are the crate root; `a.rs` and
/// `a/mod.rs` both define `crate::a`.
pub fn module_path_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str()?.to_string()),
            _ => return None,
        }
    }

    let file_name = segments.pop()?;
    let stem = file_name.strip_suffix(".rs")?;

    let is_root_file = segments.is_empty() && (stem == "lib" || stem == "main");
    if !is_root_file && stem != "mod" {
        segments.push(stem.to_string());
    }

    let mut module_path = CRATE_ROOT.to_string();
    for segment in segments {
        module_path.push_str("::");
        module_path.push_str(&segment);
    }
    Some(module_path)
}
