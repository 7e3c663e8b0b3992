use anyhow::{Context, Result};
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Collects the `.rs` files below a crate's module root.
///
/// `target` and hidden directories are never entered.
///
/// # Example
///
/// ```no_run
/// use routes_from_source::loader::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-service/src"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} source files", result.source_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Files found by [`FileScanner::scan`].
pub struct ScanResult {
    /// Discovered `.rs` files, sorted by path
    pub source_files: Vec<PathBuf>,
    /// Entries that could not be read; scanning continued past them
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Walks the directory tree and collects all `.rs` files.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a readable directory.
    pub fn scan(&self) -> Result<ScanResult> {
        let root_meta = std::fs::metadata(&self.root_path)
            .with_context(|| format!("Failed to access source root: {}", self.root_path.display()))?;
        if !root_meta.is_dir() {
            anyhow::bail!("Source root is not a directory: {}", self.root_path.display());
        }

        let mut source_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path).into_iter().filter_entry(|e| {
            if e.path() == self.root_path {
                return true;
            }
            let file_name = e.file_name().to_string_lossy();
            !file_name.starts_with('.') && file_name != "target"
        });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        source_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        source_files.sort();

        Ok(ScanResult {
            source_files,
            warnings,
        })
    }
}
