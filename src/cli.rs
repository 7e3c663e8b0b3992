use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Resolve HTTP route descriptors against the declarations of a Rust crate
#[derive(Parser, Debug)]
#[command(name = "routes-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Route descriptor file (JSON array, or YAML for .yaml/.yml)
    #[arg(value_name = "DESCRIPTORS")]
    pub descriptors_path: PathBuf,

    /// Root directory of the crate to analyse
    #[arg(short = 's', long = "source", value_name = "DIR", default_value = ".")]
    pub source_path: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Number of threads resolving routes (1 resolves sequentially)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Fail when any handler, request or response type is unresolved
    #[arg(long = "deny-unresolved")]
    pub deny_unresolved: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl From<OutputFormat> for crate::report::ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => crate::report::ReportFormat::Text,
            OutputFormat::Yaml => crate::report::ReportFormat::Yaml,
            OutputFormat::Json => crate::report::ReportFormat::Json,
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.descriptors_path.is_file() {
        anyhow::bail!(
            "Descriptor file does not exist or is not a file: {}",
            args.descriptors_path.display()
        );
    }

    if !args.source_path.is_dir() {
        anyhow::bail!(
            "Source path does not exist or is not a directory: {}",
            args.source_path.display()
        );
    }

    if args.jobs == Some(0) {
        anyhow::bail!("--jobs must be at least 1");
    }

    info!("Descriptors: {}", args.descriptors_path.display());
    info!("Source path: {}", args.source_path.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::descriptor::{gather_package_patterns, read_descriptors};
    use crate::index::DeclarationIndex;
    use crate::loader::{package_paths, SourceLoader};
    use crate::report::{render, write_to_file, Report};
    use crate::resolver::{resolve_routes, Parallelism};

    // Step 1: read route descriptors
    let descriptors = read_descriptors(&args.descriptors_path).with_context(|| {
        format!(
            "Failed to read route descriptors from {}",
            args.descriptors_path.display()
        )
    })?;
    info!(
        "Read {} route descriptors from {}",
        descriptors.len(),
        args.descriptors_path.display()
    );

    // Step 2: work out which packages are needed
    let patterns = gather_package_patterns(&descriptors);
    info!("Will load {} packages", patterns.len());
    for pattern in &patterns {
        debug!("  - {}", pattern);
    }

    // Step 3: load and parse sources
    let loader = SourceLoader::new(args.source_path.clone());
    let packages = loader.load(&patterns)?;
    debug!("Loaded packages: {:?}", package_paths(&packages));

    // Step 4: build the declaration index
    let index = DeclarationIndex::build(&packages).context("Failed to build declaration index")?;
    info!(
        "Indexed {} types and {} methods in {} packages",
        index.type_count(),
        index.method_count(),
        index.package_count()
    );

    // Step 5: resolve routes
    let parallelism = match args.jobs {
        Some(1) => Parallelism::Sequential,
        Some(jobs) => {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
            {
                warn!("Could not configure {} resolver threads: {}", jobs, e);
            }
            Parallelism::Parallel
        }
        None => Parallelism::Parallel,
    };
    let resolutions = resolve_routes(&index, &descriptors, parallelism);

    // Step 6: report
    let report = Report::new(&index, &descriptors, &resolutions);
    let content = render(&report, args.output_format.into())?;

    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("Wrote report to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!(
        "{} routes, {} fully resolved, {} unresolved fields",
        report.summary.routes, report.summary.fully_resolved, report.summary.unresolved_fields
    );

    if args.deny_unresolved && report.has_unresolved() {
        anyhow::bail!(
            "{} route fields could not be resolved",
            report.summary.unresolved_fields
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(descriptors: PathBuf, source: PathBuf) -> CliArgs {
        CliArgs::parse_from([
            "routes-from-source".into(),
            descriptors.into_os_string(),
            "--source".into(),
            source.into_os_string(),
        ])
    }

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["routes-from-source", "routes.json"]);
        assert_eq!(args.source_path, PathBuf::from("."));
        assert!(matches!(args.output_format, OutputFormat::Text));
        assert!(args.jobs.is_none());
        assert!(!args.deny_unresolved);
    }

    #[test]
    fn test_rejects_missing_descriptor_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = parse_args_from_parsed(args(
            temp_dir.path().join("routes.json"),
            temp_dir.path().to_path_buf(),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_jobs() {
        let temp_dir = TempDir::new().unwrap();
        let descriptors = temp_dir.path().join("routes.json");
        fs::write(&descriptors, "[]").unwrap();

        let mut parsed = args(descriptors, temp_dir.path().to_path_buf());
        parsed.jobs = Some(0);
        let err = parse_args_from_parsed(parsed).unwrap_err();
        assert!(err.to_string().contains("--jobs"));
    }
}
