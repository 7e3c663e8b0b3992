//! Rendering of resolution results as text, YAML or JSON.

use crate::descriptor::RouteDescriptor;
use crate::index::DeclarationIndex;
use crate::resolver::{HandlerResolution, RouteResolution, TypeResolution};
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Output formats for a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Yaml,
    Json,
}

/// Status of one resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Resolved,
    Absent,
    Unresolved,
    MissingReceiver,
}

/// One field of a route, ready to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub status: FieldStatus,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeFieldReport {
    #[serde(flatten)]
    pub field: FieldReport,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    pub is_ptr: bool,
    pub is_array: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteReport {
    pub path: String,
    pub http_method: String,
    pub handler: FieldReport,
    pub request: TypeFieldReport,
    pub response: TypeFieldReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub routes: usize,
    pub fully_resolved: usize,
    pub unresolved_fields: usize,
}

/// Results of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub routes: Vec<RouteReport>,
    pub summary: Summary,
}

impl Report {
    /// Pairs every resolution with the descriptor it came from.
    pub fn new(
        index: &DeclarationIndex,
        descriptors: &[RouteDescriptor],
        resolutions: &[RouteResolution],
    ) -> Self {
        let routes: Vec<RouteReport> = descriptors
            .iter()
            .zip(resolutions)
            .map(|(descriptor, resolution)| RouteReport {
                path: resolution.path.clone(),
                http_method: resolution.http_method.clone(),
                handler: handler_field(index, &resolution.handler),
                request: TypeFieldReport {
                    field: type_field(index, &resolution.request),
                    format: descriptor.req_format.clone(),
                    is_ptr: descriptor.req_type.is_ptr,
                    is_array: descriptor.req_type.is_array,
                },
                response: TypeFieldReport {
                    field: type_field(index, &resolution.response),
                    format: descriptor.resp_format.clone(),
                    is_ptr: descriptor.resp_type.is_ptr,
                    is_array: descriptor.resp_type.is_array,
                },
            })
            .collect();

        let summary = Summary {
            routes: resolutions.len(),
            fully_resolved: resolutions.iter().filter(|r| r.is_fully_resolved()).count(),
            unresolved_fields: resolutions.iter().map(|r| r.unresolved_count()).sum(),
        };

        Report { routes, summary }
    }

    pub fn has_unresolved(&self) -> bool {
        self.summary.unresolved_fields > 0
    }
}

fn handler_field(index: &DeclarationIndex, handler: &HandlerResolution) -> FieldReport {
    match handler {
        HandlerResolution::Resolved(id) => {
            let decl = index.method_decl(*id);
            let mut detail = decl.qualified_name();
            if let Some(trait_name) = &decl.trait_name {
                let _ = write!(detail, " (impl {})", trait_name);
            }
            FieldReport {
                status: FieldStatus::Resolved,
                detail,
            }
        }
        HandlerResolution::Unresolved {
            pkg,
            receiver,
            method,
        } => FieldReport {
            status: FieldStatus::Unresolved,
            detail: format!("{}::{}::{}", pkg, receiver, method),
        },
        HandlerResolution::MissingReceiver { pkg, method } => FieldReport {
            status: FieldStatus::MissingReceiver,
            detail: format!("{}::{}", pkg, method),
        },
    }
}

fn type_field(index: &DeclarationIndex, resolution: &TypeResolution) -> FieldReport {
    match resolution {
        TypeResolution::Resolved(spec) => FieldReport {
            status: FieldStatus::Resolved,
            detail: spec.describe(index),
        },
        TypeResolution::Absent => FieldReport {
            status: FieldStatus::Absent,
            detail: "<empty type>".to_string(),
        },
        TypeResolution::Unresolved(ident) => FieldReport {
            status: FieldStatus::Unresolved,
            detail: ident.to_string(),
        },
    }
}

/// Renders a report in the requested format.
///
/// # Errors
///
/// Returns an error if YAML or JSON serialization fails.
pub fn render(report: &Report, format: ReportFormat) -> Result<String> {
    debug!("Rendering report as {:?}", format);
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Yaml => {
            serde_yaml::to_string(report).context("Failed to serialize report to YAML")
        }
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
        }
    }
}

fn render_text(report: &Report) -> String {
    let mut out = String::new();

    for route in &report.routes {
        let _ = writeln!(out, "{} {}", route.http_method, route.path);
        let _ = writeln!(out, "  handler:  {}", describe_field(&route.handler));
        let _ = writeln!(out, "  request:  {}", describe_field(&route.request.field));
        let _ = writeln!(out, "  response: {}", describe_field(&route.response.field));
    }

    let summary = &report.summary;
    let _ = writeln!(
        out,
        "\n{} routes, {} fully resolved, {} unresolved fields",
        summary.routes, summary.fully_resolved, summary.unresolved_fields
    );

    out
}

fn describe_field(field: &FieldReport) -> String {
    match field.status {
        FieldStatus::Resolved | FieldStatus::Absent => field.detail.clone(),
        FieldStatus::Unresolved => format!("UNRESOLVED {}", field.detail),
        FieldStatus::MissingReceiver => format!("NO RECEIVER {}", field.detail),
    }
}

/// Writes `content` to `path`, creating parent directories as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing report to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse_json;
    use crate::loader::tests::packages_from_sources;
    use crate::resolver::{resolve_routes, Parallelism};
    use tempfile::TempDir;

    const ROUTES: &str = r#"[
        {
            "path": "/widgets", "http_method": "GET",
            "func": {"receiver": {"ident": {"pkg": "p", "name": "Widget"}}, "ident": {"pkg": "p", "name": "list"}},
            "resp_format": "json", "resp_type": {"ident": {"pkg": "p", "name": "Page"}, "is_array": true}
        },
        {
            "path": "/widgets/{id}", "http_method": "DELETE",
            "func": {"receiver": {"ident": {"pkg": "p", "name": "Widget"}}, "ident": {"pkg": "p", "name": "delete"}},
            "req_type": {"ident": {"pkg": "", "name": "u64"}},
            "resp_type": {"ident": {"pkg": "p", "name": "Gone"}}
        }
    ]"#;

    fn report() -> Report {
        let packages = packages_from_sources(&[(
            "p",
            r#"
            pub struct Widget;
            pub struct Page;
            impl Widget { pub fn list(&self) -> Vec<Page> { vec![] } }
            "#,
        )]);
        let index = DeclarationIndex::build(&packages).unwrap();
        let descriptors = parse_json(ROUTES).unwrap();
        let resolutions = resolve_routes(&index, &descriptors, Parallelism::Sequential);
        Report::new(&index, &descriptors, &resolutions)
    }

    #[test]
    fn test_report_summary() {
        let report = report();
        assert_eq!(
            report.summary,
            Summary {
                routes: 2,
                fully_resolved: 1,
                unresolved_fields: 2,
            }
        );
        assert!(report.has_unresolved());

        let first = &report.routes[0];
        assert_eq!(first.handler.detail, "p::Widget::list");
        assert_eq!(first.request.field.status, FieldStatus::Absent);
        assert!(first.response.is_array);
        assert_eq!(first.response.format, "json");

        let second = &report.routes[1];
        assert_eq!(second.handler.status, FieldStatus::Unresolved);
        assert_eq!(second.request.field.detail, "<built-in type u64>");
        assert_eq!(second.response.field.detail, "p::Gone");
    }

    #[test]
    fn test_render_text() {
        let text = render(&report(), ReportFormat::Text).unwrap();
        assert!(text.contains("GET /widgets\n"));
        assert!(text.contains("  handler:  UNRESOLVED p::Widget::delete"));
        assert!(text.contains("  request:  <empty type>"));
        assert!(text.contains("2 routes, 1 fully resolved, 2 unresolved fields"));
    }

    #[test]
    fn test_render_json_and_yaml() {
        let report = report();

        let json = render(&report, ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["routes"][0]["handler"]["status"], "resolved");
        assert_eq!(value["routes"][1]["response"]["status"], "unresolved");
        assert_eq!(value["summary"]["routes"], 2);

        let yaml = render(&report, ReportFormat::Yaml).unwrap();
        assert!(yaml.contains("status: missing_receiver") || yaml.contains("status: unresolved"));
        assert!(yaml.contains("fully_resolved: 1"));
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out/nested/report.txt");

        write_to_file("hello", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }
}
