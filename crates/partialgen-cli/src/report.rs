//! Command reports in human, JSON and YAML form

use anyhow::{Context, Result};
use clap::ValueEnum;
use partialgen_compiler::{CodeFix, PassReport};
use partialgen_core::diagnostics::Diagnostic;
use serde::Serialize;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

#[derive(Debug, Serialize)]
pub struct GenerateReport {
    pub snapshot: String,
    pub output_directory: String,
    pub files: Vec<String>,
    pub pass: PassReport,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticRecord {
    pub id: String,
    pub severity: String,
    pub location: String,
    pub message: String,
}

impl From<&Diagnostic> for DiagnosticRecord {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            id: diagnostic.id().to_string(),
            severity: diagnostic.severity().to_string(),
            location: diagnostic.location.to_string(),
            message: diagnostic.message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub snapshot: String,
    pub diagnostics: Vec<DiagnosticRecord>,
}

#[derive(Debug, Serialize)]
pub struct FixReport {
    pub snapshot: String,
    pub written_to: Option<String>,
    pub fixes: Vec<CodeFix>,
}

/// Print `value` as JSON or YAML, or with `human` for human output
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Human => human(value),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON report")?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value).context("Failed to serialize YAML report")?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

pub fn print_generate(reports: &[GenerateReport]) {
    for report in reports {
        println!("📦 {}", report.snapshot);
        println!(
            "   {} files ({} regenerated, {} reused) in {}",
            report.files.len(),
            report.pass.cache.generated,
            report.pass.cache.reused,
            report.output_directory
        );
        for file in &report.files {
            println!("     {}", file);
        }
    }
}

pub fn print_check(reports: &[CheckReport]) {
    let mut total = 0;
    for report in reports {
        for diagnostic in &report.diagnostics {
            println!(
                "{}: {} {}: {}",
                diagnostic.location, diagnostic.severity, diagnostic.id, diagnostic.message
            );
        }
        total += report.diagnostics.len();
    }
    if total == 0 {
        println!("✅ No problems found in {} snapshots", reports.len());
    } else {
        println!("❌ {} problems found", total);
    }
}

pub fn print_fix(reports: &[FixReport]) {
    for report in reports {
        if report.fixes.is_empty() {
            println!("✅ {}: nothing to fix", report.snapshot);
            continue;
        }
        println!("🔧 {}: {} fixes", report.snapshot, report.fixes.len());
        for fix in &report.fixes {
            println!("   {} in {} ({})", fix.title, fix.declaration, fix.tree_path);
            for line in fix.stub_text.lines() {
                println!("       {}", line);
            }
        }
        match &report.written_to {
            Some(path) => println!("   Updated snapshot written to {}", path),
            None => println!("   Dry run; pass --write to update the snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partialgen_compiler::analyzers::MISSING_SUBSCRIPTION_CALLBACK;
    use partialgen_core::model::Location;

    #[test]
    fn test_diagnostic_record_fields() {
        let diagnostic = Diagnostic::new(
            &MISSING_SUBSCRIPTION_CALLBACK,
            Location::new("Assets/Player.cs", 8, 10),
            vec![
                "Player".to_string(),
                "OnHealthChanged(int previous, int current)".to_string(),
                "health".to_string(),
            ],
        );
        let record = DiagnosticRecord::from(&diagnostic);
        assert_eq!(record.id, "PG0002");
        assert_eq!(record.severity, "error");
        assert_eq!(record.location, "Assets/Player.cs:8:10");
        assert_eq!(record.message, diagnostic.message());
    }
}
