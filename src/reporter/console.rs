use colored::Colorize;
use tabled::{Table, Tabled, settings::{Alignment, Modify, Style, object::Rows}};

use crate::models::{Finding, Severity};
use crate::scanner::ScanStats;

const MAX_CELL: usize = 60;

pub struct ConsoleReporter;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Finding")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Evidence")]
    evidence: String,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn print_findings(&self, findings: &[Finding]) {
        if findings.is_empty() {
            println!("\n{}", "No findings.".green());
            return;
        }

        let mut sorted: Vec<&Finding> = findings.iter().collect();
        sorted.sort_by(|a, b| b.severity.numeric_value().cmp(&a.severity.numeric_value()));

        let rows: Vec<TableRow> = sorted
            .into_iter()
            .map(|f| TableRow {
                severity: Self::severity_label(f.severity),
                name: f.name.clone(),
                url: truncate(&f.url),
                evidence: truncate(&f.evidence),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .to_string();

        println!("\n{}", table);
    }

    pub fn print_summary(&self, findings: &[Finding], stats: Option<&ScanStats>) {
        println!("\n{}", "Summary".bold().underline());

        if let Some(stats) = stats {
            println!(
                "{} jobs, {} completed, {} skipped{}",
                stats.jobs_total,
                stats.completed,
                stats.skipped,
                if stats.cancelled { " (cancelled)".yellow().to_string() } else { String::new() }
            );
        }

        for severity in Severity::ALL {
            let count = findings.iter().filter(|f| f.severity == severity).count();
            if count > 0 {
                println!("  {}: {}", Self::severity_label(severity), count);
            }
        }
        println!("  {}: {}", "TOTAL".bold(), findings.len());
        println!();
    }

    pub fn print_live(finding: &Finding) {
        println!(
            "[{}] {} {}",
            Self::severity_label(finding.severity),
            finding.name.white().bold(),
            finding.url.dimmed()
        );
    }

    fn severity_label(severity: Severity) -> String {
        match severity {
            Severity::Critical => "CRITICAL".red().bold().to_string(),
            Severity::High => "HIGH".red().to_string(),
            Severity::Medium => "MEDIUM".yellow().to_string(),
            Severity::Low => "LOW".blue().to_string(),
            Severity::Info => "INFO".cyan().to_string(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_CELL) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
