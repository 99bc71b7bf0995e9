use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::models::Finding;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub target: String,
    pub scan_time: DateTime<Utc>,
    pub scan_type: String,
    pub issues: Vec<Finding>,
}

impl ScanReport {
    pub fn new(target: impl Into<String>, scan_type: impl Into<String>, issues: Vec<Finding>) -> Self {
        Self {
            target: target.into(),
            scan_time: Utc::now(),
            scan_type: scan_type.into(),
            issues,
        }
    }
}

pub struct JsonExporter;

impl JsonExporter {
    pub fn export(report: &ScanReport, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        fs::write(path, json).with_context(|| format!("Failed to write to {}", path))?;
        Ok(())
    }

    pub fn load(path: &str) -> Result<ScanReport> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?;

        let report: ScanReport = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse report {}", path))?;
        Ok(report)
    }
}
