use anyhow::{anyhow, Result};

use crate::db::models::ScanVerdict;

pub fn parse_verdict(value: &str) -> Result<ScanVerdict> {
    match value {
        "SAFE" => Ok(ScanVerdict::Safe),
        "UNSAFE" => Ok(ScanVerdict::Unsafe),
        other => Err(anyhow!("unknown scan result {other}")),
    }
}

/// Allergen labels are stored comma-separated.
pub fn join_labels(labels: &[String]) -> String {
    labels.join(",")
}

pub fn split_labels(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
