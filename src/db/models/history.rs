//! Scan history rows.

use serde::{Deserialize, Serialize};

use crate::allergens::ScanOutcome;

pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown Product";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanVerdict {
    Safe,
    Unsafe,
}

impl ScanVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanVerdict::Safe => "SAFE",
            ScanVerdict::Unsafe => "UNSAFE",
        }
    }

    /// `None` for an unresolved outcome, which never reaches the ledger.
    pub fn from_outcome(outcome: &ScanOutcome) -> Option<Self> {
        match outcome {
            ScanOutcome::None => None,
            ScanOutcome::Safe => Some(ScanVerdict::Safe),
            ScanOutcome::Unsafe(_) => Some(ScanVerdict::Unsafe),
        }
    }
}

/// A completed scan waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub barcode: String,
    pub product_name: String,
    pub timestamp_millis: i64,
    pub verdict: ScanVerdict,
    pub conflicting_allergens: Vec<String>,
}

impl NewHistoryEntry {
    /// Builds the row for a resolved outcome; `None` when the outcome is unresolved.
    pub fn from_outcome(
        barcode: &str,
        product_name: Option<&str>,
        outcome: &ScanOutcome,
        timestamp_millis: i64,
    ) -> Option<Self> {
        let verdict = ScanVerdict::from_outcome(outcome)?;
        Some(Self {
            barcode: barcode.to_string(),
            product_name: product_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(UNKNOWN_PRODUCT_NAME)
                .to_string(),
            timestamp_millis,
            verdict,
            conflicting_allergens: outcome
                .conflicts()
                .iter()
                .map(|allergen| allergen.label().to_string())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub barcode: String,
    pub product_name: String,
    pub timestamp_millis: i64,
    pub verdict: ScanVerdict,
    pub conflicting_allergens: Vec<String>,
}

impl HistoryEntry {
    pub fn from_new(id: i64, entry: NewHistoryEntry) -> Self {
        Self {
            id,
            barcode: entry.barcode,
            product_name: entry.product_name,
            timestamp_millis: entry.timestamp_millis,
            verdict: entry.verdict,
            conflicting_allergens: entry.conflicting_allergens,
        }
    }
}
