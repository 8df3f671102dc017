use serde::{Deserialize, Serialize};

use crate::allergens::{CanonicalAllergen, ProductAnalysis, ScanOutcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ScanPhase {
    #[default]
    Idle,
    Loading,
    Resolved,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ScanFailure {
    NotFound,
    NetworkError(String),
    UnknownError(String),
}

impl ScanFailure {
    pub fn message(&self, barcode: &str) -> String {
        match self {
            ScanFailure::NotFound => format!("Product not found (Barcode: {barcode})"),
            ScanFailure::NetworkError(detail) => format!("Network error: {detail}"),
            ScanFailure::UnknownError(detail) => format!("Error: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub name: Option<String>,
    pub detected_allergens: Vec<CanonicalAllergen>,
    pub declared_allergens: Vec<String>,
}

impl ProductSummary {
    pub fn new(name: Option<String>, analysis: &ProductAnalysis) -> Self {
        Self {
            name,
            detected_allergens: analysis.detected.clone(),
            declared_allergens: analysis.declared_tags.clone(),
        }
    }
}

/// What the presentation layer renders. Only the scan controller mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScanSessionState {
    pub phase: ScanPhase,
    /// Generation of the scan this state belongs to; bumped on every accepted scan.
    pub scan_id: u64,
    pub last_barcode: Option<String>,
    pub outcome: ScanOutcome,
    pub failure: Option<ScanFailure>,
    pub error_message: Option<String>,
    pub product: Option<ProductSummary>,
}

impl ScanSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// New scans are dropped while a lookup runs or a result is on screen. After a failure
    /// only a different barcode gets through; the failed one needs a clear first.
    pub fn accepts_scan(&self, barcode: &str) -> bool {
        match self.phase {
            ScanPhase::Idle => true,
            ScanPhase::Failed => self.last_barcode.as_deref() != Some(barcode),
            ScanPhase::Loading | ScanPhase::Resolved => false,
        }
    }

    pub fn begin_scan(&mut self, barcode: &str) -> u64 {
        *self = Self {
            phase: ScanPhase::Loading,
            scan_id: self.scan_id.wrapping_add(1),
            last_barcode: Some(barcode.to_string()),
            ..Self::default()
        };
        self.scan_id
    }

    /// True while `scan_id` for `barcode` is still the lookup this state is waiting on.
    pub fn is_awaiting(&self, scan_id: u64, barcode: &str) -> bool {
        self.phase == ScanPhase::Loading
            && self.scan_id == scan_id
            && self.last_barcode.as_deref() == Some(barcode)
    }

    pub fn resolve(&mut self, product: ProductSummary, outcome: ScanOutcome) {
        self.phase = ScanPhase::Resolved;
        self.outcome = outcome;
        self.product = Some(product);
        self.failure = None;
        self.error_message = None;
    }

    pub fn fail(&mut self, failure: ScanFailure) {
        let barcode = self.last_barcode.clone().unwrap_or_default();
        self.phase = ScanPhase::Failed;
        self.outcome = ScanOutcome::None;
        self.product = None;
        self.error_message = Some(failure.message(&barcode));
        self.failure = Some(failure);
    }

    /// Back to idle. The generation survives so late results stay distinguishable.
    pub fn clear(&mut self) {
        *self = Self {
            scan_id: self.scan_id,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allergens::ConflictSet;

    #[test]
    fn begin_scan_resets_previous_result_and_bumps_generation() {
        let mut state = ScanSessionState::new();
        let first = state.begin_scan("123");
        state.fail(ScanFailure::NotFound);

        let second = state.begin_scan("456");
        assert_eq!(second, first + 1);
        assert_eq!(state.phase, ScanPhase::Loading);
        assert_eq!(state.last_barcode.as_deref(), Some("456"));
        assert!(state.failure.is_none());
        assert!(state.error_message.is_none());
        assert_eq!(state.outcome, ScanOutcome::None);
    }

    #[test]
    fn only_idle_and_failed_accept_scans() {
        let mut state = ScanSessionState::new();
        assert!(state.accepts_scan("1"));

        state.begin_scan("1");
        assert!(!state.accepts_scan("1"));
        assert!(!state.accepts_scan("2"));

        state.resolve(
            ProductSummary {
                name: None,
                detected_allergens: Vec::new(),
                declared_allergens: Vec::new(),
            },
            ScanOutcome::Safe,
        );
        assert!(!state.accepts_scan("2"));

        state.begin_scan("2");
        state.fail(ScanFailure::NetworkError("offline".into()));
        assert!(!state.accepts_scan("2"));
        assert!(state.accepts_scan("3"));

        state.clear();
        assert!(state.accepts_scan("2"));
    }

    #[test]
    fn failure_messages_name_the_barcode() {
        let mut state = ScanSessionState::new();
        state.begin_scan("000");
        state.fail(ScanFailure::NotFound);
        assert_eq!(
            state.error_message.as_deref(),
            Some("Product not found (Barcode: 000)")
        );
        assert_eq!(
            ScanFailure::UnknownError("bad json".into()).message("1"),
            "Error: bad json"
        );
    }

    #[test]
    fn clear_keeps_generation_but_nothing_else() {
        let mut state = ScanSessionState::new();
        let id = state.begin_scan("789");
        state.resolve(
            ProductSummary {
                name: Some("Bread".into()),
                detected_allergens: vec![CanonicalAllergen::Gluten],
                declared_allergens: vec!["Gluten".into()],
            },
            ScanOutcome::Unsafe(ConflictSet::new([CanonicalAllergen::Gluten]).unwrap()),
        );

        state.clear();
        assert_eq!(
            state,
            ScanSessionState {
                scan_id: id,
                ..ScanSessionState::default()
            }
        );
        assert!(!state.is_awaiting(id, "789"));
    }
}
