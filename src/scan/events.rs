use serde::Serialize;

use crate::db::HistoryEntry;

use super::ScanSessionState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ScanEvent {
    StateChanged(ScanSessionState),
    ScanRecorded(HistoryEntry),
    /// The result stays on screen; only the ledger write was lost.
    HistoryWriteFailed { barcode: String, message: String },
}

impl ScanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::StateChanged(_) => "scan-state-changed",
            ScanEvent::ScanRecorded(_) => "scan-recorded",
            ScanEvent::HistoryWriteFailed { .. } => "history-write-failed",
        }
    }
}
