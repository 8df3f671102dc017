use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{
    allergens::analyze,
    db::NewHistoryEntry,
    history::HistoryLedger,
    lookup::{LookupError, LookupResponse, ProductLookup, ProductRecord},
    profile::ProfileRegistry,
};

use super::{ProductSummary, ScanEvent, ScanFailure, ScanSessionState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

struct Session {
    state: ScanSessionState,
    in_flight: Option<CancellationToken>,
}

/// Owns the scan session: admits barcodes, runs one lookup at a time, classifies the
/// product, records history and publishes every transition.
#[derive(Clone)]
pub struct ScanController {
    session: Arc<Mutex<Session>>,
    lookup: Arc<dyn ProductLookup>,
    profile: Arc<ProfileRegistry>,
    history: HistoryLedger,
    state_tx: Arc<watch::Sender<ScanSessionState>>,
    events: broadcast::Sender<ScanEvent>,
    lookup_timeout: Duration,
}

impl ScanController {
    pub fn new(
        lookup: Arc<dyn ProductLookup>,
        profile: Arc<ProfileRegistry>,
        history: HistoryLedger,
        lookup_timeout: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ScanSessionState::new());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            session: Arc::new(Mutex::new(Session {
                state: ScanSessionState::new(),
                in_flight: None,
            })),
            lookup,
            profile,
            history,
            state_tx: Arc::new(state_tx),
            events,
            lookup_timeout,
        }
    }

    pub async fn snapshot(&self) -> ScanSessionState {
        self.session.lock().await.state.clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ScanSessionState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    pub fn profile(&self) -> &Arc<ProfileRegistry> {
        &self.profile
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    /// Entry point for the barcode source. Returns `false` when the scan was dropped because
    /// a lookup is running, a result is still displayed, or the same barcode just failed.
    /// The lookup runs in the background.
    pub async fn on_barcode_scanned(&self, barcode: &str) -> bool {
        let Some((scan_id, cancel)) = self.admit(barcode).await else {
            return false;
        };

        let controller = self.clone();
        let barcode = barcode.to_string();
        tokio::spawn(async move {
            controller.run_scan(scan_id, barcode, cancel).await;
        });
        true
    }

    /// Same admission rule as [`Self::on_barcode_scanned`], but waits for the lookup and
    /// returns the settled state. `None` when the scan was dropped.
    pub async fn scan(&self, barcode: &str) -> Option<ScanSessionState> {
        let (scan_id, cancel) = self.admit(barcode).await?;
        self.run_scan(scan_id, barcode.to_string(), cancel).await;
        Some(self.snapshot().await)
    }

    /// Returns to idle from any phase, abandoning a running lookup, so the same barcode can
    /// be scanned again.
    pub async fn clear(&self) {
        let mut session = self.session.lock().await;
        if let Some(token) = session.in_flight.take() {
            token.cancel();
            log_debug!("Cancelled in-flight lookup for scan {}", session.state.scan_id);
        }
        session.state.clear();
        self.publish(&session.state);
    }

    async fn admit(&self, barcode: &str) -> Option<(u64, CancellationToken)> {
        let mut session = self.session.lock().await;
        if !session.state.accepts_scan(barcode) {
            log_debug!(
                "Ignoring scan of {} while session is {:?}",
                barcode,
                session.state.phase
            );
            return None;
        }

        let scan_id = session.state.begin_scan(barcode);
        let cancel = CancellationToken::new();
        session.in_flight = Some(cancel.clone());
        self.publish(&session.state);

        log_info!("Scan {} accepted for barcode {}", scan_id, barcode);
        Some((scan_id, cancel))
    }

    async fn run_scan(&self, scan_id: u64, barcode: String, cancel: CancellationToken) {
        let lookup = tokio::time::timeout(self.lookup_timeout, self.lookup.lookup(&barcode));

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                log_debug!("Lookup for scan {} abandoned", scan_id);
                return;
            }
            outcome = lookup => match outcome {
                Ok(result) => result,
                Err(_) => Err(LookupError::Network(format!(
                    "lookup timed out after {}s",
                    self.lookup_timeout.as_secs_f32()
                ))),
            },
        };

        self.complete(scan_id, &barcode, result).await;
    }

    async fn complete(
        &self,
        scan_id: u64,
        barcode: &str,
        result: Result<LookupResponse, LookupError>,
    ) {
        match result {
            Ok(LookupResponse::Found(product)) => self.resolve(scan_id, barcode, product).await,
            Ok(LookupResponse::NotFound) => {
                self.fail(scan_id, barcode, ScanFailure::NotFound).await
            }
            Err(err) => {
                let failure = match err {
                    LookupError::Network(detail) => ScanFailure::NetworkError(detail),
                    other => ScanFailure::UnknownError(other.to_string()),
                };
                self.fail(scan_id, barcode, failure).await
            }
        }
    }

    async fn resolve(&self, scan_id: u64, barcode: &str, product: ProductRecord) {
        if !self.is_awaiting(scan_id, barcode).await {
            log_debug!("Discarding stale lookup result for {}", barcode);
            return;
        }

        let analysis = analyze(&product, &self.profile.get());

        if let Some(entry) = NewHistoryEntry::from_outcome(
            barcode,
            product.name.as_deref(),
            &analysis.outcome,
            Utc::now().timestamp_millis(),
        ) {
            match self.history.append(entry).await {
                Ok(recorded) => {
                    let _ = self.events.send(ScanEvent::ScanRecorded(recorded));
                }
                Err(err) => {
                    log_error!("Failed to record scan of {} in history: {:#}", barcode, err);
                    let _ = self.events.send(ScanEvent::HistoryWriteFailed {
                        barcode: barcode.to_string(),
                        message: format!("{err:#}"),
                    });
                }
            }
        }

        let mut session = self.session.lock().await;
        if !session.state.is_awaiting(scan_id, barcode) {
            log_warn!("Scan of {} was cleared while its result was being recorded", barcode);
            return;
        }

        log_info!(
            "Scan {} resolved: {} conflict(s) for {}",
            scan_id,
            analysis.outcome.conflicts().len(),
            barcode
        );
        let summary = ProductSummary::new(product.name.clone(), &analysis);
        session.state.resolve(summary, analysis.outcome);
        session.in_flight = None;
        self.publish(&session.state);
    }

    async fn fail(&self, scan_id: u64, barcode: &str, failure: ScanFailure) {
        let mut session = self.session.lock().await;
        if !session.state.is_awaiting(scan_id, barcode) {
            log_debug!("Discarding stale lookup failure for {}", barcode);
            return;
        }

        log_warn!("Scan {} failed: {}", scan_id, failure.message(barcode));
        session.state.fail(failure);
        session.in_flight = None;
        self.publish(&session.state);
    }

    async fn is_awaiting(&self, scan_id: u64, barcode: &str) -> bool {
        self.session.lock().await.state.is_awaiting(scan_id, barcode)
    }

    /// Called with the session lock held so subscribers see transitions in order.
    fn publish(&self, state: &ScanSessionState) {
        self.state_tx.send_replace(state.clone());
        let _ = self.events.send(ScanEvent::StateChanged(state.clone()));
    }
}
