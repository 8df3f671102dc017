//! Append-only ledger of completed scans, published as a live sequence.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::watch;

use crate::db::{HistoryEntry, NewHistoryEntry};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Durable storage behind the ledger.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, row: &NewHistoryEntry) -> Result<HistoryEntry>;
    async fn select_all_order_by_time_desc(&self) -> Result<Vec<HistoryEntry>>;
    async fn delete_all(&self) -> Result<usize>;
}

#[derive(Clone)]
pub struct HistoryLedger {
    store: Arc<dyn HistoryStore>,
    live: Arc<watch::Sender<Vec<HistoryEntry>>>,
}

impl HistoryLedger {
    /// Reads the current rows so subscribers start from the stored state.
    pub async fn open(store: Arc<dyn HistoryStore>) -> Result<Self> {
        let initial = store
            .select_all_order_by_time_desc()
            .await
            .context("failed to load scan history")?;
        let (live, _) = watch::channel(initial);
        Ok(Self {
            store,
            live: Arc::new(live),
        })
    }

    /// Fails only when the row was not written. A failed re-read after the insert leaves
    /// subscribers on the previous sequence.
    pub async fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry> {
        let stored = self.store.insert(&entry).await?;
        if let Err(err) = self.refresh().await {
            log_warn!("History entry {} saved but live view not refreshed: {:#}", stored.id, err);
        }
        Ok(stored)
    }

    /// Every entry, newest first.
    pub async fn all(&self) -> Result<Vec<HistoryEntry>> {
        self.refresh().await
    }

    pub async fn clear(&self) -> Result<usize> {
        let removed = self.store.delete_all().await?;
        self.refresh().await?;
        Ok(removed)
    }

    /// Receiver that observes the ledger after every append and clear.
    pub fn subscribe(&self) -> watch::Receiver<Vec<HistoryEntry>> {
        self.live.subscribe()
    }

    async fn refresh(&self) -> Result<Vec<HistoryEntry>> {
        let rows = self.store.select_all_order_by_time_desc().await?;
        self.live.send_replace(rows.clone());
        Ok(rows)
    }
}
