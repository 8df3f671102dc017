use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{join_labels, parse_verdict, split_labels},
        models::{HistoryEntry, NewHistoryEntry},
    },
    history::HistoryStore,
};

fn row_to_history_entry(row: &Row) -> Result<HistoryEntry> {
    let scan_result: String = row.get("scan_result")?;
    let conflicting: String = row.get("conflicting_allergens")?;

    Ok(HistoryEntry {
        id: row.get("id")?,
        barcode: row.get("barcode")?,
        product_name: row.get("product_name")?,
        timestamp_millis: row.get("scan_time")?,
        verdict: parse_verdict(&scan_result)?,
        conflicting_allergens: split_labels(&conflicting),
    })
}

impl Database {
    pub async fn insert_history_entry(&self, entry: &NewHistoryEntry) -> Result<HistoryEntry> {
        let record = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO scan_history (barcode, product_name, scan_time, scan_result, conflicting_allergens)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.barcode,
                    record.product_name,
                    record.timestamp_millis,
                    record.verdict.as_str(),
                    join_labels(&record.conflicting_allergens),
                ],
            )
            .with_context(|| "failed to insert scan history entry")?;

            let id = conn.last_insert_rowid();
            Ok(HistoryEntry::from_new(id, record))
        })
        .await
    }

    /// Newest first; rows with the same timestamp come back in reverse insertion order.
    pub async fn list_history(&self) -> Result<Vec<HistoryEntry>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, barcode, product_name, scan_time, scan_result, conflicting_allergens
                 FROM scan_history
                 ORDER BY scan_time DESC, id DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_history_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }

    pub async fn clear_history(&self) -> Result<usize> {
        self.execute(|conn| {
            let removed = conn
                .execute("DELETE FROM scan_history", [])
                .with_context(|| "failed to clear scan history")?;
            Ok(removed)
        })
        .await
    }
}

#[async_trait]
impl HistoryStore for Database {
    async fn insert(&self, row: &NewHistoryEntry) -> Result<HistoryEntry> {
        self.insert_history_entry(row).await
    }

    async fn select_all_order_by_time_desc(&self) -> Result<Vec<HistoryEntry>> {
        self.list_history().await
    }

    async fn delete_all(&self) -> Result<usize> {
        self.clear_history().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ScanVerdict;

    fn entry(barcode: &str, timestamp_millis: i64, conflicts: &[&str]) -> NewHistoryEntry {
        NewHistoryEntry {
            barcode: barcode.to_string(),
            product_name: format!("Product {barcode}"),
            timestamp_millis,
            verdict: if conflicts.is_empty() {
                ScanVerdict::Safe
            } else {
                ScanVerdict::Unsafe
            },
            conflicting_allergens: conflicts.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn inserted_rows_come_back_newest_first() {
        let db = Database::open_in_memory().unwrap();

        db.insert_history_entry(&entry("111", 1_000, &[])).await.unwrap();
        db.insert_history_entry(&entry("222", 3_000, &["Milk", "Soy"]))
            .await
            .unwrap();
        db.insert_history_entry(&entry("333", 2_000, &[])).await.unwrap();

        let rows = db.list_history().await.unwrap();
        let barcodes: Vec<&str> = rows.iter().map(|r| r.barcode.as_str()).collect();
        assert_eq!(barcodes, vec!["222", "333", "111"]);

        assert_eq!(rows[0].verdict, ScanVerdict::Unsafe);
        assert_eq!(rows[0].conflicting_allergens, vec!["Milk", "Soy"]);
        assert_eq!(rows[1].verdict, ScanVerdict::Safe);
        assert!(rows[1].conflicting_allergens.is_empty());
    }

    #[tokio::test]
    async fn equal_timestamps_fall_back_to_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let first = db.insert_history_entry(&entry("a", 5, &[])).await.unwrap();
        let second = db.insert_history_entry(&entry("b", 5, &[])).await.unwrap();
        assert!(second.id > first.id);

        let rows = db.list_history().await.unwrap();
        assert_eq!(rows, vec![second, first]);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..4 {
            db.insert_history_entry(&entry(&i.to_string(), i, &[]))
                .await
                .unwrap();
        }

        assert_eq!(db.clear_history().await.unwrap(), 4);
        assert!(db.list_history().await.unwrap().is_empty());
    }
}
