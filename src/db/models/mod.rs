pub mod history;

pub use history::{HistoryEntry, NewHistoryEntry, ScanVerdict, UNKNOWN_PRODUCT_NAME};
