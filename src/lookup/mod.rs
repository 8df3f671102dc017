//! Product lookup port and its HTTP adapter.

pub mod open_food_facts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use open_food_facts::OpenFoodFactsClient;

/// Product metadata as returned by the lookup service. Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: Option<String>,
    pub ingredients_text: Option<String>,
    #[serde(default)]
    pub allergen_tags: Vec<String>,
    #[serde(default)]
    pub trace_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResponse {
    Found(ProductRecord),
    NotFound,
}

#[derive(Debug, Error)]
pub enum LookupError {
    /// Transport failure: DNS, connect, TLS, reset, timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Service answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<LookupResponse, LookupError>;
}
