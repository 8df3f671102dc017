//! Open Food Facts product API client.
//!
//! Queries `GET {base}/api/v2/product/{barcode}.json`. The service reports an unknown
//! barcode either with HTTP 404 or with `status != 1` in the body; both map to
//! [`LookupResponse::NotFound`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::{LookupError, LookupResponse, ProductLookup, ProductRecord};

pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org/";
const USER_AGENT: &str = concat!("allergen-scan/", env!("CARGO_PKG_VERSION"));

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Deserialize)]
struct ProductResponse {
    product: Option<OffProduct>,
    #[serde(default)]
    status: i32,
    status_verbose: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OffProduct {
    product_name: Option<String>,
    allergens_tags: Option<Vec<String>>,
    traces_tags: Option<Vec<String>>,
    ingredients_text: Option<String>,
}

impl From<OffProduct> for ProductRecord {
    fn from(product: OffProduct) -> Self {
        Self {
            name: product.product_name.filter(|name| !name.trim().is_empty()),
            ingredients_text: product.ingredients_text,
            allergen_tags: product.allergens_tags.unwrap_or_default(),
            trace_tags: product.traces_tags.unwrap_or_default(),
        }
    }
}

pub struct OpenFoodFactsClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LookupError::Other(format!("invalid lookup url '{base_url}': {e}")))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn product_url(&self, barcode: &str) -> Result<Url, LookupError> {
        let file_name = format!("{barcode}.json");
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LookupError::Other(format!("lookup url '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "v2", "product", file_name.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Result<LookupResponse, LookupError> {
        let url = self.product_url(barcode)?;
        log_debug!("Querying Open Food Facts: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(LookupResponse::NotFound);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LookupError::Api(status.as_u16(), error_text));
        }

        let body: ProductResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                LookupError::Parse(e.to_string())
            } else {
                LookupError::Network(e.to_string())
            }
        })?;

        match body.product {
            Some(product) if body.status == 1 => {
                log_info!("Open Food Facts lookup for {} found a product", barcode);
                Ok(LookupResponse::Found(product.into()))
            }
            _ => {
                log_info!(
                    "Open Food Facts has no product for {} ({})",
                    barcode,
                    body.status_verbose.as_deref().unwrap_or("no status")
                );
                Ok(LookupResponse::NotFound)
            }
        }
    }
}
