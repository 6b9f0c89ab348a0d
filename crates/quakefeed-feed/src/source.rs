//! Prediction source clients.
//!
//! Endpoint: `GET {base_url}/predict_data`

use async_trait::async_trait;
use quakefeed_common::{QuakefeedError, Result};
use quakefeed_config::SourceConfig;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::models::{PredictionBatch, PredictionPoint};

const PREDICT_DATA_PATH: &str = "predict_data";

/// Common interface for anything that can hand out the latest prediction batch.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    /// Fetch the current batch. Each call is one complete, authoritative snapshot.
    async fn fetch_latest(&self) -> Result<PredictionBatch>;
}

/// Body of a successful `/predict_data` response.
/// Unknown fields (the service also echoes the latest `latitude`/`longitude`) are ignored.
#[derive(Debug, Deserialize)]
struct PredictDataResponse {
    #[serde(default)]
    prediction: Option<f64>,
    #[serde(default)]
    actual: Option<f64>,
    #[serde(default)]
    mae: Option<f64>,
    #[serde(default)]
    predictions_data: Option<Vec<PredictionPoint>>,
}

impl From<PredictDataResponse> for PredictionBatch {
    fn from(r: PredictDataResponse) -> Self {
        PredictionBatch {
            current_prediction: r.prediction,
            current_actual: r.actual,
            mean_absolute_error: r.mae,
            history: r.predictions_data.unwrap_or_default(),
        }
    }
}

/// Decode a raw `/predict_data` body into a batch.
pub fn decode_batch(body: &[u8]) -> Result<PredictionBatch> {
    let response: PredictDataResponse = serde_json::from_slice(body)?;
    Ok(response.into())
}

pub struct HttpPredictionSource {
    client: Client,
    url: Url,
    timeout_ms: u64,
}

impl HttpPredictionSource {
    pub fn new(cfg: &SourceConfig) -> Result<Self> {
        let base = Url::parse(&with_trailing_slash(&cfg.base_url))
            .map_err(|e| QuakefeedError::Config(format!("invalid source.base_url {}: {}", cfg.base_url, e)))?;
        let url = base
            .join(PREDICT_DATA_PATH)
            .map_err(|e| QuakefeedError::Config(format!("cannot build prediction URL: {}", e)))?;

        let client = Client::builder()
            .timeout(cfg.timeout())
            .build()?;

        Ok(Self { client, url, timeout_ms: cfg.timeout_ms })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') { base.to_string() } else { format!("{}/", base) }
}

#[async_trait]
impl PredictionSource for HttpPredictionSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_latest(&self) -> Result<PredictionBatch> {
        let resp = self.client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| if e.is_timeout() { QuakefeedError::Timeout(self.timeout_ms) } else { e.into() })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QuakefeedError::Status {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = resp.bytes().await?;
        let batch = decode_batch(&body)?;
        debug!(points = batch.len(), "prediction batch received");
        Ok(batch)
    }
}
