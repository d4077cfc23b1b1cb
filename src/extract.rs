use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api_types::ApiExtractionRequest;
use crate::config::ExtractionConfig;
use crate::error::TurnError;

/// Thin HTTP client for the extraction service. Returns the raw body; the
/// session decides which adapter reads it.
#[derive(Debug, Clone)]
pub struct ExtractionClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ExtractionClient {
    pub fn new(cfg: &ExtractionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    pub async fn extract(&self, request: &ApiExtractionRequest) -> Result<String, TurnError> {
        let start = std::time::Instant::now();
        debug!(
            "Extraction call starting - transcript_length={} chars, has_image={}",
            request.transcript.len(),
            request.image.is_some()
        );

        let mut req = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Extraction service error - status={}, body_length={}", status, body.len());
            return Err(TurnError::NetworkFailure(format!(
                "{} from {}: {}",
                status,
                self.endpoint,
                body.chars().take(200).collect::<String>()
            )));
        }
        let body = resp.text().await?;

        let elapsed = start.elapsed();
        info!(
            "Extraction call completed - duration={:.2}s, response_length={} chars",
            elapsed.as_secs_f32(),
            body.len()
        );
        Ok(body)
    }
}
