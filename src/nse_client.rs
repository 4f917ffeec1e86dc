use crate::config;
use crate::error::{ChainError, Result};
use crate::models::{IndexSymbol, RawPayload};
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{header, Client};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Settings for the snapshot fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Raw body is written here on every successful read; `None` disables it
    pub artifact_path: Option<PathBuf>,
    /// Hit the base URL once before the first API call to collect cookies
    pub warmup: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: config::NSE_BASE_URL.to_string(),
            timeout: config::HTTP_TIMEOUT,
            artifact_path: Some(PathBuf::from(config::DIAGNOSTIC_ARTIFACT)),
            warmup: false,
        }
    }
}

// -----------------------------------------------
// CLIENT WRAPPER WITH SESSION STATE
// -----------------------------------------------
pub struct NSEClient {
    client: Client,
    config: FetcherConfig,
    warmed_up: Arc<RwLock<bool>>,
}

impl NSEClient {
    pub fn with_config(config: FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
            warmed_up: Arc::new(RwLock::new(false)),
        })
    }

    /// Warmup NSE session (only once per client)
    async fn warmup_if_needed(&self) -> Result<()> {
        if !self.config.warmup || *self.warmed_up.read().await {
            return Ok(());
        }

        let mut warmed = self.warmed_up.write().await;
        if !*warmed {
            self.client
                .get(&self.config.base_url)
                .header(header::ACCEPT, config::HEADER_ACCEPT_HTML)
                .send()
                .await
                .map_err(|e| ChainError::Transport(format!("session warmup failed: {}", e)))?;

            tokio::time::sleep(Duration::from_millis(config::WARMUP_DELAY_MS)).await;
            *warmed = true;
            debug!("NSE session warmed up");
        }

        Ok(())
    }

    /// Single GET of the option chain for `index`. No retry here.
    pub async fn fetch(&self, index: IndexSymbol) -> Result<RawPayload> {
        self.warmup_if_needed().await?;

        let url = config::nse_option_chain_url(&self.config.base_url, index.as_str());
        debug!(%url, "fetching option chain");

        let res = self
            .client
            .get(&url)
            .header(header::REFERER, config::HEADER_REFERER)
            .header("X-Requested-With", config::HEADER_X_REQUESTED_WITH)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ChainError::Transport(format!(
                "HTTP {} from {}: {}",
                status,
                url,
                preview(&body)
            )));
        }

        let text = res.text().await?;
        self.write_artifact(&text).await;

        let payload = parse_payload(&text)?;
        info!(
            index = %index,
            rows = payload.records.data.len(),
            expiries = payload.records.expiry_dates.len(),
            "option chain fetched"
        );
        Ok(payload)
    }

    async fn write_artifact(&self, body: &str) {
        let Some(path) = &self.config.artifact_path else {
            return;
        };
        if let Err(e) = tokio::fs::write(path, body).await {
            warn!(path = %path.display(), error = %e, "failed to write diagnostic artifact");
        }
    }
}

/// Parse a raw response body into a payload
pub fn parse_payload(text: &str) -> Result<RawPayload> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return Err(ChainError::Format(format!(
            "Non-JSON response: {}",
            preview(text)
        )));
    }

    serde_json::from_str(trimmed)
        .map_err(|e| ChainError::Format(format!("Failed to parse option chain: {}", e)))
}

fn preview(text: &str) -> String {
    text.chars().take(config::BODY_PREVIEW_CHARS).collect()
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9");
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static(lang),
    );
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .gzip(true)
        .user_agent(config::USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ChainError::Transport(format!("Failed to build HTTP client: {}", e)))
}
