use crate::error::ChainError;
use crate::models::IndexSymbol;
use crate::nse_client::NSEClient;
use crate::processor::{ChainSummary, NormalizedChainView, Side};
use crate::session::{load_snapshot, ChainSnapshot};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChainQuery {
    pub symbol: Option<String>,
    pub expiry: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start_time: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }

    fn failed(error: &ChainError, start_time: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpiriesResponse {
    pub symbol: String,
    pub expiry_dates: Vec<String>,
    pub default_expiry: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainResponse {
    pub symbol: String,
    pub timestamp: Option<String>,
    pub underlying_value: Option<f64>,
    pub expiry_dates: Vec<String>,
    pub view: NormalizedChainView,
    pub summary: ChainSummary,
    /// (strike, OI, change in OI) per side, sorted by strike, for the OI charts
    pub ce_series: Vec<(i64, i64, i64)>,
    pub pe_series: Vec<(i64, i64, i64)>,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    client: Arc<NSEClient>,
    cache: Arc<RwLock<HashMap<IndexSymbol, (Arc<ChainSnapshot>, Instant)>>>,
    refresh_lock: Arc<Mutex<()>>,
    cache_duration: Duration,
}

impl AppState {
    pub fn new(client: Arc<NSEClient>, cache_duration: Duration) -> Self {
        Self {
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            refresh_lock: Arc::new(Mutex::new(())),
            cache_duration,
        }
    }

    async fn cached(&self, index: IndexSymbol) -> Option<Arc<ChainSnapshot>> {
        let cache = self.cache.read().await;
        cache
            .get(&index)
            .filter(|(_, cached_at)| cached_at.elapsed() < self.cache_duration)
            .map(|(snapshot, _)| Arc::clone(snapshot))
    }

    /// Fresh snapshot for `index`, refreshing at most one index at a time.
    /// A failed refresh falls back to the stale snapshot if there is one.
    async fn snapshot(&self, index: IndexSymbol) -> Result<Arc<ChainSnapshot>, ChainError> {
        if let Some(snapshot) = self.cached(index).await {
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another request may have refreshed while we waited
        if let Some(snapshot) = self.cached(index).await {
            return Ok(snapshot);
        }

        match load_snapshot(&self.client, index).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let mut cache = self.cache.write().await;
                cache.insert(index, (Arc::clone(&snapshot), Instant::now()));
                Ok(snapshot)
            }
            Err(e) => {
                let cache = self.cache.read().await;
                match cache.get(&index) {
                    Some((stale, _)) => {
                        warn!(index = %index, error = %e, "refresh failed, serving stale chain");
                        Ok(Arc::clone(stale))
                    }
                    None => Err(e),
                }
            }
        }
    }
}

fn status_for(error: &ChainError) -> StatusCode {
    match error {
        ChainError::UnsupportedIndex(_) => StatusCode::BAD_REQUEST,
        ChainError::NotFound { .. } => StatusCode::NOT_FOUND,
        ChainError::Coercion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ChainError::Transport(_) | ChainError::Format(_) => StatusCode::BAD_GATEWAY,
    }
}

fn parse_symbol(symbol: Option<&str>) -> Result<IndexSymbol, ChainError> {
    match symbol {
        Some(symbol) => symbol.parse(),
        None => Err(ChainError::UnsupportedIndex("<missing symbol>".to_string())),
    }
}

fn failure<T>(error: ChainError, start_time: Instant) -> ApiResult<T> {
    (status_for(&error), Json(ApiResponse::failed(&error, start_time)))
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /health
async fn health() -> &'static str {
    "ok"
}

/// GET /api/indices - Supported index symbols
async fn get_indices() -> Json<ApiResponse<Vec<&'static str>>> {
    let start_time = Instant::now();
    let symbols = IndexSymbol::ALL.iter().map(IndexSymbol::as_str).collect();
    Json(ApiResponse::ok(symbols, start_time))
}

/// GET /api/expiries?symbol=NIFTY - Expiry dates of the current chain
async fn get_expiries(
    Query(query): Query<SymbolQuery>,
    State(app_state): State<AppState>,
) -> ApiResult<ExpiriesResponse> {
    let start_time = Instant::now();

    let index = match parse_symbol(query.symbol.as_deref()) {
        Ok(index) => index,
        Err(e) => return failure(e, start_time),
    };

    match app_state.snapshot(index).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                ExpiriesResponse {
                    symbol: index.to_string(),
                    expiry_dates: snapshot.chain.expiries().to_vec(),
                    default_expiry: snapshot.chain.default_expiry().map(str::to_string),
                },
                start_time,
            )),
        ),
        Err(e) => failure(e, start_time),
    }
}

/// GET /api/chain?symbol=NIFTY&expiry=28-Mar-2024 - Normalized CE/PE view
async fn get_chain(
    Query(query): Query<ChainQuery>,
    State(app_state): State<AppState>,
) -> ApiResult<ChainResponse> {
    let start_time = Instant::now();

    let index = match parse_symbol(query.symbol.as_deref()) {
        Ok(index) => index,
        Err(e) => return failure(e, start_time),
    };

    let snapshot = match app_state.snapshot(index).await {
        Ok(snapshot) => snapshot,
        Err(e) => return failure(e, start_time),
    };

    match snapshot.view(query.expiry.as_deref()) {
        Ok(view) => {
            let summary = view.summary();
            let ce_series = view.oi_series(Side::Call);
            let pe_series = view.oi_series(Side::Put);
            (
                StatusCode::OK,
                Json(ApiResponse::ok(
                    ChainResponse {
                        symbol: index.to_string(),
                        timestamp: snapshot.timestamp.clone(),
                        underlying_value: snapshot.underlying_value,
                        expiry_dates: snapshot.chain.expiries().to_vec(),
                        view,
                        summary,
                        ce_series,
                        pe_series,
                    },
                    start_time,
                )),
            )
        }
        Err(e) => failure(e, start_time),
    }
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/indices", get(get_indices))
        .route("/api/expiries", get(get_expiries))
        .route("/api/chain", get(get_chain))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(port: u16, app_state: AppState) -> Result<()> {
    let app = router(app_state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "option chain API listening");
    println!("🚀 NSE Option Chain API running on http://{}", addr);
    println!("📋 Available endpoints:");
    println!("   GET  /health");
    println!("   GET  /api/indices");
    println!("   GET  /api/expiries?symbol=NIFTY");
    println!("   GET  /api/chain?symbol=NIFTY&expiry=28-Mar-2024");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}
