use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use nse_chain_analyzer::api_server_axum::{router, ApiResponse, AppState, ChainResponse, ExpiriesResponse};
use nse_chain_analyzer::{Activity, FetcherConfig, NSEClient};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const FIXTURE: &str = include_str!("fixtures/option_chain.json");

/// Serve `exchange` locally and return the API router wired to it
async fn api_for(exchange: Router, cache_duration: Duration) -> Router {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, exchange).await.unwrap();
    });

    let client = NSEClient::with_config(FetcherConfig {
        base_url: format!("http://{}", addr),
        timeout: Duration::from_secs(2),
        artifact_path: None,
        warmup: false,
    })
    .unwrap();

    router(AppState::new(Arc::new(client), cache_duration))
}

/// Fake exchange counting how often it is hit
fn counting_exchange() -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let exchange = Router::new().route(
        "/api/option-chain-indices",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                FIXTURE
            }
        }),
    );
    (exchange, hits)
}

async fn api_with_exchange() -> (Router, Arc<AtomicUsize>) {
    let (exchange, hits) = counting_exchange();
    (api_for(exchange, Duration::from_secs(60)).await, hits)
}

async fn call<T: DeserializeOwned>(app: &Router, uri: &str) -> (StatusCode, ApiResponse<T>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_indices() {
        let (app, _) = api_with_exchange().await;
        let (status, body) = call::<Vec<String>>(&app, "/api/indices").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap(), vec!["NIFTY", "BANKNIFTY"]);
    }

    #[tokio::test]
    async fn test_expiries_default_to_first() {
        let (app, _) = api_with_exchange().await;
        let (status, body) = call::<ExpiriesResponse>(&app, "/api/expiries?symbol=nifty").await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data.symbol, "NIFTY");
        assert_eq!(data.expiry_dates, vec!["28-Mar-2024", "04-Apr-2024"]);
        assert_eq!(data.default_expiry.as_deref(), Some("28-Mar-2024"));
    }

    #[tokio::test]
    async fn test_chain_view_and_cache() {
        let (app, hits) = api_with_exchange().await;

        let (status, body) = call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        let data = body.data.unwrap();
        assert_eq!(data.view.expiry, "28-Mar-2024");
        assert_eq!(data.view.call.len(), 3);
        assert_eq!(data.view.call[0].activity, Activity::LongBuildUp);
        assert_eq!(data.view.ce_max_oi_row, Some(1));
        assert_eq!(data.summary.pe_totals.total_oi, 21200);
        assert_eq!(data.underlying_value, Some(22096.75));
        assert_eq!(
            data.ce_series,
            vec![(21900, 4200, 350), (22000, 12500, -150), (22200, 8000, 0)]
        );
        assert_eq!(data.pe_series.len(), 3);
        assert_eq!(data.pe_series[1], (22000, 9100, 0));

        let (status, _) =
            call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY&expiry=28-Mar-2024").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_refreshes_once_per_request() {
        let (exchange, hits) = counting_exchange();
        let app = api_for(exchange, Duration::ZERO).await;

        let (status, _) = call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call::<ExpiriesResponse>(&app, "/api/expiries?symbol=NIFTY").await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_stale_chain() {
        let hits = Arc::new(AtomicUsize::new(0));
        let exchange = Router::new()
            .route(
                "/api/option-chain-indices",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::OK, FIXTURE)
                    } else {
                        (StatusCode::SERVICE_UNAVAILABLE, "busy")
                    }
                }),
            )
            .with_state(Arc::clone(&hits));
        let app = api_for(exchange, Duration::ZERO).await;

        let (_, first) = call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY").await;
        let (status, second) = call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        let (first, second) = (first.data.unwrap(), second.data.unwrap());
        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(second.view, first.view);
    }

    #[tokio::test]
    async fn test_first_refresh_failure_is_bad_gateway() {
        let exchange = Router::new().route(
            "/api/option-chain-indices",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let app = api_for(exchange, Duration::ZERO).await;

        let (status, body) = call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_missing_symbol_uses_envelope() {
        let (app, hits) = api_with_exchange().await;

        for uri in ["/api/chain", "/api/expiries"] {
            let (status, body) = call::<serde_json::Value>(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(!body.success);
            assert!(body.error.unwrap().contains("missing symbol"));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_index_is_bad_request() {
        let (app, hits) = api_with_exchange().await;
        let (status, body) = call::<ChainResponse>(&app, "/api/chain?symbol=FINNIFTY").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(body.error.unwrap().contains("FINNIFTY"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_expiry_is_not_found() {
        let (app, _) = api_with_exchange().await;
        let (status, body) =
            call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY&expiry=25-Apr-2024").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.data.is_none());
    }

    #[tokio::test]
    async fn test_bad_record_is_unprocessable() {
        let (app, _) = api_with_exchange().await;
        let (status, body) =
            call::<ChainResponse>(&app, "/api/chain?symbol=NIFTY&expiry=04-Apr-2024").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.error.unwrap().contains("lastPrice"));
    }
}
