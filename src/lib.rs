pub mod api_server_axum;
pub mod app_config;
pub mod chain;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod nse_client;
pub mod processor;
pub mod rules;
pub mod session;

// Re-exports (public API)
pub use chain::{build_index, ChainIndex, ChainSlot, ExpirySides};
pub use error::{ChainError, Result};
pub use models::{IndexSymbol, RawContractRecord, RawNumber, RawPayload, Records, StrikeRow};
pub use nse_client::{parse_payload, FetcherConfig, NSEClient};
pub use processor::{
    build_view, max_oi_row, normalize, ChainSummary, NormalizedChainView, NormalizedRecord,
    Side, SideTotals,
};
pub use rules::{classify, Activity};
pub use session::{
    load_snapshot, load_snapshot_with_retry, ChainSession, ChainSnapshot, RetryPolicy,
};
