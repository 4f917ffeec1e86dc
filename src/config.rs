use std::time::Duration;

// -----------------------------------------------
// NSE API ENDPOINTS
// -----------------------------------------------
pub const NSE_BASE_URL: &str = "https://www.nseindia.com";
pub const NSE_OPTION_CHAIN_PATH: &str = "/api/option-chain-indices";

pub fn nse_option_chain_url(base_url: &str, symbol: &str) -> String {
    format!(
        "{}{}?symbol={}",
        base_url.trim_end_matches('/'),
        NSE_OPTION_CHAIN_PATH,
        urlencoding::encode(symbol)
    )
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/100.0.4896.127 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-IN,en;q=0.9",
];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------
// SESSION WARMUP
// -----------------------------------------------
pub const WARMUP_DELAY_MS: u64 = 200;

// -----------------------------------------------
// HTTP HEADERS
// -----------------------------------------------
pub const HEADER_REFERER: &str = "https://www.nseindia.com/option-chain";
pub const HEADER_X_REQUESTED_WITH: &str = "XMLHttpRequest";
pub const HEADER_ACCEPT_HTML: &str = "text/html";

// -----------------------------------------------
// DIAGNOSTICS
// -----------------------------------------------
pub const DIAGNOSTIC_ARTIFACT: &str = "OC.json";
pub const BODY_PREVIEW_CHARS: usize = 200;

// -----------------------------------------------
// RETRY CONFIG (caller side only)
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 200;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// REFRESH / SERVER
// -----------------------------------------------
pub const DEFAULT_REFRESH_SECS: u64 = 60;
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SYMBOL: &str = "NIFTY";
pub const DEFAULT_LOG_DIR: &str = "./logs";

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Get the execution mode from environment or default to watch
pub fn get_execution_mode() -> String {
    std::env::var("NSE_MODE").unwrap_or_else(|_| "watch".to_string())
}

pub fn get_symbol() -> String {
    std::env::var("NSE_SYMBOL").unwrap_or_else(|_| DEFAULT_SYMBOL.to_string())
}

/// Expiry to display; `None` means the chain's first expiry
pub fn get_expiry() -> Option<String> {
    std::env::var("NSE_EXPIRY")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_port() -> u16 {
    std::env::var("NSE_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn get_refresh_interval() -> Duration {
    let secs = std::env::var("NSE_REFRESH_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_REFRESH_SECS);
    Duration::from_secs(secs.max(1))
}

/// Artifact path; an empty `NSE_ARTIFACT_PATH` disables the artifact
pub fn get_artifact_path() -> Option<String> {
    match std::env::var("NSE_ARTIFACT_PATH") {
        Ok(path) if path.trim().is_empty() => None,
        Ok(path) => Some(path),
        Err(_) => Some(DIAGNOSTIC_ARTIFACT.to_string()),
    }
}

pub fn get_warmup() -> bool {
    std::env::var("NSE_WARMUP")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Directory for the rolling JSON log files
pub fn get_log_dir() -> String {
    std::env::var("NSE_LOG_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
}

pub fn get_base_url() -> String {
    std::env::var("NSE_BASE_URL").unwrap_or_else(|_| NSE_BASE_URL.to_string())
}
