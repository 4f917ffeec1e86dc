use crate::config;
use crate::models::IndexSymbol;
use crate::nse_client::FetcherConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Single refresh, print, exit
    Once,
    /// Refresh on a timer and reprint
    Watch,
    /// JSON API
    Server,
}

impl Mode {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Mode::Once),
            "watch" => Ok(Mode::Watch),
            "server" => Ok(Mode::Server),
            other => anyhow::bail!(
                "Invalid mode '{}'. Use 'once', 'watch' or 'server' (NSE_MODE)",
                other
            ),
        }
    }
}

/// Application configuration handler
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: Mode,
    pub index: IndexSymbol,
    pub expiry: Option<String>,
    pub port: u16,
    pub refresh_interval: Duration,
    pub fetcher: FetcherConfig,
}

impl AppConfig {
    /// Create new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mode = Mode::parse(&config::get_execution_mode())?;
        let symbol = config::get_symbol();
        let index = symbol
            .parse::<IndexSymbol>()
            .with_context(|| format!("NSE_SYMBOL={}", symbol))?;

        Ok(Self {
            mode,
            index,
            expiry: config::get_expiry(),
            port: config::get_port(),
            refresh_interval: config::get_refresh_interval(),
            fetcher: FetcherConfig {
                base_url: config::get_base_url(),
                artifact_path: config::get_artifact_path().map(PathBuf::from),
                warmup: config::get_warmup(),
                ..FetcherConfig::default()
            },
        })
    }

    pub fn print_banner(&self) {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "NSE Option Chain Analyzer".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!("{} Mode: {:?}", "→".cyan(), self.mode);
        println!("{} Index: {}", "→".cyan(), self.index.to_string().yellow());
        if let Some(expiry) = &self.expiry {
            println!("{} Expiry: {}", "→".cyan(), expiry.yellow());
        }
        if self.mode != Mode::Once {
            println!("{} Refresh every {}s", "→".cyan(), self.refresh_interval.as_secs());
        }
        println!();
    }
}
