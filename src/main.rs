use anyhow::{Context, Result};
use colored::Colorize;
use nse_chain_analyzer::api_server_axum::{self, AppState};
use nse_chain_analyzer::app_config::{AppConfig, Mode};
use nse_chain_analyzer::{display, logging, ChainSession, NSEClient, RetryPolicy};
use std::sync::Arc;
use tracing::{error, info};

/// Render the session's current snapshot for the configured expiry
fn render(session: &ChainSession, expiry: Option<&str>) {
    let Some(snapshot) = session.current() else {
        println!("{} No option chain loaded yet", "ℹ".blue());
        return;
    };

    match snapshot.view(expiry) {
        Ok(view) => {
            display::print_expiries(&snapshot, &view.expiry);
            display::print_view(&snapshot, &view);
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            display::print_expiries(&snapshot, expiry.unwrap_or_default());
        }
    }
}

/// Single refresh and print
async fn run_once(app: &AppConfig, client: Arc<NSEClient>) -> Result<()> {
    let mut session = ChainSession::new(client, app.index);
    session
        .refresh_with_retry(RetryPolicy::default())
        .await
        .with_context(|| format!("Failed to load option chain for {}", app.index))?;

    render(&session, app.expiry.as_deref());
    Ok(())
}

/// Periodic refresh; a failed cycle keeps showing the previous chain
async fn run_watch(app: &AppConfig, client: Arc<NSEClient>) -> Result<()> {
    let mut session = ChainSession::new(client, app.index);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    session
        .watch(
            app.refresh_interval,
            RetryPolicy::default(),
            shutdown,
            |session, failure| {
                if let Some(e) = failure {
                    error!(index = %app.index, error = %e, "refresh failed");
                    println!("{} Refresh failed: {}", "✗".red(), e);
                    if session.current().is_some() {
                        println!("{} Showing previous snapshot", "⚠".yellow());
                    }
                }
                render(session, app.expiry.as_deref());
            },
        )
        .await;

    info!("shutting down");
    println!("{}", "Done!".green().bold());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging().context("Failed to initialise logging")?;

    let app = AppConfig::from_env()?;
    app.print_banner();

    let client = Arc::new(NSEClient::with_config(app.fetcher.clone())?);

    match app.mode {
        Mode::Once => run_once(&app, client).await?,
        Mode::Watch => run_watch(&app, client).await?,
        Mode::Server => {
            let state = AppState::new(client, app.refresh_interval);
            api_server_axum::start_server(app.port, state).await?;
        }
    }

    Ok(())
}
