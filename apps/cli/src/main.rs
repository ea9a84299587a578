use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ApiShape, HttpPredictionClient, RequestController};
use presentation::{historical_series, ViewDirective};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "predictor", about = "Request stock return predictions from the inference service")]
struct Cli {
    /// Base URL of the inference service.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = "predictor.toml")]
    config: PathBuf,
    /// Per-request timeout; 0 disables it.
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict the next-day return for one symbol.
    Predict {
        symbol: String,
        /// Also fetch and chart the symbol's price history.
        #[arg(long)]
        history: bool,
    },
    /// Next-day prediction from the symbol-less daily index endpoint.
    Daily,
    /// List symbols with a trained model.
    Models,
    /// Chart the historical close prices for a symbol.
    History { symbol: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Some(url) = cli.server_url {
        settings.server_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout_secs = (secs > 0).then_some(secs);
    }
    info!(server_url = %settings.server_url, shape = ?settings.api_shape, "predictor starting");

    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Predict { symbol, history } => {
            let client = build_client(&settings, settings.api_shape)?;
            let controller =
                RequestController::with_options(client.clone(), settings.controller_options());
            let directive = render::run_prediction(&controller, &symbol, &mut stdout).await?;
            if history {
                if let ViewDirective::ShowResult { symbol, .. } = &directive {
                    print_history(&client, symbol, &mut stdout).await?;
                }
            }
        }
        Command::Daily => {
            let client = build_client(&settings, ApiShape::DailyGet)?;
            let controller =
                RequestController::with_options(client, settings.controller_options());
            render::run_prediction(&controller, &settings.daily_symbol, &mut stdout).await?;
        }
        Command::Models => {
            let client = build_client(&settings, settings.api_shape)?;
            let models = match client.list_trained_models().await {
                Ok(models) => models,
                Err(err) => {
                    warn!(error = %err, "falling back to configured model list");
                    settings.fallback_models.clone()
                }
            };
            writeln!(stdout, "Trained models:")?;
            for symbol in models {
                writeln!(stdout, "  {symbol}")?;
            }
        }
        Command::History { symbol } => {
            let client = build_client(&settings, settings.api_shape)?;
            let symbol = shared::domain::normalize_symbol(&symbol)
                .context("symbol must not be empty")?;
            print_history(&client, &symbol, &mut stdout).await?;
        }
    }

    Ok(())
}

fn build_client(settings: &Settings, shape: ApiShape) -> Result<Arc<HttpPredictionClient>> {
    let client = HttpPredictionClient::new(&settings.server_url, shape, settings.request_timeout())
        .context("failed to configure prediction client")?;
    Ok(Arc::new(client))
}

async fn print_history(
    client: &HttpPredictionClient,
    symbol: &str,
    out: &mut impl Write,
) -> Result<()> {
    match client.historical_series(symbol).await {
        Ok(bars) => render::render_series(&historical_series(&bars), out),
        Err(err) => {
            writeln!(out, "Error: {}", err.message)?;
            Ok(())
        }
    }
}
