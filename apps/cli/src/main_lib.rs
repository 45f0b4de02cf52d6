use anyhow::Context;
use chrono::Utc;
use pricefeed_market_data::{MarketDataConfig, OutputSize, ProviderRegistry};
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Command;

/// Logs go to stderr so stdout stays parseable JSON.
pub fn init_tracing() {
    let log_format = std::env::var("PRICEFEED_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

pub async fn build_registry() -> anyhow::Result<ProviderRegistry> {
    let config = MarketDataConfig::from_env().context("Invalid market data configuration")?;
    let registry = ProviderRegistry::from_config(&config)
        .await
        .context("Failed to initialize providers")?;
    tracing::debug!(
        "Providers in use: {:?}",
        registry
            .available_providers()
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
    );
    Ok(registry)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarketHours {
    open: bool,
    checked_at: chrono::DateTime<Utc>,
}

pub async fn run_command(registry: &ProviderRegistry, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Quote(args) => {
            let quote = registry
                .fetch_current_quote(&args.symbol, args.asset_class, &args.currency)
                .await
                .with_context(|| format!("Failed to fetch quote for {}", args.symbol))?;
            match quote {
                Some(quote) => print_json(&quote),
                None => anyhow::bail!("No provider returned a quote for {}", args.symbol),
            }
        }
        Command::History { symbol, full } => {
            let size = if full { OutputSize::Full } else { OutputSize::Compact };
            let points = registry
                .fetch_historical_prices(&symbol.symbol, symbol.asset_class, &symbol.currency, size)
                .await
                .with_context(|| format!("Failed to fetch history for {}", symbol.symbol))?;
            print_json(&points)
        }
        Command::Search { keywords } => print_json(&registry.search_symbols(&keywords).await),
        Command::Batch { entries } => print_json(&registry.fetch_multiple_quotes(&entries).await),
        Command::Stats => print_json(&registry.get_provider_stats()),
        Command::MarketHours => {
            let now = Utc::now();
            print_json(&MarketHours {
                open: registry.is_market_hours_at(now),
                checked_at: now,
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
