use anyhow::{Context, Result};
use phone_buckets::config::AppConfig;
use phone_buckets::logging::{init_logging, LogFormat};
use phone_buckets::notifier::{NoopNotifier, TelegramNotifier};
use phone_buckets::pipeline::{run_once, RunSummary};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let log_format = std::env::var("LOG_FORMAT")
        .unwrap_or_default()
        .parse::<LogFormat>()
        .context("Invalid LOG_FORMAT")?;
    init_logging(log_format);

    info!("Starting phone buckets run");

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(
        inbox = %config.inbox_dir.display(),
        outbox = %config.outbox_dir.display(),
        telegram = config.telegram.is_some(),
        "Configuration loaded"
    );

    let today = chrono::Local::now().date_naive();

    let summary: RunSummary = match &config.telegram {
        Some(telegram) => {
            let notifier = TelegramNotifier::new(telegram, &config.recovery)
                .context("Failed to set up Telegram notifier")?;
            run_once(&config, &notifier, today).await
        }
        None => run_once(&config, &NoopNotifier, today).await,
    }
    .context("Run failed")?;

    info!(
        artifacts = summary.artifacts.len(),
        phones = summary.total_phones(),
        "Done"
    );
    Ok(())
}
