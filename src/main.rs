use anyhow::{Context, Result};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use arma_quote::config::{Config, LoggingConfig};
use arma_quote::report::TracingSummary;
use arma_quote::session::{
    BarSource, Collaborators, ForecastSession, SummarySink, TokioPacer,
};
use arma_quote::storage::{ArchivingBarSource, JsonForecastLog, JsonSummaryFile};
use arma_quote::twelvedata::TwelveDataClient;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(&logging.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let (writer, ansi) = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            (BoxMakeWriter::new(file), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn summary_sinks(config: &Config) -> Vec<Box<dyn SummarySink>> {
    let mut sinks: Vec<Box<dyn SummarySink>> = vec![Box::new(TracingSummary)];
    if config.storage.write_summary {
        sinks.push(Box::new(JsonSummaryFile::new(&config.storage.log_dir)));
    }
    sinks
}

async fn run_session<B: BarSource>(
    config: &Config,
    bars: B,
    quotes: TwelveDataClient,
    log: JsonForecastLog,
) -> Result<()> {
    let model = config.build_model()?;
    #[allow(unused_mut)]
    let mut summary = summary_sinks(config);
    #[cfg(feature = "plot")]
    summary.push(Box::new(arma_quote::report::ChartSummary::new(
        log.clone(),
        &config.storage.log_dir,
    )));

    let session = ForecastSession::new(
        config.session_config(),
        model,
        Collaborators {
            bars,
            quotes,
            log,
            summary,
            pacer: TokioPacer,
        },
    );
    match session.run().await {
        Ok(summary) => {
            tracing::info!(
                correct = summary.tally.correct,
                incorrect = summary.tally.incorrect,
                "arma-quote finished"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Session aborted");
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Make sure .env file exists with RAPIDAPI_KEY (and optionally RAPIDAPI_HOST)");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging)?;

    tracing::info!(
        symbol = %config.feed.symbol,
        interval = %config.feed.interval,
        base_url = %config.feed.base_url,
        "Starting arma-quote"
    );

    let client = TwelveDataClient::new(
        &config.feed.base_url,
        &config.feed.api_key,
        &config.feed.api_host,
        std::time::Duration::from_secs(config.feed.timeout_secs),
    )?;
    let log = JsonForecastLog::open_in(
        &config.storage.log_dir,
        chrono::Local::now().date_naive(),
    );

    if config.storage.archive_bars {
        let bars = ArchivingBarSource::new(
            client.clone(),
            &config.storage.data_dir,
            config.feed.outputsize,
        );
        run_session(&config, bars, client, log).await
    } else {
        run_session(&config, client.clone(), client, log).await
    }
}
