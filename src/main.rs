use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bintally::config::{Config, Settings};
use bintally::monitor::Poller;
use bintally::web::MetricsServer;
use bintally::{metrics, output};
use bintally_core::{GreyhoundClient, SnapshotSource, StateStore, Tracker};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    let mut client = GreyhoundClient::new(&cli.username, &cli.password);

    if cli.daemonise {
        run_daemon(client, settings).await
    } else {
        client.login().context("Failed to log in to the portal")?;
        debug!("Finished login");

        let snapshot = client.fetch().context("Failed to get bin data")?;
        for format in cli.output_formats() {
            println!("{}", output::render(&snapshot, format)?);
        }
        Ok(())
    }
}

async fn run_daemon(client: GreyhoundClient, settings: Settings) -> Result<()> {
    // Corrupt state is fatal: the operator must look at it before totals are lost
    let store = settings.state_file.clone().map(StateStore::new);
    let tracker = Tracker::open(store, settings.poll_interval(), settings.force_init)
        .context("Failed to load state file")?;

    metrics::init_metrics();
    let server = MetricsServer::new(settings.metrics.clone()).start();

    info!(
        "Polling every {}s, state file: {:?}",
        settings.poll_interval_secs, settings.state_file
    );
    let poller = Poller::new(client, tracker);

    tokio::select! {
        _ = poller.run() => Ok(()),
        result = server => result.context("Metrics server task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("bintally=debug,bintally_core=debug")
    } else {
        EnvFilter::new("bintally=info,bintally_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
