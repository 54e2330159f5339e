use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use gatehouse::config::load_config;
use gatehouse::lifecycle::{signals, Gateway, Shutdown};
use gatehouse::observability::{logging, metrics};

/// Multi-service HTTP gateway.
#[derive(Debug, Parser)]
#[command(name = "gatehouse", version, about)]
struct Cli {
    /// Path to the configuration file (JSON or TOML).
    #[arg(default_value = "./config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        path = %cli.config.display(),
        services = config.services.len(),
        "gatehouse starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    let gateway = Gateway::launch(config.services, &shutdown);

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        trigger.trigger();
    });

    let report = gateway.wait().await;
    if report.all_failed() {
        return Err("no service could be started".into());
    }

    tracing::info!(stopped = report.stopped, failed = report.failed, "Shutdown complete");
    Ok(())
}
