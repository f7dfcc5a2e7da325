#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::{fs::File, io::BufReader};

use anyhow::{bail, Context};
use clap::Parser as _;
use cli::Args;
use otlp_probe::build;
use otlp_probe::config::ProbeConfig;
use otlp_probe::MetricProbe;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize log tracing. Diagnostics go to stderr so that stdout
    // carries nothing but the completion marker.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "info,otlp_probe=debug".into()),
                ),
        )
        .init();

    tracing::info!(
        "otlp-probe version: v{} commit: {} buildtime: {}",
        build::PKG_VERSION,
        build::COMMIT_HASH,
        build::BUILD_TIME
    );

    tracing::info!("Current process PID: {}", std::process::id());

    let fut = async {
        match args {
            Args::Emit(options) => {
                // Load config
                let config: ProbeConfig = async {
                    Ok::<_, anyhow::Error>(match (options.config_file, options.config_content) {
                        (Some(_), Some(_)) => {
                            bail!("Cannot set both --config-file and --config-content at the same time")
                        }
                        (None, None) => ProbeConfig::from_env()?,
                        (None, Some(s)) => serde_json::from_str(&s)?,
                        (Some(path), None) => {
                            tracing::info!("Loading config from: {path:?}");
                            let file = File::open(path)?;
                            let reader = BufReader::new(file);
                            serde_json::from_reader(reader)?
                        }
                    })
                }
                .await
                .context("Failed to load config")?;

                tracing::debug!("Probe config: {config:#?}");

                tracing::info!("Starting probe run now");
                MetricProbe::from_config(&config)?.run().await?;

                tracing::info!("Probe run finished, exiting");
            }
        }

        Ok::<_, anyhow::Error>(())
    };

    if let Err(error) = fut.await {
        tracing::error!(error = format!("{error:#}"));
        std::process::exit(1);
    }
}
