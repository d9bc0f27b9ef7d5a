//! controltext - text protocol console for the example mixer schema
//!
//! Reads protocol lines from stdin and writes responses to stdout. Logs go
//! to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use controlconf::ControlConfig;
use controltext::{generate, Flow, MixerLayout, SessionClock, SessionOptions, TextSession};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "controltext")]
#[command(about = "Text protocol console for a control plane schema")]
#[command(version)]
struct Cli {
    /// Config file, in place of ./controlplane.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Echo each input line prefixed with '>'
    #[arg(long)]
    echo: bool,

    /// Number of mixer inputs
    #[arg(long)]
    inputs: Option<u16>,

    /// Number of mixer outputs
    #[arg(long)]
    outputs: Option<u16>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) =
        ControlConfig::load_with_sources_from(cli.config.as_deref()).context("loading configuration")?;
    if cli.echo {
        config.session.echo = true;
    }
    if let Some(inputs) = cli.inputs {
        config.mixer.inputs = inputs;
    }
    if let Some(outputs) = cli.outputs {
        config.mixer.outputs = outputs;
    }

    if cli.show_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    let filter = tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    let schema = Arc::new(generate(&MixerLayout::from(&config.mixer)));
    info!(addresses = schema.len(), "schema ready");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let session = TextSession::new(Arc::clone(&schema), Arc::new(tx), SessionOptions::from(&config))?;
    let clock = SessionClock::start();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(config.session.tick_interval_ms.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                schema.manager().tick(clock.now());
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match session.handle_line(clock.now(), line.trim_end_matches('\r')) {
                    Flow::Continue => {}
                    Flow::Sleep(duration) => tokio::time::sleep(duration).await,
                    Flow::Quit => break,
                }
            }
        }
    }

    info!("session closed");
    drop(session);
    writer.await??;
    Ok(())
}
