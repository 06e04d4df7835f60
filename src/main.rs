// src/main.rs
//! Feed Archiver command-line tool
//!
//! Inspect and replay export documents written by the archiver.
//!
//! ```text
//! feed-archiver analyze <file>
//! feed-archiver replay <file> [speed]
//! ```

use anyhow::{bail, Context, Result};
use feed_archiver::observability::{init_metrics, init_tracing};
use feed_archiver::recording::ExportDocument;
use feed_archiver::replay::{analyze, ReplayOptions, Replayer};
use feed_archiver::utils::config::AppConfig;
use feed_archiver::BuildInfo;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const USAGE: &str = "usage: feed-archiver <analyze|replay> <file> [speed]";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    init_tracing(&config.observability)?;
    init_metrics(&config.observability)?;

    let build = BuildInfo::current();
    info!("Feed Archiver v{} ({})", build.version, build.git_hash);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, path) = match args.as_slice() {
        [command, path, ..] => (command.as_str(), path.as_str()),
        _ => bail!(USAGE),
    };

    let doc = ExportDocument::load_from_file(path)
        .with_context(|| format!("Failed to load {}", path))?;

    match command {
        "analyze" => {
            print!("{}", analyze(&doc));
            Ok(())
        }
        "replay" => {
            let speed = match args.get(2) {
                Some(raw) => raw
                    .parse::<f64>()
                    .with_context(|| format!("Invalid speed {:?}", raw))?,
                None => config.replay.speed,
            };
            replay(&doc, speed).await
        }
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

async fn replay(doc: &ExportDocument, speed: f64) -> Result<()> {
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping replay");
                cancel.cancel();
            }
        }
    });

    let options = ReplayOptions::default()
        .with_speed(speed)
        .with_cancel(cancel);

    let summary = Replayer::default()
        .replay(
            doc,
            |event, payload| {
                info!(
                    method = %event.method,
                    msg_id = %event.msg_id,
                    display_id = event.display_id.as_deref().unwrap_or("-"),
                    "{} bytes",
                    payload.len()
                );
            },
            options,
        )
        .await?;

    println!(
        "Replayed {}/{} messages ({} skipped){}",
        summary.delivered,
        summary.total,
        summary.skipped,
        if summary.cancelled { ", cancelled" } else { "" }
    );
    Ok(())
}
