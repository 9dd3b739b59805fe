//! Binary entrypoint for the WebDAV photo frame.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dav_photo_frame::cache::ImageCache;
use dav_photo_frame::clock::SystemClock;
use dav_photo_frame::config::Configuration;
use dav_photo_frame::events::ViewerCommand;
use dav_photo_frame::supplier::PhotoSupplier;
use dav_photo_frame::tasks;
use dav_photo_frame::webdav::DavClient;

#[derive(Debug, Parser)]
#[command(
    name = "photo-frame",
    version,
    about = "Slideshow of JPEGs served from a WebDAV folder"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Print the next N images the supplier would show and exit
    #[arg(long = "next", value_name = "COUNT")]
    next: Option<usize>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let filter = match verbosity {
        0 => filter,
        1 => filter.add_directive("dav_photo_frame=debug".parse()?),
        _ => filter.add_directive("dav_photo_frame=trace".parse()?),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        next,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::info!(
        "Loaded configuration from {}:\n{:#?}",
        config.display(),
        cfg
    );

    let client = DavClient::new(cfg.server_base_uri.clone(), cfg.request_timeout)?;
    let dav = Arc::new(client.clone());
    let supplier = Arc::new(PhotoSupplier::new(
        cfg.image_folder.clone(),
        dav.clone(),
        dav,
    ));

    if let Some(count) = next {
        return run_dry(&supplier, &cfg, count).await;
    }

    let cache = ImageCache::new(cfg.cache.policy()?, SystemClock);
    let (viewer_tx, viewer_rx) = mpsc::channel::<ViewerCommand>(cfg.viewer_channel_capacity);
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Slideshow
    tasks.spawn({
        let to_viewer = viewer_tx.clone();
        let cancel = cancel.clone();
        let timing = tasks::slideshow::SlideshowTiming {
            first_advance: cfg.first_advance,
            advance_interval: cfg.advance_interval,
        };
        async move {
            tasks::slideshow::run(supplier, cache, to_viewer, timing, cancel)
                .await
                .context("slideshow task failed")
        }
    });

    // Clock
    tasks.spawn({
        let to_viewer = viewer_tx;
        let cancel = cancel.clone();
        let period = cfg.clock_interval;
        async move {
            tasks::clock::run(to_viewer, period, cancel)
                .await
                .context("clock task failed")
        }
    });

    // Viewer
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            tasks::viewer::run(viewer_rx, client, cancel)
                .await
                .context("viewer task failed")
        }
    });

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
        // One task ending takes the others down with it.
        cancel.cancel();
    }

    Ok(())
}

async fn run_dry(
    supplier: &PhotoSupplier<DavClient, DavClient>,
    cfg: &Configuration,
    count: usize,
) -> Result<()> {
    println!("# next images\n# folder: {}\n# count: {}\n", cfg.folder_url(), count);
    for idx in 0..count {
        match supplier.next_image().await {
            Some(image) => println!("  {:>4}: {}", idx + 1, image),
            None => {
                println!("(no image available)");
                break;
            }
        }
    }
    Ok(())
}
