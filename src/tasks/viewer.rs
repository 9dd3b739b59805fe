use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::ViewerCommand;
use crate::photo::Photo;
use crate::webdav::DavClient;

type Decoded = (u64, Arc<Photo>, Result<Arc<RgbaImage>>);

/// Headless display surface: decodes what it is asked to show and logs it.
///
/// Decodes run off the receive loop so clock updates keep flowing while a
/// fetch is slow. A photo that fails to fetch or decode is skipped and the
/// current one stays up. A decode that finishes after a newer photo went up
/// is not shown.
pub async fn run(
    mut commands: Receiver<ViewerCommand>,
    client: DavClient,
    cancel: CancellationToken,
) -> Result<()> {
    let mut current: Option<Arc<Photo>> = None;
    let mut shown_seq = 0u64;
    let mut next_seq = 0u64;
    let mut decoding: JoinSet<Decoded> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => break,
            cmd = commands.recv() => match cmd {
                Some(ViewerCommand::Show(photo)) => {
                    next_seq += 1;
                    let seq = next_seq;
                    let client = client.clone();
                    decoding.spawn(async move {
                        let pixels = photo.decoded(&client).await;
                        (seq, photo, pixels)
                    });
                }
                Some(ViewerCommand::Clock(label)) => info!(clock = %label, "clock"),
                None => break,
            },
            Some(joined) = decoding.join_next() => match joined {
                Ok((seq, photo, _)) if seq < shown_seq => {
                    debug!(uri = %photo.uri(), "newer photo already shown; dropping");
                }
                Ok((seq, photo, Ok(pixels))) => {
                    let (width, height) = pixels.dimensions();
                    info!(uri = %photo.uri(), width, height, "displaying");
                    shown_seq = seq;
                    current = Some(photo);
                }
                Ok((_, photo, Err(err))) => warn!(
                    uri = %photo.uri(),
                    showing = ?current.as_ref().map(|p| p.uri().as_str()),
                    "could not load photo; keeping current: {err:#}"
                ),
                Err(err) => warn!("decode task failed: {err}"),
            },
        }
    }
    decoding.shutdown().await;
    Ok(())
}
