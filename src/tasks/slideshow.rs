use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ImageCache;
use crate::clock::Clock;
use crate::events::ViewerCommand;
use crate::image_ref::ImageRef;
use crate::photo::Photo;
use crate::source::{DirectoryLister, ExistenceValidator};
use crate::supplier::PhotoSupplier;

#[derive(Debug, Clone, Copy)]
pub struct SlideshowTiming {
    pub first_advance: Duration,
    pub advance_interval: Duration,
}

/// Advances the slideshow on a fixed period.
///
/// Every tick starts a supplier call in the background, so a slow listing
/// never holds back the timer. Ticks that land while a refill is still
/// running come back empty and are simply skipped. This task is the only
/// owner of the cache: completed advancements are resolved to cached
/// photos here, forwarded to the viewer, and followed by a sweep.
pub async fn run<L, V, C>(
    supplier: Arc<PhotoSupplier<L, V>>,
    mut cache: ImageCache<Arc<Photo>, C>,
    to_viewer: Sender<ViewerCommand>,
    timing: SlideshowTiming,
    cancel: CancellationToken,
) -> Result<()>
where
    L: DirectoryLister + ?Sized + 'static,
    V: ExistenceValidator + ?Sized + 'static,
    C: Clock,
{
    let mut ticks = interval_at(
        Instant::now() + timing.first_advance,
        timing.advance_interval,
    );
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut advancing: JoinSet<Option<ImageRef>> = JoinSet::new();

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting slideshow task");
                break;
            }

            _ = ticks.tick() => {
                if !advancing.is_empty() {
                    debug!("previous advancement still running; skipping tick");
                    continue;
                }
                let supplier = supplier.clone();
                advancing.spawn(async move { supplier.next_image().await });
            }

            Some(joined) = advancing.join_next() => {
                match joined {
                    Ok(Some(image)) => {
                        let photo = cache.get_or_load(&image, |uri| Arc::new(Photo::new(uri.clone())));
                        debug!(uri = %image, cached = cache.len(), "advancing");
                        if to_viewer.send(ViewerCommand::Show(photo)).await.is_err() {
                            warn!("viewer channel closed");
                            break;
                        }
                    }
                    Ok(None) => debug!("no image available this cycle"),
                    Err(err) => warn!("advance task failed: {err}"),
                }
                cache.sweep();
            }
        }
    }
    advancing.shutdown().await;
    Ok(())
}
