use std::sync::Arc;

use tracing::debug;

use crate::image_ref::ImageRef;
use crate::queue::{ImageQueue, Refill};
use crate::source::{DirectoryLister, ExistenceValidator};

/// Produces the next image that the server confirms is still a JPEG.
///
/// Each call drains the queue, refilling it at most once. References that
/// fail validation are discarded for good. A call that finds a refill
/// already running returns `None` instead of waiting.
pub struct PhotoSupplier<L: ?Sized, V: ?Sized> {
    queue: ImageQueue,
    lister: Arc<L>,
    validator: Arc<V>,
}

impl<L, V> PhotoSupplier<L, V>
where
    L: DirectoryLister + ?Sized,
    V: ExistenceValidator + ?Sized,
{
    pub fn new(folder: impl Into<String>, lister: Arc<L>, validator: Arc<V>) -> Self {
        Self {
            queue: ImageQueue::new(folder),
            lister,
            validator,
        }
    }

    pub fn queue(&self) -> &ImageQueue {
        &self.queue
    }

    pub async fn next_image(&self) -> Option<ImageRef> {
        if self.queue.is_refilling() {
            debug!("refill in flight; skipping this cycle");
            return None;
        }

        let mut refilled = false;
        loop {
            let candidate = match self.queue.dequeue() {
                Some(image) => image,
                None if refilled => {
                    debug!("queue exhausted after refill");
                    return None;
                }
                None => {
                    refilled = true;
                    match self.queue.refill(self.lister.as_ref()).await {
                        Refill::Busy => return None,
                        Refill::Loaded(0) => {
                            debug!("refill produced nothing");
                            return None;
                        }
                        Refill::Loaded(_) => continue,
                    }
                }
            };

            if self.validator.validate(&candidate).await {
                return Some(candidate);
            }
            debug!(uri = %candidate, "discarding invalid image");
        }
    }
}
