//! FIFO backlog of candidate images with a single-flight refill.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::image_ref::ImageRef;
use crate::source::DirectoryLister;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refill {
    /// Another refill was already in flight; nothing was listed or enqueued.
    Busy,
    /// The listing finished and this many references were appended.
    /// Zero covers both an empty folder and a failed listing.
    Loaded(usize),
}

#[derive(Debug)]
pub struct ImageQueue {
    folder: String,
    pending: Mutex<VecDeque<ImageRef>>,
    refilling: AtomicBool,
}

/// Clears the in-flight flag however the refill ends, including when the
/// refill future is dropped mid-listing.
struct RefillGuard<'a>(&'a AtomicBool);

impl Drop for RefillGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ImageQueue {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            pending: Mutex::new(VecDeque::new()),
            refilling: AtomicBool::new(false),
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<ImageRef>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pops the oldest reference; `None` means the caller must refill.
    pub fn dequeue(&self) -> Option<ImageRef> {
        self.pending().pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    pub fn is_refilling(&self) -> bool {
        self.refilling.load(Ordering::Acquire)
    }

    /// Appends references directly, bypassing the lister.
    pub fn extend(&self, images: impl IntoIterator<Item = ImageRef>) {
        self.pending().extend(images);
    }

    /// Lists the configured folder and appends every result in order.
    ///
    /// Never waits for a concurrent refill: if one is running this returns
    /// [`Refill::Busy`] immediately.
    pub async fn refill<L>(&self, lister: &L) -> Refill
    where
        L: DirectoryLister + ?Sized,
    {
        if self
            .refilling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(folder = %self.folder, "refill already in flight");
            return Refill::Busy;
        }
        let _guard = RefillGuard(&self.refilling);

        match lister.list(&self.folder).await {
            Ok(images) => {
                let count = images.len();
                self.extend(images);
                info!(folder = %self.folder, count, "queue refilled");
                Refill::Loaded(count)
            }
            Err(err) => {
                warn!(folder = %self.folder, parse = err.is_parse(), "listing failed: {err}");
                Refill::Loaded(0)
            }
        }
    }
}
