use async_trait::async_trait;
use dav_photo_frame::error::DavError;
use dav_photo_frame::image_ref::ImageRef;
use dav_photo_frame::source::{DirectoryLister, ExistenceValidator};
use dav_photo_frame::supplier::PhotoSupplier;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Plays back one scripted listing per call; `None` is a transport failure,
/// and an exhausted script lists nothing.
struct ScriptedLister {
    script: Mutex<VecDeque<Option<Vec<&'static str>>>>,
    calls: AtomicUsize,
}

impl ScriptedLister {
    fn new(script: Vec<Option<Vec<&'static str>>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryLister for ScriptedLister {
    async fn list(&self, folder: &str) -> Result<Vec<ImageRef>, DavError> {
        assert_eq!(folder, "/p/");
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Some(images)) => Ok(images.into_iter().map(ImageRef::from).collect()),
            Some(None) => Err(DavError::Status {
                url: "http://h/p/".into(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            }),
            None => Ok(Vec::new()),
        }
    }
}

struct AllowList {
    valid: HashSet<&'static str>,
    checked: Mutex<Vec<String>>,
}

impl AllowList {
    fn new(valid: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            valid: valid.iter().copied().collect(),
            checked: Mutex::new(Vec::new()),
        })
    }

    fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExistenceValidator for AllowList {
    async fn validate(&self, image: &ImageRef) -> bool {
        self.checked.lock().unwrap().push(image.to_string());
        self.valid.contains(image.as_str())
    }
}

#[tokio::test]
async fn invalid_head_is_discarded_and_refill_supplies_next() {
    let lister = ScriptedLister::new(vec![Some(vec!["http://h/p/good.jpg"])]);
    let validator = AllowList::new(&["http://h/p/good.jpg"]);
    let supplier = PhotoSupplier::new("/p/", lister.clone(), validator.clone());
    supplier.queue().extend([ImageRef::from("http://h/p/gone.jpg")]);

    let next = supplier.next_image().await;

    assert_eq!(next, Some(ImageRef::from("http://h/p/good.jpg")));
    assert_eq!(lister.calls(), 1);
    assert_eq!(
        validator.checked(),
        vec!["http://h/p/gone.jpg", "http://h/p/good.jpg"]
    );
    assert!(supplier.queue().is_empty());
}

#[tokio::test]
async fn failed_refill_reports_no_image_without_retry() {
    let lister = ScriptedLister::new(vec![None, Some(vec!["http://h/p/a.jpg"])]);
    let validator = AllowList::new(&["http://h/p/a.jpg"]);
    let supplier = PhotoSupplier::new("/p/", lister.clone(), validator.clone());

    assert_eq!(supplier.next_image().await, None);
    assert_eq!(lister.calls(), 1);
    assert!(validator.checked().is_empty());

    // The next cycle lists again and recovers.
    assert_eq!(
        supplier.next_image().await,
        Some(ImageRef::from("http://h/p/a.jpg"))
    );
    assert_eq!(lister.calls(), 2);
}

#[tokio::test]
async fn persistently_invalid_listing_terminates() {
    let bad = vec!["http://h/p/x.jpg", "http://h/p/y.jpg"];
    let lister = ScriptedLister::new(vec![Some(bad.clone()), Some(bad.clone()), Some(bad)]);
    let validator = AllowList::new(&[]);
    let supplier = PhotoSupplier::new("/p/", lister.clone(), validator.clone());

    assert_eq!(supplier.next_image().await, None);
    assert_eq!(lister.calls(), 1, "at most one refill per call");
    assert_eq!(validator.checked().len(), 2);
    assert!(supplier.queue().is_empty());
}

#[tokio::test]
async fn rejected_references_are_never_served_or_requeued() {
    let lister = ScriptedLister::new(vec![Some(vec![
        "http://h/p/bad1.jpg",
        "http://h/p/ok.jpg",
        "http://h/p/bad2.jpeg",
    ])]);
    let validator = AllowList::new(&["http://h/p/ok.jpg"]);
    let supplier = PhotoSupplier::new("/p/", lister.clone(), validator.clone());

    assert_eq!(
        supplier.next_image().await,
        Some(ImageRef::from("http://h/p/ok.jpg"))
    );
    assert_eq!(supplier.queue().len(), 1);

    // bad2 is drained, the empty relisting yields nothing.
    assert_eq!(supplier.next_image().await, None);
    assert!(supplier.queue().is_empty());
    assert_eq!(lister.calls(), 2);

    let checked = validator.checked();
    assert_eq!(checked.iter().filter(|u| u.contains("bad1")).count(), 1);
    assert_eq!(checked.iter().filter(|u| u.contains("bad2")).count(), 1);
}

#[tokio::test]
async fn queued_image_is_served_without_listing() {
    let lister = ScriptedLister::new(vec![]);
    let validator = AllowList::new(&["http://h/p/a.jpg"]);
    let supplier = PhotoSupplier::new("/p/", lister.clone(), validator);
    supplier
        .queue()
        .extend([ImageRef::from("http://h/p/a.jpg"), ImageRef::from("http://h/p/a.jpg")]);

    assert_eq!(
        supplier.next_image().await,
        Some(ImageRef::from("http://h/p/a.jpg"))
    );
    assert_eq!(lister.calls(), 0);
    assert_eq!(supplier.queue().len(), 1, "duplicates are tolerated");
}

struct GatedLister {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl DirectoryLister for GatedLister {
    async fn list(&self, _folder: &str) -> Result<Vec<ImageRef>, DavError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(vec![ImageRef::from("http://h/p/a.jpg")])
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn call_during_refill_is_dropped() {
    let lister = Arc::new(GatedLister {
        gate: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let validator = AllowList::new(&["http://h/p/a.jpg"]);
    let supplier = Arc::new(PhotoSupplier::new("/p/", lister.clone(), validator.clone()));

    let slow = tokio::spawn({
        let supplier = supplier.clone();
        async move { supplier.next_image().await }
    });
    while !supplier.queue().is_refilling() {
        tokio::task::yield_now().await;
    }

    assert_eq!(supplier.next_image().await, None);
    assert!(validator.checked().is_empty());

    lister.gate.notify_one();
    let served = tokio::time::timeout(std::time::Duration::from_secs(2), slow)
        .await
        .expect("timeout waiting for in-flight refill")
        .unwrap();
    assert_eq!(served, Some(ImageRef::from("http://h/p/a.jpg")));
    assert_eq!(lister.calls.load(Ordering::SeqCst), 1);
    assert!(supplier.queue().is_empty());
}
