use std::fmt;
use std::sync::Arc;

/// Absolute URI of a remote image.
///
/// Cheap to clone; the queue may hold duplicates, the cache keys on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef(Arc<str>);

impl ImageRef {
    pub fn new(uri: impl AsRef<str>) -> Self {
        Self(Arc::from(uri.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for ImageRef {
    fn from(uri: String) -> Self {
        Self(Arc::from(uri))
    }
}
