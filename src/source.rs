//! Seams between the supply pipeline and the remote photo folder.

use async_trait::async_trait;

use crate::error::DavError;
use crate::image_ref::ImageRef;

/// Lists candidate images in a remote folder.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Immediate children of `folder` that look like JPEGs, as absolute URIs,
    /// in the order the server returned them.
    async fn list(&self, folder: &str) -> Result<Vec<ImageRef>, DavError>;
}

/// Confirms that a previously listed image can still be served.
#[async_trait]
pub trait ExistenceValidator: Send + Sync {
    /// Never fails: any problem reaching or reading the resource is `false`.
    async fn validate(&self, image: &ImageRef) -> bool;
}
