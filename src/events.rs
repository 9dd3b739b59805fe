use std::sync::Arc;

use crate::photo::Photo;

/// Messages accepted by the viewer task.
#[derive(Debug)]
pub enum ViewerCommand {
    /// Show this photo; it may still need fetching and decoding.
    Show(Arc<Photo>),
    /// Replace the clock label.
    Clock(String),
}
