use thiserror::Error;

/// Failures talking to the remote photo folder.
#[derive(Debug, Error)]
pub enum DavError {
    /// Connection, timeout or body read failure.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The multistatus document is not well-formed XML.
    #[error("malformed multistatus document: {0}")]
    Parse(#[from] roxmltree::Error),

    /// The document parsed but lacks a property we need.
    #[error("response has no DAV:{0} property")]
    MissingProperty(&'static str),
}

impl DavError {
    /// True for document problems, false for network/status problems.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::MissingProperty(_))
    }
}
