use thiserror::Error;

/// Why a loader invocation produced no page.
///
/// Never reaches the rendering layer: the failure boundary logs it and
/// substitutes an empty page.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("response is not a page object: {0}")]
    Malformed(String),
}

impl LoaderError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }
}
