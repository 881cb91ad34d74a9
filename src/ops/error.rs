//! Engine-level error roll-up.

use thiserror::Error;

use crate::activate::ActivateError;
use crate::io::digest::VerifyError;
use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;
use crate::resolver::ResolveError;
use crate::store::StoreError;
use crate::types::format::UnsupportedFormat;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Activate(#[from] ActivateError),

    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormat),

    #[error("version {version} of '{user_id}' is not installed")]
    VersionNotInstalled { user_id: String, version: String },

    #[error("invalid release URL: {0}")]
    InvalidUrl(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Wrap with operation context (operation name, binary, version).
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
