//! Error taxonomy for the load pipeline.
//!
//! Every operation surfaces a single [`SliError`] naming the stage that failed.
//! Row-level CSV validation is the only soft failure and never produces one of these.

use std::fmt;
use std::path::PathBuf;

/// The result type used throughout the core crate.
pub type Result<T> = std::result::Result<T, SliError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SliError {
    /// The login response carried no authentication cookie.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The token response carried no security token cookie.
    #[error("getting security token failed: {message}")]
    Token { message: String },

    /// An HTTP call failed, returned a non-success status, or returned an unexpected body.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// An identifier could not be resolved to a platform object.
    #[error("cannot resolve object {identifier}: {message}")]
    Resolution { identifier: String, message: String },

    /// The operation needs state (login, project, manifest) that does not exist yet.
    #[error("precondition failed: {message}")]
    Precondition { message: String },

    /// The load archive could not be written.
    #[error("cannot package load archive {}: {message}", path.display())]
    Packaging {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// A step of the file transfer failed.
    #[error("upload failed while {stage}: {message}")]
    Upload { stage: UploadStage, message: String },
}

/// The step of the secure FTP session that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Connect,
    Login,
    CreateDirectory,
    ChangeDirectory,
    Transfer,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            UploadStage::Connect => "connecting",
            UploadStage::Login => "logging in",
            UploadStage::CreateDirectory => "creating the remote directory",
            UploadStage::ChangeDirectory => "changing into the remote directory",
            UploadStage::Transfer => "transferring the archive",
        };
        f.write_str(stage)
    }
}

impl SliError {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        SliError::Transport {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SliError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        SliError::Precondition {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn resolution(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        SliError::Resolution {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn packaging(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SliError::Packaging {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn upload(stage: UploadStage, message: impl Into<String>) -> Self {
        SliError::Upload {
            stage,
            message: message.into(),
        }
    }

    /// Short stage label, used in reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SliError::Authentication { .. } => "authentication",
            SliError::Token { .. } => "token",
            SliError::Transport { .. } => "transport",
            SliError::Resolution { .. } => "resolution",
            SliError::Precondition { .. } => "precondition",
            SliError::Packaging { .. } => "packaging",
            SliError::Upload { .. } => "upload",
        }
    }
}
