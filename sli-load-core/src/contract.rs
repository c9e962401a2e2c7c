//! # contract: the two transport seams of the pipeline
//!
//! The core never opens sockets itself. Remote work goes through two traits:
//!
//! - [`HttpTransport`] sends one request to the platform REST API and hands back status,
//!   `Set-Cookie` headers and the raw body.
//! - [`FileTransfer`] pushes one local file into a fresh remote directory on the
//!   staging FTP host.
//!
//! Concrete clients live in the `sli-load` crate. Both traits are annotated for
//! `mockall` so tests can script the platform deterministically.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Value of the `Accept` header for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// `application/json`, used for POST calls.
    Json,
    /// `application/json, application/zip`, used for GET calls (templates are zip bodies).
    JsonOrZip,
}

impl Accept {
    pub fn header_value(&self) -> &'static str {
        match self {
            Accept::Json => "application/json",
            Accept::JsonOrZip => "application/json, application/zip",
        }
    }
}

/// One outbound request against the platform REST API.
///
/// `path` is already bound (no `<project>` placeholder left) and relative to the server root.
/// Each entry of `cookies` must be sent as its own `Cookie` header.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub accept: Accept,
    pub cookies: Vec<String>,
    pub body: Option<serde_json::Value>,
}

/// What the core needs from an HTTP response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw values of every `Set-Cookie` header, in response order.
    pub set_cookies: Vec<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Login name and password, reused by the file transfer channel.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A single archive upload into a new remote directory.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub host: String,
    pub credentials: Credentials,
    pub remote_directory: String,
    pub remote_name: String,
    pub local_path: PathBuf,
}

/// Sends requests to the platform REST API.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request. Only connection-level failures are errors here;
    /// non-success statuses are returned as responses.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Moves a packaged archive onto the staging host.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Connect, log in, switch to passive mode, create and enter `remote_directory`,
    /// and store `local_path` as `remote_name`. The first failing step aborts the transfer
    /// with an `Upload` error naming that step.
    async fn transfer(&self, request: TransferRequest) -> Result<()>;
}
