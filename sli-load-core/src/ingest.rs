//! Transfer a packaged load to the staging host and ask the platform to pull it.
//!
//! The upload and the pull are strictly sequential: the pull request is only sent
//! once the archive is on the staging host, and the first failure aborts the rest.

use serde_json::json;
use tracing::{error, info};

use crate::contract::{FileTransfer, HttpTransport, TransferRequest};
use crate::error::{Result, SliError};
use crate::naming::{random_token, TOKEN_LENGTH};
use crate::package::LoadArchive;
use crate::session::{project_path, SessionContext, API_ETL};

pub const REMOTE_ARCHIVE_NAME: &str = "upload.zip";

/// Where an archive was placed on the staging host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub remote_directory: String,
    pub archive_name: String,
}

impl UploadTarget {
    /// A fresh, randomly named directory.
    pub fn fresh() -> Self {
        Self {
            remote_directory: random_token(TOKEN_LENGTH),
            archive_name: REMOTE_ARCHIVE_NAME.to_string(),
        }
    }
}

pub struct IngestionTrigger<F> {
    transfer: F,
    upload_host: String,
}

impl<F: FileTransfer> IngestionTrigger<F> {
    pub fn new(transfer: F, upload_host: impl Into<String>) -> Self {
        Self {
            transfer,
            upload_host: upload_host.into(),
        }
    }

    pub fn upload_host(&self) -> &str {
        &self.upload_host
    }

    /// Put `archive` into a new random directory on the staging host using the
    /// session's login credentials. Returns the directory name.
    pub async fn upload<H: HttpTransport>(
        &self,
        ctx: &SessionContext<H>,
        archive: &LoadArchive,
    ) -> Result<String> {
        let credentials = ctx
            .credentials()
            .cloned()
            .ok_or_else(|| SliError::precondition("no credentials for upload; call login first"))?;
        let target = UploadTarget::fresh();

        info!(
            host = %self.upload_host,
            remote_directory = %target.remote_directory,
            archive = %archive.file_path.display(),
            "[UPLOAD] Transferring load archive"
        );
        let request = TransferRequest {
            host: self.upload_host.clone(),
            credentials,
            remote_directory: target.remote_directory.clone(),
            remote_name: target.archive_name,
            local_path: archive.file_path.clone(),
        };
        if let Err(e) = self.transfer.transfer(request).await {
            error!(error = %e, remote_directory = %target.remote_directory, "[UPLOAD] Transfer failed");
            return Err(e);
        }
        info!(remote_directory = %target.remote_directory, "[UPLOAD] Transfer complete");
        Ok(target.remote_directory)
    }

    /// Ask the platform to ingest the package in `remote_directory` into `project`.
    pub async fn trigger_pull<H: HttpTransport>(
        &self,
        ctx: &SessionContext<H>,
        remote_directory: &str,
        project: &str,
    ) -> Result<()> {
        let path = project_path(API_ETL, project);
        ctx.post(&path, json!({ "pullIntegration": remote_directory }))
            .await
            .map_err(|e| {
                error!(error = %e, remote_directory, project, "[PULL] Pull request failed");
                e
            })?;
        info!(remote_directory, project, "[PULL] Pull integration started");
        Ok(())
    }

    /// Upload, then trigger the pull into the working project. The pull is never sent
    /// if the upload failed.
    pub async fn upload_and_pull<H: HttpTransport>(
        &self,
        ctx: &SessionContext<H>,
        archive: &LoadArchive,
    ) -> Result<String> {
        let project = ctx.require_project()?;
        let remote_directory = self.upload(ctx, archive).await?;
        self.trigger_pull(ctx, &remote_directory, project).await?;
        Ok(remote_directory)
    }

    /// `true` only if both the upload and the pull request succeeded.
    pub async fn ingest<H: HttpTransport>(
        &self,
        ctx: &SessionContext<H>,
        archive: &LoadArchive,
    ) -> bool {
        match self.upload_and_pull(ctx, archive).await {
            Ok(_) => true,
            Err(e) => {
                error!(stage = e.kind(), error = %e, "Ingestion failed");
                false
            }
        }
    }
}
