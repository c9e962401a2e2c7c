//! End-to-end load of one dataset: template → manifest → CSV → archive → upload → pull.
//!
//! Each stage runs only after the previous one succeeded; the first failure is returned
//! as is, so the caller sees which stage broke. Skipped rows are not failures and are
//! reported in [`LoadReport`].

use std::path::PathBuf;

use tracing::{error, info};

use crate::contract::{FileTransfer, HttpTransport};
use crate::encode::{CsvEncoder, RowWarning};
use crate::error::Result;
use crate::ingest::IngestionTrigger;
use crate::manifest::ManifestStore;
use crate::package::LoadPackager;
use crate::session::SessionContext;

/// What to load, into the session's working project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub dataset: String,
    pub rows: Vec<Vec<String>>,
    pub incremental: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub project: String,
    pub dataset: String,
    pub accepted: usize,
    pub skipped: usize,
    pub warnings: Vec<RowWarning>,
    pub archive_path: PathBuf,
    pub remote_directory: String,
}

pub async fn load_dataset<H, F>(
    ctx: &SessionContext<H>,
    store: &mut ManifestStore,
    encoder: &CsvEncoder,
    trigger: &IngestionTrigger<F>,
    request: &LoadRequest,
) -> Result<LoadReport>
where
    H: HttpTransport,
    F: FileTransfer,
{
    let project = ctx.require_project()?.to_string();
    let dataset = request.dataset.as_str();
    info!(project = %project, dataset, rows = request.rows.len(), "[LOAD] Starting load");

    store.read_sli_template(ctx, dataset).await?;
    if request.incremental {
        store.set_incremental(&project, dataset)?;
    }
    let manifest = store.manifest(&project, dataset)?;

    let encoded = encoder.encode::<_, String>(manifest, &request.rows)?;
    let archive = LoadPackager.build(manifest, &encoded.text)?;

    let remote_directory = match trigger.upload_and_pull(ctx, &archive).await {
        Ok(dir) => dir,
        Err(e) => {
            error!(dataset, stage = e.kind(), error = %e, "[LOAD] Load aborted");
            return Err(e);
        }
    };

    info!(
        project = %project,
        dataset,
        accepted = encoded.accepted,
        skipped = encoded.skipped,
        remote_directory = %remote_directory,
        "[LOAD] Load submitted"
    );
    Ok(LoadReport {
        project,
        dataset: dataset.to_string(),
        accepted: encoded.accepted,
        skipped: encoded.skipped,
        warnings: encoded.warnings,
        archive_path: archive.file_path,
        remote_directory,
    })
}
