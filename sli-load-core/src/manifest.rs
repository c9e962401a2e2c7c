//! # manifest: SLI templates and the per-dataset manifest cache
//!
//! A dataset's SLI template is a zip archive holding:
//!   - `upload_info.json`: the manifest, `{"dataSetSLIManifest": {"parts": [..], ..}}`
//!   - `<dataset>.csv`: one line of comma separated column names
//!
//! [`ManifestStore`] downloads the template, parses it into a [`DatasetManifest`],
//! enriches every column with the metadata of the object it populates, and caches
//! the result under `(project, dataset)`. Encoding and packaging need a cached,
//! complete manifest; [`ManifestStore::manifest`] fails with a precondition error
//! otherwise.
//!
//! The order of `parts` is the platform's column order and is never changed here.
//! Fields of the manifest this crate does not interpret are kept verbatim so the
//! JSON written into the load archive matches what the platform handed out.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

use crate::contract::HttpTransport;
use crate::error::{Result, SliError};
use crate::metadata::{MetadataResolver, ObjectMeta};
use crate::package::read_entry;
use crate::session::{SessionContext, API_SLI};

pub const MANIFEST_ENTRY: &str = "upload_info.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadMode {
    #[default]
    Full,
    Incremental,
}

/// Metadata of the platform object a column populates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMeta {
    pub title: String,
    pub uri: String,
    pub category: String,
    pub identifier: String,
}

impl From<&ObjectMeta> for ResolvedMeta {
    fn from(meta: &ObjectMeta) -> Self {
        Self {
            title: meta.title.clone(),
            uri: meta.uri.clone(),
            category: meta.category.clone(),
            identifier: meta.identifier.clone(),
        }
    }
}

/// One entry of `dataSetSLIManifest.parts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestColumn {
    #[serde(rename = "columnName")]
    pub column_name: String,
    #[serde(default)]
    pub populates: Vec<String>,
    #[serde(default)]
    pub mode: LoadMode,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Filled by [`ManifestStore::enrich_manifest`]; never serialized.
    #[serde(skip)]
    pub resolved_meta: Option<ResolvedMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliManifest {
    #[serde(default)]
    pub parts: Vec<ManifestColumn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contents of `upload_info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadInfo {
    #[serde(rename = "dataSetSLIManifest")]
    pub manifest: SliManifest,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed SLI template for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetManifest {
    pub dataset_id: String,
    /// Where the downloaded template lives; load archives are written next to it.
    pub template_path: PathBuf,
    /// `None` when the template had no `upload_info.json`.
    pub upload_info: Option<UploadInfo>,
    /// Provisional column order from `<dataset>.csv`; `None` when that entry was missing.
    pub template_columns: Option<Vec<String>>,
}

impl DatasetManifest {
    pub fn parts(&self) -> &[ManifestColumn] {
        self.upload_info
            .as_ref()
            .map(|info| info.manifest.parts.as_slice())
            .unwrap_or_default()
    }

    pub fn parts_mut(&mut self) -> &mut [ManifestColumn] {
        match self.upload_info.as_mut() {
            Some(info) => info.manifest.parts.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Column names in manifest order.
    pub fn column_names(&self) -> Vec<&str> {
        self.parts().iter().map(|c| c.column_name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.parts().len()
    }

    /// Name of the data entry inside template and load archives.
    pub fn csv_entry_name(&self) -> String {
        csv_entry_name(&self.dataset_id)
    }

    pub fn is_complete(&self) -> bool {
        self.ensure_complete().is_ok()
    }

    /// Fails unless both template entries were present and the manifest has columns.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.upload_info.is_none() {
            return Err(SliError::precondition(format!(
                "manifest for {} is incomplete: template had no {MANIFEST_ENTRY}",
                self.dataset_id
            )));
        }
        if self.template_columns.is_none() {
            return Err(SliError::precondition(format!(
                "manifest for {} is incomplete: template had no {}",
                self.dataset_id,
                self.csv_entry_name()
            )));
        }
        if self.parts().is_empty() {
            return Err(SliError::precondition(format!(
                "manifest for {} has no columns",
                self.dataset_id
            )));
        }
        Ok(())
    }

    /// Switch every column to incremental mode. Applying it again changes nothing.
    pub fn set_incremental(&mut self) {
        for column in self.parts_mut() {
            column.mode = LoadMode::Incremental;
        }
    }

    /// Serialized `upload_info.json`.
    pub fn to_json(&self) -> Result<String> {
        self.ensure_complete()?;
        serde_json::to_string(&self.upload_info)
            .map_err(|e| SliError::packaging(&self.template_path, "cannot serialize manifest", e))
    }
}

pub fn csv_entry_name(dataset: &str) -> String {
    format!("{dataset}.csv")
}

/// Cache of parsed manifests keyed by `(project, dataset)`.
pub struct ManifestStore {
    temp_dir: PathBuf,
    cache: HashMap<(String, String), DatasetManifest>,
}

impl Default for ManifestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestStore {
    /// Templates are stored in the system temp directory.
    pub fn new() -> Self {
        Self::with_temp_dir(std::env::temp_dir())
    }

    pub fn with_temp_dir(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Download the SLI template of `dataset` in the working project and store it
    /// under a randomized name. Returns the local path.
    pub async fn fetch_template<H: HttpTransport>(
        &self,
        ctx: &SessionContext<H>,
        dataset: &str,
    ) -> Result<PathBuf> {
        let project = ctx.require_project()?;
        let response = ctx.get(&format!("{API_SLI}/{dataset}/template")).await?;

        let tmp = tempfile::Builder::new()
            .prefix(&format!("gdc-{project}-template-{dataset}-"))
            .suffix(".zip")
            .rand_bytes(6)
            .tempfile_in(&self.temp_dir)
            .map_err(|e| store_error(&self.temp_dir, e))?;
        let (mut file, path) = tmp.keep().map_err(|e| store_error(&self.temp_dir, e.error))?;
        file.write_all(&response.body)
            .map_err(|e| store_error(&path, e))?;

        info!(
            project,
            dataset,
            path = %path.display(),
            size = response.body.len(),
            "Downloaded SLI template"
        );
        Ok(path)
    }

    /// Read a downloaded template. Missing entries leave the manifest incomplete
    /// instead of failing here.
    pub fn parse_template(archive_path: &Path, dataset: &str) -> Result<DatasetManifest> {
        let file = File::open(archive_path).map_err(|e| {
            error!(path = %archive_path.display(), error = %e, "Cannot open SLI template");
            SliError::transport_with_source(
                format!("cannot open SLI template {}", archive_path.display()),
                e,
            )
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            error!(path = %archive_path.display(), error = %e, "SLI template is not a zip archive");
            SliError::transport_with_source(
                format!("SLI template {} is not a zip archive", archive_path.display()),
                e,
            )
        })?;
        let mut entry = |name: &str| {
            read_entry(&mut archive, name).map_err(|e| {
                SliError::transport_with_source(format!("cannot read {name} from SLI template"), e)
            })
        };

        let upload_info = match entry(MANIFEST_ENTRY)? {
            Some(bytes) => Some(serde_json::from_slice::<UploadInfo>(&bytes).map_err(|e| {
                error!(path = %archive_path.display(), error = %e, "Malformed SLI manifest");
                SliError::transport_with_source(format!("malformed {MANIFEST_ENTRY}"), e)
            })?),
            None => {
                warn!(dataset, "SLI template has no {MANIFEST_ENTRY}");
                None
            }
        };

        let csv_name = csv_entry_name(dataset);
        let template_columns = match entry(&csv_name)? {
            Some(bytes) => Some(parse_column_line(&String::from_utf8_lossy(&bytes))),
            None => {
                warn!(dataset, entry = %csv_name, "SLI template has no column file");
                None
            }
        };

        let manifest = DatasetManifest {
            dataset_id: dataset.to_string(),
            template_path: archive_path.to_path_buf(),
            upload_info,
            template_columns,
        };

        if let Some(columns) = &manifest.template_columns {
            let parts = manifest.column_names();
            if !parts.is_empty() && parts != columns.iter().map(String::as_str).collect::<Vec<_>>() {
                warn!(
                    dataset,
                    manifest = ?parts,
                    template = ?columns,
                    "Template column file disagrees with manifest; using manifest order"
                );
            }
        }
        debug!(dataset, columns = manifest.column_count(), "Parsed SLI template");
        Ok(manifest)
    }

    /// Fill `resolved_meta` of every column from the object its first `populates` entry names.
    pub async fn enrich_manifest<H: HttpTransport>(
        ctx: &SessionContext<H>,
        manifest: &mut DatasetManifest,
    ) -> Result<()> {
        let resolver = MetadataResolver::new(ctx);
        for column in manifest.parts_mut() {
            let identifier = column.populates.first().ok_or_else(|| {
                SliError::resolution(&column.column_name, "column populates no object")
            })?;
            let object = resolver.resolve_object(identifier).await?;
            debug!(
                column = %column.column_name,
                title = %object.meta.title,
                category = %object.meta.category,
                "Resolved column metadata"
            );
            column.resolved_meta = Some(ResolvedMeta::from(&object.meta));
        }
        Ok(())
    }

    /// Fetch, parse and enrich the template of `dataset`, then cache it for the working project.
    pub async fn read_sli_template<H: HttpTransport>(
        &mut self,
        ctx: &SessionContext<H>,
        dataset: &str,
    ) -> Result<&DatasetManifest> {
        let project = ctx.require_project()?.to_string();
        let path = self.fetch_template(ctx, dataset).await?;
        let mut manifest = Self::parse_template(&path, dataset)?;
        if manifest.upload_info.is_some() {
            Self::enrich_manifest(ctx, &mut manifest).await?;
        }
        info!(
            project = %project,
            dataset,
            columns = manifest.column_count(),
            complete = manifest.is_complete(),
            "SLI template read"
        );
        Ok(self.insert(project, manifest))
    }

    /// Cache a manifest under `(project, manifest.dataset_id)`, replacing any previous entry.
    pub fn insert(&mut self, project: impl Into<String>, manifest: DatasetManifest) -> &DatasetManifest {
        let key = (project.into(), manifest.dataset_id.clone());
        self.cache.insert(key.clone(), manifest);
        &self.cache[&key]
    }

    pub fn manifest(&self, project: &str, dataset: &str) -> Result<&DatasetManifest> {
        self.cache
            .get(&(project.to_string(), dataset.to_string()))
            .ok_or_else(|| missing_manifest(project, dataset))
    }

    pub fn manifest_mut(&mut self, project: &str, dataset: &str) -> Result<&mut DatasetManifest> {
        self.cache
            .get_mut(&(project.to_string(), dataset.to_string()))
            .ok_or_else(|| missing_manifest(project, dataset))
    }

    /// Switch the cached manifest to incremental mode.
    pub fn set_incremental(&mut self, project: &str, dataset: &str) -> Result<&DatasetManifest> {
        let manifest = self.manifest_mut(project, dataset)?;
        manifest.set_incremental();
        info!(project, dataset, "Manifest switched to INCREMENTAL mode");
        Ok(manifest)
    }

    pub fn column_count(&self, project: &str, dataset: &str) -> Result<usize> {
        Ok(self.manifest(project, dataset)?.column_count())
    }
}

fn missing_manifest(project: &str, dataset: &str) -> SliError {
    SliError::precondition(format!(
        "no manifest for dataset {dataset} in project {project}; call read_sli_template first"
    ))
}

fn store_error(path: &Path, e: std::io::Error) -> SliError {
    error!(path = %path.display(), error = %e, "Cannot store SLI template");
    SliError::transport_with_source(format!("cannot store SLI template in {}", path.display()), e)
}

fn parse_column_line(content: &str) -> Vec<String> {
    content
        .lines()
        .next()
        .unwrap_or_default()
        .split(',')
        .map(|name| name.trim().trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_column_line_takes_first_line_only() {
        assert_eq!(
            parse_column_line("f_a.nm_name,f_a.f_amount\r\nignored"),
            vec!["f_a.nm_name".to_string(), "f_a.f_amount".to_string()]
        );
    }

    #[test]
    fn load_mode_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&LoadMode::Incremental).unwrap(), "\"INCREMENTAL\"");
        assert_eq!(serde_json::from_str::<LoadMode>("\"FULL\"").unwrap(), LoadMode::Full);
    }
}
