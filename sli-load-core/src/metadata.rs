//! Metadata lookups: projects, datasets, and identifier → object resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::contract::HttpTransport;
use crate::error::{Result, SliError};
use crate::session::{project_path, SessionContext, API_DATASETS, API_ID_TO_URI, API_MD};

/// The `meta` block every platform object carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub title: String,
    pub uri: String,
    #[serde(default)]
    pub category: String,
    pub identifier: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A resolved platform object, e.g. `{"attribute": {"meta": {..}, "content": {..}}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    /// The single top-level key (`attribute`, `fact`, `attributeDisplayForm`, ...).
    pub kind: String,
    pub meta: ObjectMeta,
    pub raw: Value,
}

impl ObjectMetadata {
    pub fn from_json(identifier: &str, raw: Value) -> Result<Self> {
        let (kind, inner) = raw
            .as_object()
            .and_then(|object| object.iter().next())
            .ok_or_else(|| SliError::resolution(identifier, "object body is not a JSON object"))?;
        let meta_value = inner
            .get("meta")
            .cloned()
            .ok_or_else(|| SliError::resolution(identifier, format!("{kind} has no meta block")))?;
        let meta: ObjectMeta = serde_json::from_value(meta_value).map_err(|e| {
            SliError::resolution(identifier, format!("malformed meta block: {e}"))
        })?;
        Ok(Self {
            kind: kind.clone(),
            meta,
            raw,
        })
    }
}

/// One entry of the project list, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectLink {
    pub identifier: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
struct IdentifierToUri {
    identifiers: Vec<IdentifierUri>,
}

#[derive(Deserialize)]
struct IdentifierUri {
    uri: String,
}

#[derive(Deserialize)]
struct MetadataRoot {
    about: About,
}

#[derive(Deserialize)]
struct About {
    #[serde(default)]
    links: Vec<ProjectLink>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataSetsResponse {
    data_sets_info: DataSetsInfo,
}

#[derive(Deserialize)]
struct DataSetsInfo {
    #[serde(default)]
    sets: Vec<Value>,
}

pub struct MetadataResolver<'a, H> {
    ctx: &'a SessionContext<H>,
}

impl<'a, H: HttpTransport> MetadataResolver<'a, H> {
    pub fn new(ctx: &'a SessionContext<H>) -> Self {
        Self { ctx }
    }

    /// Resolve an identifier to its URI, then fetch the object behind it.
    pub async fn resolve_object(&self, identifier: &str) -> Result<ObjectMetadata> {
        debug!(identifier, "Resolving object identifier");
        let lookup: IdentifierToUri = self
            .ctx
            .post_json(API_ID_TO_URI, json!({ "identifierToUri": [identifier] }))
            .await?;

        let uri = match lookup.identifiers.into_iter().next() {
            Some(entry) if !entry.uri.is_empty() => entry.uri,
            _ => {
                error!(identifier, "Identifier has no URI");
                return Err(SliError::resolution(identifier, "identifier has no URI"));
            }
        };

        let raw: Value = self.ctx.get_json(&uri).await?;
        let object = ObjectMetadata::from_json(identifier, raw)?;
        debug!(identifier, uri = %object.meta.uri, kind = %object.kind, "Resolved object");
        Ok(object)
    }

    /// Projects available to the logged-in user, in server order.
    pub async fn list_projects(&self) -> Result<Vec<ProjectLink>> {
        let root: MetadataRoot = self.ctx.get_json(API_MD).await?;
        info!(count = root.about.links.len(), "Listed projects");
        Ok(root.about.links)
    }

    /// Datasets of `project`, keyed by dataset identifier. Values are the raw dataset objects.
    pub async fn list_datasets(&self, project: &str) -> Result<BTreeMap<String, Value>> {
        let path = project_path(API_DATASETS, project);
        let response: DataSetsResponse = self.ctx.get_json(&path).await?;

        let mut datasets = BTreeMap::new();
        for set in response.data_sets_info.sets {
            let identifier = set
                .pointer("/meta/identifier")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    error!(path = %path, "Dataset entry without meta.identifier");
                    SliError::transport(format!("dataset entry without meta.identifier in {path}"))
                })?;
            datasets.insert(identifier, set);
        }
        info!(project, count = datasets.len(), "Listed datasets");
        Ok(datasets)
    }
}
