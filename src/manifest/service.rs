//! Manifest download
//!
//! Fetches the manifest index, downloads the requested tables in
//! parallel, and assembles them into [`ManifestDefinitions`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value;

use super::definitions::{ManifestDefinitions, TableName};
use crate::api::{ApiClient, ApiError, Fetcher, HttpRequest, ServiceError};

pub const MANIFEST_PATH: &str = "/Platform/Destiny2/Manifest/";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to load manifest index: {0}")]
    Index(#[from] ServiceError),

    #[error("manifest has no content for language '{0}'")]
    Language(String),

    #[error("manifest has no path for table {0}")]
    MissingTable(TableName),

    /// Every cache-busting attempt failed; `source` is the first failure.
    #[error("failed to download {table} from {url}: {source}")]
    Download {
        table: TableName,
        url: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to decode {table}: {source}")]
    Decode {
        table: TableName,
        #[source]
        source: serde_json::Error,
    },
}

/// Response of `Destiny2/Manifest`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestIndex {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub json_world_component_content_paths: HashMap<String, HashMap<String, String>>,
}

/// Suffixes tried in order to get past stale edge-cache entries.
pub fn cache_busters() -> [String; 3] {
    [String::new(), "?bust".to_string(), format!("?bust-{}", random_digits())]
}

fn random_digits() -> String {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf).to_string(),
        Err(_) => "cacheBust".to_string(),
    }
}

pub struct ManifestService {
    api: ApiClient,
    fetcher: Arc<dyn Fetcher>,
    language: String,
}

impl ManifestService {
    /// `api` loads the index; `fetcher` downloads the table blobs.
    pub fn new(api: ApiClient, fetcher: Arc<dyn Fetcher>, language: impl Into<String>) -> Self {
        Self {
            api,
            fetcher,
            language: language.into(),
        }
    }

    pub async fn get_manifest_index(&self) -> Result<ManifestIndex, ManifestError> {
        Ok(self.api.get(MANIFEST_PATH, &[]).await?)
    }

    /// Download `tables` and build lookup tables from them.
    ///
    /// All-or-nothing: the first table that cannot be loaded fails the
    /// whole batch.
    pub async fn get_manifest_definitions(
        &self,
        tables: &[TableName],
    ) -> Result<ManifestDefinitions, ManifestError> {
        let index = self.get_manifest_index().await?;
        tracing::info!(version = %index.version, tables = tables.len(), "Loading manifest");

        let paths = index
            .json_world_component_content_paths
            .get(&self.language)
            .ok_or_else(|| ManifestError::Language(self.language.clone()))?;

        let wanted: BTreeSet<TableName> = tables.iter().copied().collect();
        let downloads = wanted.iter().map(|&table| async move {
            let path = paths
                .get(&table.component_key())
                .ok_or(ManifestError::MissingTable(table))?;
            let blob = self.download_table(table, path).await?;
            Ok::<_, ManifestError>((table, blob))
        });
        let blobs = try_join_all(downloads).await?;

        let mut defs = ManifestDefinitions::default();
        for (table, blob) in blobs {
            defs.insert_blob(table, blob)
                .map_err(|source| ManifestError::Decode { table, source })?;
        }
        Ok(defs)
    }

    /// Try the table URL with each cache buster until one returns OK with a
    /// JSON body.
    async fn download_table(&self, table: TableName, path: &str) -> Result<Value, ManifestError> {
        let mut first_error: Option<(String, ApiError)> = None;

        for suffix in cache_busters() {
            let url = format!("{}{}{}", self.api.base_url(), path, suffix);
            let failure = match self.fetcher.fetch(HttpRequest::get(url.clone())).await {
                Ok(resp) if resp.is_ok() => match resp.json() {
                    Ok(body) => {
                        tracing::debug!(%table, %url, bytes = resp.body.len(), "Downloaded table");
                        return Ok(body);
                    }
                    Err(e) => ApiError::Parse(e.to_string()),
                },
                Ok(resp) => ApiError::HttpStatus {
                    status: i32::from(resp.status),
                    status_text: resp.status_text.clone(),
                },
                Err(e) => e,
            };
            tracing::debug!(%table, %url, "Table download attempt failed: {}", failure);
            first_error.get_or_insert((url, failure));
        }

        let (url, source) = first_error.unwrap_or_else(|| {
            (
                path.to_string(),
                ApiError::Internal("no download attempts were made".to_string()),
            )
        });
        tracing::warn!(%table, %url, "Giving up on table: {}", source);
        Err(ManifestError::Download { table, url, source })
    }
}
