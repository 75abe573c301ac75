use crate::error::{Error, Result};
use crate::package::PackageDescriptor;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// The usable subset of a fetched index.
#[derive(Debug, Clone, Default)]
pub struct IndexListing {
    pub total_entries: usize,
    pub packages: Vec<PackageDescriptor>,
    pub skipped: usize,
}

pub struct PackageIndexClient {
    client: Client,
    url: String,
    cache_path: Option<PathBuf>,
}

impl PackageIndexClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("uot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            cache_path: None,
        })
    }

    /// Keep a copy of every successfully fetched index at `path`.
    pub fn with_cache(mut self, path: PathBuf) -> Self {
        self.cache_path = Some(path);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One request, no retries: fetch failures and malformed JSON are returned as-is.
    pub async fn fetch_index(&self) -> Result<IndexListing> {
        let fetch_error = |reason: String| Error::IndexFetch {
            url: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let listing = parse_index(&body)?;
        tracing::debug!(
            "Loaded index with {} entries ({} usable)",
            listing.total_entries,
            listing.packages.len()
        );

        self.persist(&body).await;
        Ok(listing)
    }

    async fn persist(&self, body: &str) {
        let Some(path) = &self.cache_path else {
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Could not create index cache directory {:?}: {}", parent, e);
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, body).await {
            tracing::warn!("Could not cache index at {:?}: {}", path, e);
        }
    }
}

pub fn parse_index(body: &str) -> Result<IndexListing> {
    let value: Value = serde_json::from_str(body).map_err(|e| Error::IndexParse(e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(Error::IndexParse("expected a JSON array".to_string()));
    };

    let mut listing = IndexListing {
        total_entries: entries.len(),
        ..Default::default()
    };

    for (idx, entry) in entries.into_iter().enumerate() {
        match descriptor_from(entry) {
            Some(descriptor) => listing.packages.push(descriptor),
            None => {
                tracing::info!("[SKIP] Entry {} is empty or missing code/package_version", idx);
                listing.skipped += 1;
            }
        }
    }

    Ok(listing)
}

fn descriptor_from(entry: Value) -> Option<PackageDescriptor> {
    let object = entry.as_object()?;
    let field = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(PackageDescriptor {
        code: field("code")?,
        package_version: field("package_version")?,
    })
}
