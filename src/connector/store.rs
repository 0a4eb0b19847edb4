//! File path connector backed by `object_store` (local, S3, R2, GCS, Azure)

use super::types::{DataConnector, ListContext};
use crate::asset::{AssetSource, DataAsset};
use crate::error::{Error, Result};
use crate::partition::{Location, Partition, Partitioner};
use crate::types::ConnectorFamily;
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::fmt;
use std::sync::Arc;

/// Connector listing files under a base URL
#[derive(Clone)]
pub struct ObjectStoreConnector {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket/container
    prefix: String,
    /// URL root used to build absolute locations (e.g. `s3://bucket`)
    root: String,
    /// URL scheme for logging
    scheme: String,
}

impl fmt::Debug for ObjectStoreConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreConnector")
            .field("root", &self.root)
            .field("prefix", &self.prefix)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

/// Split `bucket/some/prefix` into (`bucket`, `some/prefix`)
fn split_bucket(without_scheme: &str) -> (&str, String) {
    match without_scheme.find('/') {
        Some(idx) => (
            &without_scheme[..idx],
            without_scheme[idx + 1..].trim_matches('/').to_string(),
        ),
        None => (without_scheme, String::new()),
    }
}

impl ObjectStoreConnector {
    /// Parse a base URL and create the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/path/` - AWS S3
    /// - `r2://bucket/path/` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path/` - Google Cloud Storage
    /// - `az://container/path/` - Azure Blob Storage
    /// - `memory://` - In-memory store (tests)
    /// - `/local/path/`, `./path/` or `file:///path` - Local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if url.starts_with("s3://") {
            Self::parse_s3(url, false)
        } else if url.starts_with("r2://") {
            Self::parse_s3(url, true)
        } else if url.starts_with("gs://") {
            Self::parse_gcs(url)
        } else if url.starts_with("az://") {
            Self::parse_azure(url)
        } else if url.starts_with("memory://") {
            Ok(Self::new(Arc::new(InMemory::new()), "memory", "memory://", ""))
        } else {
            Self::parse_local(url)
        }
    }

    /// Wrap an existing store
    pub fn new(
        store: Arc<dyn ObjectStore>,
        scheme: impl Into<String>,
        root: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        let root = root.into();
        // A bare `scheme://` root keeps its separator
        let root = if root.ends_with("://") {
            root
        } else {
            root.trim_end_matches('/').to_string()
        };

        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            root,
            scheme: scheme.into(),
        }
    }

    /// Parse S3 or R2 URL
    fn parse_s3(url: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let without_scheme = url
            .strip_prefix(&format!("{scheme}://"))
            .ok_or_else(|| Error::config(format!("Invalid {scheme} URL: {url}")))?;
        let (bucket, prefix) = split_bucket(without_scheme);

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // AWS_ENDPOINT is read by from_env(); R2 also honours R2_ENDPOINT_URL
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::connection(url, format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self::new(
            Arc::new(store),
            scheme,
            format!("{scheme}://{bucket}"),
            prefix,
        ))
    }

    /// Parse GCS URL
    fn parse_gcs(url: &str) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("gs://")
            .ok_or_else(|| Error::config(format!("Invalid GCS URL: {url}")))?;
        let (bucket, prefix) = split_bucket(without_scheme);

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::connection(url, format!("Failed to create GCS client: {e}")))?;

        Ok(Self::new(
            Arc::new(store),
            "gs",
            format!("gs://{bucket}"),
            prefix,
        ))
    }

    /// Parse Azure Blob URL
    fn parse_azure(url: &str) -> Result<Self> {
        let without_scheme = url
            .strip_prefix("az://")
            .ok_or_else(|| Error::config(format!("Invalid Azure URL: {url}")))?;
        let (container, prefix) = split_bucket(without_scheme);

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::connection(url, format!("Failed to create Azure client: {e}")))?;

        Ok(Self::new(
            Arc::new(store),
            "az",
            format!("az://{container}"),
            prefix,
        ))
    }

    /// Parse local filesystem path
    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        if !std::path::Path::new(path).is_dir() {
            return Err(Error::connection(
                path,
                "base directory does not exist or is not a directory",
            ));
        }

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::connection(path, format!("Failed to open local store: {e}")))?;

        Ok(Self::new(Arc::new(store), "file", path, ""))
    }

    /// Get the scheme (s3, r2, gs, az, memory, file)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Check if this is a cloud store (not local or in-memory)
    pub fn is_cloud(&self) -> bool {
        !matches!(self.scheme.as_str(), "file" | "memory")
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Join the base prefix with an asset prefix
    fn listing_prefix(&self, asset_prefix: &str) -> String {
        let asset_prefix = asset_prefix.trim_matches('/');
        match (self.prefix.is_empty(), asset_prefix.is_empty()) {
            (true, _) => asset_prefix.to_string(),
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}/{asset_prefix}", self.prefix),
        }
    }

    /// Absolute location string for an object path
    fn location_for(&self, path: &ObjectPath) -> String {
        if self.root.ends_with("://") {
            format!("{}{path}", self.root)
        } else {
            format!("{}/{path}", self.root)
        }
    }

    /// List object paths under `prefix`, relative names in lexicographic order
    async fn list_names(&self, prefix: &str, recursive: bool) -> Result<Vec<(String, ObjectPath)>> {
        let prefix_path = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));

        let objects: Vec<ObjectPath> = if recursive {
            self.store
                .list(prefix_path.as_ref())
                .map_ok(|meta| meta.location)
                .try_collect::<Vec<_>>()
                .await
        } else {
            self.store
                .list_with_delimiter(prefix_path.as_ref())
                .await
                .map(|listing| {
                    listing
                        .objects
                        .into_iter()
                        .map(|meta| meta.location)
                        .collect::<Vec<_>>()
                })
        }
        .map_err(|e| Error::connection(self.describe(), e.to_string()))?;

        let strip = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };

        let mut names: Vec<(String, ObjectPath)> = objects
            .into_iter()
            .map(|path| {
                let relative = path
                    .as_ref()
                    .strip_prefix(strip.as_str())
                    .unwrap_or(path.as_ref())
                    .to_string();
                (relative, path)
            })
            .collect();
        names.sort_by(|a, b| a.1.as_ref().cmp(b.1.as_ref()));

        Ok(names)
    }
}

#[async_trait]
impl DataConnector for ObjectStoreConnector {
    fn family(&self) -> ConnectorFamily {
        ConnectorFamily::FilePath
    }

    fn describe(&self) -> String {
        match (self.prefix.is_empty(), self.root.ends_with("://")) {
            (true, _) => self.root.clone(),
            (false, true) => format!("{}{}", self.root, self.prefix),
            (false, false) => format!("{}/{}", self.root, self.prefix),
        }
    }

    async fn check(&self) -> Result<()> {
        let prefix = (!self.prefix.is_empty()).then(|| ObjectPath::from(self.prefix.as_str()));
        self.store
            .list_with_delimiter(prefix.as_ref())
            .await
            .map_err(|e| Error::connection(self.describe(), e.to_string()))?;
        Ok(())
    }

    async fn list_partitions(
        &self,
        asset: &DataAsset,
        partitioner: Option<&Partitioner>,
        ctx: &ListContext,
    ) -> Result<Vec<Partition>> {
        let AssetSource::Files { prefix, recursive } = asset.source() else {
            return Err(Error::config(format!(
                "Asset '{}' is not a file asset and cannot be listed from {}",
                asset.name(),
                self.describe()
            )));
        };

        let file_partitioner = match partitioner {
            Some(Partitioner::File(p)) => p,
            Some(Partitioner::Column(_)) => {
                return Err(Error::config(format!(
                    "Asset '{}': column partitioners are not valid for file assets",
                    asset.name()
                )))
            }
            None => {
                return Err(Error::config(format!(
                    "Asset '{}' has no partitioner configured",
                    asset.name()
                )))
            }
        };

        let listing_prefix = self.listing_prefix(prefix);
        tracing::debug!(
            "Listing {} under '{}' for asset {}",
            self.describe(),
            listing_prefix,
            asset.name()
        );

        let names = ctx.run(self.list_names(&listing_prefix, *recursive)).await?;
        let candidates = names.len();

        let partitions: Vec<Partition> = names
            .into_iter()
            .filter_map(|(name, path)| {
                file_partitioner
                    .extract(&name)
                    .map(|key| Partition::new(Location::Path(self.location_for(&path)), key))
            })
            .collect();

        tracing::debug!(
            "Asset {}: {} of {} candidates matched '{}'",
            asset.name(),
            partitions.len(),
            candidates,
            file_partitioner.pattern().as_str()
        );

        Ok(partitions)
    }
}
