use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::arcgis::JsonFetcher;
use crate::cache::FetchCache;
use crate::domain::{LayerMetadata, Resource, is_downloadable_layer};
use crate::error::CatalogError;
use crate::store;

/// Records requested per feature query; the usual server-side `maxRecordCount`.
pub const PAGE_SIZE: usize = 1000;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s/\\]").expect("valid filename regex"));

/// Downloads a feature or annotation layer as a single GeoJSON file.
pub struct ResourceExtractor<'a, F: JsonFetcher> {
    cache: &'a FetchCache<F>,
}

impl<'a, F: JsonFetcher> ResourceExtractor<'a, F> {
    pub fn new(cache: &'a FetchCache<F>) -> Self {
        Self { cache }
    }

    pub fn get_resource(
        &self,
        resource_url: &str,
        destination_dir: &Utf8Path,
    ) -> Result<Resource, CatalogError> {
        let mut resource = self.fetch_metadata(resource_url)?;
        let file_path = self.download(resource_url, &resource.title, destination_dir)?;
        resource.file_path = file_path.to_string();
        Ok(resource)
    }

    /// Reads `<layer>?f=json` and rejects anything that is not a feature or
    /// annotation layer.
    pub fn fetch_metadata(&self, resource_url: &str) -> Result<Resource, CatalogError> {
        debug!(resource_url, "fetching metadata");
        let raw = self.cache.fetch(resource_url)?;

        // services and folders lack id/name, so the type is checked on the raw body
        let layer_type = raw.get("type").and_then(Value::as_str).unwrap_or_default();
        if !is_downloadable_layer(layer_type) {
            warn!(
                resource_url,
                layer_type,
                "refusing to download unsupported layer type"
            );
            let layer_type = if layer_type.is_empty() {
                "none".to_string()
            } else {
                layer_type.to_string()
            };
            return Err(CatalogError::UnsupportedResourceType(layer_type));
        }

        let metadata: LayerMetadata =
            serde_json::from_value(raw).map_err(|err| CatalogError::Malformed {
                url: resource_url.to_string(),
                message: err.to_string(),
            })?;

        let mut resource =
            Resource::geojson(resource_url.to_string(), metadata.resource_title());
        resource.description = metadata.description;
        Ok(resource)
    }

    fn download(
        &self,
        resource_url: &str,
        title: &str,
        destination_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, CatalogError> {
        debug!(resource_url, "fetch and download data");
        let collection = self
            .collect_pages(resource_url)
            .map_err(|err| CatalogError::Download {
                url: resource_url.to_string(),
                message: err.to_string(),
            })?;

        let file_path = destination_dir.join(format!("{}.geojson", sanitize_file_name(title)));
        let content = serde_json::to_vec(&collection)
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        store::write_bytes_atomic(&file_path, &content)?;
        info!(resource_url, path = %file_path, bytes = content.len(), "resource written");
        Ok(file_path)
    }

    fn collect_pages(&self, resource_url: &str) -> Result<Value, CatalogError> {
        let query_url = format!("{resource_url}/query");
        let page_size = PAGE_SIZE.to_string();
        let mut pages = PageAccumulator::default();
        let mut offset = 0usize;

        loop {
            let offset_param = offset.to_string();
            let page = self.cache.query(
                &query_url,
                &[
                    ("where", "1=1"),
                    ("f", "geojson"),
                    ("outFields", "*"),
                    ("resultOffset", offset_param.as_str()),
                    ("resultRecordCount", page_size.as_str()),
                ],
            )?;
            let truncated = pages.push(page);
            debug!(offset, truncated, total = pages.len(), "page received");
            if !truncated {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(pages.finish())
    }
}

/// Merges feature query pages: features are concatenated in arrival order,
/// every other top-level key comes from the first page.
#[derive(Debug, Default)]
pub struct PageAccumulator {
    template: Option<Map<String, Value>>,
    features: Vec<Value>,
}

impl PageAccumulator {
    /// Adds one page and returns whether the server truncated it.
    pub fn push(&mut self, page: Value) -> bool {
        let truncated = exceeded_transfer_limit(&page);
        let Value::Object(mut object) = page else {
            return truncated;
        };
        // take() leaves the key in place so `features` serializes where the server put it
        if let Some(Value::Array(features)) = object.get_mut("features").map(Value::take) {
            self.features.extend(features);
        }
        if self.template.is_none() {
            object
                .entry("features")
                .or_insert_with(|| Value::Array(Vec::new()));
            self.template = Some(object);
        }
        truncated
    }

    fn len(&self) -> usize {
        self.features.len()
    }

    pub fn finish(self) -> Value {
        let mut collection = self.template.unwrap_or_default();
        collection.insert("features".to_string(), Value::Array(self.features));
        Value::Object(collection)
    }
}

/// `exceededTransferLimit` at the top level, or under `properties` as ArcGIS
/// writes it in `f=geojson` output.
pub fn exceeded_transfer_limit(page: &Value) -> bool {
    page.get("exceededTransferLimit")
        .or_else(|| page.get("properties")?.get("exceededTransferLimit"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn sanitize_file_name(title: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(title, "_").into_owned()
}
