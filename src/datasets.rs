//! Flat dataset view of a catalog: every map service is one dataset and each
//! of its non-group layers is a downloadable resource.

use tracing::debug;

use crate::arcgis::JsonFetcher;
use crate::cache::FetchCache;
use crate::domain::{
    Dataset, DatasetList, DatasetResource, GEOJSON_FORMAT, GEOJSON_MIME_TYPE, GROUP_LAYER,
    LayerDescriptor, MAP_SERVER, RemoteNode, ServiceDescriptor,
};
use crate::error::CatalogError;
use crate::resolver::service_url;

pub struct DatasetIndex<'a, F: JsonFetcher> {
    cache: &'a FetchCache<F>,
    base_url: &'a str,
}

impl<'a, F: JsonFetcher> DatasetIndex<'a, F> {
    pub fn new(cache: &'a FetchCache<F>, base_url: &'a str) -> Self {
        Self { cache, base_url }
    }

    /// Services of the root listing followed by those of every folder,
    /// sub-folders walked depth-first.
    pub fn list_services(&self) -> Result<Vec<ServiceDescriptor>, CatalogError> {
        let root = self.fetch_node(self.base_url)?;
        let mut services = root.services.unwrap_or_default();
        for folder in root.folders.unwrap_or_default() {
            services.extend(self.list_services_in_folder(&folder)?);
        }
        Ok(services)
    }

    fn list_services_in_folder(&self, folder: &str) -> Result<Vec<ServiceDescriptor>, CatalogError> {
        let url = format!("{}/{folder}", self.base_url.trim_end_matches('/'));
        let node = self.fetch_node(&url)?;
        let mut services = node.services.unwrap_or_default();
        for sub_folder in node.folders.unwrap_or_default() {
            services.extend(self.list_services_in_folder(&format!("{folder}/{sub_folder}"))?);
        }
        Ok(services)
    }

    pub fn list_datasets(&self) -> Result<DatasetList, CatalogError> {
        let mut results = Vec::new();
        for service in self.list_services()? {
            if service.service_type != MAP_SERVER {
                continue;
            }
            let origin = service_url(self.base_url, &service);
            let node = self.fetch_node(&origin)?;
            let layers = node.layers.unwrap_or_default();
            if layers.is_empty() {
                debug!(service = service.name.as_str(), "no layers, skipped");
                continue;
            }

            let resources = layers
                .iter()
                .filter(|layer| layer.layer_type != GROUP_LAYER)
                .map(|layer| dataset_resource(&service, &origin, layer, &layers))
                .collect();
            results.push(Dataset {
                id: service.name.clone(),
                title: service.title(),
                origin,
                description: None,
                resources,
            });
        }

        Ok(DatasetList {
            count: results.len(),
            results,
        })
    }

    /// One dataset by id, with the service description filled in.
    pub fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>, CatalogError> {
        let Some(mut dataset) = self
            .list_datasets()?
            .results
            .into_iter()
            .find(|dataset| dataset.id == dataset_id)
        else {
            return Ok(None);
        };
        dataset.description = self.fetch_node(&dataset.origin)?.description;
        Ok(Some(dataset))
    }

    fn fetch_node(&self, url: &str) -> Result<RemoteNode, CatalogError> {
        let raw = self.cache.fetch(url)?;
        serde_json::from_value(raw).map_err(|err| CatalogError::Malformed {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

fn dataset_resource(
    service: &ServiceDescriptor,
    service_url: &str,
    layer: &LayerDescriptor,
    siblings: &[LayerDescriptor],
) -> DatasetResource {
    let parent = (!layer.is_top_level())
        .then(|| {
            siblings
                .iter()
                .find(|candidate| candidate.id.to_string() == layer.parent_layer_id.to_string())
        })
        .flatten();
    let title = match parent {
        Some(parent) => format!("{} - {}", parent.name, layer.name),
        None => layer.name.clone(),
    };

    DatasetResource {
        id: format!("{}-{}", service.name, layer.id),
        title,
        url: format!(
            "{service_url}/{}/query?f=geojson&outFields=*&where=shape+is+not+null",
            layer.id
        ),
        format: GEOJSON_FORMAT.to_string(),
        mime_type: GEOJSON_MIME_TYPE.to_string(),
    }
}
