use camino::Utf8Path;
use tracing::{info, warn};

use crate::arcgis::{ArcgisHttpClient, JsonFetcher};
use crate::cache::FetchCache;
use crate::config::CatalogConfig;
use crate::datasets::DatasetIndex;
use crate::domain::{Dataset, DatasetList, ListResult, Resource};
use crate::error::CatalogError;
use crate::extractor::ResourceExtractor;
use crate::resolver::CatalogResolver;

/// Entry point for a host: one catalog configuration and the response cache
/// shared by every browse and download call made through it.
pub struct ArcgisConnector<F: JsonFetcher> {
    config: CatalogConfig,
    cache: FetchCache<F>,
}

impl ArcgisConnector<ArcgisHttpClient> {
    pub fn from_config(config: CatalogConfig) -> Result<Self, CatalogError> {
        config.validate()?;
        let client = ArcgisHttpClient::new(&config)?;
        Ok(Self::new(config, client))
    }
}

impl<F: JsonFetcher> ArcgisConnector<F> {
    pub fn new(config: CatalogConfig, fetcher: F) -> Self {
        Self::with_cache(config, FetchCache::new(fetcher))
    }

    pub fn with_cache(config: CatalogConfig, cache: FetchCache<F>) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Validates the configuration and checks that the catalog answers.
    pub fn prepare(&self) -> Result<(), CatalogError> {
        self.config.validate()?;
        if let Err(err) = self.cache.query(&self.config.url, &[("f", "json")]) {
            warn!(url = self.config.url.as_str(), error = %err, "catalog check failed");
            return Err(CatalogError::Unreachable(format!("{}: {err}", self.config.url)));
        }
        info!(url = self.config.url.as_str(), "catalog reachable");
        Ok(())
    }

    pub fn list(&self, current_folder: Option<&str>) -> Result<ListResult, CatalogError> {
        CatalogResolver::new(&self.cache, &self.config.url).list(current_folder)
    }

    pub fn get_resource(
        &self,
        resource_id: &str,
        destination_dir: &Utf8Path,
    ) -> Result<Resource, CatalogError> {
        ResourceExtractor::new(&self.cache).get_resource(resource_id, destination_dir)
    }

    pub fn list_datasets(&self) -> Result<DatasetList, CatalogError> {
        DatasetIndex::new(&self.cache, &self.config.url).list_datasets()
    }

    pub fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>, CatalogError> {
        DatasetIndex::new(&self.cache, &self.config.url).get_dataset(dataset_id)
    }
}
