use std::collections::HashMap;

use assert_matches::assert_matches;
use mockito::{Matcher, Server};
use serde_json::{Value, json};

use arcgis_catalog::arcgis::JsonFetcher;
use arcgis_catalog::config::CatalogConfig;
use arcgis_catalog::connector::ArcgisConnector;
use arcgis_catalog::error::CatalogError;

const BASE: &str = "https://example.com/arcgis/rest/services";

#[derive(Default)]
struct StaticCatalog {
    responses: HashMap<String, Value>,
}

impl StaticCatalog {
    fn with(mut self, url: &str, body: Value) -> Self {
        self.responses.insert(url.to_string(), body);
        self
    }
}

impl JsonFetcher for StaticCatalog {
    fn get_json(&self, url: &str, _query: &[(&str, &str)]) -> Result<Value, CatalogError> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| CatalogError::Http(format!("unexpected request to {url}")))
    }
}

fn catalog() -> StaticCatalog {
    StaticCatalog::default()
        .with(
            BASE,
            json!({
                "folders": ["Env"],
                "services": [
                    { "name": "City", "type": "MapServer" },
                    { "name": "Edits", "type": "FeatureServer" }
                ]
            }),
        )
        .with(
            &format!("{BASE}/Env"),
            json!({
                "folders": ["Water"],
                "services": [{ "name": "Env/Empty", "type": "MapServer" }]
            }),
        )
        .with(
            &format!("{BASE}/Env/Water"),
            json!({ "services": [{ "name": "Env/Water/Rivers", "type": "MapServer" }] }),
        )
        .with(
            &format!("{BASE}/City/MapServer"),
            json!({
                "description": "City basemap",
                "layers": [
                    { "id": 0, "name": "Transport", "type": "Group Layer", "parentLayerId": -1 },
                    { "id": 1, "name": "Bus stops", "type": "Feature Layer", "parentLayerId": 0 }
                ]
            }),
        )
        .with(&format!("{BASE}/Env/Empty/MapServer"), json!({ "layers": [] }))
        .with(
            &format!("{BASE}/Env/Water/Rivers/MapServer"),
            json!({
                "layers": [
                    { "id": 3, "name": "Rivers", "type": "Feature Layer", "parentLayerId": -1 }
                ]
            }),
        )
}

#[test]
fn datasets_walk_folders_and_keep_map_services_with_layers() {
    let connector = ArcgisConnector::new(CatalogConfig::new(BASE), catalog());
    let datasets = connector.list_datasets().unwrap();

    assert_eq!(datasets.count, 2);
    let ids: Vec<&str> = datasets.results.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["City", "Env/Water/Rivers"]);

    let city = &datasets.results[0];
    assert_eq!(city.title, "City (MapServer)");
    assert_eq!(city.origin, format!("{BASE}/City/MapServer"));
    assert_eq!(city.resources.len(), 1);
    assert_eq!(city.resources[0].id, "City-1");
    assert_eq!(city.resources[0].title, "Transport - Bus stops");
}

#[test]
fn dataset_lookup_adds_description() {
    let connector = ArcgisConnector::new(CatalogConfig::new(BASE), catalog());

    let city = connector.get_dataset("City").unwrap().unwrap();
    assert_eq!(city.description.as_deref(), Some("City basemap"));

    assert!(connector.get_dataset("Nope").unwrap().is_none());
}

#[test]
fn prepare_checks_the_catalog_with_secret_headers() {
    let mut server = Server::new();
    let root = server
        .mock("GET", "/arcgis/rest/services")
        .match_query(Matcher::UrlEncoded("f".into(), "json".into()))
        .match_header("x-esri-authorization", "Bearer secret-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "currentVersion": 11.1, "folders": [] }).to_string())
        .create();

    let mut config = CatalogConfig::new(format!("{}/arcgis/rest/services", server.url()));
    config.secrets.insert(
        "X-Esri-Authorization".to_string(),
        "Bearer secret-token".to_string(),
    );
    let connector = ArcgisConnector::from_config(config).unwrap();

    connector.prepare().unwrap();
    root.assert();
}

#[test]
fn prepare_reports_unreachable_catalog() {
    let mut server = Server::new();
    let _missing = server
        .mock("GET", "/arcgis/rest/services")
        .match_query(Matcher::Any)
        .with_status(404)
        .create();

    let config = CatalogConfig::new(format!("{}/arcgis/rest/services", server.url()));
    let connector = ArcgisConnector::from_config(config).unwrap();

    let err = connector.prepare().unwrap_err();
    assert_matches!(err, CatalogError::Unreachable(_));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let err = ArcgisConnector::from_config(CatalogConfig::new("")).err().unwrap();
    assert_matches!(err, CatalogError::InvalidConfig(_));
}

#[test]
fn listing_surfaces_error_bodies_sent_with_status_ok() {
    let mut server = Server::new();
    let _root = server
        .mock("GET", "/arcgis/rest/services")
        .match_query(Matcher::UrlEncoded("f".into(), "json".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": { "code": 499, "message": "Token Required", "details": [] }
            })
            .to_string(),
        )
        .create();

    let config = CatalogConfig::new(format!("{}/arcgis/rest/services", server.url()));
    let connector = ArcgisConnector::from_config(config).unwrap();

    let err = connector.list(None).unwrap_err();
    assert_matches!(
        err,
        CatalogError::Service { code: 499, ref message, .. } if message == "Token Required"
    );
    assert!(err.to_string().contains("Token Required"));
}
