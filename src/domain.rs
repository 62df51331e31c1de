use std::fmt;

use serde::{Deserialize, Serialize};

pub const FEATURE_SERVER: &str = "FeatureServer";
pub const MAP_SERVER: &str = "MapServer";

pub const GROUP_LAYER: &str = "Group Layer";
pub const FEATURE_LAYER: &str = "Feature Layer";
pub const ANNOTATION_LAYER: &str = "Annotation Layer";

pub const GEOJSON_FORMAT: &str = "geojson";
pub const GEOJSON_MIME_TYPE: &str = "application/geo+json";

/// Segments that name a service type at the end of a service URL.
pub fn is_service_marker(segment: &str) -> bool {
    segment == FEATURE_SERVER || segment == MAP_SERVER
}

pub fn is_downloadable_layer(layer_type: &str) -> bool {
    layer_type == FEATURE_LAYER || layer_type == ANNOTATION_LAYER
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub origin: String,
    pub format: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource {
    pub fn geojson(id: String, title: String) -> Self {
        Self {
            origin: id.clone(),
            id,
            title,
            format: GEOJSON_FORMAT.to_string(),
            file_path: String::new(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogNode {
    Folder(Folder),
    Resource(Resource),
}

impl CatalogNode {
    pub fn id(&self) -> &str {
        match self {
            CatalogNode::Folder(folder) => &folder.id,
            CatalogNode::Resource(resource) => &resource.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogNode::Folder(folder) => &folder.title,
            CatalogNode::Resource(resource) => &resource.title,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, CatalogNode::Folder(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub results: Vec<CatalogNode>,
    pub count: usize,
    pub path: Vec<Folder>,
}

impl ListResult {
    pub fn new(results: Vec<CatalogNode>, path: Vec<Folder>) -> Self {
        Self {
            count: results.len(),
            results,
            path,
        }
    }
}

/// Layer identifier as sent by the server: usually a number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerId {
    Number(i64),
    Text(String),
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Number(value) => write!(f, "{value}"),
            LayerId::Text(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl ServiceDescriptor {
    pub fn is_browsable(&self) -> bool {
        is_service_marker(&self.service_type)
    }

    pub fn title(&self) -> String {
        format!("{} ({})", self.name, self.service_type)
    }
}

fn top_level_parent() -> i64 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub id: LayerId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub layer_type: String,
    #[serde(default = "top_level_parent")]
    pub parent_layer_id: i64,
}

impl LayerDescriptor {
    pub fn is_top_level(&self) -> bool {
        self.parent_layer_id == -1
    }

    pub fn title(&self) -> String {
        format!("{} - {}", self.name, self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubLayerDescriptor {
    pub id: LayerId,
    pub name: String,
}

impl SubLayerDescriptor {
    pub fn title(&self) -> String {
        format!("{} - {}", self.name, self.id)
    }
}

/// Any node of the services directory. Which groups are present tells the
/// node apart: a folder listing carries `folders`/`services`, a service or
/// layer carries `layers`/`subLayers`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNode {
    #[serde(default)]
    pub folders: Option<Vec<String>>,
    #[serde(default)]
    pub services: Option<Vec<ServiceDescriptor>>,
    #[serde(default)]
    pub layers: Option<Vec<LayerDescriptor>>,
    #[serde(default)]
    pub sub_layers: Option<Vec<SubLayerDescriptor>>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `<layer>?f=json` response, reduced to what the extractor reads.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerMetadata {
    pub id: LayerId,
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl LayerMetadata {
    pub fn resource_title(&self) -> String {
        format!("{}-{}", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub title: String,
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub resources: Vec<DatasetResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResource {
    pub id: String,
    pub title: String,
    pub url: String,
    pub format: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetList {
    pub count: usize,
    pub results: Vec<Dataset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_id_accepts_numbers_and_strings() {
        let numeric: LayerDescriptor = serde_json::from_str(
            r#"{"id": 3, "name": "Roads", "type": "Feature Layer", "parentLayerId": -1}"#,
        )
        .unwrap();
        assert_eq!(numeric.id.to_string(), "3");
        assert!(numeric.is_top_level());

        let text: SubLayerDescriptor =
            serde_json::from_str(r#"{"id": "0", "name": "SubLayer1"}"#).unwrap();
        assert_eq!(text.title(), "SubLayer1 - 0");
    }

    #[test]
    fn missing_parent_means_top_level() {
        let layer: LayerDescriptor =
            serde_json::from_str(r#"{"id": 1, "name": "Parcels", "type": "Feature Layer"}"#)
                .unwrap();
        assert_eq!(layer.parent_layer_id, -1);
    }

    #[test]
    fn catalog_node_serializes_with_type_tag() {
        let node = CatalogNode::Resource(Resource::geojson(
            "https://x/rest/services/S/MapServer/1".to_string(),
            "Parcels - 1".to_string(),
        ));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "resource");
        assert_eq!(value["format"], "geojson");
        assert_eq!(value["filePath"], "");
        assert_eq!(value["origin"], value["id"]);
        assert!(value.get("description").is_none());

        let folder = CatalogNode::Folder(Folder {
            id: "https://x/rest/services/A".to_string(),
            title: "A".to_string(),
        });
        assert_eq!(serde_json::to_value(&folder).unwrap()["type"], "folder");
    }
}
