use tracing::debug;

use crate::arcgis::JsonFetcher;
use crate::cache::FetchCache;
use crate::domain::{
    CatalogNode, Folder, GROUP_LAYER, LayerId, ListResult, RemoteNode, Resource,
    ServiceDescriptor, is_downloadable_layer, is_service_marker,
};
use crate::error::CatalogError;

/// Turns any node of the services directory into folders and resources.
pub struct CatalogResolver<'a, F: JsonFetcher> {
    cache: &'a FetchCache<F>,
    base_url: &'a str,
}

impl<'a, F: JsonFetcher> CatalogResolver<'a, F> {
    pub fn new(cache: &'a FetchCache<F>, base_url: &'a str) -> Self {
        Self { cache, base_url }
    }

    /// Lists the children of `current` (the catalog root when `None` or empty)
    /// together with the breadcrumb leading to it.
    pub fn list(&self, current: Option<&str>) -> Result<ListResult, CatalogError> {
        let node_url = current
            .filter(|value| !value.is_empty())
            .unwrap_or(self.base_url);
        debug!(base_url = self.base_url, node_url, "list folders/services/layers");

        let raw = self.cache.fetch(node_url)?;
        let node: RemoteNode =
            serde_json::from_value(raw).map_err(|err| CatalogError::Malformed {
                url: node_url.to_string(),
                message: err.to_string(),
            })?;

        let results = resolve_children(&node, self.base_url, node_url);
        let path = breadcrumb_path(self.base_url, node_url);
        debug!(node_url, children = results.len(), depth = path.len(), "listed");
        Ok(ListResult::new(results, path))
    }
}

/// Children in fixed group order: folders, services, layers, sub-layers.
pub fn resolve_children(node: &RemoteNode, base_url: &str, target: &str) -> Vec<CatalogNode> {
    let mut children = Vec::new();

    for folder in node.folders.iter().flatten() {
        children.push(CatalogNode::Folder(Folder {
            id: format!("{target}/{folder}"),
            title: folder.clone(),
        }));
    }

    for service in node.services.iter().flatten() {
        if !service.is_browsable() {
            continue;
        }
        children.push(CatalogNode::Folder(Folder {
            id: service_url(base_url, service),
            title: service.title(),
        }));
    }

    for layer in node.layers.iter().flatten() {
        let id = format!("{target}/{}", layer.id);
        if layer.layer_type == GROUP_LAYER {
            children.push(CatalogNode::Folder(Folder {
                id,
                title: layer.title(),
            }));
        } else if is_downloadable_layer(&layer.layer_type) && layer.is_top_level() {
            children.push(CatalogNode::Resource(Resource::geojson(id, layer.title())));
        }
    }

    for sub_layer in node.sub_layers.iter().flatten() {
        children.push(CatalogNode::Resource(Resource::geojson(
            sibling_url(target, &sub_layer.id),
            sub_layer.title(),
        )));
    }

    children
}

/// The service's declared URL, or `<base>/<name>/<type>` when it has none.
pub fn service_url(base_url: &str, service: &ServiceDescriptor) -> String {
    match &service.url {
        Some(url) if !url.is_empty() => url.clone(),
        _ => format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            service.name,
            service.service_type
        ),
    }
}

/// Replaces the last path segment of `url` with `id`.
pub fn sibling_url(url: &str, id: &LayerId) -> String {
    let parent = match url.rfind('/') {
        Some(index) => &url[..=index],
        None => "",
    };
    format!("{parent}{id}")
}

/// Folders from the catalog root down to `target`, one per path segment below
/// `base_url`. A `FeatureServer`/`MapServer` segment extends the previous
/// entry instead of adding its own.
pub fn breadcrumb_path(base_url: &str, target: &str) -> Vec<Folder> {
    let Some(rest) = target.strip_prefix(base_url) else {
        debug!(base_url, node_url = target, "node outside catalog root, empty path");
        return Vec::new();
    };

    let mut path: Vec<Folder> = Vec::new();
    let mut end = base_url.len();
    for (index, segment) in rest.split('/').enumerate() {
        if index > 0 {
            end += 1;
        }
        end += segment.len();

        if is_service_marker(segment) {
            if let Some(last) = path.last_mut() {
                last.id.push('/');
                last.id.push_str(segment);
            }
        } else if !segment.is_empty() {
            path.push(Folder {
                id: target[..end].to_string(),
                title: segment.to_string(),
            });
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://x/rest/services";

    fn ids(path: &[Folder]) -> Vec<&str> {
        path.iter().map(|folder| folder.id.as_str()).collect()
    }

    #[test]
    fn root_has_empty_path() {
        assert!(breadcrumb_path(BASE, BASE).is_empty());
        assert!(breadcrumb_path(BASE, &format!("{BASE}/")).is_empty());
    }

    #[test]
    fn service_marker_merges_into_previous_entry() {
        let path = breadcrumb_path(BASE, "https://x/rest/services/Env/Parks/FeatureServer");
        assert_eq!(
            ids(&path),
            vec![
                "https://x/rest/services/Env",
                "https://x/rest/services/Env/Parks/FeatureServer",
            ]
        );
        assert_eq!(path[1].title, "Parks");
    }

    #[test]
    fn layer_segments_follow_merged_service() {
        let path = breadcrumb_path(BASE, "https://x/rest/services/test-1/MapServer/1");
        assert_eq!(
            ids(&path),
            vec![
                "https://x/rest/services/test-1/MapServer",
                "https://x/rest/services/test-1/MapServer/1",
            ]
        );
    }

    #[test]
    fn repeated_segment_names_truncate_at_their_own_position() {
        let path = breadcrumb_path(BASE, "https://x/rest/services/a/a");
        assert_eq!(
            ids(&path),
            vec!["https://x/rest/services/a", "https://x/rest/services/a/a"]
        );
    }

    #[test]
    fn leading_marker_without_parent_is_dropped() {
        let path = breadcrumb_path(BASE, "https://x/rest/services/MapServer");
        assert!(path.is_empty());
    }

    #[test]
    fn foreign_target_yields_empty_path() {
        assert!(breadcrumb_path(BASE, "https://other/rest/services/A").is_empty());
    }

    #[test]
    fn sibling_replaces_last_segment() {
        assert_eq!(
            sibling_url(
                "https://x/rest/services/S/FeatureServer/1",
                &LayerId::Text("0".to_string())
            ),
            "https://x/rest/services/S/FeatureServer/0"
        );
        assert_eq!(sibling_url("layer", &LayerId::Number(4)), "4");
    }

    #[test]
    fn synthesized_service_url_joins_with_single_slash() {
        let service = ServiceDescriptor {
            name: "Env/Parks".to_string(),
            service_type: "MapServer".to_string(),
            url: None,
        };
        assert_eq!(
            service_url(BASE, &service),
            "https://x/rest/services/Env/Parks/MapServer"
        );
        assert_eq!(
            service_url(&format!("{BASE}/"), &service),
            "https://x/rest/services/Env/Parks/MapServer"
        );
    }

    #[test]
    fn children_follow_group_order_and_filters() {
        let node: RemoteNode = serde_json::from_value(serde_json::json!({
            "folders": ["B", "A"],
            "services": [
                { "name": "Geo", "type": "GeocodeServer" },
                { "name": "S2", "type": "MapServer" },
                { "name": "S1", "type": "FeatureServer" }
            ],
            "layers": [
                { "id": 0, "name": "Group", "type": "Group Layer", "parentLayerId": -1 },
                { "id": 1, "name": "Child", "type": "Feature Layer", "parentLayerId": 0 },
                { "id": 2, "name": "Labels", "type": "Annotation Layer", "parentLayerId": -1 },
                { "id": 3, "name": "Image", "type": "Raster Layer", "parentLayerId": -1 }
            ]
        }))
        .unwrap();

        let children = resolve_children(&node, BASE, BASE);
        let titles: Vec<&str> = children.iter().map(CatalogNode::title).collect();
        assert_eq!(
            titles,
            vec!["B", "A", "S2 (MapServer)", "S1 (FeatureServer)", "Group - 0", "Labels - 2"]
        );
        assert!(children[4].is_folder());
        assert!(!children[5].is_folder());
        assert_eq!(children[5].id(), "https://x/rest/services/2");
    }
}
