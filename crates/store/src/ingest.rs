//! Building variables from the map's rendered features.
//!
//! A single read of a source layer yields one [`BoundsIndex`] (geometry does
//! not depend on the attribute) and one value map per requested attribute.

use std::sync::Arc;

use foundation::{BoundsIndex, GeoId, LayerId, ValueMap};
use serde_json::Value;
use service::{LayerInfo, RenderedFeature};
use tracing::debug;

use crate::NewVariable;

/// Property holding the feature's GEOID.
pub const GEOID_KEY: &str = "GEOID";

/// Geography layer names offered as variable sources.
pub const GEO_TYPES: [&str; 3] = ["Counties", "Tracts", "ZCTA"];

/// Identity of the layer the features were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayer {
    pub id: LayerId,
    pub name: String,
}

/// An attribute the user asked to turn into a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRef {
    pub id: String,
    pub display_name: Option<String>,
}

impl AttributeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Layers named after one of `geo_types` (ignoring case), in listing order.
pub fn reference_layers(layers: &[LayerInfo], geo_types: &[String]) -> Vec<SourceLayer> {
    layers
        .iter()
        .filter(|l| geo_types.iter().any(|g| g.eq_ignore_ascii_case(&l.name)))
        .map(|l| SourceLayer {
            id: l.id.clone(),
            name: l.name.clone(),
        })
        .collect()
}

fn geoid_of(feature: &RenderedFeature, geoid_key: &str) -> Option<GeoId> {
    match feature.properties.get(geoid_key)? {
        Value::String(s) => Some(GeoId::new(s.clone())),
        Value::Number(n) => Some(GeoId::new(n.to_string())),
        _ => None,
    }
}

/// Numbers and numeric strings; anything else (null, NaN, text) is skipped.
fn numeric(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// GEOID -> value for features that carry both.
pub fn value_map(features: &[RenderedFeature], geoid_key: &str, attribute: &str) -> ValueMap {
    let mut map = ValueMap::with_capacity(features.len());
    for f in features {
        let Some(geoid) = geoid_of(f, geoid_key) else {
            continue;
        };
        let Some(value) = f.properties.get(attribute).and_then(numeric) else {
            continue;
        };
        map.insert(geoid, value);
    }
    map
}

/// GEOID -> reported bbox; features without a bbox are kept as `None`.
pub fn bounds_index(features: &[RenderedFeature], geoid_key: &str) -> BoundsIndex {
    let mut index = BoundsIndex::with_capacity(features.len());
    for f in features {
        if let Some(geoid) = geoid_of(f, geoid_key) {
            index.insert(geoid, f.bbox);
        }
    }
    index
}

/// One variable per attribute, all sharing one bounds index.
pub fn variables_from_features(
    source: &SourceLayer,
    features: &[RenderedFeature],
    attributes: &[AttributeRef],
) -> Vec<NewVariable> {
    let bounds = Arc::new(bounds_index(features, GEOID_KEY));
    debug!(
        source = %source.id,
        features = features.len(),
        bounded = bounds.len(),
        "built bounds index"
    );
    attributes
        .iter()
        .map(|attr| NewVariable {
            source_layer_id: source.id.clone(),
            source_name: source.name.clone(),
            attribute: attr.id.clone(),
            attribute_display_name: attr.display_name().to_string(),
            data: value_map(features, GEOID_KEY, &attr.id),
            feature_bounds: Arc::clone(&bounds),
            backing_layer_id: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use foundation::{Aabb2, GeoId, LayerId};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use service::RenderedFeature;

    use super::*;

    fn feature(props: serde_json::Value, bbox: Option<[f64; 4]>) -> RenderedFeature {
        RenderedFeature {
            properties: props.as_object().cloned().unwrap_or_default(),
            bbox: bbox.map(Aabb2::from_lng_lat),
        }
    }

    #[test]
    fn reference_layers_match_names_case_insensitively() {
        let layer = |id: &str, name: &str| LayerInfo {
            id: LayerId::from(id),
            name: name.to_string(),
            visible: false,
        };
        let layers = vec![
            layer("l1", "counties"),
            layer("l2", "Counties: pop"),
            layer("l3", "ZCTA"),
            layer("l4", "Roads"),
        ];
        let geo_types: Vec<String> = GEO_TYPES.iter().map(|g| g.to_string()).collect();
        let ids: Vec<LayerId> = reference_layers(&layers, &geo_types)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![LayerId::from("l1"), LayerId::from("l3")]);
    }

    #[test]
    fn value_map_skips_missing_and_non_numeric() {
        let features = vec![
            feature(json!({"GEOID": "06001", "pop": 100}), None),
            feature(json!({"GEOID": "06003", "pop": "250.5"}), None),
            feature(json!({"GEOID": "06005", "pop": null}), None),
            feature(json!({"GEOID": "06007", "pop": "n/a"}), None),
            feature(json!({"pop": 7}), None),
            feature(json!({"GEOID": 6009, "pop": 1.5}), None),
        ];
        let map = value_map(&features, GEOID_KEY, "pop");
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("06001"), Some(&100.0));
        assert_eq!(map.get("06003"), Some(&250.5));
        assert_eq!(map.get("6009"), Some(&1.5));
    }

    #[test]
    fn bounds_index_keeps_features_without_bbox() {
        let features = vec![
            feature(json!({"GEOID": "1"}), Some([0.0, 0.0, 1.0, 1.0])),
            feature(json!({"GEOID": "2"}), None),
        ];
        let index = bounds_index(&features, GEOID_KEY);
        assert_eq!(index.len(), 2);
        assert!(index[&GeoId::from("1")].is_some());
        assert_eq!(index[&GeoId::from("2")], None);
    }

    #[test]
    fn variables_share_one_bounds_index() {
        let features = vec![
            feature(json!({"GEOID": "06001", "pop": 100, "income": 5}), Some([0.0, 0.0, 1.0, 1.0])),
            feature(json!({"GEOID": "06002", "pop": 200}), Some([1.0, 0.0, 2.0, 1.0])),
        ];
        let source = SourceLayer {
            id: LayerId::from("counties"),
            name: "Counties".to_string(),
        };
        let attrs = [
            AttributeRef::new("pop"),
            AttributeRef {
                id: "income".to_string(),
                display_name: Some("Median income".to_string()),
            },
        ];
        let vars = variables_from_features(&source, &features, &attrs);
        assert_eq!(vars.len(), 2);
        assert!(Arc::ptr_eq(&vars[0].feature_bounds, &vars[1].feature_bounds));
        assert_eq!(vars[0].data.len(), 2);
        assert_eq!(vars[1].data.len(), 1);
        assert_eq!(vars[1].attribute_display_name, "Median income");
    }
}
