//! Types exchanged with the hosted map service.
//!
//! This module defines the payloads for:
//! - Overlay creation (GeoJSON geometry + style in, layer ids out)
//! - Layer visibility changes
//! - Per-variable layer styling (numeric choropleth)
//! - Rendered-feature reads used to build variables
//! - Map notifications (viewport move-end, render idle)
//!
//! Field names follow the service's JSON conventions so the same types can be
//! forwarded to a real embedding without translation.

use foundation::{Aabb2, GeoId, LayerId};
use serde::{Deserialize, Serialize};

/// Notification pushed by the map service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapEvent {
    /// The user finished panning or zooming.
    ViewportMoveEnd,
    /// All pending tiles have been rendered.
    Idle,
}

/// A GeoJSON `FeatureCollection` used as ad-hoc overlay geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<OverlayFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub geometry: PolygonGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// Rings of `[lng, lat]` positions; the first ring is the exterior.
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl OverlayGeometry {
    /// Single-feature collection whose polygon is the feature's bounding box.
    pub fn from_bounds(geoid: &GeoId, bounds: Aabb2) -> Self {
        let mut properties = serde_json::Map::new();
        properties.insert(
            "GEOID".to_string(),
            serde_json::Value::String(geoid.to_string()),
        );
        Self {
            kind: "FeatureCollection".to_string(),
            features: vec![OverlayFeature {
                kind: "Feature".to_string(),
                properties,
                geometry: PolygonGeometry {
                    kind: "Polygon".to_string(),
                    coordinates: vec![bounds.ring().to_vec()],
                },
            }],
        }
    }
}

/// Paint applied to an overlay layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayStyle {
    pub color: String,
    pub fill_opacity: f32,
    pub stroke_width: f32,
}

/// Identifiers returned by the service for a newly created overlay.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOverlay {
    pub layer_ids: Vec<LayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<LayerId>,
}

impl CreatedOverlay {
    /// Every identifier the service handed out, layers first then the group.
    pub fn into_ids(self) -> Vec<LayerId> {
        let mut ids = self.layer_ids;
        ids.extend(self.group_id);
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisibilityChange {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show: Vec<LayerId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hide: Vec<LayerId>,
}

impl VisibilityChange {
    pub fn show(ids: impl IntoIterator<Item = LayerId>) -> Self {
        Self {
            show: ids.into_iter().collect(),
            hide: Vec::new(),
        }
    }

    pub fn hide(ids: impl IntoIterator<Item = LayerId>) -> Self {
        Self {
            show: Vec::new(),
            hide: ids.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.show.is_empty() && self.hide.is_empty()
    }
}

/// Numeric choropleth style for a variable's layer, in the service's style
/// language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub config: StyleConfig,
    pub legend: StyleLegend,
    pub paint: StylePaint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    pub numeric_attribute: String,
    pub steps: StyleSteps,
}

/// Classification of the attribute's values into color bins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSteps {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleLegend {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePaint {
    pub color: Vec<String>,
    pub opacity: Vec<f32>,
    pub stroke_color: Vec<String>,
    pub stroke_width: Vec<f32>,
}

/// A feature currently drawn by the map, with its attribute row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderedFeature {
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Aabb2>,
}

/// Layer listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn overlay_geometry_is_a_closed_bbox_polygon() {
        let g = OverlayGeometry::from_bounds(
            &GeoId::from("06001"),
            Aabb2::from_lng_lat([-122.0, 37.0, -121.0, 38.0]),
        );
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["properties"]["GEOID"], "06001");
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        let ring = &json["features"][0]["geometry"]["coordinates"][0];
        assert_eq!(ring.as_array().unwrap().len(), 5);
        assert_eq!(ring[0], ring[4]);
    }

    #[test]
    fn created_overlay_ids_include_group() {
        let created = CreatedOverlay {
            layer_ids: vec![LayerId::from("a"), LayerId::from("b")],
            group_id: Some(LayerId::from("g")),
        };
        assert_eq!(
            created.into_ids(),
            vec![LayerId::from("a"), LayerId::from("b"), LayerId::from("g")]
        );
    }

    #[test]
    fn rendered_feature_reads_service_json() {
        let f: RenderedFeature = serde_json::from_str(
            r#"{"properties": {"GEOID": "06001", "pop": 10}, "bbox": [0, 1, 2, 3]}"#,
        )
        .unwrap();
        assert_eq!(f.properties["pop"], 10);
        assert_eq!(f.bbox, Some(Aabb2::from_lng_lat([0.0, 1.0, 2.0, 3.0])));
    }

    #[test]
    fn layer_style_uses_service_field_names() {
        let style = LayerStyle {
            version: "2.3".to_string(),
            kind: "numeric".to_string(),
            config: StyleConfig {
                numeric_attribute: "pop".to_string(),
                steps: StyleSteps {
                    kind: "quantiles".to_string(),
                    count: 5,
                },
            },
            legend: StyleLegend {
                display_name: "auto".to_string(),
            },
            paint: StylePaint {
                color: vec!["#ffffcc".to_string()],
                opacity: vec![0.8],
                stroke_color: vec!["#cccccc".to_string()],
                stroke_width: vec![0.5],
            },
        };
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["type"], "numeric");
        assert_eq!(json["config"]["numericAttribute"], "pop");
        assert_eq!(json["config"]["steps"]["type"], "quantiles");
        assert_eq!(json["legend"]["displayName"], "auto");
        assert_eq!(json["paint"]["strokeColor"][0], "#cccccc");
    }

    #[test]
    fn events_use_tagged_json() {
        let json = serde_json::to_string(&MapEvent::ViewportMoveEnd).unwrap();
        assert_eq!(json, r#"{"type":"viewport_move_end"}"#);
    }
}
