use std::collections::HashSet;

use foundation::{Aabb2, BoundsIndex, GeoId, Viewport};
use serde::{Deserialize, Serialize};

/// Approximates the visible map area from center + zoom.
///
/// The longitude span is `360 / 2^zoom * tile_span`; the latitude span is the
/// longitude span scaled by `lat_aspect`. This is not an inverse projection,
/// only a rectangle roughly matching what the map shows at mid latitudes.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportApprox {
    /// Tile widths visible across the map.
    pub tile_span: f64,
    pub lat_aspect: f64,
}

impl ViewportApprox {
    pub const DEFAULT_TILE_SPAN: f64 = 4.0;
    pub const DEFAULT_LAT_ASPECT: f64 = 0.65;

    pub fn rect(&self, viewport: &Viewport) -> Aabb2 {
        let lng_span = 360.0 / 2f64.powf(viewport.zoom) * self.tile_span;
        let lat_span = lng_span * self.lat_aspect;
        Aabb2::centered(
            [viewport.center.lng, viewport.center.lat],
            lng_span,
            lat_span,
        )
    }
}

impl Default for ViewportApprox {
    fn default() -> Self {
        Self {
            tile_span: Self::DEFAULT_TILE_SPAN,
            lat_aspect: Self::DEFAULT_LAT_ASPECT,
        }
    }
}

/// Result of viewport filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VisibleSet {
    /// No filtering possible (no viewport, no bounds); treat everything as visible.
    #[default]
    All,
    Only(HashSet<GeoId>),
}

impl VisibleSet {
    pub fn contains(&self, geoid: &GeoId) -> bool {
        match self {
            VisibleSet::All => true,
            VisibleSet::Only(set) => set.contains(geoid),
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, VisibleSet::Only(_))
    }
}

/// GEOIDs whose bounds overlap `rect`. Entries without bounds never match.
pub fn geoids_in_rect(rect: &Aabb2, index: &BoundsIndex) -> HashSet<GeoId> {
    index
        .iter()
        .filter_map(|(geoid, bounds)| {
            bounds
                .filter(|b| b.intersects(rect))
                .map(|_| geoid.clone())
        })
        .collect()
}

/// Features of `index` inside the approximated viewport.
///
/// Returns [`VisibleSet::All`] when the viewport is unknown or the index is
/// empty, since "cannot filter" must not read as "nothing visible".
pub fn visible_geoids(
    viewport: Option<&Viewport>,
    index: &BoundsIndex,
    approx: ViewportApprox,
) -> VisibleSet {
    let Some(viewport) = viewport else {
        return VisibleSet::All;
    };
    if index.is_empty() {
        return VisibleSet::All;
    }
    VisibleSet::Only(geoids_in_rect(&approx.rect(viewport), index))
}
