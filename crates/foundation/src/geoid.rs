use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bounds::Aabb2;

/// Identifier of one geographic feature (county, tract, ZCTA, ...).
///
/// GEOIDs are the join key between variables; they are compared as opaque
/// strings, so `"06001"` and `"6001"` are different features.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoId(String);

impl GeoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for GeoId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GeoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GeoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// GEOID -> numeric value for one variable.
pub type ValueMap = HashMap<GeoId, f64>;

/// GEOID -> bounding box of the rendered feature, if the map reported one.
pub type BoundsIndex = HashMap<GeoId, Option<Aabb2>>;
