//! JSON fixtures that seed the in-memory map for the demo binary and tests.
//!
//! ```json
//! {
//!   "viewport": { "center": { "lat": 37.6, "lng": -122.0 }, "zoom": 7 },
//!   "sources": [{
//!     "id": "counties", "name": "Counties",
//!     "attributes": [{ "id": "pop", "display_name": "Population" }],
//!     "features": [{ "properties": { "GEOID": "06001", "pop": 100 },
//!                    "bbox": [-122.3, 37.4, -121.4, 37.9] }]
//!   }]
//! }
//! ```

use std::path::{Path, PathBuf};

use foundation::{LayerId, Viewport};
use serde::Deserialize;
use service::{InMemoryMapService, RenderedFeature};
use store::ingest::{AttributeRef, SourceLayer};

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub viewport: Option<Viewport>,
    pub sources: Vec<FixtureSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSource {
    pub id: LayerId,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<FixtureAttribute>,
    #[serde(default)]
    pub features: Vec<RenderedFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAttribute {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug)]
pub enum FixtureError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl std::fmt::Display for FixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixtureError::Io { path, source } => {
                write!(f, "failed to read fixture {}: {source}", path.display())
            }
            FixtureError::Parse(err) => write!(f, "invalid fixture: {err}"),
        }
    }
}

impl std::error::Error for FixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FixtureError::Io { source, .. } => Some(source),
            FixtureError::Parse(err) => Some(err),
        }
    }
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(text).map_err(FixtureError::Parse)
    }

    /// Map service holding every source as a hidden layer.
    pub fn service(&self) -> InMemoryMapService {
        let svc = match self.viewport {
            Some(vp) => InMemoryMapService::with_viewport(vp),
            None => InMemoryMapService::new(),
        };
        for source in &self.sources {
            svc.add_source_layer(
                source.id.clone(),
                source.name.clone(),
                source.features.clone(),
            );
        }
        svc
    }
}

impl FixtureSource {
    pub fn layer(&self) -> SourceLayer {
        SourceLayer {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn attribute_refs(&self) -> Vec<AttributeRef> {
        self.attributes
            .iter()
            .map(|a| AttributeRef {
                id: a.id.clone(),
                display_name: a.display_name.clone(),
            })
            .collect()
    }
}
