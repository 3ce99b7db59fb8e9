//! Variable store.
//!
//! Holds every variable the user added, keyed by a [`VariableId`] handed out
//! by the store's own allocator. Data and bounds maps are immutable once a
//! variable is added; only the visibility flag changes afterwards, and it is
//! changed by replacing the `Arc<Variable>` rather than mutating in place.
//! Readers either take a [`VariableStore::list`] snapshot or follow
//! [`VariableStore::subscribe`].

pub mod ingest;
pub mod stats;

use std::sync::Arc;

use foundation::{BoundsIndex, GeoId, IdAllocator, LayerId, ValueMap, VariableId};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

/// One added (geography, attribute) dataset.
#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub id: VariableId,
    /// Geography layer the values were read from. Variables sharing it can be
    /// plotted against each other.
    pub source_layer_id: LayerId,
    /// Geography name, e.g. "Counties".
    pub source_name: String,
    pub attribute: String,
    pub attribute_display_name: String,
    #[serde(skip)]
    pub data: Arc<ValueMap>,
    /// Bounds of `data`'s values at insert time.
    pub min: f64,
    pub max: f64,
    /// Shared by every variable built from the same feature read.
    #[serde(skip)]
    pub feature_bounds: Arc<BoundsIndex>,
    pub visible: bool,
    /// Styled map layer created for this variable, if any.
    pub backing_layer_id: Option<LayerId>,
}

impl Variable {
    /// `"<geography>: <attribute>"`
    pub fn display_name(&self) -> String {
        format!("{}: {}", self.source_name, self.attribute_display_name)
    }

    pub fn value(&self, geoid: &GeoId) -> Option<f64> {
        self.data.get(geoid).copied()
    }

    pub fn bounds_of(&self, geoid: &GeoId) -> Option<foundation::Aabb2> {
        self.feature_bounds.get(geoid).copied().flatten()
    }
}

/// Everything needed to add a variable; the store assigns id and bounds.
#[derive(Debug, Clone)]
pub struct NewVariable {
    pub source_layer_id: LayerId,
    pub source_name: String,
    pub attribute: String,
    pub attribute_display_name: String,
    pub data: ValueMap,
    pub feature_bounds: Arc<BoundsIndex>,
    pub backing_layer_id: Option<LayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownVariable(VariableId),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownVariable(id) => write!(f, "unknown variable {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Ordered snapshot of the store's variables (insertion order).
pub type VariableList = Arc<[Arc<Variable>]>;

#[derive(Debug)]
pub struct VariableStore {
    ids: IdAllocator,
    variables: Vec<Arc<Variable>>,
    published: watch::Sender<VariableList>,
}

impl VariableStore {
    pub fn new() -> Self {
        let (published, _) = watch::channel(VariableList::from(Vec::new()));
        Self {
            ids: IdAllocator::new(),
            variables: Vec::new(),
            published,
        }
    }

    pub fn add(&mut self, new: NewVariable) -> VariableId {
        let id = self.ids.allocate();
        let (min, max) = stats::min_max(new.data.values().copied()).unwrap_or((0.0, 0.0));
        debug!(
            %id,
            source = %new.source_layer_id,
            attribute = %new.attribute,
            values = new.data.len(),
            "variable added"
        );
        self.variables.push(Arc::new(Variable {
            id,
            source_layer_id: new.source_layer_id,
            source_name: new.source_name,
            attribute: new.attribute,
            attribute_display_name: new.attribute_display_name,
            data: Arc::new(new.data),
            min,
            max,
            feature_bounds: new.feature_bounds,
            visible: false,
            backing_layer_id: new.backing_layer_id,
        }));
        self.publish();
        id
    }

    pub fn remove(&mut self, id: VariableId) -> Result<Arc<Variable>, StoreError> {
        let idx = self.index_of(id)?;
        let removed = self.variables.remove(idx);
        debug!(%id, "variable removed");
        self.publish();
        Ok(removed)
    }

    pub fn set_visible(&mut self, id: VariableId, visible: bool) -> Result<(), StoreError> {
        let idx = self.index_of(id)?;
        if self.variables[idx].visible != visible {
            let mut updated = Variable::clone(&self.variables[idx]);
            updated.visible = visible;
            self.variables[idx] = Arc::new(updated);
            self.publish();
        }
        Ok(())
    }

    /// Marks `id` visible and every other variable hidden.
    pub fn show_only(&mut self, id: VariableId) -> Result<(), StoreError> {
        self.index_of(id)?;
        let mut changed = false;
        for slot in &mut self.variables {
            let visible = slot.id == id;
            if slot.visible != visible {
                let mut updated = Variable::clone(&**slot);
                updated.visible = visible;
                *slot = Arc::new(updated);
                changed = true;
            }
        }
        if changed {
            self.publish();
        }
        Ok(())
    }

    pub fn get(&self, id: VariableId) -> Option<&Arc<Variable>> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn list(&self) -> VariableList {
        VariableList::from(self.variables.clone())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Receiver that observes every change after this call.
    pub fn subscribe(&self) -> watch::Receiver<VariableList> {
        self.published.subscribe()
    }

    fn index_of(&self, id: VariableId) -> Result<usize, StoreError> {
        self.variables
            .iter()
            .position(|v| v.id == id)
            .ok_or(StoreError::UnknownVariable(id))
    }

    fn publish(&self) {
        self.published.send_replace(self.list());
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}
