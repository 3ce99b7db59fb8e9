//! In-process map service.
//!
//! Backs the demo binary and every async test in the workspace. Besides the
//! [`MapService`] contract it exposes knobs for scripting latency and
//! failures, plus a call log so tests can assert on request ordering.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Duration;

use foundation::{LayerId, Viewport};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::map_service::{BoxFuture, MapService, ServiceError, ServiceResult};
use crate::protocol::{
    CreatedOverlay, LayerInfo, LayerStyle, MapEvent, OverlayGeometry, OverlayStyle,
    RenderedFeature, VisibilityChange,
};

/// One request received by the service, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Viewport,
    CreateOverlay { geoid: Option<String> },
    DeleteLayer(LayerId),
    SetVisibility(VisibilityChange),
    DuplicateLayer(LayerId),
    RenameLayer { id: LayerId, name: String },
    SetLayerStyle { id: LayerId, attribute: String },
    Layers,
    RenderedFeatures(LayerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerKind {
    Source,
    Copy,
    Overlay,
}

#[derive(Debug, Clone)]
struct LayerRecord {
    name: String,
    visible: bool,
    kind: LayerKind,
    style: Option<LayerStyle>,
}

#[derive(Debug, Default)]
struct State {
    viewport: Option<Viewport>,
    layers: BTreeMap<LayerId, LayerRecord>,
    features: HashMap<LayerId, Vec<RenderedFeature>>,
    next_overlay: u64,
    next_copy: u64,
    create_delays: VecDeque<Duration>,
    delete_delays: VecDeque<Duration>,
    duplicate_failures: usize,
    create_failures: usize,
    viewport_failures: usize,
    delete_failures: HashSet<LayerId>,
    calls: Vec<ServiceCall>,
}

pub struct InMemoryMapService {
    state: Mutex<State>,
    events: broadcast::Sender<MapEvent>,
}

impl InMemoryMapService {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(State::default()),
            events,
        }
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        let svc = Self::new();
        svc.state.lock().viewport = Some(viewport);
        svc
    }

    /// Registers a hidden source layer whose features become readable once
    /// the layer is shown.
    pub fn add_source_layer(
        &self,
        id: LayerId,
        name: impl Into<String>,
        features: Vec<RenderedFeature>,
    ) {
        let mut st = self.state.lock();
        st.layers.insert(
            id.clone(),
            LayerRecord {
                name: name.into(),
                visible: false,
                kind: LayerKind::Source,
                style: None,
            },
        );
        st.features.insert(id, features);
    }

    /// Moves the map and notifies subscribers with `ViewportMoveEnd`.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.lock().viewport = Some(viewport);
        self.emit(MapEvent::ViewportMoveEnd);
    }

    pub fn emit(&self, event: MapEvent) {
        // No subscribers is not an error for a broadcast source.
        let _ = self.events.send(event);
    }

    /// Delay applied to the next `create_overlay` call (FIFO).
    pub fn push_create_delay(&self, delay: Duration) {
        self.state.lock().create_delays.push_back(delay);
    }

    /// Delay applied to the next `delete_layer` call (FIFO). The layer stays
    /// on the map until the delay has elapsed.
    pub fn push_delete_delay(&self, delay: Duration) {
        self.state.lock().delete_delays.push_back(delay);
    }

    pub fn fail_next_duplicates(&self, n: usize) {
        self.state.lock().duplicate_failures += n;
    }

    pub fn fail_next_creates(&self, n: usize) {
        self.state.lock().create_failures += n;
    }

    pub fn fail_next_viewport_reads(&self, n: usize) {
        self.state.lock().viewport_failures += n;
    }

    /// Every future `delete_layer(id)` fails and leaves the layer in place.
    pub fn fail_delete(&self, id: LayerId) {
        self.state.lock().delete_failures.insert(id);
    }

    /// Ids of overlay layers and groups that still exist.
    pub fn overlay_ids(&self) -> Vec<LayerId> {
        self.state
            .lock()
            .layers
            .iter()
            .filter(|(_, l)| l.kind == LayerKind::Overlay)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Ids of layers created by `duplicate_layer` that still exist.
    pub fn copied_layer_ids(&self) -> Vec<LayerId> {
        self.state
            .lock()
            .layers
            .iter()
            .filter(|(_, l)| l.kind == LayerKind::Copy)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn layer_name(&self, id: &LayerId) -> Option<String> {
        self.state.lock().layers.get(id).map(|l| l.name.clone())
    }

    pub fn layer_style(&self, id: &LayerId) -> Option<LayerStyle> {
        self.state.lock().layers.get(id).and_then(|l| l.style.clone())
    }

    pub fn is_visible(&self, id: &LayerId) -> bool {
        self.state.lock().layers.get(id).is_some_and(|l| l.visible)
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: ServiceCall) {
        self.state.lock().calls.push(call);
    }
}

impl Default for InMemoryMapService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryMapService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.state.lock();
        f.debug_struct("InMemoryMapService")
            .field("layers", &st.layers.len())
            .field("calls", &st.calls.len())
            .finish()
    }
}

impl MapService for InMemoryMapService {
    fn viewport(&self) -> BoxFuture<'_, ServiceResult<Viewport>> {
        let result = {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::Viewport);
            if st.viewport_failures > 0 {
                st.viewport_failures -= 1;
                Err(ServiceError::new("viewport unavailable"))
            } else {
                st.viewport
                    .ok_or_else(|| ServiceError::new("map has no viewport yet"))
            }
        };
        Box::pin(async move { result })
    }

    fn subscribe(&self) -> broadcast::Receiver<MapEvent> {
        self.events.subscribe()
    }

    fn create_overlay(
        &self,
        geometry: OverlayGeometry,
        _style: OverlayStyle,
    ) -> BoxFuture<'_, ServiceResult<CreatedOverlay>> {
        let geoid = geometry
            .features
            .first()
            .and_then(|f| f.properties.get("GEOID"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let (delay, fail, n) = {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::CreateOverlay {
                geoid: geoid.clone(),
            });
            let delay = st.create_delays.pop_front().unwrap_or_default();
            let fail = st.create_failures > 0;
            if fail {
                st.create_failures -= 1;
            }
            st.next_overlay += 1;
            (delay, fail, st.next_overlay)
        };

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(ServiceError::new("overlay creation rejected"));
            }

            let created = CreatedOverlay {
                layer_ids: vec![
                    LayerId::new(format!("overlay-{n}-fill")),
                    LayerId::new(format!("overlay-{n}-line")),
                ],
                group_id: Some(LayerId::new(format!("overlay-{n}"))),
            };
            let mut st = self.state.lock();
            for id in created.layer_ids.iter().chain(created.group_id.iter()) {
                st.layers.insert(
                    id.clone(),
                    LayerRecord {
                        name: format!("highlight {}", geoid.as_deref().unwrap_or("?")),
                        visible: true,
                        kind: LayerKind::Overlay,
                        style: None,
                    },
                );
            }
            debug!(overlay = n, "overlay created");
            Ok(created)
        })
    }

    fn delete_layer(&self, id: LayerId) -> BoxFuture<'_, ServiceResult<()>> {
        let delay = {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::DeleteLayer(id.clone()));
            st.delete_delays.pop_front().unwrap_or_default()
        };
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut st = self.state.lock();
            if st.delete_failures.contains(&id) {
                Err(ServiceError::new(format!("delete of {id} rejected")))
            } else if st.layers.remove(&id).is_some() {
                st.features.remove(&id);
                Ok(())
            } else {
                Err(ServiceError::new(format!("no layer {id}")))
            }
        })
    }

    fn set_layer_visibility(&self, change: VisibilityChange) -> BoxFuture<'_, ServiceResult<()>> {
        {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::SetVisibility(change.clone()));
            for id in &change.hide {
                if let Some(layer) = st.layers.get_mut(id) {
                    layer.visible = false;
                }
            }
            for id in &change.show {
                if let Some(layer) = st.layers.get_mut(id) {
                    layer.visible = true;
                }
            }
        }
        // Re-rendering is instantaneous here.
        self.emit(MapEvent::Idle);
        Box::pin(async { Ok(()) })
    }

    fn duplicate_layer(&self, id: LayerId) -> BoxFuture<'_, ServiceResult<LayerId>> {
        let result = {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::DuplicateLayer(id.clone()));
            if st.duplicate_failures > 0 {
                st.duplicate_failures -= 1;
                Err(ServiceError::new(format!("duplicate of {id} rejected")))
            } else if let Some(original) = st.layers.get(&id).cloned() {
                st.next_copy += 1;
                let copy = LayerId::new(format!("{id}-copy-{}", st.next_copy));
                let features = st.features.get(&id).cloned().unwrap_or_default();
                st.layers.insert(
                    copy.clone(),
                    LayerRecord {
                        kind: LayerKind::Copy,
                        ..original
                    },
                );
                st.features.insert(copy.clone(), features);
                debug!(source = %id, layer = %copy, "layer duplicated");
                Ok(copy)
            } else {
                Err(ServiceError::new(format!("no layer {id}")))
            }
        };
        Box::pin(async move { result })
    }

    fn rename_layer(&self, id: LayerId, name: String) -> BoxFuture<'_, ServiceResult<()>> {
        let result = {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::RenameLayer {
                id: id.clone(),
                name: name.clone(),
            });
            match st.layers.get_mut(&id) {
                Some(layer) => {
                    layer.name = name;
                    Ok(())
                }
                None => Err(ServiceError::new(format!("no layer {id}"))),
            }
        };
        Box::pin(async move { result })
    }

    fn set_layer_style(&self, id: LayerId, style: LayerStyle) -> BoxFuture<'_, ServiceResult<()>> {
        let result = {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::SetLayerStyle {
                id: id.clone(),
                attribute: style.config.numeric_attribute.clone(),
            });
            match st.layers.get_mut(&id) {
                Some(layer) => {
                    layer.style = Some(style);
                    Ok(())
                }
                None => Err(ServiceError::new(format!("no layer {id}"))),
            }
        };
        Box::pin(async move { result })
    }

    fn layers(&self) -> BoxFuture<'_, ServiceResult<Vec<LayerInfo>>> {
        self.record(ServiceCall::Layers);
        let layers = self
            .state
            .lock()
            .layers
            .iter()
            .map(|(id, l)| LayerInfo {
                id: id.clone(),
                name: l.name.clone(),
                visible: l.visible,
            })
            .collect();
        Box::pin(async move { Ok(layers) })
    }

    fn rendered_features(
        &self,
        layer: LayerId,
    ) -> BoxFuture<'_, ServiceResult<Vec<RenderedFeature>>> {
        let result = {
            let mut st = self.state.lock();
            st.calls.push(ServiceCall::RenderedFeatures(layer.clone()));
            match st.layers.get(&layer) {
                None => Err(ServiceError::new(format!("no layer {layer}"))),
                Some(l) if !l.visible => Ok(Vec::new()),
                Some(_) => Ok(st.features.get(&layer).cloned().unwrap_or_default()),
            }
        };
        Box::pin(async move { result })
    }
}
