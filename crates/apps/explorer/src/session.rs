//! One explorer session: the variable store, the plotted pair, the viewport
//! filter and the hover highlight, wired against a single map service.

use std::collections::HashMap;
use std::sync::Arc;

use foundation::{Aabb2, BoundsIndex, GeoId, LayerId, VariableId};
use layers::{HighlightManager, HoverOutcome, choropleth_style};
use plot::{AxisSelection, HoverTracker, PlotFrame, SurfaceEvent, Tooltip, VisibleSet};
use service::{BoxFuture, MapService, ServiceError, VisibilityChange, wait_for_idle};
use store::ingest::{
    AttributeRef, SourceLayer, reference_layers, variables_from_features,
};
use store::{NewVariable, StoreError, Variable, VariableList, VariableStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ExplorerConfig;
use crate::legend::{LegendEntry, legend_entries};
use crate::tracker::ViewportTracker;

#[derive(Debug)]
pub enum SessionError {
    Service(ServiceError),
    Store(StoreError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Service(err) => write!(f, "map service error: {err}"),
            SessionError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Service(err) => Some(err),
            SessionError::Store(err) => Some(err),
        }
    }
}

impl From<ServiceError> for SessionError {
    fn from(err: ServiceError) -> Self {
        SessionError::Service(err)
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Store(err)
    }
}

pub struct Explorer<S: ?Sized> {
    service: Arc<S>,
    config: ExplorerConfig,
    store: VariableStore,
    selection: AxisSelection,
    tracker: Arc<ViewportTracker<S>>,
    listener: Option<JoinHandle<()>>,
    highlight: HighlightManager<S>,
    hover: HoverTracker,
    frame: PlotFrame,
}

impl<S> Explorer<S>
where
    S: MapService + ?Sized + 'static,
{
    pub fn new(service: Arc<S>, config: ExplorerConfig) -> Self {
        let tracker = Arc::new(ViewportTracker::new(Arc::clone(&service), config.viewport));
        let highlight = HighlightManager::new(Arc::clone(&service), &config.highlight);
        Self {
            service,
            config,
            store: VariableStore::new(),
            selection: AxisSelection::new(),
            tracker,
            listener: None,
            highlight,
            hover: HoverTracker::new(),
            frame: PlotFrame::empty(plot::EmptyState::NeedTwoVariables),
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Filters once against the current viewport, then follows move-end
    /// notifications until [`Explorer::shutdown`].
    pub async fn activate(&mut self) {
        if self.listener.is_some() {
            return;
        }
        let events = self.service.subscribe();
        self.tracker.refresh().await;
        self.listener = Some(self.tracker.listen(events));
        info!("explorer activated");
    }

    /// Geography layers on the map that variables can be read from.
    pub async fn discover_sources(&self) -> Result<Vec<SourceLayer>, SessionError> {
        let layers = self.service.layers().await?;
        let sources = reference_layers(&layers, &self.config.geo_types);
        debug!(layers = layers.len(), sources = sources.len(), "discovered sources");
        Ok(sources)
    }

    /// Reads `attributes` from the rendered features of `source` and adds one
    /// variable per attribute, each backed by its own styled copy of the
    /// source layer.
    ///
    /// The source layer is shown for the read. Afterwards it is hidden along
    /// with every other variable layer, and the last variable added becomes
    /// the shown one.
    pub async fn add_variables(
        &mut self,
        source: &SourceLayer,
        attributes: &[AttributeRef],
    ) -> Result<Vec<VariableId>, SessionError> {
        let mut events = self.service.subscribe();
        self.service
            .set_layer_visibility(VisibilityChange::show([source.id.clone()]))
            .await?;
        if !wait_for_idle(&mut events, self.config.map_idle_timeout()).await {
            debug!(source = %source.id, "map did not report idle; reading features anyway");
        }
        let features = self.service.rendered_features(source.id.clone()).await?;

        let mut ids = Vec::with_capacity(attributes.len());
        let mut newest = None;
        for mut new in variables_from_features(source, &features, attributes) {
            let layer = self.create_variable_layer(&new).await?;
            new.backing_layer_id = Some(layer.clone());
            newest = Some(layer);
            ids.push(self.add_variable(new).await);
        }

        let mut hide: Vec<LayerId> = self
            .store
            .list()
            .iter()
            .filter_map(|v| v.backing_layer_id.clone())
            .filter(|layer| Some(layer) != newest.as_ref())
            .collect();
        hide.push(source.id.clone());
        self.service
            .set_layer_visibility(VisibilityChange {
                show: newest.into_iter().collect(),
                hide,
            })
            .await?;
        if let Some(last) = ids.last() {
            self.store.show_only(*last)?;
        }
        info!(source = %source.id, added = ids.len(), features = features.len(), "variables added");
        Ok(ids)
    }

    pub async fn add_variable(&mut self, new: NewVariable) -> VariableId {
        let id = self.store.add(new);
        self.sync_selection().await;
        id
    }

    /// Removes the variable and, best effort, its backing map layer. If the
    /// shown variable goes, the first remaining one is shown instead.
    pub async fn remove_variable(&mut self, id: VariableId) -> Result<(), SessionError> {
        let removed = self.store.remove(id)?;
        self.sync_selection().await;
        if let Some(layer) = removed.backing_layer_id.clone() {
            if let Err(err) = self.service.delete_layer(layer.clone()).await {
                warn!(layer = %layer, "failed to delete variable layer: {err}");
            }
        }
        if removed.visible {
            let first = self.store.list().first().map(|v| v.id);
            if let Some(first) = first {
                self.show_variable(first).await?;
            }
        }
        Ok(())
    }

    /// Legend selection: show this variable's layer and hide every other one.
    pub async fn show_variable(&mut self, id: VariableId) -> Result<(), SessionError> {
        self.store.show_only(id)?;
        let variables = self.store.list();
        let layer_of = |v: &Arc<Variable>| v.backing_layer_id.clone();
        let hide: Vec<LayerId> = variables
            .iter()
            .filter(|v| v.id != id)
            .filter_map(layer_of)
            .collect();
        let show: Vec<LayerId> = variables
            .iter()
            .filter(|v| v.id == id)
            .filter_map(layer_of)
            .collect();
        let change = VisibilityChange { show, hide };
        if !change.is_empty() {
            if let Err(err) = self.service.set_layer_visibility(change).await {
                warn!(variable = %id, "failed to update layer visibility: {err}");
            }
        }
        Ok(())
    }

    pub async fn select_source(&mut self, source: &LayerId) -> bool {
        let ok = self.selection.select_source(source);
        self.update_index().await;
        ok
    }

    pub async fn set_x_axis(&mut self, id: VariableId) -> bool {
        let ok = self.selection.set_x(id);
        self.update_index().await;
        ok
    }

    pub async fn set_y_axis(&mut self, id: VariableId) -> bool {
        let ok = self.selection.set_y(id);
        self.update_index().await;
        ok
    }

    pub fn selection(&self) -> &AxisSelection {
        &self.selection
    }

    pub fn variables(&self) -> VariableList {
        self.store.list()
    }

    pub fn variable_updates(&self) -> watch::Receiver<VariableList> {
        self.store.subscribe()
    }

    pub fn visible(&self) -> VisibleSet {
        self.tracker.visible()
    }

    pub fn visible_updates(&self) -> watch::Receiver<VisibleSet> {
        self.tracker.subscribe()
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        legend_entries(&self.store.list())
    }

    /// Rebuilds the plot from the current selection and visible set.
    pub fn frame(&mut self) -> &PlotFrame {
        let axes = self
            .selection
            .axes()
            .and_then(|(x, y)| Some((self.store.get(x)?, self.store.get(y)?)));
        self.frame = PlotFrame::build(
            self.store.len(),
            axes.map(|(x, y)| (x.as_ref(), y.as_ref())),
            &self.tracker.visible(),
            &self.config.plot,
        );
        &self.frame
    }

    /// Last frame built by [`Explorer::frame`].
    pub fn current_frame(&self) -> &PlotFrame {
        &self.frame
    }

    /// Hit-tests against the current frame and forwards hover changes to the
    /// highlight manager. Service calls run on their own task, so the pointer
    /// never waits for the map.
    pub fn pointer_moved(&mut self, cursor: [f64; 2]) -> Option<SurfaceEvent> {
        let event = self
            .hover
            .pointer_moved(&self.frame, cursor, self.config.plot.pick_radius)?;
        match &event {
            SurfaceEvent::HoverEnter(geoid) => {
                let request = self.hover_enter(geoid.clone());
                let geoid = geoid.clone();
                tokio::spawn(async move {
                    let outcome = request.await;
                    debug!(geoid = %geoid, ?outcome, "hover highlight settled");
                });
            }
            SurfaceEvent::HoverLeave => self.hover_leave(),
        }
        Some(event)
    }

    pub fn pointer_left(&mut self) -> Option<SurfaceEvent> {
        let event = self.hover.pointer_left()?;
        self.hover_leave();
        Some(event)
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        self.frame.tooltip(self.hover.current()?)
    }

    /// Switches the highlight to `geoid` now; the returned future finishes
    /// the service calls.
    pub fn hover_enter(&self, geoid: GeoId) -> BoxFuture<'static, HoverOutcome> {
        let bounds = self.bounds_of(&geoid);
        self.highlight.hover_enter(geoid, bounds)
    }

    pub fn hover_leave(&self) {
        self.highlight.hover_leave();
    }

    pub fn highlight(&self) -> &HighlightManager<S> {
        &self.highlight
    }

    /// Stops following the viewport and removes any highlight.
    pub async fn shutdown(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.highlight.clear().await;
        info!("explorer shut down");
    }

    fn bounds_of(&self, geoid: &GeoId) -> Option<Aabb2> {
        let (x, y) = self.selection.axes()?;
        [x, y]
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .find_map(|v| v.bounds_of(geoid))
    }

    /// Duplicates the source layer, names it after the variable and applies
    /// the choropleth of its attribute.
    async fn create_variable_layer(&self, new: &NewVariable) -> Result<LayerId, SessionError> {
        let layer = self
            .service
            .duplicate_layer(new.source_layer_id.clone())
            .await?;
        let name = format!("{}: {}", new.source_name, new.attribute_display_name);
        self.service.rename_layer(layer.clone(), name).await?;
        self.service
            .set_layer_style(layer.clone(), choropleth_style(&new.attribute))
            .await?;
        debug!(layer = %layer, attribute = %new.attribute, "variable layer styled");
        Ok(layer)
    }

    async fn sync_selection(&mut self) {
        if self.selection.sync(&self.store.list()) {
            debug!(
                source = ?self.selection.selected_source(),
                x = ?self.selection.x(),
                y = ?self.selection.y(),
                "axis selection changed"
            );
        }
        self.update_index().await;
    }

    /// Points the viewport filter at the bounds of the plotted variables.
    async fn update_index(&self) {
        let index = match self.selection.axes() {
            Some((x, y)) => match (self.store.get(x), self.store.get(y)) {
                (Some(x), Some(y)) => merged_bounds(x, y),
                _ => Arc::default(),
            },
            None => Arc::default(),
        };
        self.tracker.set_index(index).await;
    }
}

/// Variables read together share one index; otherwise x's entries win.
fn merged_bounds(x: &Variable, y: &Variable) -> Arc<BoundsIndex> {
    if Arc::ptr_eq(&x.feature_bounds, &y.feature_bounds) || y.feature_bounds.is_empty() {
        return Arc::clone(&x.feature_bounds);
    }
    if x.feature_bounds.is_empty() {
        return Arc::clone(&y.feature_bounds);
    }
    let mut merged: HashMap<GeoId, Option<Aabb2>> = (*y.feature_bounds).clone();
    merged.extend(
        x.feature_bounds
            .iter()
            .map(|(g, b)| (g.clone(), *b)),
    );
    Arc::new(merged)
}
