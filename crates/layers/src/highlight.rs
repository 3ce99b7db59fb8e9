//! Hover highlight overlay.
//!
//! At most one bounding-box overlay exists on the map at a time. Hovering a
//! point replaces it, leaving removes it after a short debounce so that
//! sliding between neighbouring points does not flash the map.
//!
//! Ordering contract:
//! - The previous overlay's deletes are issued before the next create.
//! - A create that completes after a newer enter/leave is deleted right away
//!   and never becomes the current overlay.
//! - A leave followed by an enter of the same GEOID inside the leave delay
//!   produces no service calls at all.
//! - State transitions happen when `hover_enter` / `hover_leave` are called,
//!   not when the returned future is polled, so calls take effect in call
//!   order even when their futures run on separate tasks.

use std::sync::Arc;
use std::time::Duration;

use foundation::{Aabb2, GeoId, LayerId};
use futures_util::future::join_all;
use parking_lot::Mutex;
use runtime::{DebounceTicket, Debouncer, Generation};
use serde::{Deserialize, Serialize};
use service::{BoxFuture, MapService, OverlayGeometry, OverlayStyle};
use tracing::{debug, warn};

use crate::symbology::{
    HIGHLIGHT_COLOR, HIGHLIGHT_FILL_OPACITY, HIGHLIGHT_STROKE_WIDTH, highlight_style,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub leave_delay_ms: u64,
    pub color: String,
    pub fill_opacity: f32,
    pub stroke_width: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            leave_delay_ms: 150,
            color: HIGHLIGHT_COLOR.to_string(),
            fill_opacity: HIGHLIGHT_FILL_OPACITY,
            stroke_width: HIGHLIGHT_STROKE_WIDTH,
        }
    }
}

impl HighlightConfig {
    pub fn leave_delay(&self) -> Duration {
        Duration::from_millis(self.leave_delay_ms)
    }

    pub fn style(&self) -> OverlayStyle {
        OverlayStyle {
            fill_opacity: self.fill_opacity,
            stroke_width: self.stroke_width,
            ..highlight_style(&self.color)
        }
    }
}

/// What the manager believes is on the map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// A create for this GEOID is in flight.
    Pending(GeoId),
    Active { geoid: GeoId, layers: Vec<LayerId> },
}

impl Phase {
    pub fn target(&self) -> Option<&GeoId> {
        match self {
            Phase::Idle => None,
            Phase::Pending(g) | Phase::Active { geoid: g, .. } => Some(g),
        }
    }

    fn into_layers(self) -> Vec<LayerId> {
        match self {
            Phase::Active { layers, .. } => layers,
            _ => Vec::new(),
        }
    }
}

/// Result of a [`HighlightManager::hover_enter`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    Created,
    /// Already showing (or creating) this GEOID.
    Unchanged,
    /// A newer hover or leave took over while this one was in flight.
    Superseded,
    /// The GEOID has no bounding box; the previous overlay was still removed.
    NoBounds,
    /// The service rejected the create.
    Failed,
}

struct Shared<S: ?Sized> {
    phase: Mutex<Phase>,
    generation: Generation,
    leave: Debouncer,
    leave_delay: Duration,
    style: OverlayStyle,
    service: Arc<S>,
}

/// Owns the single hover overlay. Cheap to clone; clones share state.
pub struct HighlightManager<S: ?Sized> {
    shared: Arc<Shared<S>>,
}

impl<S: ?Sized> Clone for HighlightManager<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> HighlightManager<S>
where
    S: MapService + ?Sized + 'static,
{
    pub fn new(service: Arc<S>, config: &HighlightConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                phase: Mutex::new(Phase::Idle),
                generation: Generation::new(),
                leave: Debouncer::new(),
                leave_delay: config.leave_delay(),
                style: config.style(),
                service,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase.lock().clone()
    }

    /// GEOID whose overlay is shown or being created.
    pub fn current(&self) -> Option<GeoId> {
        self.shared.phase.lock().target().cloned()
    }

    /// Shows the overlay for `geoid`, replacing any previous one.
    ///
    /// Any pending leave is cancelled and the target switches before this
    /// returns; the returned future performs the service calls and can be
    /// spawned. Re-entering the current GEOID is a no-op.
    pub fn hover_enter(
        &self,
        geoid: GeoId,
        bounds: Option<Aabb2>,
    ) -> BoxFuture<'static, HoverOutcome> {
        let shared = Arc::clone(&self.shared);
        let (ticket, previous) = {
            let mut phase = shared.phase.lock();
            shared.leave.cancel();
            if phase.target() == Some(&geoid) {
                return Box::pin(std::future::ready(HoverOutcome::Unchanged));
            }
            let previous = std::mem::replace(&mut *phase, Phase::Pending(geoid.clone()));
            (shared.generation.advance(), previous.into_layers())
        };
        Box::pin(async move { shared.show(geoid, bounds, ticket, previous).await })
    }

    /// Schedules removal of the overlay after the leave delay.
    pub fn hover_leave(&self) {
        let phase = self.shared.phase.lock();
        if matches!(*phase, Phase::Idle) {
            return;
        }
        // Scheduled under the phase lock: an enter either cancels this leave
        // or completed its transition before it.
        let shared = Arc::clone(&self.shared);
        self.shared
            .leave
            .schedule(self.shared.leave_delay, move |ticket| async move {
                shared.clear(Some(ticket)).await;
            });
    }

    /// Removes the overlay now, cancelling any pending leave.
    pub async fn clear(&self) {
        self.shared.leave.cancel();
        self.shared.clear(None).await;
    }
}

impl<S> Shared<S>
where
    S: MapService + ?Sized,
{
    async fn show(
        &self,
        geoid: GeoId,
        bounds: Option<Aabb2>,
        ticket: runtime::Ticket,
        previous: Vec<LayerId>,
    ) -> HoverOutcome {
        self.teardown(previous).await;
        if !self.generation.is_current(ticket) {
            return HoverOutcome::Superseded;
        }

        let Some(bounds) = bounds else {
            warn!(geoid = %geoid, "no bounds for hovered feature; skipping highlight");
            self.settle_idle(ticket);
            return HoverOutcome::NoBounds;
        };

        let geometry = OverlayGeometry::from_bounds(&geoid, bounds);
        match self
            .service
            .create_overlay(geometry, self.style.clone())
            .await
        {
            Ok(created) => {
                let layers = created.into_ids();
                let committed = {
                    let mut phase = self.phase.lock();
                    let live = self.generation.is_current(ticket);
                    if live {
                        *phase = Phase::Active {
                            geoid: geoid.clone(),
                            layers: layers.clone(),
                        };
                    }
                    live
                };
                if committed {
                    debug!(geoid = %geoid, layers = layers.len(), "highlight created");
                    HoverOutcome::Created
                } else {
                    debug!(geoid = %geoid, "stale highlight; removing");
                    self.teardown(layers).await;
                    HoverOutcome::Superseded
                }
            }
            Err(err) => {
                warn!(geoid = %geoid, "failed to create highlight overlay: {err}");
                self.settle_idle(ticket);
                HoverOutcome::Failed
            }
        }
    }

    async fn clear(&self, ticket: Option<DebounceTicket>) {
        let layers = {
            let mut phase = self.phase.lock();
            if ticket.is_some_and(|t| !t.is_live()) || matches!(*phase, Phase::Idle) {
                return;
            }
            self.generation.advance();
            std::mem::take(&mut *phase).into_layers()
        };
        self.teardown(layers).await;
    }

    /// Back to idle unless a newer operation already owns the state.
    fn settle_idle(&self, ticket: runtime::Ticket) {
        let mut phase = self.phase.lock();
        if self.generation.is_current(ticket) {
            *phase = Phase::Idle;
        }
    }

    /// Best-effort delete; failures are logged and otherwise ignored.
    async fn teardown(&self, layers: Vec<LayerId>) {
        if layers.is_empty() {
            return;
        }
        let results = join_all(layers.into_iter().map(|id| async move {
            let result = self.service.delete_layer(id.clone()).await;
            (id, result)
        }))
        .await;
        for (id, result) in results {
            if let Err(err) = result {
                warn!(layer = %id, "failed to delete highlight layer: {err}");
            }
        }
    }
}
