//! Keeps the visible GEOID set in step with the map viewport.

use std::sync::Arc;

use foundation::BoundsIndex;
use parking_lot::RwLock;
use plot::{ViewportApprox, VisibleSet, visible_geoids};
use runtime::Generation;
use service::{MapEvent, MapService};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Recomputes the viewport filter on demand and on every move-end.
///
/// Only the bounds index is kept between computations. Every filter pass
/// reads the viewport afresh, and a pass whose read was overtaken by a newer
/// one does not publish. Results are published on a `watch` channel.
pub struct ViewportTracker<S: ?Sized> {
    service: Arc<S>,
    approx: ViewportApprox,
    index: RwLock<Arc<BoundsIndex>>,
    reads: Generation,
    visible: watch::Sender<VisibleSet>,
}

impl<S> ViewportTracker<S>
where
    S: MapService + ?Sized + 'static,
{
    pub fn new(service: Arc<S>, approx: ViewportApprox) -> Self {
        let (visible, _) = watch::channel(VisibleSet::All);
        Self {
            service,
            approx,
            index: RwLock::new(Arc::default()),
            reads: Generation::new(),
            visible,
        }
    }

    pub fn visible(&self) -> VisibleSet {
        self.visible.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<VisibleSet> {
        self.visible.subscribe()
    }

    /// Replaces the bounds index and refilters against a fresh viewport
    /// read. The same index is a no-op.
    pub async fn set_index(&self, index: Arc<BoundsIndex>) -> VisibleSet {
        {
            let mut current = self.index.write();
            if Arc::ptr_eq(&*current, &index) {
                return self.visible();
            }
            *current = index;
        }
        self.refresh().await
    }

    /// Reads the viewport and refilters. A failed read disables filtering.
    pub async fn refresh(&self) -> VisibleSet {
        let ticket = self.reads.advance();
        let viewport = match self.service.viewport().await {
            Ok(vp) => Some(vp),
            Err(err) => {
                warn!("viewport read failed; showing all points: {err}");
                None
            }
        };
        let index = Arc::clone(&*self.index.read());
        let visible = visible_geoids(viewport.as_ref(), &index, self.approx);
        if self.reads.is_current(ticket) {
            self.publish(visible.clone());
        } else {
            debug!("viewport read overtaken; not publishing");
        }
        visible
    }

    /// Refreshes on every [`MapEvent::ViewportMoveEnd`] from `events` until
    /// the stream closes or the task is aborted.
    pub fn listen(self: &Arc<Self>, mut events: broadcast::Receiver<MapEvent>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(MapEvent::ViewportMoveEnd) => {
                        this.refresh().await;
                    }
                    Ok(MapEvent::Idle) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "viewport events lagged; refreshing");
                        this.refresh().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn publish(&self, visible: VisibleSet) {
        if let VisibleSet::Only(set) = &visible {
            debug!(visible = set.len(), "visible set updated");
        }
        self.visible.send_replace(visible);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use foundation::{Aabb2, BoundsIndex, GeoId, LatLng, Viewport};
    use plot::{ViewportApprox, VisibleSet};
    use pretty_assertions::assert_eq;
    use service::{InMemoryMapService, MapService, ServiceCall};

    use super::ViewportTracker;

    fn index() -> Arc<BoundsIndex> {
        Arc::new(
            [
                ("near", Some(Aabb2::from_lng_lat([-0.5, -0.5, 0.5, 0.5]))),
                ("far", Some(Aabb2::from_lng_lat([40.0, 40.0, 41.0, 41.0]))),
            ]
            .into_iter()
            .map(|(g, b)| (GeoId::from(g), b))
            .collect(),
        )
    }

    fn only(ids: &[&str]) -> VisibleSet {
        VisibleSet::Only(ids.iter().map(|g| GeoId::from(*g)).collect::<HashSet<_>>())
    }

    fn vp(lat: f64, lng: f64) -> Viewport {
        Viewport::new(LatLng::new(lat, lng), 8.0)
    }

    #[tokio::test]
    async fn refresh_filters_with_current_index() {
        let svc = Arc::new(InMemoryMapService::with_viewport(vp(0.0, 0.0)));
        let tracker = ViewportTracker::new(svc, ViewportApprox::default());
        assert_eq!(tracker.refresh().await, VisibleSet::All);

        assert_eq!(tracker.set_index(index()).await, only(&["near"]));
        assert_eq!(tracker.visible(), only(&["near"]));
    }

    #[tokio::test]
    async fn index_swap_reads_the_viewport_again() {
        let svc = Arc::new(InMemoryMapService::with_viewport(vp(0.0, 0.0)));
        let tracker = ViewportTracker::new(Arc::clone(&svc), ViewportApprox::default());
        let first = index();
        tracker.set_index(Arc::clone(&first)).await;
        assert_eq!(tracker.visible(), only(&["near"]));

        // No listener: the move is only seen through a fresh read.
        svc.set_viewport(vp(40.5, 40.5));
        svc.clear_calls();
        tracker.set_index(Arc::clone(&first)).await;
        assert!(svc.calls().is_empty());
        assert_eq!(tracker.visible(), only(&["near"]));

        tracker.set_index(index()).await;
        assert_eq!(svc.calls(), vec![ServiceCall::Viewport]);
        assert_eq!(tracker.visible(), only(&["far"]));
    }

    #[tokio::test]
    async fn viewport_failure_means_no_filter() {
        let svc = Arc::new(InMemoryMapService::with_viewport(vp(0.0, 0.0)));
        let tracker = ViewportTracker::new(Arc::clone(&svc), ViewportApprox::default());
        tracker.set_index(index()).await;
        assert_eq!(tracker.visible(), only(&["near"]));

        svc.fail_next_viewport_reads(1);
        assert_eq!(tracker.refresh().await, VisibleSet::All);
    }

    #[tokio::test]
    async fn move_end_triggers_refresh() {
        let svc = Arc::new(InMemoryMapService::with_viewport(vp(0.0, 0.0)));
        let tracker = Arc::new(ViewportTracker::new(
            Arc::clone(&svc),
            ViewportApprox::default(),
        ));
        tracker.set_index(index()).await;
        let task = tracker.listen(svc.subscribe());
        let mut updates = tracker.subscribe();

        svc.set_viewport(vp(40.5, 40.5));
        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow_and_update(), only(&["far"]));
        task.abort();
    }
}
