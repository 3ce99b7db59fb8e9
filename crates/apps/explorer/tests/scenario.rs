use std::sync::Arc;
use std::time::Duration;

use explorer::{Explorer, ExplorerConfig};
use foundation::{Aabb2, GeoId, LatLng, LayerId, Viewport};
use plot::{EmptyState, SurfaceEvent, VisibleSet};
use pretty_assertions::assert_eq;
use serde_json::json;
use service::{InMemoryMapService, RenderedFeature};
use store::ingest::{AttributeRef, SourceLayer};

fn feature(props: serde_json::Value, bbox: Option<[f64; 4]>) -> RenderedFeature {
    RenderedFeature {
        properties: props.as_object().cloned().unwrap_or_default(),
        bbox: bbox.map(Aabb2::from_lng_lat),
    }
}

fn counties() -> SourceLayer {
    SourceLayer {
        id: LayerId::from("counties"),
        name: "Counties".to_string(),
    }
}

fn attrs() -> Vec<AttributeRef> {
    vec![AttributeRef::new("pop"), AttributeRef::new("income")]
}

fn viewport(lat: f64, lng: f64) -> Viewport {
    Viewport::new(LatLng::new(lat, lng), 8.0)
}

#[tokio::test]
async fn single_shared_geoid_plots_at_center() {
    let svc = Arc::new(InMemoryMapService::new());
    svc.add_source_layer(
        LayerId::from("counties"),
        "Counties",
        vec![
            feature(json!({"GEOID": "06001", "pop": 100, "income": 5}), None),
            feature(json!({"GEOID": "06002", "pop": 200}), None),
        ],
    );
    let mut ex = Explorer::new(Arc::clone(&svc), ExplorerConfig::default());
    // No viewport on the map: filtering is disabled rather than empty.
    ex.activate().await;
    assert_eq!(ex.visible(), VisibleSet::All);

    let ids = ex.add_variables(&counties(), &attrs()).await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(!svc.is_visible(&LayerId::from("counties")));
    assert_eq!(ex.selection().axes(), Some((ids[0], ids[1])));

    let layout = ex.config().plot;
    let frame = ex.frame();
    assert_eq!(frame.empty, None);
    assert_eq!(frame.marks.len(), 1);
    let mark = &frame.marks[0];
    assert_eq!(mark.geoid, GeoId::from("06001"));
    assert_eq!((mark.x, mark.y), (100.0, 5.0));
    let [x0, x1] = layout.x_range();
    let [y0, y1] = layout.y_range();
    assert_eq!(mark.px, (x0 + x1) / 2.0);
    assert_eq!(mark.py, (y0 + y1) / 2.0);

    let legend = ex.legend();
    assert_eq!(legend[0].label, "Counties: income");
    assert!(legend[0].visible);
    assert!(!legend[1].visible);
    ex.shutdown().await;
}

#[tokio::test]
async fn empty_states_follow_variable_set() {
    let svc = Arc::new(InMemoryMapService::new());
    svc.add_source_layer(
        LayerId::from("counties"),
        "Counties",
        vec![
            feature(json!({"GEOID": "1", "pop": 1}), None),
            feature(json!({"GEOID": "2", "income": 2}), None),
        ],
    );
    let mut ex = Explorer::new(Arc::clone(&svc), ExplorerConfig::default());
    assert_eq!(ex.frame().empty, Some(EmptyState::NeedTwoVariables));

    ex.add_variables(&counties(), &attrs()).await.unwrap();
    let frame = ex.frame();
    assert_eq!(frame.empty, Some(EmptyState::NoMatches));
    assert_eq!(
        frame.empty.map(EmptyState::message),
        Some("No matching GEOIDs found between the selected variables")
    );
}

#[tokio::test]
async fn axes_rescale_as_the_viewport_moves() {
    let svc = Arc::new(InMemoryMapService::with_viewport(viewport(0.0, 0.0)));
    svc.add_source_layer(
        LayerId::from("counties"),
        "Counties",
        vec![
            feature(
                json!({"GEOID": "a", "pop": 1, "income": 10}),
                Some([-0.5, -0.5, 0.5, 0.5]),
            ),
            feature(
                json!({"GEOID": "b", "pop": 2, "income": 20}),
                Some([1.0, 0.0, 1.5, 0.5]),
            ),
            feature(
                json!({"GEOID": "c", "pop": 100, "income": 1000}),
                Some([40.0, 40.0, 41.0, 41.0]),
            ),
        ],
    );
    let mut ex = Explorer::new(Arc::clone(&svc), ExplorerConfig::default());
    ex.activate().await;
    ex.add_variables(&counties(), &attrs()).await.unwrap();

    let frame = ex.frame();
    assert_eq!(frame.marks.len(), 2);
    assert_eq!(frame.x_axis.as_ref().unwrap().scale.domain, [1.0, 2.0]);
    assert_eq!(frame.y_axis.as_ref().unwrap().scale.domain, [10.0, 20.0]);

    let mut updates = ex.visible_updates();
    svc.set_viewport(viewport(40.5, 40.5));
    updates.changed().await.unwrap();
    let frame = ex.frame();
    assert_eq!(frame.marks.len(), 1);
    assert_eq!(frame.marks[0].geoid, GeoId::from("c"));
    assert_eq!(frame.x_axis.as_ref().unwrap().scale.domain, [100.0, 100.0]);

    svc.set_viewport(viewport(-60.0, -60.0));
    updates.changed().await.unwrap();
    let frame = ex.frame();
    assert!(frame.marks.is_empty());
    assert_eq!(frame.empty, None);
    // Nothing visible: stored bounds take over.
    assert_eq!(frame.x_axis.as_ref().unwrap().scale.domain, [1.0, 100.0]);
    ex.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pointer_hover_round_trip() {
    let svc = Arc::new(InMemoryMapService::with_viewport(viewport(0.0, 0.0)));
    svc.add_source_layer(
        LayerId::from("counties"),
        "Counties",
        vec![
            feature(
                json!({"GEOID": "a", "pop": 1500, "income": 10}),
                Some([-0.5, -0.5, 0.5, 0.5]),
            ),
            feature(
                json!({"GEOID": "b", "pop": 2500, "income": 20}),
                Some([1.0, 0.0, 1.5, 0.5]),
            ),
        ],
    );
    let mut ex = Explorer::new(Arc::clone(&svc), ExplorerConfig::default());
    ex.activate().await;
    ex.add_variables(&counties(), &attrs()).await.unwrap();
    let target = ex.frame().marks[0].clone();

    let event = ex.pointer_moved([target.px + 1.0, target.py]);
    assert_eq!(event, Some(SurfaceEvent::HoverEnter(GeoId::from("a"))));
    // Let the spawned highlight request reach the service.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(svc.overlay_ids().len(), 3);
    assert_eq!(
        ex.tooltip().unwrap().lines,
        vec![
            "GEOID: a".to_string(),
            "pop: 1.5k".to_string(),
            "income: 10".to_string(),
        ]
    );

    // Jitter on the same mark: no new service traffic.
    svc.clear_calls();
    assert_eq!(ex.pointer_moved([target.px, target.py + 1.0]), None);
    assert!(svc.calls().is_empty());

    assert_eq!(ex.pointer_left(), Some(SurfaceEvent::HoverLeave));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(svc.overlay_ids().len(), 3);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(svc.overlay_ids().is_empty());
    ex.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pointer_is_not_held_up_by_a_slow_highlight() {
    let svc = Arc::new(InMemoryMapService::with_viewport(viewport(0.0, 0.0)));
    svc.add_source_layer(
        LayerId::from("counties"),
        "Counties",
        vec![
            feature(
                json!({"GEOID": "a", "pop": 1, "income": 10}),
                Some([-0.5, -0.5, 0.5, 0.5]),
            ),
            feature(
                json!({"GEOID": "b", "pop": 2, "income": 20}),
                Some([1.0, 0.0, 1.5, 0.5]),
            ),
        ],
    );
    let mut ex = Explorer::new(Arc::clone(&svc), ExplorerConfig::default());
    ex.activate().await;
    ex.add_variables(&counties(), &attrs()).await.unwrap();
    let frame = ex.frame().clone();
    let (a, b) = (frame.marks[0].clone(), frame.marks[1].clone());

    svc.push_create_delay(Duration::from_millis(400));
    let started = tokio::time::Instant::now();
    assert_eq!(
        ex.pointer_moved([a.px, a.py]),
        Some(SurfaceEvent::HoverEnter(GeoId::from("a")))
    );
    // a's create is now in flight.
    tokio::task::yield_now().await;
    assert_eq!(ex.pointer_left(), Some(SurfaceEvent::HoverLeave));
    assert_eq!(
        ex.pointer_moved([b.px, b.py]),
        Some(SurfaceEvent::HoverEnter(GeoId::from("b")))
    );
    assert_eq!(started.elapsed(), Duration::ZERO);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(ex.highlight().current(), Some(GeoId::from("b")));
    let b_overlay = svc.overlay_ids();
    assert_eq!(b_overlay.len(), 3);

    // a's late create lands and is removed again; b's overlay is untouched.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(svc.overlay_ids(), b_overlay);
    assert_eq!(ex.highlight().current(), Some(GeoId::from("b")));
    ex.shutdown().await;
}

#[tokio::test]
async fn shutdown_clears_highlight() {
    let svc = Arc::new(InMemoryMapService::with_viewport(viewport(0.0, 0.0)));
    svc.add_source_layer(
        LayerId::from("counties"),
        "Counties",
        vec![
            feature(
                json!({"GEOID": "a", "pop": 1, "income": 10}),
                Some([-0.5, -0.5, 0.5, 0.5]),
            ),
            feature(
                json!({"GEOID": "b", "pop": 2, "income": 20}),
                Some([1.0, 0.0, 1.5, 0.5]),
            ),
        ],
    );
    let mut ex = Explorer::new(Arc::clone(&svc), ExplorerConfig::default());
    ex.activate().await;
    ex.add_variables(&counties(), &attrs()).await.unwrap();
    ex.hover_enter(GeoId::from("b")).await;
    assert_eq!(svc.overlay_ids().len(), 3);

    ex.shutdown().await;
    assert!(svc.overlay_ids().is_empty());
}
