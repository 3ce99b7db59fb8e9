use foundation::GeoId;

use crate::surface::{Mark, PlotFrame};

/// Nearest mark within `radius` pixels of `cursor`.
///
/// Ties resolve to the lower GEOID since marks are GEOID-sorted and only a
/// strictly closer mark replaces the current best.
pub fn pick_mark(frame: &PlotFrame, cursor: [f64; 2], radius: f64) -> Option<&Mark> {
    let r2 = radius * radius;
    let mut best: Option<(&Mark, f64)> = None;
    for mark in &frame.marks {
        let dx = mark.px - cursor[0];
        let dy = mark.py - cursor[1];
        let d2 = dx * dx + dy * dy;
        if d2 > r2 {
            continue;
        }
        match best {
            Some((_, best_d2)) if d2.total_cmp(&best_d2).is_ge() => {}
            _ => best = Some((mark, d2)),
        }
    }
    best.map(|(mark, _)| mark)
}

/// Pointer transitions reported by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    HoverEnter(GeoId),
    HoverLeave,
}

/// Turns raw pointer positions into enter/leave events.
///
/// Only changes are reported: moving within one mark yields nothing, moving
/// straight from one mark to another yields a single `HoverEnter`.
#[derive(Debug, Default)]
pub struct HoverTracker {
    current: Option<GeoId>,
}

impl HoverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&GeoId> {
        self.current.as_ref()
    }

    pub fn pointer_moved(
        &mut self,
        frame: &PlotFrame,
        cursor: [f64; 2],
        radius: f64,
    ) -> Option<SurfaceEvent> {
        let hit = pick_mark(frame, cursor, radius).map(|m| &m.geoid);
        match (hit, &self.current) {
            (Some(g), Some(cur)) if g == cur => None,
            (Some(g), _) => {
                self.current = Some(g.clone());
                Some(SurfaceEvent::HoverEnter(g.clone()))
            }
            (None, Some(_)) => {
                self.current = None;
                Some(SurfaceEvent::HoverLeave)
            }
            (None, None) => None,
        }
    }

    /// The pointer left the surface entirely.
    pub fn pointer_left(&mut self) -> Option<SurfaceEvent> {
        self.current.take().map(|_| SurfaceEvent::HoverLeave)
    }
}

#[cfg(test)]
mod tests {
    use foundation::GeoId;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::surface::{Mark, PlotFrame};

    fn frame(points: &[(&str, f64, f64)]) -> PlotFrame {
        PlotFrame {
            marks: points
                .iter()
                .map(|(g, px, py)| Mark {
                    geoid: GeoId::from(*g),
                    x: 0.0,
                    y: 0.0,
                    px: *px,
                    py: *py,
                })
                .collect(),
            x_axis: None,
            y_axis: None,
            empty: None,
        }
    }

    #[test]
    fn picks_nearest_within_radius() {
        let f = frame(&[("a", 10.0, 10.0), ("b", 14.0, 10.0), ("c", 100.0, 100.0)]);
        assert_eq!(pick_mark(&f, [13.0, 10.0], 6.0).unwrap().geoid.as_str(), "b");
        assert_eq!(pick_mark(&f, [11.0, 10.0], 6.0).unwrap().geoid.as_str(), "a");
        assert!(pick_mark(&f, [50.0, 50.0], 6.0).is_none());
    }

    #[test]
    fn equidistant_prefers_lower_geoid() {
        let f = frame(&[("a", 10.0, 10.0), ("b", 14.0, 10.0)]);
        assert_eq!(pick_mark(&f, [12.0, 10.0], 6.0).unwrap().geoid.as_str(), "a");
    }

    #[test]
    fn tracker_reports_changes_only() {
        let f = frame(&[("a", 10.0, 10.0), ("b", 40.0, 10.0)]);
        let mut t = HoverTracker::new();
        assert_eq!(
            t.pointer_moved(&f, [10.0, 10.0], 6.0),
            Some(SurfaceEvent::HoverEnter(GeoId::from("a")))
        );
        assert_eq!(t.pointer_moved(&f, [11.0, 11.0], 6.0), None);
        assert_eq!(
            t.pointer_moved(&f, [40.0, 10.0], 6.0),
            Some(SurfaceEvent::HoverEnter(GeoId::from("b")))
        );
        assert_eq!(
            t.pointer_moved(&f, [25.0, 60.0], 6.0),
            Some(SurfaceEvent::HoverLeave)
        );
        assert_eq!(t.pointer_moved(&f, [25.0, 61.0], 6.0), None);
        assert_eq!(t.pointer_left(), None);

        t.pointer_moved(&f, [40.0, 10.0], 6.0);
        assert_eq!(t.pointer_left(), Some(SurfaceEvent::HoverLeave));
        assert_eq!(t.current(), None);
    }
}
