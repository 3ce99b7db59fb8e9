use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in geographic degrees.
///
/// `min = [min_lng, min_lat]`, `max = [max_lng, max_lat]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Build from the map service's `[min_lng, min_lat, max_lng, max_lat]` layout.
    pub fn from_lng_lat(b: [f64; 4]) -> Self {
        Aabb2::new([b[0], b[1]], [b[2], b[3]])
    }

    pub fn to_lng_lat(self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }

    /// Rectangle of the given spans centered on `center` (`[lng, lat]`).
    pub fn centered(center: [f64; 2], lng_span: f64, lat_span: f64) -> Self {
        let hw = lng_span / 2.0;
        let hh = lat_span / 2.0;
        Aabb2::new(
            [center[0] - hw, center[1] - hh],
            [center[0] + hw, center[1] + hh],
        )
    }

    /// Separating-axis overlap test. Shared edges count as overlapping.
    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.max[0] >= other.min[0]
            && self.min[0] <= other.max[0]
            && self.max[1] >= other.min[1]
            && self.min[1] <= other.max[1]
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        ]
    }

    /// Closed counter-clockwise polygon ring (`[lng, lat]` pairs, first == last).
    pub fn ring(&self) -> [[f64; 2]; 5] {
        let [x0, y0] = self.min;
        let [x1, y1] = self.max;
        [[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
    }
}

impl From<[f64; 4]> for Aabb2 {
    fn from(b: [f64; 4]) -> Self {
        Aabb2::from_lng_lat(b)
    }
}

impl From<Aabb2> for [f64; 4] {
    fn from(b: Aabb2) -> Self {
        b.to_lng_lat()
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;

    #[test]
    fn overlap_and_separation() {
        let feature = Aabb2::from_lng_lat([-1.0, -1.0, 1.0, 1.0]);
        assert!(feature.intersects(&Aabb2::from_lng_lat([-2.0, -2.0, 2.0, 2.0])));
        assert!(!feature.intersects(&Aabb2::from_lng_lat([10.0, 10.0, 20.0, 20.0])));
    }

    #[test]
    fn touching_edges_intersect() {
        let a = Aabb2::from_lng_lat([0.0, 0.0, 1.0, 1.0]);
        let b = Aabb2::from_lng_lat([1.0, 0.5, 2.0, 2.0]);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn ring_is_closed() {
        let r = Aabb2::from_lng_lat([1.0, 2.0, 3.0, 4.0]).ring();
        assert_eq!(r[0], r[4]);
        assert_eq!(r[2], [3.0, 4.0]);
    }

    #[test]
    fn serde_uses_flat_array() {
        let b: Aabb2 = serde_json::from_str("[1.0, 2.0, 3.0, 4.0]").unwrap();
        assert_eq!(b.min, [1.0, 2.0]);
        assert_eq!(b.max, [3.0, 4.0]);
    }
}
