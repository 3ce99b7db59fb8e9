use foundation::{GeoId, ValueMap};
use serde::Serialize;

/// One scatterplot point: the same feature's value on both axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedPoint {
    pub geoid: GeoId,
    pub x: f64,
    pub y: f64,
}

/// Inner join of two variables on GEOID.
///
/// Iterates the smaller map and looks up each key in the larger one, so cost is
/// `O(min(|x|, |y|))` lookups plus the final sort.
///
/// Ordering contract:
/// - Output is sorted by GEOID, independent of hash iteration order.
pub fn join(x: &ValueMap, y: &ValueMap) -> Vec<PairedPoint> {
    let mut out: Vec<PairedPoint> = if x.len() <= y.len() {
        x.iter()
            .filter_map(|(g, &xv)| {
                y.get(g).map(|&yv| PairedPoint {
                    geoid: g.clone(),
                    x: xv,
                    y: yv,
                })
            })
            .collect()
    } else {
        y.iter()
            .filter_map(|(g, &yv)| {
                x.get(g).map(|&xv| PairedPoint {
                    geoid: g.clone(),
                    x: xv,
                    y: yv,
                })
            })
            .collect()
    };
    out.sort_by(|a, b| a.geoid.cmp(&b.geoid));
    out
}

#[cfg(test)]
mod tests {
    use foundation::{GeoId, ValueMap};
    use pretty_assertions::assert_eq;

    use super::{PairedPoint, join};

    fn map(entries: &[(&str, f64)]) -> ValueMap {
        entries.iter().map(|(g, v)| (GeoId::from(*g), *v)).collect()
    }

    fn pt(g: &str, x: f64, y: f64) -> PairedPoint {
        PairedPoint {
            geoid: GeoId::from(g),
            x,
            y,
        }
    }

    #[test]
    fn keeps_only_shared_geoids() {
        let a = map(&[("1", 10.0), ("2", 20.0)]);
        let b = map(&[("1", 5.0), ("3", 9.0)]);
        assert_eq!(join(&a, &b), vec![pt("1", 10.0, 5.0)]);
    }

    #[test]
    fn axis_roles_survive_size_swap() {
        // x is larger than y, so the y map drives iteration.
        let x = map(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let y = map(&[("c", 30.0), ("a", 10.0)]);
        assert_eq!(join(&x, &y), vec![pt("a", 1.0, 10.0), pt("c", 3.0, 30.0)]);
    }

    #[test]
    fn empty_inputs_yield_no_points() {
        assert!(join(&ValueMap::new(), &map(&[("1", 1.0)])).is_empty());
        assert!(join(&map(&[("1", 1.0)]), &map(&[("2", 1.0)])).is_empty());
    }

    #[test]
    fn output_is_sorted_and_repeatable() {
        let x: ValueMap = (0..200)
            .map(|i| (GeoId::new(format!("{i:05}")), i as f64))
            .collect();
        let y: ValueMap = (100..300)
            .map(|i| (GeoId::new(format!("{i:05}")), -(i as f64)))
            .collect();
        let first = join(&x, &y);
        assert_eq!(first.len(), 100);
        assert!(first.windows(2).all(|w| w[0].geoid < w[1].geoid));
        assert_eq!(first, join(&x, &y));
    }
}
