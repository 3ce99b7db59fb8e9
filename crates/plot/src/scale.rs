use serde::Serialize;

/// Linear map from a value domain to a pixel range.
///
/// A degenerate domain (`min == max`) maps every value to the middle of the
/// range instead of dividing by zero.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct LinearScale {
    pub domain: [f64; 2],
    pub range: [f64; 2],
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, v: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        if d0 == d1 {
            return (r0 + r1) * 0.5;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Evenly spaced "nice" values (1, 2 or 5 times a power of ten) inside
    /// the domain. Roughly `count` values; a degenerate domain yields just
    /// its single value.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let [lo, hi] = ordered(self.domain);
        if !lo.is_finite() || !hi.is_finite() {
            return Vec::new();
        }
        if lo == hi || count == 0 {
            return vec![lo];
        }
        let step = nice_step(hi - lo, count);
        let start = (lo / step).ceil() as i64;
        let stop = (hi / step).floor() as i64;
        (start..=stop).map(|i| i as f64 * step).collect()
    }
}

fn ordered([a, b]: [f64; 2]) -> [f64; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

fn nice_step(span: f64, count: usize) -> f64 {
    let raw = span / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let error = raw / power;
    let factor = if error >= 7.07 {
        10.0
    } else if error >= 3.16 {
        5.0
    } else if error >= 1.41 {
        2.0
    } else {
        1.0
    };
    factor * power
}

/// `[min, max]` of the values, or `fallback` when there are none.
pub fn domain_or(values: impl IntoIterator<Item = f64>, fallback: [f64; 2]) -> [f64; 2] {
    store::stats::min_max(values)
        .map(|(lo, hi)| [lo, hi])
        .unwrap_or(fallback)
}
