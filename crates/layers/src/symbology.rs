use service::{LayerStyle, OverlayStyle, StyleConfig, StyleLegend, StylePaint, StyleSteps};

/// Sequential yellow-green-blue ramp, light to dark.
pub const CHOROPLETH_COLORS: [&str; 5] = ["#ffffcc", "#a1dab4", "#41b6c4", "#2c7fb8", "#253494"];

/// Number of quantile bins in a variable layer's choropleth.
pub const CHOROPLETH_STEPS: u32 = CHOROPLETH_COLORS.len() as u32;
pub const CHOROPLETH_OPACITY: f32 = 0.8;
pub const CHOROPLETH_STROKE_COLOR: &str = "#cccccc";
pub const CHOROPLETH_STROKE_WIDTH: f32 = 0.5;

/// Default hover overlay color.
pub const HIGHLIGHT_COLOR: &str = "#ff6b00";
pub const HIGHLIGHT_FILL_OPACITY: f32 = 0.3;
pub const HIGHLIGHT_STROKE_WIDTH: f32 = 2.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Parses `#rrggbb` (leading `#` optional).
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// Component-wise interpolation, `t` clamped to `[0, 1]`.
pub fn lerp_color(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Rgb([
        mix(a.0[0], b.0[0]),
        mix(a.0[1], b.0[1]),
        mix(a.0[2], b.0[2]),
    ])
}

/// Color of `v` on `ramp` for a `[min, max]` domain.
///
/// Values outside the domain clamp to the ends. A degenerate domain maps
/// everything to the middle stop. Unparseable stops read as black.
pub fn value_to_color(v: f64, min: f64, max: f64, ramp: &[&str]) -> Rgb {
    let stops: Vec<Rgb> = ramp
        .iter()
        .map(|s| Rgb::parse(s).unwrap_or_default())
        .collect();
    let Some(last) = stops.len().checked_sub(1) else {
        return Rgb::default();
    };
    if last == 0 {
        return stops[0];
    }
    if !(max > min) || !v.is_finite() {
        return stops[last / 2];
    }

    let pos = ((v - min) / (max - min)).clamp(0.0, 1.0) * last as f64;
    let i = (pos.floor() as usize).min(last - 1);
    lerp_color(stops[i], stops[i + 1], pos - i as f64)
}

/// Quantile choropleth of `attribute` over [`CHOROPLETH_COLORS`], applied to
/// each variable's map layer.
pub fn choropleth_style(attribute: &str) -> LayerStyle {
    LayerStyle {
        version: "2.3".to_string(),
        kind: "numeric".to_string(),
        config: StyleConfig {
            numeric_attribute: attribute.to_string(),
            steps: StyleSteps {
                kind: "quantiles".to_string(),
                count: CHOROPLETH_STEPS,
            },
        },
        legend: StyleLegend {
            display_name: "auto".to_string(),
        },
        paint: StylePaint {
            color: CHOROPLETH_COLORS.iter().map(|c| c.to_string()).collect(),
            opacity: vec![CHOROPLETH_OPACITY],
            stroke_color: vec![CHOROPLETH_STROKE_COLOR.to_string()],
            stroke_width: vec![CHOROPLETH_STROKE_WIDTH],
        },
    }
}

/// Paint for the hover bounding-box overlay.
pub fn highlight_style(color: &str) -> OverlayStyle {
    OverlayStyle {
        color: color.to_string(),
        fill_opacity: HIGHLIGHT_FILL_OPACITY,
        stroke_width: HIGHLIGHT_STROKE_WIDTH,
    }
}
