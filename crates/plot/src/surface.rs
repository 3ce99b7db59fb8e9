use foundation::GeoId;
use serde::{Deserialize, Serialize};
use store::Variable;

use crate::format::format_value;
use crate::join::join;
use crate::scale::{LinearScale, domain_or};
use crate::visibility::VisibleSet;

/// Fill used for every point mark.
pub const POINT_FILL: &str = "#4f8ef7";
pub const POINT_OPACITY: f32 = 0.7;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Pixel geometry of the chart area.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotLayout {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub tick_count: usize,
    /// Hover hit radius around a mark, in pixels.
    pub pick_radius: f64,
}

impl Default for PlotLayout {
    fn default() -> Self {
        Self {
            width: 480.0,
            height: 360.0,
            margin: Margin {
                top: 16.0,
                right: 24.0,
                bottom: 48.0,
                left: 48.0,
            },
            tick_count: 5,
            pick_radius: 6.0,
        }
    }
}

impl PlotLayout {
    pub fn x_range(&self) -> [f64; 2] {
        [self.margin.left, self.width - self.margin.right]
    }

    /// Screen y grows downwards, so larger values map to smaller y.
    pub fn y_range(&self) -> [f64; 2] {
        [self.height - self.margin.bottom, self.margin.top]
    }
}

/// Why nothing is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyState {
    NeedTwoVariables,
    SelectAxes,
    NoMatches,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NeedTwoVariables => "Add at least 2 variables to plot",
            EmptyState::SelectAxes => "Select X and Y axes above",
            EmptyState::NoMatches => "No matching GEOIDs found between the selected variables",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mark {
    pub geoid: GeoId,
    pub x: f64,
    pub y: f64,
    /// Pixel position inside the layout.
    pub px: f64,
    pub py: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: f64,
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub label: String,
    pub scale: LinearScale,
    pub ticks: Vec<Tick>,
}

impl Axis {
    fn new(label: &str, domain: [f64; 2], range: [f64; 2], tick_count: usize) -> Self {
        let scale = LinearScale::new(domain, range);
        let ticks = scale
            .ticks(tick_count)
            .into_iter()
            .map(|value| Tick {
                value,
                position: scale.apply(value),
                label: format_value(value),
            })
            .collect();
        Self {
            label: label.to_string(),
            scale,
            ticks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub geoid: GeoId,
    pub lines: Vec<String>,
}

/// Everything a renderer needs for one scatterplot draw.
///
/// Ordering contract:
/// - `marks` are sorted by GEOID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotFrame {
    pub marks: Vec<Mark>,
    pub x_axis: Option<Axis>,
    pub y_axis: Option<Axis>,
    pub empty: Option<EmptyState>,
}

impl PlotFrame {
    pub fn empty(state: EmptyState) -> Self {
        Self {
            marks: Vec::new(),
            x_axis: None,
            y_axis: None,
            empty: Some(state),
        }
    }

    /// Join, filter to the visible set, then scale into `layout`.
    ///
    /// Axis domains come from the visible points. If the viewport hides every
    /// joined point the stored min/max of each variable is used instead and
    /// the frame has axes but no marks.
    pub fn build(
        variable_count: usize,
        axes: Option<(&Variable, &Variable)>,
        visible: &VisibleSet,
        layout: &PlotLayout,
    ) -> Self {
        if variable_count < 2 {
            return Self::empty(EmptyState::NeedTwoVariables);
        }
        let Some((xv, yv)) = axes else {
            return Self::empty(EmptyState::SelectAxes);
        };

        let mut points = join(&xv.data, &yv.data);
        if points.is_empty() {
            return Self::empty(EmptyState::NoMatches);
        }
        points.retain(|p| visible.contains(&p.geoid));

        let x_domain = domain_or(points.iter().map(|p| p.x), [xv.min, xv.max]);
        let y_domain = domain_or(points.iter().map(|p| p.y), [yv.min, yv.max]);
        let x_axis = Axis::new(
            &xv.attribute_display_name,
            x_domain,
            layout.x_range(),
            layout.tick_count,
        );
        let y_axis = Axis::new(
            &yv.attribute_display_name,
            y_domain,
            layout.y_range(),
            layout.tick_count,
        );

        let marks = points
            .into_iter()
            .map(|p| Mark {
                px: x_axis.scale.apply(p.x),
                py: y_axis.scale.apply(p.y),
                geoid: p.geoid,
                x: p.x,
                y: p.y,
            })
            .collect();

        Self {
            marks,
            x_axis: Some(x_axis),
            y_axis: Some(y_axis),
            empty: None,
        }
    }

    pub fn mark(&self, geoid: &GeoId) -> Option<&Mark> {
        self.marks
            .binary_search_by(|m| m.geoid.cmp(geoid))
            .ok()
            .map(|i| &self.marks[i])
    }

    pub fn tooltip(&self, geoid: &GeoId) -> Option<Tooltip> {
        let mark = self.mark(geoid)?;
        let x_label = self.x_axis.as_ref().map_or("x", |a| a.label.as_str());
        let y_label = self.y_axis.as_ref().map_or("y", |a| a.label.as_str());
        Some(Tooltip {
            geoid: mark.geoid.clone(),
            lines: vec![
                format!("GEOID: {}", mark.geoid),
                format!("{x_label}: {}", format_value(mark.x)),
                format!("{y_label}: {}", format_value(mark.y)),
            ],
        })
    }
}
