use std::sync::Arc;

use foundation::VariableId;
use layers::{CHOROPLETH_COLORS, value_to_color};
use plot::format_value;
use serde::Serialize;
use store::Variable;

/// One row of the variable legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub id: VariableId,
    pub label: String,
    pub visible: bool,
    pub ramp: Vec<String>,
    pub min: f64,
    pub max: f64,
    pub min_label: String,
    pub max_label: String,
}

impl LegendEntry {
    fn from_variable(v: &Variable) -> Self {
        Self {
            id: v.id,
            label: v.display_name(),
            visible: v.visible,
            ramp: CHOROPLETH_COLORS.iter().map(|c| c.to_string()).collect(),
            min: v.min,
            max: v.max,
            min_label: format_value(v.min),
            max_label: format_value(v.max),
        }
    }

    pub fn marker(&self) -> char {
        if self.visible { '\u{25cf}' } else { '\u{25cb}' }
    }

    /// Ramp color for `value` within this variable's stored range.
    pub fn color_for(&self, value: f64) -> String {
        value_to_color(value, self.min, self.max, &CHOROPLETH_COLORS).to_hex()
    }
}

/// Legend rows, newest variable first.
pub fn legend_entries(variables: &[Arc<Variable>]) -> Vec<LegendEntry> {
    variables
        .iter()
        .rev()
        .map(|v| LegendEntry::from_variable(v))
        .collect()
}
