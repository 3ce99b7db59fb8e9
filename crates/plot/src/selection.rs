use std::sync::Arc;

use foundation::{LayerId, VariableId};
use serde::Serialize;
use store::Variable;

/// Variables read from the same geography layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceGroup {
    pub source_layer_id: LayerId,
    pub source_name: String,
    /// Member ids in store order.
    pub members: Vec<VariableId>,
}

impl SourceGroup {
    /// A group needs two variables to make a scatterplot.
    pub fn is_plottable(&self) -> bool {
        self.members.len() >= 2
    }

    pub fn contains(&self, id: VariableId) -> bool {
        self.members.contains(&id)
    }
}

/// Groups variables by source layer, ordered by first appearance.
pub fn group_by_source(variables: &[Arc<Variable>]) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    for v in variables {
        match groups
            .iter_mut()
            .find(|g| g.source_layer_id == v.source_layer_id)
        {
            Some(g) => g.members.push(v.id),
            None => groups.push(SourceGroup {
                source_layer_id: v.source_layer_id.clone(),
                source_name: v.source_name.clone(),
                members: vec![v.id],
            }),
        }
    }
    groups
}

/// Which source group and which two variables are plotted.
///
/// Invariants after every [`AxisSelection::sync`]:
/// - `selected_source` names a plottable group, or is `None` if none exists.
/// - `x` and `y` are members of the selected group, or `None`.
/// - `x != y` whenever the group has at least two members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AxisSelection {
    groups: Vec<SourceGroup>,
    selected_source: Option<LayerId>,
    x: Option<VariableId>,
    y: Option<VariableId>,
}

impl AxisSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derives groups from the current variable list and repairs the
    /// selection. Returns `true` if the selected source or either axis changed.
    pub fn sync(&mut self, variables: &[Arc<Variable>]) -> bool {
        let before = (self.selected_source.clone(), self.x, self.y);
        self.groups = group_by_source(variables);

        let still_plottable = self
            .selected_group()
            .is_some_and(SourceGroup::is_plottable);
        if !still_plottable {
            let first = self
                .plottable_groups()
                .next()
                .map(|g| g.source_layer_id.clone());
            self.selected_source = first;
        }
        self.repair_axes();

        before != (self.selected_source.clone(), self.x, self.y)
    }

    pub fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    pub fn plottable_groups(&self) -> impl Iterator<Item = &SourceGroup> + '_ {
        self.groups.iter().filter(|g| g.is_plottable())
    }

    pub fn selected_source(&self) -> Option<&LayerId> {
        self.selected_source.as_ref()
    }

    pub fn selected_group(&self) -> Option<&SourceGroup> {
        let id = self.selected_source.as_ref()?;
        self.groups.iter().find(|g| &g.source_layer_id == id)
    }

    /// Switches to another plottable group; axes are re-picked from it.
    pub fn select_source(&mut self, source: &LayerId) -> bool {
        let ok = self
            .groups
            .iter()
            .any(|g| &g.source_layer_id == source && g.is_plottable());
        if ok && self.selected_source.as_ref() != Some(source) {
            self.selected_source = Some(source.clone());
            self.repair_axes();
        }
        ok
    }

    /// Returns `false` (and changes nothing) if `id` is outside the selected group.
    pub fn set_x(&mut self, id: VariableId) -> bool {
        if !self.in_selected(id) {
            return false;
        }
        self.x = Some(id);
        true
    }

    pub fn set_y(&mut self, id: VariableId) -> bool {
        if !self.in_selected(id) {
            return false;
        }
        self.y = Some(id);
        true
    }

    pub fn x(&self) -> Option<VariableId> {
        self.x
    }

    pub fn y(&self) -> Option<VariableId> {
        self.y
    }

    /// Both axes set, distinct, and inside the selected group.
    pub fn can_plot(&self) -> bool {
        self.axes().is_some()
    }

    pub fn axes(&self) -> Option<(VariableId, VariableId)> {
        let (x, y) = (self.x?, self.y?);
        (x != y && self.in_selected(x) && self.in_selected(y)).then_some((x, y))
    }

    fn in_selected(&self, id: VariableId) -> bool {
        self.selected_group().is_some_and(|g| g.contains(id))
    }

    fn repair_axes(&mut self) {
        let members: Vec<VariableId> = self
            .selected_group()
            .map(|g| g.members.clone())
            .unwrap_or_default();
        let valid = |id: Option<VariableId>| id.filter(|id| members.contains(id));
        let first_other = |other: VariableId| members.iter().copied().find(|m| *m != other);

        match (valid(self.x), valid(self.y)) {
            (Some(_), Some(_)) => {}
            (Some(x), None) => {
                self.y = first_other(x).or(Some(x));
            }
            (None, Some(y)) => {
                self.x = first_other(y).or(Some(y));
            }
            (None, None) => {
                self.x = members.first().copied();
                self.y = members.get(1).or(members.first()).copied();
            }
        }
    }
}
