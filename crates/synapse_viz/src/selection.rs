//! Hover, pin and search state, and the visual weights derived from it.
//!
//! The pinned unit and the pinned layer always change together, so they live in a
//! single tagged [`Inspection`] value instead of two loosely coupled fields. The
//! inspector shows the pinned layer if there is one, otherwise the hovered layer.
//!
//! Every derivation in this module is pure given the current [`SelectionState`]:
//!
//! - [`SelectionState::is_search_match`]: empty query, or name/type contains the
//!   query case-insensitively.
//! - [`SelectionState::is_edge_highlighted`]: a unit is selected and the edge touches it.
//! - [`SelectionState::is_unit_highlighted`]: nothing selected, or the unit is the
//!   selected one or one of its direct neighbours.
//! - [`SelectionState::unit_weight`] / [`SelectionState::edge_weight`]: opacity and
//!   stroke width under one of three exclusive [`Regime`]s.
//!
//! # Examples
//!
//! ```
//! use synapse_viz::{Inspection, SelectionState, UnitId};
//!
//! let mut state = SelectionState::default();
//! state.hover("dense_1");
//! assert_eq!(state.active_layer_id(), Some("dense_1"));
//!
//! let unit = UnitId::new(1, 0);
//! state.toggle_unit(unit, "dense_1");
//! assert_eq!(state.selected_unit(), Some(unit));
//!
//! // Selecting the same unit again clears pin and selection together.
//! state.toggle_unit(unit, "dense_1");
//! assert_eq!(state.inspection, Inspection::None);
//! ```

use crate::architecture::Layer;
use crate::edges::VisualEdge;
use crate::layout::UnitId;
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which layer (and possibly which unit) the user is inspecting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inspection {
    /// Nothing hovered or pinned.
    #[default]
    None,

    /// The pointer rests over a unit of this layer.
    Hovered {
        /// Id of the hovered layer.
        layer_id: String,
    },

    /// A unit was clicked and stays selected; its layer is pinned.
    Pinned {
        /// The selected unit.
        unit: UnitId,
        /// Id of the pinned layer.
        layer_id: String,
    },
}

/// The three exclusive ways visual weights are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// A unit is pinned; its neighbourhood is highlighted, the rest fades out.
    Selection,
    /// A non-empty query is active; matches are accentuated.
    Search,
    /// Everything is drawn with opacity proportional to importance.
    Idle,
}

/// Opacity and stroke attributes for one node, edge or label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualWeight {
    /// Opacity in `[0, 1]`.
    pub opacity: f64,

    /// Stroke width (edges) or outline width (units).
    pub stroke_width: f64,

    /// Draw the glow marker (selection regime highlight).
    pub glow: bool,

    /// Draw with the accent style (search regime match).
    pub accent: bool,
}

impl VisualWeight {
    fn new(opacity: f64, stroke_width: f64) -> Self {
        Self {
            opacity: opacity.clamp(0.0, 1.0),
            stroke_width: stroke_width.max(0.0),
            glow: false,
            accent: false,
        }
    }

    fn glowing(mut self) -> Self {
        self.glow = true;
        self
    }

    fn accented(mut self) -> Self {
        self.accent = true;
        self
    }
}

/// Opacity of elements outside the selected neighbourhood.
pub const SELECTION_DIM_OPACITY: f64 = 0.08;

/// Opacity of elements not matching the search query.
pub const SEARCH_DIM_OPACITY: f64 = 0.2;

/// The interaction state the engine derives highlighting from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    /// Hover / pin state.
    pub inspection: Inspection,

    /// Free-text search query, as typed.
    pub search_query: String,
}

impl SelectionState {
    /// Records the pointer entering a unit of `layer_id`.
    ///
    /// A pinned unit keeps precedence, so hovering while pinned changes nothing.
    /// Returns whether the state changed.
    pub fn hover(&mut self, layer_id: &str) -> bool {
        match &self.inspection {
            Inspection::Pinned { .. } => false,
            Inspection::Hovered { layer_id: current } if current == layer_id => false,
            _ => {
                self.inspection = Inspection::Hovered {
                    layer_id: layer_id.to_string(),
                };
                true
            }
        }
    }

    /// Records the pointer leaving a unit.
    pub fn leave(&mut self) -> bool {
        if matches!(self.inspection, Inspection::Hovered { .. }) {
            self.inspection = Inspection::None;
            true
        } else {
            false
        }
    }

    /// Pins `unit`, or unpins it if it is already the selected unit.
    pub fn toggle_unit(&mut self, unit: UnitId, layer_id: &str) {
        self.inspection = match &self.inspection {
            Inspection::Pinned { unit: current, .. } if *current == unit => Inspection::None,
            _ => Inspection::Pinned {
                unit,
                layer_id: layer_id.to_string(),
            },
        };
    }

    /// Clears pin and selection together. Returns whether anything was pinned.
    pub fn clear(&mut self) -> bool {
        if matches!(self.inspection, Inspection::Pinned { .. }) {
            self.inspection = Inspection::None;
            true
        } else {
            false
        }
    }

    /// Replaces the search query. Returns whether it changed.
    pub fn set_query(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        if query == self.search_query {
            return false;
        }
        self.search_query = query;
        true
    }

    /// The selected unit, if a unit is pinned.
    pub fn selected_unit(&self) -> Option<UnitId> {
        match &self.inspection {
            Inspection::Pinned { unit, .. } => Some(*unit),
            _ => None,
        }
    }

    /// The pinned layer id, if any.
    pub fn pinned_layer_id(&self) -> Option<&str> {
        match &self.inspection {
            Inspection::Pinned { layer_id, .. } => Some(layer_id.as_str()),
            _ => None,
        }
    }

    /// The layer the inspector should show: pinned, else hovered, else none.
    pub fn active_layer_id(&self) -> Option<&str> {
        match &self.inspection {
            Inspection::Pinned { layer_id, .. } | Inspection::Hovered { layer_id } => {
                Some(layer_id.as_str())
            }
            Inspection::None => None,
        }
    }

    /// Selection beats search, search beats idle.
    pub fn regime(&self) -> Regime {
        if self.selected_unit().is_some() {
            Regime::Selection
        } else if !self.search_query.is_empty() {
            Regime::Search
        } else {
            Regime::Idle
        }
    }

    /// True if the query is empty or the layer's name or type contains it,
    /// ignoring case.
    pub fn is_search_match(&self, layer: &Layer) -> bool {
        if self.search_query.is_empty() {
            return true;
        }
        let query = self.search_query.to_lowercase();
        layer.name.to_lowercase().contains(&query) || layer.layer_type.as_str().contains(&query)
    }

    /// True only when a unit is selected and the edge touches it.
    pub fn is_edge_highlighted(&self, edge: &VisualEdge) -> bool {
        self.selected_unit().is_some_and(|unit| edge.touches(unit))
    }

    /// True for every unit when nothing is selected; otherwise true for the selected
    /// unit and its one-edge neighbours.
    pub fn is_unit_highlighted(&self, unit: UnitId, scene: &Scene) -> bool {
        match self.selected_unit() {
            None => true,
            Some(selected) if selected == unit => true,
            Some(selected) => scene.edges_for_unit(selected).any(|e| e.other_end(selected) == Some(unit)),
        }
    }

    /// The selected unit and its neighbours, or `None` when nothing is selected.
    pub fn highlighted_units(&self, scene: &Scene) -> Option<HashSet<UnitId>> {
        let selected = self.selected_unit()?;
        let mut set: HashSet<UnitId> = scene.neighbors(selected).collect();
        set.insert(selected);
        Some(set)
    }

    /// Visual weight of a unit.
    ///
    /// `highlighted` is [`is_unit_highlighted`](Self::is_unit_highlighted) and
    /// `matched` is [`is_search_match`](Self::is_search_match) for its layer.
    pub fn unit_weight(&self, highlighted: bool, matched: bool, importance: f64) -> VisualWeight {
        match self.regime() {
            Regime::Selection if highlighted => VisualWeight::new(1.0, 2.5).glowing(),
            Regime::Selection => VisualWeight::new(SELECTION_DIM_OPACITY, 1.0),
            Regime::Search if matched => VisualWeight::new(1.0, 2.0).accented(),
            Regime::Search => VisualWeight::new(SEARCH_DIM_OPACITY, 1.0),
            Regime::Idle => VisualWeight::new(0.4 + 0.6 * importance, 1.0),
        }
    }

    /// Visual weight of an edge.
    ///
    /// Under search, an edge is accentuated only when both of its layers match.
    pub fn edge_weight(&self, edge: &VisualEdge, both_ends_match: bool) -> VisualWeight {
        match self.regime() {
            Regime::Selection if self.is_edge_highlighted(edge) => {
                VisualWeight::new(0.9, 1.5 + edge.importance).glowing()
            }
            Regime::Selection => VisualWeight::new(SELECTION_DIM_OPACITY / 2.0, 0.5),
            Regime::Search if both_ends_match => VisualWeight::new(0.5, 1.0 + edge.importance).accented(),
            Regime::Search => VisualWeight::new(SEARCH_DIM_OPACITY / 4.0, 0.5),
            Regime::Idle => VisualWeight::new(0.05 + 0.35 * edge.importance, 0.5 + 1.5 * edge.importance),
        }
    }

    /// Visual weight of a layer label. `highlighted` means the layer holds a
    /// highlighted unit.
    pub fn label_weight(&self, highlighted: bool, matched: bool) -> VisualWeight {
        match self.regime() {
            Regime::Selection if highlighted => VisualWeight::new(1.0, 0.0),
            Regime::Selection => VisualWeight::new(0.3, 0.0),
            Regime::Search if matched => VisualWeight::new(1.0, 0.0).accented(),
            Regime::Search => VisualWeight::new(0.3, 0.0),
            Regime::Idle => VisualWeight::new(1.0, 0.0),
        }
    }
}

/// Plain data handed to the inspector panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorData {
    /// The active layer.
    pub layer: Layer,

    /// Position of the layer in input order.
    pub layer_index: usize,

    /// `round(relative_importance × 100)`.
    pub score: i64,

    /// Whether the layer is pinned (as opposed to hovered).
    pub pinned: bool,
}

impl InspectorData {
    /// Builds inspector data for a layer.
    pub fn new(layer: &Layer, layer_index: usize, pinned: bool) -> Self {
        Self {
            layer: layer.clone(),
            layer_index,
            score: importance_score(layer.relative_importance),
            pinned,
        }
    }
}

/// Percentage score shown by the inspector.
///
/// ```
/// assert_eq!(synapse_viz::importance_score(0.756), 76);
/// assert_eq!(synapse_viz::importance_score(0.0), 0);
/// ```
pub fn importance_score(relative_importance: f64) -> i64 {
    (relative_importance * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::{LayerBuilder, LayerType};

    fn layer(name: &str, layer_type: LayerType) -> Layer {
        LayerBuilder::new(name, layer_type).name(name).build()
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let state = SelectionState::default();
        for t in LayerType::ALL {
            assert!(state.is_search_match(&layer("anything", t)));
        }
    }

    #[test]
    fn test_search_matches_name_or_type_case_insensitive() {
        let mut state = SelectionState::default();
        state.set_query("CONV");
        assert!(state.is_search_match(&layer("Feature Extractor", LayerType::Convolution)));
        assert!(state.is_search_match(&layer("conv_block", LayerType::Dense)));
        assert!(!state.is_search_match(&layer("Classifier", LayerType::Output)));
    }

    #[test]
    fn test_query_is_matched_as_typed() {
        let mut state = SelectionState::default();
        state.set_query("dense ");
        assert_eq!(state.regime(), Regime::Search);
        assert!(!state.is_search_match(&layer("x", LayerType::Dense)));
        assert!(state.is_search_match(&layer("dense head", LayerType::Output)));

        state.set_query("   ");
        assert_eq!(state.regime(), Regime::Search);
        assert!(!state.is_search_match(&layer("x", LayerType::Pooling)));
    }

    #[test]
    fn test_toggle_twice_clears() {
        let mut state = SelectionState::default();
        let unit = UnitId::new(0, 3);
        state.toggle_unit(unit, "l0");
        assert_eq!(state.pinned_layer_id(), Some("l0"));
        state.toggle_unit(unit, "l0");
        assert_eq!(state.selected_unit(), None);
        assert_eq!(state.pinned_layer_id(), None);
    }

    #[test]
    fn test_toggle_other_unit_moves_pin() {
        let mut state = SelectionState::default();
        state.toggle_unit(UnitId::new(0, 0), "l0");
        state.toggle_unit(UnitId::new(1, 2), "l1");
        assert_eq!(state.selected_unit(), Some(UnitId::new(1, 2)));
        assert_eq!(state.pinned_layer_id(), Some("l1"));
    }

    #[test]
    fn test_pinned_takes_precedence_over_hover() {
        let mut state = SelectionState::default();
        state.toggle_unit(UnitId::new(0, 0), "l0");
        assert!(!state.hover("l2"));
        assert_eq!(state.active_layer_id(), Some("l0"));
        assert!(!state.leave());
        assert_eq!(state.active_layer_id(), Some("l0"));
    }

    #[test]
    fn test_hover_and_leave() {
        let mut state = SelectionState::default();
        assert!(state.hover("l1"));
        assert!(!state.hover("l1"));
        assert_eq!(state.active_layer_id(), Some("l1"));
        assert!(state.leave());
        assert_eq!(state.active_layer_id(), None);
    }

    #[test]
    fn test_clear_only_affects_pin() {
        let mut state = SelectionState::default();
        assert!(!state.clear());
        state.toggle_unit(UnitId::new(0, 0), "l0");
        assert!(state.clear());
        assert_eq!(state.inspection, Inspection::None);
    }

    #[test]
    fn test_selection_beats_search() {
        let mut state = SelectionState::default();
        state.set_query("dense");
        assert_eq!(state.regime(), Regime::Search);
        state.toggle_unit(UnitId::new(0, 0), "l0");
        assert_eq!(state.regime(), Regime::Selection);
    }

    #[test]
    fn test_edge_highlight_requires_selection() {
        let edge = VisualEdge {
            source: UnitId::new(0, 0),
            target: UnitId::new(1, 0),
            importance: 0.5,
        };
        let mut state = SelectionState::default();
        assert!(!state.is_edge_highlighted(&edge));
        state.toggle_unit(UnitId::new(1, 0), "l1");
        assert!(state.is_edge_highlighted(&edge));
        state.toggle_unit(UnitId::new(1, 1), "l1");
        assert!(!state.is_edge_highlighted(&edge));
    }

    #[test]
    fn test_weights_per_regime() {
        let mut state = SelectionState::default();
        let idle_low = state.unit_weight(true, true, 0.0);
        let idle_high = state.unit_weight(true, true, 1.0);
        assert!(idle_low.opacity < idle_high.opacity);
        assert!(!idle_high.glow && !idle_high.accent);

        state.set_query("x");
        assert!(state.unit_weight(true, true, 0.5).accent);
        assert_eq!(state.unit_weight(true, false, 0.5).opacity, SEARCH_DIM_OPACITY);

        state.toggle_unit(UnitId::new(0, 0), "l0");
        let lit = state.unit_weight(true, false, 0.5);
        assert_eq!(lit.opacity, 1.0);
        assert!(lit.glow);
        assert_eq!(state.unit_weight(false, true, 0.5).opacity, SELECTION_DIM_OPACITY);
    }

    #[test]
    fn test_out_of_range_importance_is_clamped() {
        let state = SelectionState::default();
        assert_eq!(state.unit_weight(true, true, 7.0).opacity, 1.0);
        assert_eq!(state.unit_weight(true, true, -3.0).opacity, 0.0);
    }

    #[test]
    fn test_inspector_score() {
        let l = LayerBuilder::new("l", LayerType::Dense).importance(0.875).build();
        let data = InspectorData::new(&l, 2, true);
        assert_eq!(data.score, 88);
        assert!(data.pinned);
    }

    #[test]
    fn test_inspection_serialization() {
        let json = serde_json::to_string(&Inspection::Pinned {
            unit: UnitId::new(1, 2),
            layer_id: "l1".into(),
        })
        .unwrap();
        assert!(json.contains("\"kind\":\"pinned\""));
        assert!(json.contains("\"layer_id\":\"l1\""));
    }
}
