//! The derived scene graph: positioned units, edges and layer labels.
//!
//! A [`Scene`] is pure geometry, rebuilt from the architecture whenever it or the
//! viewport changes. A [`RenderedScene`] layers the current [`SelectionState`] on top
//! of it, attaching a [`VisualWeight`] to every element. The renderer, the exporter
//! and the HTTP API all consume the rendered form, so what is exported is exactly
//! what is on screen.
//!
//! # Examples
//!
//! ```
//! use synapse_viz::{Architecture, LayerBuilder, LayerType, LayoutConfig, Scene, Viewport};
//!
//! let arch = Architecture::new("t")
//!     .with_layer(LayerBuilder::new("a", LayerType::Input).neurons(4).build())
//!     .with_layer(LayerBuilder::new("b", LayerType::Dense).neurons(3).build())
//!     .with_layer(LayerBuilder::new("c", LayerType::Output).neurons(2).build());
//!
//! let scene = Scene::build(&arch, Viewport::default(), &LayoutConfig::default());
//! assert_eq!(scene.stats().node_count, 9);
//! assert_eq!(scene.stats().edge_count, 18);
//! ```

use crate::architecture::Architecture;
use crate::edges::{build_edges, VisualEdge};
use crate::layout::{LayoutConfig, UnitId, Viewport, VisualUnit};
use crate::selection::{Regime, SelectionState, VisualWeight};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distance between a layer's topmost unit and its label.
const LABEL_OFFSET: f64 = 30.0;

/// A text label above a layer column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerLabel {
    /// Index of the layer in input order.
    pub layer_index: usize,

    /// Id of the layer.
    pub layer_id: String,

    /// Rendered text, `"<name> (<neurons>)"`.
    pub text: String,

    /// Anchor x (text is centered on it).
    pub x: f64,

    /// Baseline y.
    pub y: f64,
}

/// Counts describing a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStats {
    /// Number of layers (columns).
    pub layer_count: usize,

    /// Number of visible units.
    pub node_count: usize,

    /// Number of edges.
    pub edge_count: usize,
}

/// Positioned geometry for one architecture and viewport.
#[derive(Debug, Clone)]
pub struct Scene {
    /// The viewport the scene was laid out for.
    pub viewport: Viewport,

    /// Units, layer by layer, unit index ascending.
    pub units: Vec<VisualUnit>,

    /// Edges, layer pair by layer pair.
    pub edges: Vec<VisualEdge>,

    /// One label per layer.
    pub labels: Vec<LayerLabel>,

    unit_index: HashMap<UnitId, usize>,
    edges_by_unit: HashMap<UnitId, Vec<usize>>,
}

impl Scene {
    /// Lays out units, edges and labels. Pure and deterministic.
    pub fn build(arch: &Architecture, viewport: Viewport, config: &LayoutConfig) -> Self {
        let units = config.layout_units(arch, &viewport);
        let edges = build_edges(arch, config);
        let count = arch.layers.len();

        let labels = arch
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                let top = config.unit_y(0, config.visible_units(layer), &viewport);
                LayerLabel {
                    layer_index: i,
                    layer_id: layer.id.clone(),
                    text: format!("{} ({})", layer.name, layer.neuron_count),
                    x: config.layer_x(i, count, &viewport),
                    y: top - LABEL_OFFSET,
                }
            })
            .collect();

        let unit_index = units.iter().enumerate().map(|(i, u)| (u.id, i)).collect();
        let mut edges_by_unit: HashMap<UnitId, Vec<usize>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            edges_by_unit.entry(edge.source).or_default().push(i);
            edges_by_unit.entry(edge.target).or_default().push(i);
        }

        Self {
            viewport,
            units,
            edges,
            labels,
            unit_index,
            edges_by_unit,
        }
    }

    /// Looks up a unit by id.
    pub fn unit(&self, id: UnitId) -> Option<&VisualUnit> {
        self.unit_index.get(&id).map(|&i| &self.units[i])
    }

    /// Units of one layer, in unit order.
    pub fn units_in_layer(&self, layer: usize) -> impl Iterator<Item = &VisualUnit> {
        self.units.iter().filter(move |u| u.id.layer == layer)
    }

    /// Edges starting or ending at `id`.
    pub fn edges_for_unit(&self, id: UnitId) -> impl Iterator<Item = &VisualEdge> {
        self.edges_by_unit
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// Units one edge away from `id`.
    pub fn neighbors(&self, id: UnitId) -> impl Iterator<Item = UnitId> + '_ {
        self.edges_for_unit(id).filter_map(move |e| e.other_end(id))
    }

    /// Counts.
    pub fn stats(&self) -> SceneStats {
        SceneStats {
            layer_count: self.labels.len(),
            node_count: self.units.len(),
            edge_count: self.edges.len(),
        }
    }
}

/// A unit with its visual attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedUnit {
    /// Unit id.
    pub id: UnitId,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Circle radius.
    pub radius: f64,
    /// Fill color, from the layer type.
    pub color: String,
    /// Derived opacity and stroke.
    pub weight: VisualWeight,
}

/// An edge with its endpoints resolved and visual attributes attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedEdge {
    /// Source unit.
    pub source: UnitId,
    /// Target unit.
    pub target: UnitId,
    /// Source x.
    pub x1: f64,
    /// Source y.
    pub y1: f64,
    /// Target x.
    pub x2: f64,
    /// Target y.
    pub y2: f64,
    /// Edge importance.
    pub importance: f64,
    /// Whether the edge touches the selected unit.
    pub highlighted: bool,
    /// Derived opacity and stroke.
    pub weight: VisualWeight,
}

/// A layer label with its visual attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedLabel {
    /// The label geometry.
    #[serde(flatten)]
    pub label: LayerLabel,
    /// Derived opacity.
    pub weight: VisualWeight,
}

/// The scene as currently interacted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedScene {
    /// Display name of the architecture.
    pub title: String,
    /// Viewport size.
    pub viewport: Viewport,
    /// Regime the weights were derived under.
    pub regime: Regime,
    /// Units.
    pub units: Vec<RenderedUnit>,
    /// Edges.
    pub edges: Vec<RenderedEdge>,
    /// Labels.
    pub labels: Vec<RenderedLabel>,
    /// Counts.
    pub stats: SceneStats,
}

impl RenderedScene {
    /// Derives visual attributes for every element of `scene`.
    pub fn render(
        scene: &Scene,
        arch: &Architecture,
        selection: &SelectionState,
        config: &LayoutConfig,
    ) -> Self {
        let matches: Vec<bool> = arch.layers.iter().map(|l| selection.is_search_match(l)).collect();
        let highlighted = selection.highlighted_units(scene);
        let is_lit = |id: UnitId| highlighted.as_ref().is_none_or(|set| set.contains(&id));
        let layer_match = |layer: usize| matches.get(layer).copied().unwrap_or(false);

        let units = scene
            .units
            .iter()
            .map(|u| {
                let weight = selection.unit_weight(is_lit(u.id), layer_match(u.id.layer), u.importance);
                let scale = if weight.glow || weight.accent { 1.3 } else { 1.0 };
                RenderedUnit {
                    id: u.id,
                    x: u.x,
                    y: u.y,
                    radius: config.unit_radius * scale,
                    color: arch
                        .layers
                        .get(u.id.layer)
                        .map(|l| l.layer_type.color())
                        .unwrap_or("#64748b")
                        .to_string(),
                    weight,
                }
            })
            .collect();

        let edges = scene
            .edges
            .iter()
            .filter_map(|e| {
                let (s, t) = (scene.unit(e.source)?, scene.unit(e.target)?);
                let both = layer_match(e.source.layer) && layer_match(e.target.layer);
                Some(RenderedEdge {
                    source: e.source,
                    target: e.target,
                    x1: s.x,
                    y1: s.y,
                    x2: t.x,
                    y2: t.y,
                    importance: e.importance,
                    highlighted: selection.is_edge_highlighted(e),
                    weight: selection.edge_weight(e, both),
                })
            })
            .collect();

        let labels = scene
            .labels
            .iter()
            .map(|label| {
                let lit = highlighted
                    .as_ref()
                    .is_none_or(|set| set.iter().any(|id| id.layer == label.layer_index));
                RenderedLabel {
                    label: label.clone(),
                    weight: selection.label_weight(lit, layer_match(label.layer_index)),
                }
            })
            .collect();

        Self {
            title: arch.display_name().to_string(),
            viewport: scene.viewport,
            regime: selection.regime(),
            units,
            edges,
            labels,
            stats: scene.stats(),
        }
    }

    /// Converts the rendered scene into a D3-style `{nodes, links, labels, stats}`
    /// document for browser clients.
    pub fn to_d3_json(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "viewport": self.viewport,
            "regime": self.regime,
            "nodes": self.units.iter().map(|u| {
                serde_json::json!({
                    "id": u.id.to_string(),
                    "layer": u.id.layer,
                    "unit": u.id.unit,
                    "x": u.x,
                    "y": u.y,
                    "r": u.radius,
                    "color": u.color,
                    "opacity": u.weight.opacity,
                    "glow": u.weight.glow,
                    "accent": u.weight.accent,
                })
            }).collect::<Vec<_>>(),
            "links": self.edges.iter().map(|e| {
                serde_json::json!({
                    "source": e.source.to_string(),
                    "target": e.target.to_string(),
                    "importance": e.importance,
                    "highlighted": e.highlighted,
                    "opacity": e.weight.opacity,
                    "width": e.weight.stroke_width,
                })
            }).collect::<Vec<_>>(),
            "labels": self.labels,
            "stats": self.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::{LayerBuilder, LayerType};

    fn three_layer() -> Architecture {
        Architecture::new("t")
            .with_layer(LayerBuilder::new("a", LayerType::Input).name("Input").neurons(4).importance(0.2).build())
            .with_layer(LayerBuilder::new("b", LayerType::Dense).name("Hidden").neurons(3).importance(0.8).build())
            .with_layer(LayerBuilder::new("c", LayerType::Output).name("Out").neurons(2).importance(0.6).build())
    }

    fn scene(arch: &Architecture) -> Scene {
        Scene::build(arch, Viewport::default(), &LayoutConfig::default())
    }

    #[test]
    fn test_counts() {
        let stats = scene(&three_layer()).stats();
        assert_eq!(stats, SceneStats { layer_count: 3, node_count: 9, edge_count: 18 });
    }

    #[test]
    fn test_empty_architecture() {
        let s = Scene::build(&Architecture::default(), Viewport::default(), &LayoutConfig::default());
        assert_eq!(s.stats(), SceneStats::default());
    }

    #[test]
    fn test_neighbors_are_adjacent_layers_only() {
        let s = scene(&three_layer());
        let mut n: Vec<UnitId> = s.neighbors(UnitId::new(1, 0)).collect();
        n.sort();
        assert_eq!(n.len(), 4 + 2);
        assert!(n.iter().all(|id| id.layer == 0 || id.layer == 2));
        assert_eq!(s.neighbors(UnitId::new(0, 0)).count(), 3);
    }

    #[test]
    fn test_lookup() {
        let s = scene(&three_layer());
        assert!(s.unit(UnitId::new(2, 1)).is_some());
        assert!(s.unit(UnitId::new(2, 2)).is_none());
        assert_eq!(s.units_in_layer(0).count(), 4);
        assert_eq!(s.edges_for_unit(UnitId::new(9, 9)).count(), 0);
    }

    #[test]
    fn test_labels() {
        let s = scene(&three_layer());
        assert_eq!(s.labels[1].text, "Hidden (3)");
        let top = s.units_in_layer(1).map(|u| u.y).fold(f64::INFINITY, f64::min);
        assert_eq!(s.labels[1].y, top - LABEL_OFFSET);
    }

    #[test]
    fn test_render_idle_has_no_glow() {
        let arch = three_layer();
        let s = scene(&arch);
        let r = RenderedScene::render(&s, &arch, &SelectionState::default(), &LayoutConfig::default());
        assert_eq!(r.regime, Regime::Idle);
        assert!(r.units.iter().all(|u| !u.weight.glow));
        assert_eq!(r.edges.len(), 18);
    }

    #[test]
    fn test_render_selection_highlights_neighbourhood() {
        let arch = three_layer();
        let s = scene(&arch);
        let mut sel = SelectionState::default();
        sel.toggle_unit(UnitId::new(0, 0), "a");
        let r = RenderedScene::render(&s, &arch, &sel, &LayoutConfig::default());
        let glowing: Vec<_> = r.units.iter().filter(|u| u.weight.glow).map(|u| u.id).collect();
        assert_eq!(glowing.len(), 1 + 3);
        assert_eq!(r.edges.iter().filter(|e| e.highlighted).count(), 3);
        assert!(r.labels[2].weight.opacity < 1.0);
    }

    #[test]
    fn test_render_search_accents_matching_layers() {
        let arch = three_layer();
        let s = scene(&arch);
        let mut sel = SelectionState::default();
        sel.set_query("hidden");
        let r = RenderedScene::render(&s, &arch, &sel, &LayoutConfig::default());
        assert_eq!(r.units.iter().filter(|u| u.weight.accent).count(), 3);
        assert!(r.edges.iter().all(|e| !e.weight.accent));
        assert!(r.labels[1].weight.accent);
    }

    #[test]
    fn test_d3_json() {
        let arch = three_layer();
        let s = scene(&arch);
        let r = RenderedScene::render(&s, &arch, &SelectionState::default(), &LayoutConfig::default());
        let json = r.to_d3_json();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 9);
        assert_eq!(json["links"].as_array().unwrap().len(), 18);
        assert_eq!(json["nodes"][0]["id"], "L0U0");
    }
}
