//! Full bipartite edges between adjacent layers.
//!
//! Every visible unit of layer `i` connects to every visible unit of layer `i + 1`.
//! There are no skip connections. Each edge carries the unweighted mean of its two
//! layers' relative importance.

use crate::architecture::Architecture;
use crate::layout::{LayoutConfig, UnitId};
use serde::{Deserialize, Serialize};

/// A directed connection between two visible units of adjacent layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualEdge {
    /// Unit in layer `i`.
    pub source: UnitId,

    /// Unit in layer `i + 1`.
    pub target: UnitId,

    /// Mean of the two layers' relative importance.
    pub importance: f64,
}

impl VisualEdge {
    /// Whether the edge starts or ends at `unit`.
    pub fn touches(&self, unit: UnitId) -> bool {
        self.source == unit || self.target == unit
    }

    /// The endpoint opposite to `unit`, if the edge touches it.
    pub fn other_end(&self, unit: UnitId) -> Option<UnitId> {
        if self.source == unit {
            Some(self.target)
        } else if self.target == unit {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Builds the edge set for an architecture.
///
/// ```
/// use synapse_viz::{build_edges, Architecture, LayerBuilder, LayerType, LayoutConfig};
///
/// let arch = Architecture::new("t")
///     .with_layer(LayerBuilder::new("a", LayerType::Input).neurons(4).build())
///     .with_layer(LayerBuilder::new("b", LayerType::Dense).neurons(3).build())
///     .with_layer(LayerBuilder::new("c", LayerType::Output).neurons(2).build());
///
/// assert_eq!(build_edges(&arch, &LayoutConfig::default()).len(), 4 * 3 + 3 * 2);
/// ```
pub fn build_edges(arch: &Architecture, config: &LayoutConfig) -> Vec<VisualEdge> {
    let mut edges = Vec::with_capacity(expected_edge_count(arch, config));
    for (i, pair) in arch.layers.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        let importance = (from.relative_importance + to.relative_importance) / 2.0;
        for s in 0..config.visible_units(from) {
            for t in 0..config.visible_units(to) {
                edges.push(VisualEdge {
                    source: UnitId::new(i, s),
                    target: UnitId::new(i + 1, t),
                    importance,
                });
            }
        }
    }
    edges
}

/// Closed-form edge count: `Σ visible[i] × visible[i + 1]`.
pub fn expected_edge_count(arch: &Architecture, config: &LayoutConfig) -> usize {
    arch.layers
        .windows(2)
        .map(|pair| config.visible_units(&pair[0]) * config.visible_units(&pair[1]))
        .sum()
}
