//! Layered layout: one column per layer, vertically centered units.
//!
//! The layout is a pure function of the architecture, the viewport and the
//! [`LayoutConfig`]. Calling it twice with unchanged inputs yields bit-identical
//! coordinates, which keeps re-renders stable and lets the exporter reproduce the
//! on-screen scene exactly.
//!
//! Columns are placed by a uniform linear map from `[0, N-1]` to
//! `[padding, width - padding]`; a single layer sits at `padding`. Within a column,
//! the first `min(neuron_count, max_visible_units)` units are spaced evenly around
//! the vertical center.

use crate::architecture::{Architecture, Layer};
use serde::{Deserialize, Serialize};

/// Default horizontal padding on each side of the viewport.
pub const DEFAULT_PADDING: f64 = 80.0;

/// Default vertical distance between two units of a layer.
pub const DEFAULT_UNIT_SPACING: f64 = 35.0;

/// Default cap on units drawn per layer.
pub const DEFAULT_MAX_VISIBLE_UNITS: usize = 10;

/// Tunables for the layered layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal padding in scene units.
    pub padding: f64,

    /// Vertical spacing between units in a layer.
    pub unit_spacing: f64,

    /// Maximum number of units materialized per layer.
    pub max_visible_units: usize,

    /// Base radius of a unit circle.
    pub unit_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            unit_spacing: DEFAULT_UNIT_SPACING,
            max_visible_units: DEFAULT_MAX_VISIBLE_UNITS,
            unit_radius: 10.0,
        }
    }
}

impl LayoutConfig {
    /// Number of units drawn for a layer.
    pub fn visible_units(&self, layer: &Layer) -> usize {
        layer.neuron_count.min(self.max_visible_units)
    }

    /// X coordinate of the column for layer `index` out of `count` layers.
    ///
    /// ```
    /// use synapse_viz::{LayoutConfig, Viewport};
    ///
    /// let config = LayoutConfig::default();
    /// let viewport = Viewport::new(1000.0, 600.0);
    /// assert_eq!(config.layer_x(0, 3, &viewport), 80.0);
    /// assert_eq!(config.layer_x(2, 3, &viewport), 920.0);
    /// assert_eq!(config.layer_x(0, 1, &viewport), 80.0);
    /// ```
    pub fn layer_x(&self, index: usize, count: usize, viewport: &Viewport) -> f64 {
        if count <= 1 {
            return self.padding;
        }
        let span = viewport.width - 2.0 * self.padding;
        self.padding + span * index as f64 / (count - 1) as f64
    }

    /// Y coordinate of unit `unit_index` in a column of `visible_count` units.
    pub fn unit_y(&self, unit_index: usize, visible_count: usize, viewport: &Viewport) -> f64 {
        let center_y = viewport.height / 2.0;
        // visible_count <= 1 has no extent to center
        let extent = if visible_count > 1 {
            (visible_count - 1) as f64 * self.unit_spacing
        } else {
            0.0
        };
        center_y - extent / 2.0 + unit_index as f64 * self.unit_spacing
    }

    /// Lays out every visible unit of the architecture, layer by layer.
    pub fn layout_units(&self, arch: &Architecture, viewport: &Viewport) -> Vec<VisualUnit> {
        let count = arch.layers.len();
        let mut units = Vec::new();
        for (layer_index, layer) in arch.layers.iter().enumerate() {
            let x = self.layer_x(layer_index, count, viewport);
            let visible = self.visible_units(layer);
            for unit_index in 0..visible {
                units.push(VisualUnit {
                    id: UnitId::new(layer_index, unit_index),
                    x,
                    y: self.unit_y(unit_index, visible, viewport),
                    importance: layer.relative_importance,
                });
            }
        }
        units
    }
}

/// The drawing area the scene is laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in scene units (SVG user units, CSS pixels on screen).
    pub width: f64,

    /// Height in scene units.
    pub height: f64,
}

impl Viewport {
    /// Creates a viewport.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1200.0, 600.0)
    }
}

/// Composite identifier of a visible unit: layer index and unit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId {
    /// Index of the owning layer in input order.
    pub layer: usize,

    /// Index of the unit inside its layer.
    pub unit: usize,
}

impl UnitId {
    /// Creates a unit id.
    pub fn new(layer: usize, unit: usize) -> Self {
        Self { layer, unit }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}U{}", self.layer, self.unit)
    }
}

/// One on-screen representative of a layer's neurons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualUnit {
    /// Composite id.
    pub id: UnitId,

    /// Column position.
    pub x: f64,

    /// Vertical position.
    pub y: f64,

    /// Relative importance inherited from the layer.
    pub importance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::{LayerBuilder, LayerType};

    fn arch(counts: &[usize]) -> Architecture {
        counts.iter().enumerate().fold(Architecture::new("t"), |a, (i, n)| {
            a.with_layer(LayerBuilder::new(format!("l{}", i), LayerType::Dense).neurons(*n).build())
        })
    }

    #[test]
    fn test_visible_units_are_capped() {
        let config = LayoutConfig::default();
        let units = config.layout_units(&arch(&[3, 250]), &Viewport::default());
        assert_eq!(units.iter().filter(|u| u.id.layer == 1).count(), 10);
        assert_eq!(units.len(), 13);
    }

    #[test]
    fn test_columns_evenly_spaced() {
        let config = LayoutConfig::default();
        let viewport = Viewport::new(1000.0, 500.0);
        let xs: Vec<f64> = (0..5).map(|i| config.layer_x(i, 5, &viewport)).collect();
        assert_eq!(xs, vec![80.0, 290.0, 500.0, 710.0, 920.0]);
    }

    #[test]
    fn test_units_vertically_centered() {
        let config = LayoutConfig::default();
        let viewport = Viewport::new(800.0, 400.0);
        let units = config.layout_units(&arch(&[4]), &viewport);
        let ys: Vec<f64> = units.iter().map(|u| u.y).collect();
        assert_eq!(ys, vec![147.5, 182.5, 217.5, 252.5]);
        let mean = ys.iter().sum::<f64>() / ys.len() as f64;
        assert_eq!(mean, 200.0);
    }

    #[test]
    fn test_single_unit_sits_on_center() {
        let config = LayoutConfig::default();
        let viewport = Viewport::new(800.0, 400.0);
        assert_eq!(config.unit_y(0, 1, &viewport), 200.0);
        assert_eq!(config.unit_y(0, 0, &viewport), 200.0);
    }

    #[test]
    fn test_empty_layer_produces_no_units() {
        let config = LayoutConfig::default();
        let units = config.layout_units(&arch(&[2, 0, 2]), &Viewport::default());
        assert_eq!(units.len(), 4);
        assert!(units.iter().all(|u| u.id.layer != 1));
        assert!(units.iter().all(|u| u.y.is_finite()));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let config = LayoutConfig::default();
        let a = arch(&[7, 12, 3]);
        assert_eq!(
            config.layout_units(&a, &Viewport::default()),
            config.layout_units(&a, &Viewport::default())
        );
    }

    #[test]
    fn test_unit_id_display() {
        assert_eq!(UnitId::new(2, 7).to_string(), "L2U7");
    }
}
