//! The architecture description consumed by the visualization engine.
//!
//! An [`Architecture`] is an ordered list of [`Layer`]s plus a few descriptive
//! fields. It arrives already validated from the inference collaborator and is
//! read-only for the duration of a render: the engine never re-sorts layers and
//! never checks `relative_importance` ranges, it only clamps unit counts to the
//! display cap when laying out.
//!
//! # Quick Start
//!
//! ```
//! use synapse_viz::{Architecture, LayerBuilder, LayerType};
//!
//! let arch = Architecture::new("mlp")
//!     .with_layer(LayerBuilder::new("in", LayerType::Input).neurons(4).importance(0.4).build())
//!     .with_layer(LayerBuilder::new("h1", LayerType::Dense).neurons(3).importance(0.8).build())
//!     .with_layer(LayerBuilder::new("out", LayerType::Output).neurons(2).importance(0.6).build());
//!
//! assert_eq!(arch.layers.len(), 3);
//! assert_eq!(arch.export_file_name("svg"), "neural-network-mlp.svg");
//! ```
//!
//! # JSON
//!
//! The wire format is camelCase, matching the inference collaborator:
//!
//! ```json
//! {
//!   "name": "mlp",
//!   "type": "feedforward",
//!   "layers": [
//!     { "id": "in", "name": "Input", "type": "input", "neuronCount": 4,
//!       "contributionText": "raw features", "relativeImportance": 0.4 }
//!   ]
//! }
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed set of layer kinds the engine knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Raw features entering the network.
    Input,
    /// Fully connected layer.
    Dense,
    /// Convolutional feature extractor.
    Convolution,
    /// Spatial down-sampling.
    Pooling,
    /// Regularisation by random unit dropping.
    Dropout,
    /// Final prediction layer.
    Output,
    /// Batch/layer normalisation.
    Normalization,
    /// Stand-alone activation function.
    Activation,
}

impl LayerType {
    /// All layer types, in declaration order.
    pub const ALL: [LayerType; 8] = [
        LayerType::Input,
        LayerType::Dense,
        LayerType::Convolution,
        LayerType::Pooling,
        LayerType::Dropout,
        LayerType::Output,
        LayerType::Normalization,
        LayerType::Activation,
    ];

    /// Returns a hex fill color for units of this layer type.
    ///
    /// ```
    /// use synapse_viz::LayerType;
    ///
    /// assert_eq!(LayerType::Input.color(), "#22c55e");
    /// assert_eq!(LayerType::Output.color(), "#ef4444");
    /// ```
    pub fn color(&self) -> &'static str {
        match self {
            LayerType::Input => "#22c55e",         // Green
            LayerType::Dense => "#3b82f6",         // Blue
            LayerType::Convolution => "#8b5cf6",   // Violet
            LayerType::Pooling => "#06b6d4",       // Cyan
            LayerType::Dropout => "#94a3b8",       // Slate
            LayerType::Output => "#ef4444",        // Red
            LayerType::Normalization => "#f59e0b", // Amber
            LayerType::Activation => "#ec4899",    // Pink
        }
    }

    /// The lowercase name used on the wire and matched by search.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Input => "input",
            LayerType::Dense => "dense",
            LayerType::Convolution => "convolution",
            LayerType::Pooling => "pooling",
            LayerType::Dropout => "dropout",
            LayerType::Output => "output",
            LayerType::Normalization => "normalization",
            LayerType::Activation => "activation",
        }
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage of a model architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Stable identifier, unique within the architecture.
    pub id: String,

    /// Human readable name shown in labels and matched by search.
    pub name: String,

    /// Kind of layer; drives color and search matching.
    #[serde(rename = "type")]
    pub layer_type: LayerType,

    /// Declared number of neurons. Only the first
    /// [`max_visible_units`](crate::LayoutConfig::max_visible_units) are drawn.
    pub neuron_count: usize,

    /// Activation function name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_function: Option<String>,

    /// Longer free-text explanation shown by the inspector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_text: Option<String>,

    /// What this layer contributes to the model's output.
    #[serde(default)]
    pub contribution_text: String,

    /// Caller supplied weight in `[0, 1]`; not validated here.
    pub relative_importance: f64,
}

/// A validated architecture description, as produced by the inference collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    /// Display name, also used to name exported files.
    pub name: String,

    /// Architecture family, e.g. `"cnn"` or `"transformer"`.
    #[serde(rename = "type", default)]
    pub arch_type: String,

    /// Free-text description.
    #[serde(default)]
    pub description: String,

    /// Total trainable parameters as reported by the collaborator.
    #[serde(default)]
    pub total_parameters: u64,

    /// Intended use case.
    #[serde(default)]
    pub use_case: String,

    /// Layers in input order. Never re-sorted.
    pub layers: Vec<Layer>,
}

/// Aggregate counts over an [`Architecture`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureStats {
    /// Number of layers.
    pub layer_count: usize,

    /// Sum of declared neuron counts.
    pub declared_neurons: usize,

    /// Number of layers per type.
    pub layers_by_type: BTreeMap<LayerType, usize>,
}

impl Architecture {
    /// Creates an empty architecture with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch_type: String::new(),
            description: String::new(),
            total_parameters: 0,
            use_case: String::new(),
            layers: Vec::new(),
        }
    }

    /// Appends a layer, keeping input order.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Parses the camelCase JSON document handed over by the inference collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) if the document
    /// is not valid JSON or misses a required field.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the architecture back to camelCase JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Finds a layer by id.
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Returns the position of a layer in input order.
    pub fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// The name shown in titles; falls back to `"network"` for unnamed input.
    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            "network"
        } else {
            trimmed
        }
    }

    /// File name for an export with the given extension.
    ///
    /// ```
    /// use synapse_viz::Architecture;
    ///
    /// let arch = Architecture::new("ResNet/50");
    /// assert_eq!(arch.export_file_name("png"), "neural-network-ResNet-50.png");
    /// ```
    pub fn export_file_name(&self, ext: &str) -> String {
        let name: String = self
            .display_name()
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
            .collect();
        format!("neural-network-{}.{}", name, ext)
    }

    /// Computes aggregate counts.
    pub fn stats(&self) -> ArchitectureStats {
        let mut stats = ArchitectureStats {
            layer_count: self.layers.len(),
            ..Default::default()
        };
        for layer in &self.layers {
            stats.declared_neurons += layer.neuron_count;
            *stats.layers_by_type.entry(layer.layer_type).or_insert(0) += 1;
        }
        stats
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Self::new("network")
    }
}

/// A builder for [`Layer`] values.
///
/// ```
/// use synapse_viz::{LayerBuilder, LayerType};
///
/// let layer = LayerBuilder::new("conv1", LayerType::Convolution)
///     .name("Conv 3x3")
///     .neurons(64)
///     .activation("relu")
///     .importance(0.9)
///     .build();
///
/// assert_eq!(layer.name, "Conv 3x3");
/// assert_eq!(layer.activation_function.as_deref(), Some("relu"));
/// ```
pub struct LayerBuilder {
    layer: Layer,
}

impl LayerBuilder {
    /// Starts a layer with the given id and type; the name defaults to the id.
    pub fn new(id: impl Into<String>, layer_type: LayerType) -> Self {
        let id = id.into();
        Self {
            layer: Layer {
                name: id.clone(),
                id,
                layer_type,
                neuron_count: 1,
                activation_function: None,
                detail_text: None,
                contribution_text: String::new(),
                relative_importance: 0.5,
            },
        }
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.layer.name = name.into();
        self
    }

    /// Sets the declared neuron count.
    pub fn neurons(mut self, count: usize) -> Self {
        self.layer.neuron_count = count;
        self
    }

    /// Sets the activation function.
    pub fn activation(mut self, activation: impl Into<String>) -> Self {
        self.layer.activation_function = Some(activation.into());
        self
    }

    /// Sets the inspector detail text.
    pub fn detail(mut self, text: impl Into<String>) -> Self {
        self.layer.detail_text = Some(text.into());
        self
    }

    /// Sets the contribution text.
    pub fn contribution(mut self, text: impl Into<String>) -> Self {
        self.layer.contribution_text = text.into();
        self
    }

    /// Sets the relative importance.
    pub fn importance(mut self, importance: f64) -> Self {
        self.layer.relative_importance = importance;
        self
    }

    /// Builds the layer.
    pub fn build(self) -> Layer {
        self.layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "TinyNet",
        "type": "feedforward",
        "description": "two layer perceptron",
        "totalParameters": 42,
        "useCase": "demo",
        "layers": [
            {"id": "l0", "name": "Input", "type": "input", "neuronCount": 4,
             "contributionText": "features", "relativeImportance": 0.3},
            {"id": "l1", "name": "Hidden", "type": "dense", "neuronCount": 16,
             "activationFunction": "relu", "contributionText": "mixing", "relativeImportance": 0.9}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let arch = Architecture::from_json(SAMPLE).unwrap();
        assert_eq!(arch.name, "TinyNet");
        assert_eq!(arch.arch_type, "feedforward");
        assert_eq!(arch.total_parameters, 42);
        assert_eq!(arch.layers.len(), 2);
        assert_eq!(arch.layers[1].layer_type, LayerType::Dense);
        assert_eq!(arch.layers[1].activation_function.as_deref(), Some("relu"));
        assert_eq!(arch.layers[0].detail_text, None);
    }

    #[test]
    fn test_json_roundtrip_keeps_camel_case() {
        let arch = Architecture::from_json(SAMPLE).unwrap();
        let json = arch.to_json().unwrap();
        assert!(json.contains("neuronCount"));
        assert!(json.contains("relativeImportance"));
        assert_eq!(Architecture::from_json(&json).unwrap(), arch);
    }

    #[test]
    fn test_invalid_layer_type_rejected() {
        let json = r#"{"name": "x", "layers": [{"id": "a", "name": "a", "type": "lstm",
            "neuronCount": 1, "relativeImportance": 0.1}]}"#;
        assert!(Architecture::from_json(json).is_err());
    }

    #[test]
    fn test_layer_lookup_keeps_order() {
        let arch = Architecture::from_json(SAMPLE).unwrap();
        assert_eq!(arch.layer_index("l1"), Some(1));
        assert_eq!(arch.layer("l0").unwrap().name, "Input");
        assert!(arch.layer("missing").is_none());
    }

    #[test]
    fn test_stats() {
        let arch = Architecture::from_json(SAMPLE).unwrap();
        let stats = arch.stats();
        assert_eq!(stats.layer_count, 2);
        assert_eq!(stats.declared_neurons, 20);
        assert_eq!(stats.layers_by_type.get(&LayerType::Dense), Some(&1));
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(Architecture::new("VGG16").export_file_name("svg"), "neural-network-VGG16.svg");
        assert_eq!(Architecture::new("  ").export_file_name("png"), "neural-network-network.png");
    }

    #[test]
    fn test_layer_type_colors_are_distinct() {
        let mut colors: Vec<_> = LayerType::ALL.iter().map(|t| t.color()).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), LayerType::ALL.len());
    }
}
