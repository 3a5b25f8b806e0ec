//! Structural recommendations over an architecture's layer list.
//!
//! The rules look only at layer types, depth and the declared parameter total, so
//! they run on exactly the data the visualization already has.

use crate::architecture::{Architecture, LayerType};
use crate::edges::expected_edge_count;
use crate::layout::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fewer layers than this counts as shallow.
pub const SHALLOW_DEPTH: usize = 10;

/// More activation layers than this is flagged.
pub const MANY_ACTIVATIONS: usize = 5;

/// More parameters than this counts as a large model.
pub const LARGE_MODEL_PARAMETERS: u64 = 10_000_000;

/// The structural issue a recommendation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finding {
    /// Nothing to analyse.
    NoLayers,
    /// Fewer than [`SHALLOW_DEPTH`] layers.
    Shallow,
    /// More dense than convolution layers.
    DenseHeavy,
    /// No normalization layer anywhere.
    NoNormalization,
    /// More than [`MANY_ACTIVATIONS`] stand-alone activation layers.
    ManyActivations,
    /// More than [`LARGE_MODEL_PARAMETERS`] parameters.
    LargeModel,
    /// No rule fired.
    Balanced,
}

impl Finding {
    /// Advice shown for the finding.
    pub fn message(&self) -> &'static str {
        match self {
            Finding::NoLayers => "No layer data available for analysis.",
            Finding::Shallow => "Model is shallow: consider deeper feature extraction layers.",
            Finding::DenseHeavy => {
                "Architecture is dense-heavy: convolutional layers may improve feature learning."
            }
            Finding::NoNormalization => {
                "No normalization layer detected: add normalization for better training stability."
            }
            Finding::ManyActivations => {
                "Many activation layers detected: verify activation placement efficiency."
            }
            Finding::LargeModel => "Model is large: consider pruning or lightweight architectures.",
            Finding::Balanced => "Architecture looks balanced: no major structural issues detected.",
        }
    }
}

/// One piece of structural advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// What was detected.
    pub finding: Finding,
    /// Human readable advice.
    pub message: String,
}

impl From<Finding> for Recommendation {
    fn from(finding: Finding) -> Self {
        Self {
            finding,
            message: finding.message().to_string(),
        }
    }
}

/// Runs every rule against `arch`. Never returns an empty list.
///
/// ```
/// use synapse_viz::analysis::{recommendations, Finding};
/// use synapse_viz::{Architecture, LayerBuilder, LayerType};
///
/// let arch = Architecture::new("mlp")
///     .with_layer(LayerBuilder::new("in", LayerType::Input).build())
///     .with_layer(LayerBuilder::new("h", LayerType::Dense).build())
///     .with_layer(LayerBuilder::new("out", LayerType::Output).build());
///
/// let findings: Vec<Finding> = recommendations(&arch).into_iter().map(|r| r.finding).collect();
/// assert_eq!(findings, vec![Finding::Shallow, Finding::NoNormalization, Finding::DenseHeavy]);
/// ```
pub fn recommendations(arch: &Architecture) -> Vec<Recommendation> {
    if arch.layers.is_empty() {
        return vec![Finding::NoLayers.into()];
    }

    let count = |t: LayerType| arch.layers.iter().filter(|l| l.layer_type == t).count();
    let mut findings = Vec::new();

    if arch.layers.len() < SHALLOW_DEPTH {
        findings.push(Finding::Shallow);
    }
    if count(LayerType::Normalization) == 0 {
        findings.push(Finding::NoNormalization);
    }
    if count(LayerType::Dense) > count(LayerType::Convolution) {
        findings.push(Finding::DenseHeavy);
    }
    if count(LayerType::Activation) > MANY_ACTIVATIONS {
        findings.push(Finding::ManyActivations);
    }
    if arch.total_parameters > LARGE_MODEL_PARAMETERS {
        findings.push(Finding::LargeModel);
    }
    if findings.is_empty() {
        findings.push(Finding::Balanced);
    }

    findings.into_iter().map(Recommendation::from).collect()
}

/// Overview of an architecture served next to the inspector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSummary {
    /// Display name.
    pub name: String,
    /// Architecture family.
    pub arch_type: String,
    /// Number of layers.
    pub layer_count: usize,
    /// Sum of declared neuron counts.
    pub declared_neurons: usize,
    /// Units actually drawn.
    pub visible_units: usize,
    /// Edges actually drawn.
    pub edge_count: usize,
    /// Declared trainable parameters.
    pub total_parameters: u64,
    /// Layer count per type.
    pub layers_by_type: BTreeMap<LayerType, usize>,
    /// Structural advice.
    pub recommendations: Vec<Recommendation>,
}

impl ArchitectureSummary {
    /// Summarizes `arch` as laid out with `config`.
    pub fn new(arch: &Architecture, config: &LayoutConfig) -> Self {
        let stats = arch.stats();
        Self {
            name: arch.display_name().to_string(),
            arch_type: arch.arch_type.clone(),
            layer_count: stats.layer_count,
            declared_neurons: stats.declared_neurons,
            visible_units: arch.layers.iter().map(|l| config.visible_units(l)).sum(),
            edge_count: expected_edge_count(arch, config),
            total_parameters: arch.total_parameters,
            layers_by_type: stats.layers_by_type,
            recommendations: recommendations(arch),
        }
    }
}
