//! The interactive visualization: pointer, search and pan/zoom events in, rendered
//! scene out.
//!
//! [`Visualization`] owns everything the engine derives a frame from: the
//! architecture, the layout parameters, the mounted [`Scene`], the
//! [`SelectionState`] and the [`ViewTransform`]. It is fed [`InteractionEvent`]s and
//! reports what each one changed through an [`InteractionOutcome`].
//!
//! Geometry is rebuilt only when the architecture or the viewport changes. Hover,
//! click and search only re-derive visual weights, and pan/zoom only replaces the
//! transform; unit coordinates are never touched by either.
//!
//! An unmounted visualization ignores every event and exports nothing.

use crate::architecture::Architecture;
use crate::animation::RenderedParticle;
use crate::error::Result;
use crate::export::{rasterize_png, render_svg, ExportSink, ExportedFile, RASTER_SCALE};
use crate::layout::{LayoutConfig, UnitId, Viewport};
use crate::scene::{RenderedScene, Scene};
use crate::selection::{InspectorData, Inspection, SelectionState};
use crate::transform::ViewTransform;
use serde::{Deserialize, Serialize};

/// A user gesture.
///
/// ```
/// use synapse_viz::InteractionEvent;
///
/// let event: InteractionEvent =
///     serde_json::from_str(r#"{"type":"click","unit":{"layer":1,"unit":0}}"#).unwrap();
/// assert!(matches!(event, InteractionEvent::Click { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    /// The pointer entered a unit.
    PointerEnter {
        /// The unit under the pointer.
        unit: UnitId,
    },
    /// The pointer left the unit it was over.
    PointerLeave,
    /// A unit was clicked.
    Click {
        /// The clicked unit.
        unit: UnitId,
    },
    /// Empty canvas was clicked.
    BackgroundClick,
    /// The search box changed.
    Search {
        /// The query as typed.
        query: String,
    },
    /// Mouse wheel over the canvas.
    Wheel {
        /// Wheel delta; negative zooms in.
        delta_y: f64,
        /// Pointer x in screen units.
        x: f64,
        /// Pointer y in screen units.
        y: f64,
    },
    /// Canvas drag.
    Drag {
        /// Horizontal movement in screen units.
        dx: f64,
        /// Vertical movement in screen units.
        dy: f64,
    },
}

/// What an event (or lifecycle call) changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    /// Scene geometry was rebuilt.
    pub relayout: bool,
    /// The view transform changed.
    pub view_changed: bool,
    /// Hover, pin or search changed.
    pub selection_changed: bool,
}

impl InteractionOutcome {
    /// Whether nothing changed.
    pub fn is_noop(&self) -> bool {
        !(self.relayout || self.view_changed || self.selection_changed)
    }

    fn selection(changed: bool) -> Self {
        Self {
            selection_changed: changed,
            ..Default::default()
        }
    }
}

/// An architecture being looked at.
#[derive(Debug, Clone)]
pub struct Visualization {
    architecture: Architecture,
    layout: LayoutConfig,
    scene: Option<Scene>,
    selection: SelectionState,
    transform: ViewTransform,
    rendered: Option<RenderedScene>,
}

impl Visualization {
    /// Creates an unmounted visualization.
    pub fn new(architecture: Architecture, layout: LayoutConfig) -> Self {
        Self {
            architecture,
            layout,
            scene: None,
            selection: SelectionState::default(),
            transform: ViewTransform::identity(),
            rendered: None,
        }
    }

    /// Lays the architecture out for `viewport`.
    ///
    /// Mounting again with the same viewport is a no-op; a new viewport re-runs the
    /// layout.
    ///
    /// ```
    /// use synapse_viz::{Architecture, LayerBuilder, LayerType, LayoutConfig, Viewport, Visualization};
    ///
    /// let arch = Architecture::new("demo")
    ///     .with_layer(LayerBuilder::new("in", LayerType::Input).neurons(3).build());
    /// let mut viz = Visualization::new(arch, LayoutConfig::default());
    ///
    /// assert!(viz.mount(Viewport::default()).relayout);
    /// assert!(viz.mount(Viewport::default()).is_noop());
    /// assert_eq!(viz.rendered().map(|r| r.units.len()), Some(3));
    /// ```
    pub fn mount(&mut self, viewport: Viewport) -> InteractionOutcome {
        if self.scene.as_ref().is_some_and(|s| s.viewport == viewport) {
            return InteractionOutcome::default();
        }
        self.relayout(viewport);
        InteractionOutcome {
            relayout: true,
            ..Default::default()
        }
    }

    /// Releases the scene. The selection and query survive a remount.
    pub fn unmount(&mut self) {
        if self.scene.take().is_some() {
            log::debug!("Unmounted visualization of {}", self.architecture.display_name());
        }
        self.rendered = None;
        self.transform = ViewTransform::identity();
    }

    /// Whether a scene is mounted.
    pub fn is_mounted(&self) -> bool {
        self.scene.is_some()
    }

    /// Replaces the architecture, clearing hover and pin, and re-lays out if mounted.
    pub fn set_architecture(&mut self, architecture: Architecture) -> InteractionOutcome {
        self.architecture = architecture;
        let selection_changed = self.selection.inspection != Inspection::None;
        self.selection.inspection = Inspection::None;
        let relayout = match self.scene.as_ref().map(|s| s.viewport) {
            Some(viewport) => {
                self.relayout(viewport);
                true
            }
            None => false,
        };
        InteractionOutcome {
            relayout,
            view_changed: false,
            selection_changed,
        }
    }

    /// Replaces the layout parameters, re-laying out if mounted.
    pub fn set_layout(&mut self, layout: LayoutConfig) -> InteractionOutcome {
        self.layout = layout;
        match self.scene.as_ref().map(|s| s.viewport) {
            Some(viewport) => {
                self.relayout(viewport);
                InteractionOutcome {
                    relayout: true,
                    ..Default::default()
                }
            }
            None => InteractionOutcome::default(),
        }
    }

    /// Applies one gesture.
    pub fn handle(&mut self, event: InteractionEvent) -> InteractionOutcome {
        if !self.is_mounted() {
            log::trace!("Ignoring {:?} on unmounted visualization", event);
            return InteractionOutcome::default();
        }

        let outcome = match event {
            InteractionEvent::PointerEnter { unit } => match self.layer_id_of(unit) {
                Some(layer_id) => InteractionOutcome::selection(self.selection.hover(&layer_id)),
                None => InteractionOutcome::default(),
            },
            InteractionEvent::PointerLeave => InteractionOutcome::selection(self.selection.leave()),
            InteractionEvent::Click { unit } => match self.layer_id_of(unit) {
                Some(layer_id) => {
                    self.selection.toggle_unit(unit, &layer_id);
                    InteractionOutcome::selection(true)
                }
                None => InteractionOutcome::default(),
            },
            InteractionEvent::BackgroundClick => InteractionOutcome::selection(self.selection.clear()),
            InteractionEvent::Search { query } => InteractionOutcome::selection(self.selection.set_query(query)),
            InteractionEvent::Wheel { delta_y, x, y } => self.set_transform(self.transform.wheel(delta_y, x, y)),
            InteractionEvent::Drag { dx, dy } => self.set_transform(self.transform.pan(dx, dy)),
        };

        if outcome.selection_changed {
            self.rerender();
        }
        outcome
    }

    fn set_transform(&mut self, next: ViewTransform) -> InteractionOutcome {
        let changed = next != self.transform;
        self.transform = next;
        InteractionOutcome {
            view_changed: changed,
            ..Default::default()
        }
    }

    /// Id of the layer owning `unit`, if the unit is on screen.
    fn layer_id_of(&self, unit: UnitId) -> Option<String> {
        self.scene.as_ref()?.unit(unit)?;
        self.architecture.layers.get(unit.layer).map(|l| l.id.clone())
    }

    fn relayout(&mut self, viewport: Viewport) {
        let scene = Scene::build(&self.architecture, viewport, &self.layout);
        log::debug!(
            "Laid out {}: {} layers, {} units, {} edges",
            self.architecture.display_name(),
            scene.labels.len(),
            scene.units.len(),
            scene.edges.len()
        );
        self.scene = Some(scene);
        self.rerender();
    }

    fn rerender(&mut self) {
        self.rendered = self
            .scene
            .as_ref()
            .map(|scene| RenderedScene::render(scene, &self.architecture, &self.selection, &self.layout));
    }

    /// The current frame, if mounted.
    pub fn rendered(&self) -> Option<&RenderedScene> {
        self.rendered.as_ref()
    }

    /// Inspector contents: the pinned layer, else the hovered layer.
    ///
    /// A pin resolves through the selected unit's layer index, so duplicate layer
    /// ids still show the clicked layer.
    pub fn inspector(&self) -> Option<InspectorData> {
        let (index, pinned) = match self.selection.selected_unit() {
            Some(unit) => (unit.layer, true),
            None => (self.architecture.layer_index(self.selection.active_layer_id()?)?, false),
        };
        let layer = self.architecture.layers.get(index)?;
        Some(InspectorData::new(layer, index, pinned))
    }

    /// The architecture.
    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// The layout parameters.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// The mounted scene.
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Hover, pin and search state.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// The pan/zoom transform.
    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    /// Writes the current frame as SVG to `sink`.
    ///
    /// Returns `Ok(None)` without touching the sink when nothing is mounted.
    pub fn export_vector<S: ExportSink + ?Sized>(
        &self,
        sink: &mut S,
        particles: &[RenderedParticle],
    ) -> Result<Option<ExportedFile>> {
        let Some(rendered) = &self.rendered else {
            log::warn!("Vector export requested with no mounted scene");
            return Ok(None);
        };
        let svg = render_svg(rendered, &self.transform, particles);
        let file = ExportedFile::svg(self.architecture.export_file_name("svg"), svg);
        sink.write(&file)?;
        log::info!("Exported {} ({} bytes)", file.file_name, file.bytes.len());
        Ok(Some(file))
    }

    /// Writes the current frame as a PNG at twice the viewport resolution to `sink`.
    ///
    /// Returns `Ok(None)` without touching the sink when nothing is mounted.
    pub fn export_raster<S: ExportSink + ?Sized>(
        &self,
        sink: &mut S,
        particles: &[RenderedParticle],
    ) -> Result<Option<ExportedFile>> {
        let Some(rendered) = &self.rendered else {
            log::warn!("Raster export requested with no mounted scene");
            return Ok(None);
        };
        let svg = render_svg(rendered, &self.transform, particles);
        let png = rasterize_png(&svg, rendered.viewport.width, rendered.viewport.height, RASTER_SCALE)?;
        let file = ExportedFile::png(self.architecture.export_file_name("png"), png);
        sink.write(&file)?;
        log::info!("Exported {} ({} bytes)", file.file_name, file.bytes.len());
        Ok(Some(file))
    }
}
