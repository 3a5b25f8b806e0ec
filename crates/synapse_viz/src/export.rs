//! Snapshot export of the current frame as SVG or PNG.
//!
//! The SVG is generated from a [`RenderedScene`], so it carries the same highlight
//! and search weights, pan/zoom transform and in-flight particles as the live view.
//! PNG export rasterizes that SVG with `resvg` at twice the viewport resolution onto
//! an opaque light background.
//!
//! Where the bytes end up is decided by an [`ExportSink`]: [`MemorySink`] keeps them,
//! [`DirectorySink`] writes them to disk.
//!
//! # Examples
//!
//! ```
//! use synapse_viz::export::{render_svg, MemorySink};
//! use synapse_viz::{Architecture, LayerBuilder, LayerType, LayoutConfig, Viewport, Visualization};
//!
//! let arch = Architecture::new("demo")
//!     .with_layer(LayerBuilder::new("in", LayerType::Input).neurons(2).build())
//!     .with_layer(LayerBuilder::new("out", LayerType::Output).neurons(1).build());
//! let mut viz = Visualization::new(arch, LayoutConfig::default());
//! viz.mount(Viewport::new(400.0, 300.0));
//!
//! let mut sink = MemorySink::default();
//! let file = viz.export_vector(&mut sink, &[]).unwrap().unwrap();
//! assert_eq!(file.file_name, "neural-network-demo.svg");
//! assert!(String::from_utf8_lossy(&file.bytes).starts_with("<svg"));
//! ```

use crate::animation::RenderedParticle;
use crate::error::{Error, Result};
use crate::scene::RenderedScene;
use crate::transform::ViewTransform;
use resvg::tiny_skia;
use resvg::usvg;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Resolution multiplier for raster export.
pub const RASTER_SCALE: f64 = 2.0;

/// Canvas background, `#f8fafc`.
pub const BACKGROUND: &str = "#f8fafc";
const BACKGROUND_RGB: (u8, u8, u8) = (0xf8, 0xfa, 0xfc);

const EDGE_COLOR: &str = "#94a3b8";
const HIGHLIGHT_COLOR: &str = "#f59e0b";
const ACCENT_COLOR: &str = "#6366f1";
const PARTICLE_COLOR: &str = "#38bdf8";
const TEXT_COLOR: &str = "#1e293b";

/// Snapshot format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Vector snapshot.
    Svg,
    /// Raster snapshot at [`RASTER_SCALE`].
    Png,
}

impl ExportFormat {
    /// File extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Png => "png",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(ExportFormat::Svg),
            "png" => Ok(ExportFormat::Png),
            other => Err(format!("unknown export format '{}', expected svg or png", other)),
        }
    }
}

/// An exported snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    /// `neural-network-<name>.<ext>`.
    pub file_name: String,
    /// `image/svg+xml` or `image/png`.
    pub mime_type: String,
    /// File contents.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Wraps an SVG document.
    pub fn svg(file_name: String, svg: String) -> Self {
        Self {
            file_name,
            mime_type: "image/svg+xml".to_string(),
            bytes: svg.into_bytes(),
        }
    }

    /// Wraps PNG bytes.
    pub fn png(file_name: String, png: Vec<u8>) -> Self {
        Self {
            file_name,
            mime_type: "image/png".to_string(),
            bytes: png,
        }
    }
}

/// Destination for exported files.
pub trait ExportSink {
    /// Delivers one file.
    fn write(&mut self, file: &ExportedFile) -> Result<()>;
}

/// Keeps exported files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Files in export order.
    pub files: Vec<ExportedFile>,
}

impl ExportSink for MemorySink {
    fn write(&mut self, file: &ExportedFile) -> Result<()> {
        self.files.push(file.clone());
        Ok(())
    }
}

/// Writes exported files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Targets `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// The target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ExportSink for DirectorySink {
    fn write(&mut self, file: &ExportedFile) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file.file_name);
        std::fs::write(&path, &file.bytes)?;
        log::debug!("Wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders a self-contained SVG document sized to the scene's viewport.
pub fn render_svg(
    scene: &RenderedScene,
    transform: &ViewTransform,
    particles: &[RenderedParticle],
) -> String {
    let (w, h) = (scene.viewport.width, scene.viewport.height);
    let mut svg = String::new();

    // fmt::Write into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = writeln!(svg, "<title>{}</title>", escape(&scene.title));
    svg.push_str(concat!(
        r#"<defs><filter id="glow" x="-50%" y="-50%" width="200%" height="200%">"#,
        r#"<feGaussianBlur stdDeviation="3" result="blur"/>"#,
        r#"<feMerge><feMergeNode in="blur"/><feMergeNode in="SourceGraphic"/></feMerge>"#,
        "</filter></defs>\n"
    ));
    let _ = writeln!(svg, r#"<rect width="{w}" height="{h}" fill="{BACKGROUND}"/>"#);
    let _ = writeln!(svg, r#"<g transform="{}">"#, transform.to_svg());

    svg.push_str("<g class=\"edges\">\n");
    for e in &scene.edges {
        let color = if e.weight.glow {
            HIGHLIGHT_COLOR
        } else if e.weight.accent {
            ACCENT_COLOR
        } else {
            EDGE_COLOR
        };
        let _ = writeln!(
            svg,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-opacity="{:.3}" stroke-width="{:.2}"/>"#,
            e.x1, e.y1, e.x2, e.y2, color, e.weight.opacity, e.weight.stroke_width
        );
    }
    svg.push_str("</g>\n<g class=\"particles\">\n");
    for p in particles {
        let (r, color) = if p.highlighted {
            (4.0, HIGHLIGHT_COLOR)
        } else {
            (2.5, PARTICLE_COLOR)
        };
        let _ = writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" fill-opacity="0.9"/>"#,
            p.x, p.y, r, color
        );
    }
    svg.push_str("</g>\n<g class=\"units\">\n");
    for u in &scene.units {
        let stroke = if u.weight.accent { ACCENT_COLOR } else { "#ffffff" };
        let filter = if u.weight.glow {
            r#" filter="url(#glow)""#
        } else {
            ""
        };
        let _ = writeln!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" fill-opacity="{:.3}" stroke="{}" stroke-width="{:.2}"{}/>"#,
            u.x, u.y, u.radius, u.color, u.weight.opacity, stroke, u.weight.stroke_width, filter
        );
    }
    svg.push_str("</g>\n<g class=\"labels\">\n");
    for l in &scene.labels {
        let fill = if l.weight.accent { ACCENT_COLOR } else { TEXT_COLOR };
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-family="sans-serif" font-size="12" fill="{}" fill-opacity="{:.3}">{}</text>"#,
            l.label.x,
            l.label.y,
            fill,
            l.weight.opacity,
            escape(&l.label.text)
        );
    }
    svg.push_str("</g>\n</g>\n</svg>\n");
    svg
}

/// Rasterizes an SVG document to PNG at `scale` times `width × height`, on an
/// opaque [`BACKGROUND`].
pub fn rasterize_png(svg: &str, width: f64, height: f64, scale: f64) -> Result<Vec<u8>> {
    let px = |v: f64| (v * scale).round().max(1.0) as u32;
    let (pw, ph) = (px(width), px(height));

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| Error::Render(e.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(pw, ph)
        .ok_or_else(|| Error::Render(format!("cannot allocate {}x{} pixmap", pw, ph)))?;
    let (r, g, b) = BACKGROUND_RGB;
    pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale as f32, scale as f32),
        &mut pixmap.as_mut(),
    );

    pixmap.encode_png().map_err(|e| Error::Render(e.to_string()))
}
