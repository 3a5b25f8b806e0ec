//! Pan/zoom view transform.
//!
//! A [`ViewTransform`] is an immutable uniform-scale-plus-translation affine map
//! applied to the whole scene group. Each gesture produces a new value; the layout
//! coordinates of units and edges are never touched.

use serde::{Deserialize, Serialize};

/// Smallest allowed zoom factor.
pub const MIN_SCALE: f64 = 0.2;

/// Largest allowed zoom factor.
pub const MAX_SCALE: f64 = 4.0;

/// Zoom factor per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.15;

/// `screen = scene * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Uniform scale, within `[MIN_SCALE, MAX_SCALE]`.
    pub scale: f64,
    /// Horizontal translation in screen units.
    pub translate_x: f64,
    /// Vertical translation in screen units.
    pub translate_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    /// The identity transform.
    pub const fn identity() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }

    /// Whether this is the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Zooms by `factor` keeping the screen point `(x, y)` fixed.
    ///
    /// The resulting scale is clamped to `[MIN_SCALE, MAX_SCALE]`.
    ///
    /// ```
    /// use synapse_viz::ViewTransform;
    ///
    /// let t = ViewTransform::identity().zoom_at(100.0, 0.0, 0.0);
    /// assert_eq!(t.scale, 4.0);
    /// ```
    pub fn zoom_at(self, factor: f64, x: f64, y: f64) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return self;
        }
        let scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let ratio = scale / self.scale;
        Self {
            scale,
            translate_x: x - (x - self.translate_x) * ratio,
            translate_y: y - (y - self.translate_y) * ratio,
        }
    }

    /// Zooms for a wheel gesture: negative `delta_y` zooms in.
    pub fn wheel(self, delta_y: f64, x: f64, y: f64) -> Self {
        if delta_y == 0.0 {
            return self;
        }
        let factor = WHEEL_ZOOM_STEP.powf(-delta_y.signum());
        self.zoom_at(factor, x, y)
    }

    /// Translates by a drag delta in screen units.
    pub fn pan(self, dx: f64, dy: f64) -> Self {
        Self {
            translate_x: self.translate_x + dx,
            translate_y: self.translate_y + dy,
            ..self
        }
    }

    /// Maps a scene point to screen space.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.translate_x, y * self.scale + self.translate_y)
    }

    /// Maps a screen point back to scene space.
    pub fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.translate_x) / self.scale, (y - self.translate_y) / self.scale)
    }

    /// The SVG `transform` attribute value.
    pub fn to_svg(&self) -> String {
        format!(
            "translate({},{}) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_clamped() {
        let mut t = ViewTransform::identity();
        for _ in 0..50 {
            t = t.wheel(-1.0, 10.0, 10.0);
        }
        assert_eq!(t.scale, MAX_SCALE);
        for _ in 0..100 {
            t = t.wheel(1.0, 10.0, 10.0);
        }
        assert_eq!(t.scale, MIN_SCALE);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let t = ViewTransform::identity().pan(30.0, -12.0);
        let anchor = (200.0, 150.0);
        let before = t.invert(anchor.0, anchor.1);
        let zoomed = t.zoom_at(2.0, anchor.0, anchor.1);
        let after = zoomed.invert(anchor.0, anchor.1);
        assert!((before.0 - after.0).abs() < 1e-9);
        assert!((before.1 - after.1).abs() < 1e-9);
    }

    #[test]
    fn test_pan_and_apply() {
        let t = ViewTransform::identity().pan(10.0, 5.0).pan(-4.0, 1.0);
        assert_eq!(t.apply(1.0, 1.0), (7.0, 7.0));
        assert_eq!(t.invert(7.0, 7.0), (1.0, 1.0));
    }

    #[test]
    fn test_invalid_factor_is_ignored() {
        let t = ViewTransform::identity();
        assert_eq!(t.zoom_at(0.0, 1.0, 1.0), t);
        assert_eq!(t.zoom_at(f64::NAN, 1.0, 1.0), t);
        assert_eq!(t.wheel(0.0, 1.0, 1.0), t);
    }

    #[test]
    fn test_svg_attr() {
        assert_eq!(ViewTransform::identity().to_svg(), "translate(0,0) scale(1)");
        assert!(ViewTransform::identity().is_identity());
    }
}
