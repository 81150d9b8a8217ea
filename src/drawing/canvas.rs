use serde::{Deserialize, Serialize};

use crate::drawing::snapshot;
use crate::drawing::surface::{PixmapSurface, Surface};
use crate::error::{Result, SketchpadError};

/// Largest canvas a room may grow to
pub const MAX_CANVAS_WIDTH: u32 = 2000;
pub const MAX_CANVAS_HEIGHT: u32 = 1100;

/// Extra room added beyond the requested extent on every growth step
pub const GROWTH_MARGIN: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub growth_margin: u32,
}

impl Default for CanvasLimits {
    fn default() -> Self {
        Self {
            max_width: MAX_CANVAS_WIDTH,
            max_height: MAX_CANVAS_HEIGHT,
            growth_margin: GROWTH_MARGIN,
        }
    }
}

/// Server-held raster of one room plus its growth bookkeeping
pub struct CanvasState<S: Surface = PixmapSurface> {
    surface: S,
    limits: CanvasLimits,
    growth_exhausted: bool,
}

impl<S: Surface> CanvasState<S> {
    /// Allocate a blank canvas, clipped to the configured maxima
    pub fn new(width: u32, height: u32, limits: CanvasLimits) -> Result<Self> {
        let width = width.min(limits.max_width).max(1);
        let height = height.min(limits.max_height).max(1);

        Ok(Self {
            surface: S::allocate(width, height)?,
            limits,
            growth_exhausted: width == limits.max_width && height == limits.max_height,
        })
    }

    /// Allocate a canvas and draw an encoded image onto it at the origin
    pub fn with_snapshot(
        width: u32,
        height: u32,
        limits: CanvasLimits,
        encoded: &[u8],
    ) -> Result<Self> {
        let mut canvas = Self::new(width, height, limits)?;
        canvas
            .surface
            .decode_onto(encoded, 0, 0, (limits.max_width, limits.max_height))?;
        Ok(canvas)
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn growth_exhausted(&self) -> bool {
        self.growth_exhausted
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Grow the canvas so that it covers `(new_width, new_height)`.
    ///
    /// Each dimension becomes `min(max, max(requested + margin, current))`.
    /// Existing pixels keep their position; new area is transparent.
    /// Returns whether the surface was reallocated.
    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<bool> {
        let (width, height) = self.size();

        if self.growth_exhausted || (width >= new_width && height >= new_height) {
            return Ok(false);
        }

        let CanvasLimits {
            max_width,
            max_height,
            growth_margin,
        } = self.limits;

        let set_width = grow(width, new_width, max_width, growth_margin);
        let set_height = grow(height, new_height, max_height, growth_margin);

        if set_width == max_width && set_height == max_height {
            self.growth_exhausted = true;
        }

        if (set_width, set_height) == (width, height) {
            return Ok(false);
        }

        let preserved = self.surface.read_pixels(0, 0, width, height).ok_or_else(|| {
            SketchpadError::Raster(format!("Cannot read {}x{} canvas", width, height))
        })?;

        let mut surface = S::allocate(set_width, set_height)?;
        surface.write_pixels(&preserved, 0, 0);
        self.surface = surface;

        tracing::debug!(
            "Canvas resized from {}x{} to {}x{}",
            width,
            height,
            set_width,
            set_height
        );

        Ok(true)
    }

    /// Render the current raster as a PNG data URL
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.surface.encode_png()?;
        Ok(snapshot::encode_data_url(&png))
    }
}

fn grow(current: u32, requested: u32, max: u32, margin: u32) -> u32 {
    requested.saturating_add(margin).max(current).min(max)
}
