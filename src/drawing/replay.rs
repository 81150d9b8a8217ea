//! Applies draw events to a canvas so the server raster tracks what every
//! client has drawn.

use crate::drawing::canvas::CanvasState;
use crate::drawing::event::{DrawEvent, Shape, Tool};
use crate::drawing::surface::{Composite, Surface};
use crate::error::{Result, SketchpadError};

/// Replay one event onto the canvas, growing it first when the event
/// reaches past the current edge. Returns whether the canvas grew.
///
/// The event must already have passed [`DrawEvent::validate`].
pub fn apply<S: Surface>(canvas: &mut CanvasState<S>, event: &DrawEvent) -> Result<bool> {
    let mut resized = false;

    if !canvas.growth_exhausted() {
        let (max_x, max_y) = event.extent();
        let (width, height) = canvas.size();

        if max_x >= width as f64 || max_y >= height as f64 {
            resized = canvas.resize(to_pixels(max_x), to_pixels(max_y))?;
        }
    }

    let surface = canvas.surface_mut();

    match event.tool {
        Tool::Brush => {
            surface.set_composite(Composite::Normal);
            surface.set_color(event.color()?);
        }
        Tool::Erase => {
            surface.set_composite(Composite::Erase);
        }
    }

    match event.shape {
        Shape::Point => {
            let radius = event.radius.ok_or_else(|| missing("radius"))?;
            surface.fill_arc(event.x as f32, event.y as f32, radius as f32);
        }
        Shape::Line => {
            let (px, py, width) = match (event.px, event.py, event.width) {
                (Some(px), Some(py), Some(width)) => (px, py, width),
                _ => return Err(missing("px, py or width")),
            };
            surface.stroke_line(
                (px as f32, py as f32),
                (event.x as f32, event.y as f32),
                width as f32,
            );
        }
    }

    Ok(resized)
}

fn to_pixels(extent: f64) -> u32 {
    extent.ceil().clamp(0.0, u32::MAX as f64) as u32
}

fn missing(field: &str) -> SketchpadError {
    SketchpadError::InvalidEvent(format!("Missing {}", field))
}
