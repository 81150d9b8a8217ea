use serde::{Deserialize, Serialize};

use crate::drawing::color::Rgba;
use crate::error::{Result, SketchpadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Brush,
    Erase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Point,
    Line,
}

/// One incremental stroke as emitted by a client.
///
/// `px`/`py` (previous pointer position) and `width` belong to lines,
/// `radius` to points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawEvent {
    pub tool: Tool,
    #[serde(rename = "type")]
    pub shape: Shape,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub px: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub py: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<String>,
}

impl DrawEvent {
    pub fn point(tool: Tool, x: f64, y: f64, radius: f64) -> Self {
        Self {
            tool,
            shape: Shape::Point,
            x,
            y,
            px: None,
            py: None,
            radius: Some(radius),
            width: None,
            col: None,
        }
    }

    pub fn line(tool: Tool, from: (f64, f64), to: (f64, f64), width: f64) -> Self {
        Self {
            tool,
            shape: Shape::Line,
            x: to.0,
            y: to.1,
            px: Some(from.0),
            py: Some(from.1),
            radius: None,
            width: Some(width),
            col: None,
        }
    }

    pub fn with_color(mut self, col: impl Into<String>) -> Self {
        self.col = Some(col.into());
        self
    }

    /// Bottom-right extent the stroke reaches, ignoring its thickness
    pub fn extent(&self) -> (f64, f64) {
        match (self.px, self.py) {
            (Some(px), Some(py)) => (px.max(self.x), py.max(self.y)),
            _ => (self.x, self.y),
        }
    }

    /// Paint color for brush strokes; black when the client sent none
    pub fn color(&self) -> Result<Rgba> {
        match &self.col {
            Some(col) => Rgba::parse(col),
            None => Ok(Rgba::BLACK),
        }
    }

    /// Reject events that would leave the raster in an undefined state
    pub fn validate(&self) -> Result<()> {
        finite("x", self.x)?;
        finite("y", self.y)?;

        match self.shape {
            Shape::Point => {
                let radius = required("radius", self.radius)?;
                non_negative("radius", radius)?;
            }
            Shape::Line => {
                finite("px", required("px", self.px)?)?;
                finite("py", required("py", self.py)?)?;
                let width = required("width", self.width)?;
                non_negative("width", width)?;
            }
        }

        if self.tool == Tool::Brush {
            self.color()?;
        }

        Ok(())
    }
}

fn required(field: &str, value: Option<f64>) -> Result<f64> {
    value.ok_or_else(|| SketchpadError::InvalidEvent(format!("Missing {}", field)))
}

fn finite(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SketchpadError::InvalidEvent(format!(
            "Non-finite {}: {}",
            field, value
        )))
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64> {
    if finite(field, value)? < 0.0 {
        return Err(SketchpadError::InvalidEvent(format!(
            "{} out of range: {}",
            field, value
        )));
    }
    Ok(value)
}
