pub mod canvas;
pub mod color;
pub mod event;
pub mod replay;
pub mod snapshot;
pub mod surface;

pub use canvas::{CanvasLimits, CanvasState};
pub use color::Rgba;
pub use event::{DrawEvent, Shape, Tool};
pub use surface::{Composite, PixmapSurface, Surface};
