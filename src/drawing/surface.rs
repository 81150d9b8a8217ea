//! Raster backend contract and its tiny-skia implementation.

use image::{ImageBuffer, ImageFormat, ImageReader, Limits, Rgba as ImageRgba};
use std::io::Cursor;
use tiny_skia::{
    BlendMode, ColorU8, FillRule, IntRect, LineCap, Paint, PathBuilder, Pixmap, PixmapPaint,
    Stroke, Transform,
};

use crate::drawing::color::Rgba;
use crate::error::{Result, SketchpadError};

/// How new paint combines with what is already on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composite {
    /// Source-over
    #[default]
    Normal,
    /// Destination-out: painted coverage removes existing pixels
    Erase,
}

/// Drawing capabilities the canvas and replay engine rely on.
///
/// Mirrors a 2D canvas context: composite mode and color are sticky state
/// applied to subsequent `fill_arc` / `stroke_line` calls.
pub trait Surface: Sized {
    /// Opaque block of pixels captured by `read_pixels`
    type Pixels;

    /// Allocate a blank (fully transparent) surface
    fn allocate(width: u32, height: u32) -> Result<Self>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Self::Pixels>;

    /// Copy pixels verbatim (no blending) with their top-left at `(x, y)`
    fn write_pixels(&mut self, pixels: &Self::Pixels, x: i32, y: i32);

    fn set_composite(&mut self, mode: Composite);

    fn set_color(&mut self, color: Rgba);

    /// Filled full circle
    fn fill_arc(&mut self, x: f32, y: f32, radius: f32);

    /// Round-capped stroked segment
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32);

    /// Decode an encoded image and draw it source-over at `(x, y)`, cropped
    /// to the surface. Images declaring more than `max_size` are rejected
    /// before any pixel buffer is allocated.
    fn decode_onto(
        &mut self,
        encoded: &[u8],
        x: u32,
        y: u32,
        max_size: (u32, u32),
    ) -> Result<()>;

    /// Encode the whole surface as PNG
    fn encode_png(&self) -> Result<Vec<u8>>;
}

pub struct PixmapSurface {
    pixmap: Pixmap,
    composite: Composite,
    color: Rgba,
}

impl PixmapSurface {
    /// Straight-alpha color of a single pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgba::new(c.red(), c.green(), c.blue(), c.alpha()))
    }

    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.anti_alias = true;

        match self.composite {
            Composite::Normal => {
                paint.set_color_rgba8(self.color.r, self.color.g, self.color.b, self.color.a);
                paint.blend_mode = BlendMode::SourceOver;
            }
            Composite::Erase => {
                paint.set_color_rgba8(0, 0, 0, 255);
                paint.blend_mode = BlendMode::DestinationOut;
            }
        }

        paint
    }
}

impl Surface for PixmapSurface {
    type Pixels = Pixmap;

    fn allocate(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            SketchpadError::Raster(format!("Cannot allocate {}x{} surface", width, height))
        })?;

        Ok(Self {
            pixmap,
            composite: Composite::Normal,
            color: Rgba::BLACK,
        })
    }

    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Pixmap> {
        let rect = IntRect::from_xywh(x as i32, y as i32, width, height)?;
        self.pixmap.clone_rect(rect)
    }

    fn write_pixels(&mut self, pixels: &Pixmap, x: i32, y: i32) {
        let paint = PixmapPaint {
            blend_mode: BlendMode::Source,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(x, y, pixels.as_ref(), &paint, Transform::identity(), None);
    }

    fn set_composite(&mut self, mode: Composite) {
        self.composite = mode;
    }

    fn set_color(&mut self, color: Rgba) {
        self.color = color;
    }

    fn fill_arc(&mut self, x: f32, y: f32, radius: f32) {
        let Some(path) = PathBuilder::from_circle(x, y, radius) else {
            return;
        };
        let paint = self.paint();
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32) {
        if width <= 0.0 {
            return;
        }

        if from == to {
            // A zero-length round-capped segment renders as a dot
            self.fill_arc(from.0, from.1, width / 2.0);
            return;
        }

        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);

        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Default::default()
        };

        if let Some(path) = pb.finish() {
            let paint = self.paint();
            self.pixmap
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    fn decode_onto(
        &mut self,
        encoded: &[u8],
        x: u32,
        y: u32,
        (max_width, max_height): (u32, u32),
    ) -> Result<()> {
        let mut reader = ImageReader::new(Cursor::new(encoded))
            .with_guessed_format()
            .map_err(|e| SketchpadError::InvalidSnapshot(e.to_string()))?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(max_width);
        limits.max_image_height = Some(max_height);
        reader.limits(limits);

        let decoded = reader.decode()?.into_rgba8();
        let (image_width, image_height) = decoded.dimensions();

        // Only the part that lands on the surface is copied
        let width = image_width.min(self.width().saturating_sub(x));
        let height = image_height.min(self.height().saturating_sub(y));
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut layer = Pixmap::new(width, height).ok_or_else(|| {
            SketchpadError::Raster(format!("Cannot allocate {}x{} layer", width, height))
        })?;

        let visible = decoded
            .rows()
            .take(height as usize)
            .flat_map(|row| row.take(width as usize));
        for (dst, src) in layer.pixels_mut().iter_mut().zip(visible) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }

        self.pixmap.draw_pixmap(
            x as i32,
            y as i32,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        let mut img: ImageBuffer<ImageRgba<u8>, Vec<u8>> =
            ImageBuffer::new(self.pixmap.width(), self.pixmap.height());

        // tiny-skia stores premultiplied alpha, PNG wants straight alpha
        for (dst, src) in img.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = ImageRgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_allocate_is_transparent() {
        let surface = PixmapSurface::allocate(20, 10).unwrap();
        assert_eq!((surface.width(), surface.height()), (20, 10));
        assert_eq!(surface.pixel(5, 5), Some(Rgba::new(0, 0, 0, 0)));
    }

    #[test]
    fn test_allocate_zero_fails() {
        assert!(PixmapSurface::allocate(0, 10).is_err());
    }

    #[test]
    fn test_fill_arc_uses_color() {
        let mut surface = PixmapSurface::allocate(50, 50).unwrap();
        surface.set_color(Rgba::new(255, 0, 0, 255));
        surface.fill_arc(25.0, 25.0, 10.0);

        assert_eq!(surface.pixel(25, 25), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(surface.pixel(2, 2).unwrap().a, 0);
    }

    #[test]
    fn test_stroke_line_round_cap() {
        let mut surface = PixmapSurface::allocate(100, 20).unwrap();
        surface.stroke_line((10.0, 10.0), (90.0, 10.0), 6.0);

        assert_eq!(surface.pixel(50, 10).unwrap().a, 255);
        // Round cap extends past the end point by half the width
        assert!(surface.pixel(92, 10).unwrap().a > 0);
        assert_eq!(surface.pixel(50, 2).unwrap().a, 0);
    }

    #[test]
    fn test_zero_length_line_draws_dot() {
        let mut surface = PixmapSurface::allocate(20, 20).unwrap();
        surface.stroke_line((10.0, 10.0), (10.0, 10.0), 8.0);
        assert_eq!(surface.pixel(10, 10).unwrap().a, 255);
    }

    #[test]
    fn test_erase_clears_alpha() {
        let mut surface = PixmapSurface::allocate(40, 40).unwrap();
        surface.fill_arc(20.0, 20.0, 15.0);

        surface.set_composite(Composite::Erase);
        surface.set_color(Rgba::new(255, 255, 255, 255));
        surface.fill_arc(20.0, 20.0, 6.0);

        assert_eq!(surface.pixel(20, 20).unwrap().a, 0);
        assert_eq!(surface.pixel(20, 10).unwrap().a, 255);
    }

    #[test]
    fn test_read_write_pixels_verbatim() {
        let mut source = PixmapSurface::allocate(10, 10).unwrap();
        source.set_color(Rgba::new(0, 0, 255, 128));
        source.fill_arc(5.0, 5.0, 4.0);
        let block = source.read_pixels(0, 0, 10, 10).unwrap();

        let mut target = PixmapSurface::allocate(30, 30).unwrap();
        target.write_pixels(&block, 0, 0);
        assert_eq!(
            target.read_pixels(0, 0, 10, 10).unwrap().data(),
            block.data()
        );
    }

    #[test]
    fn test_png_round_trip() {
        let mut surface = PixmapSurface::allocate(16, 16).unwrap();
        surface.set_color(Rgba::new(0, 200, 0, 255));
        surface.fill_arc(8.0, 8.0, 4.0);

        let png = surface.encode_png().unwrap();
        assert_eq!(&png[0..8], &PNG_MAGIC);

        let mut copy = PixmapSurface::allocate(16, 16).unwrap();
        copy.decode_onto(&png, 0, 0, (16, 16)).unwrap();
        assert_eq!(copy.pixel(8, 8), surface.pixel(8, 8));
        assert_eq!(copy.pixel(0, 0).unwrap().a, 0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let mut surface = PixmapSurface::allocate(4, 4).unwrap();
        assert!(surface.decode_onto(b"not an image", 0, 0, (4, 4)).is_err());
    }

    #[test]
    fn test_decode_rejects_oversized_image() {
        let mut big = PixmapSurface::allocate(64, 48).unwrap();
        big.fill_arc(32.0, 24.0, 10.0);
        let png = big.encode_png().unwrap();

        let mut target = PixmapSurface::allocate(64, 48).unwrap();
        let err = target.decode_onto(&png, 0, 0, (63, 48)).unwrap_err();
        assert_eq!(err.code(), "invalid_snapshot");
        let err = target.decode_onto(&png, 0, 0, (64, 47)).unwrap_err();
        assert_eq!(err.code(), "invalid_snapshot");

        // Untouched by the rejected decodes
        assert_eq!(target.pixel(32, 24).unwrap().a, 0);
    }

    #[test]
    fn test_decode_crops_to_surface() {
        let mut big = PixmapSurface::allocate(40, 40).unwrap();
        big.set_color(Rgba::new(255, 0, 0, 255));
        big.fill_arc(5.0, 5.0, 4.0);
        big.fill_arc(35.0, 35.0, 4.0);
        let png = big.encode_png().unwrap();

        let mut small = PixmapSurface::allocate(20, 20).unwrap();
        small.decode_onto(&png, 0, 0, (2000, 1100)).unwrap();
        assert_eq!(small.pixel(5, 5), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(small.pixel(19, 19).unwrap().a, 0);

        let mut offset = PixmapSurface::allocate(20, 20).unwrap();
        offset.decode_onto(&png, 10, 10, (2000, 1100)).unwrap();
        assert_eq!(offset.pixel(15, 15), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(offset.pixel(5, 5).unwrap().a, 0);

        // Placed entirely off the surface: nothing to draw
        offset.decode_onto(&png, 20, 0, (2000, 1100)).unwrap();
    }
}
