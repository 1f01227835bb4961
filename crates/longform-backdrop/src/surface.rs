#![forbid(unsafe_code)]

//! Drawing surfaces for backdrop frames.
//!
//! Backdrops draw through the [`Surface`] trait in screen coordinates.
//! [`Raster`] rasterizes into an RGBA pixel buffer; [`Recording`] logs
//! the operations instead, which is what the frame tests assert against.

use crate::color::Rgba;

/// A surface a backdrop frame draws onto. Coordinates are screen-space
/// pixels with the origin at the top left.
pub trait Surface {
    /// Surface width in pixels.
    fn width(&self) -> f32;

    /// Surface height in pixels.
    fn height(&self) -> f32;

    /// Erase everything drawn so far.
    fn clear(&mut self);

    /// Fill a circle.
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba);

    /// Stroke a line segment.
    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Rgba);

    /// Fill the whole surface with a top-to-bottom gradient. Stops are
    /// `(position, color)` with positions in `[0, 1]`, sorted.
    fn fill_vertical_gradient(&mut self, stops: &[(f32, Rgba)]);

    /// Fill a circle with a soft halo extending `blur` pixels past the
    /// radius.
    fn glow_circle(&mut self, x: f32, y: f32, radius: f32, blur: f32, color: Rgba);
}

// ---------------------------------------------------------------------------
// Raster surface
// ---------------------------------------------------------------------------

/// An RGBA pixel buffer surface with source-over blending.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Raster {
    /// Create a transparent surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
        }
    }

    /// Read one pixel. Out-of-bounds reads return `None`.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn blend(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = color.over(self.pixels[idx]);
        }
    }

    fn fill_disc(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        let radius = radius.max(0.5);
        let x_min = (x - radius).floor() as i32;
        let x_max = (x + radius).ceil() as i32;
        let y_min = (y - radius).floor() as i32;
        let y_max = (y + radius).ceil() as i32;
        let r2 = radius * radius;
        for py in y_min..=y_max {
            for px in x_min..=x_max {
                let dx = px as f32 + 0.5 - x;
                let dy = py as f32 + 0.5 - y;
                if dx * dx + dy * dy <= r2 {
                    self.blend(px, py, color);
                }
            }
        }
    }
}

impl Surface for Raster {
    fn width(&self) -> f32 {
        self.width as f32
    }

    fn height(&self) -> f32 {
        self.height as f32
    }

    fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        self.fill_disc(x, y, radius, color);
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Rgba) {
        let x0 = x0.round() as i32;
        let y0 = y0.round() as i32;
        let x1 = x1.round() as i32;
        let y1 = y1.round() as i32;
        let thick = width > 1.5;

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx: i32 = if x0 < x1 { 1 } else { -1 };
        let sy: i32 = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut cx = x0;
        let mut cy = y0;

        loop {
            if thick {
                self.fill_disc(cx as f32 + 0.5, cy as f32 + 0.5, width / 2.0, color);
            } else {
                self.blend(cx, cy, color);
            }

            if cx == x1 && cy == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                if cx == x1 {
                    break;
                }
                err += dy;
                cx += sx;
            }
            if e2 <= dx {
                if cy == y1 {
                    break;
                }
                err += dx;
                cy += sy;
            }
        }
    }

    fn fill_vertical_gradient(&mut self, stops: &[(f32, Rgba)]) {
        if stops.is_empty() || self.height == 0 {
            return;
        }
        for py in 0..self.height as i32 {
            let t = (py as f32 + 0.5) / self.height as f32;
            let color = gradient_sample(stops, t);
            for px in 0..self.width as i32 {
                self.blend(px, py, color);
            }
        }
    }

    fn glow_circle(&mut self, x: f32, y: f32, radius: f32, blur: f32, color: Rgba) {
        if blur > 0.0 {
            let outer = radius + blur;
            let x_min = (x - outer).floor() as i32;
            let x_max = (x + outer).ceil() as i32;
            let y_min = (y - outer).floor() as i32;
            let y_max = (y + outer).ceil() as i32;
            for py in y_min..=y_max {
                for px in x_min..=x_max {
                    let dx = px as f32 + 0.5 - x;
                    let dy = py as f32 + 0.5 - y;
                    let d = (dx * dx + dy * dy).sqrt();
                    if d > radius && d <= outer {
                        let falloff = 1.0 - (d - radius) / blur;
                        self.blend(px, py, color.with_opacity(falloff * falloff * 0.5));
                    }
                }
            }
        }
        self.fill_disc(x, y, radius, color);
    }
}

/// Sample a sorted stop list at position `t`.
fn gradient_sample(stops: &[(f32, Rgba)], t: f32) -> Rgba {
    let first = stops[0];
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t <= p1 {
            let span = p1 - p0;
            let u = if span > 0.0 { (t - p0) / span } else { 1.0 };
            return c0.lerp(c1, u);
        }
    }
    stops[stops.len() - 1].1
}

// ---------------------------------------------------------------------------
// Recording surface
// ---------------------------------------------------------------------------

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// The surface was cleared.
    Clear,
    /// A filled circle.
    Circle {
        /// Center x.
        x: f32,
        /// Center y.
        y: f32,
        /// Radius.
        radius: f32,
        /// Fill color.
        color: Rgba,
    },
    /// A stroked segment.
    Line {
        /// Start x.
        x0: f32,
        /// Start y.
        y0: f32,
        /// End x.
        x1: f32,
        /// End y.
        y1: f32,
        /// Stroke width.
        width: f32,
        /// Stroke color.
        color: Rgba,
    },
    /// A full-surface vertical gradient.
    Gradient {
        /// Stop list as passed in.
        stops: Vec<(f32, Rgba)>,
    },
    /// A glowing circle.
    Glow {
        /// Center x.
        x: f32,
        /// Center y.
        y: f32,
        /// Radius.
        radius: f32,
        /// Halo extent.
        blur: f32,
        /// Color.
        color: Rgba,
    },
}

/// A surface that records operations instead of rasterizing them.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

impl Recording {
    /// Create a recording surface of the given logical size.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Operations recorded so far, in draw order.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain the recorded operations.
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Count of recorded circle fills.
    pub fn circle_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .count()
    }

    /// Count of recorded line strokes.
    pub fn line_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count()
    }
}

impl Surface for Recording {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        self.ops.push(DrawOp::Circle {
            x,
            y,
            radius,
            color,
        });
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Rgba) {
        self.ops.push(DrawOp::Line {
            x0,
            y0,
            x1,
            y1,
            width,
            color,
        });
    }

    fn fill_vertical_gradient(&mut self, stops: &[(f32, Rgba)]) {
        self.ops.push(DrawOp::Gradient {
            stops: stops.to_vec(),
        });
    }

    fn glow_circle(&mut self, x: f32, y: f32, radius: f32, blur: f32, color: Rgba) {
        self.ops.push(DrawOp::Glow {
            x,
            y,
            radius,
            blur,
            color,
        });
    }
}
