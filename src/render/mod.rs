//! Maps a [`Document`](crate::doc::Document) onto an abstract [`Canvas`], applying pen/color
//! semantics and the device-space → output-space coordinate transform.

#[cfg(feature = "pdf")]
pub mod pdf;
pub mod svg;

use crate::doc::{color::Color, point::Point, Document, Layer, Stroke};

/// Source resolution over output resolution: device points are 227 units per inch, output space
/// is the usual 72-per-inch page unit.
pub const SCALE: f64 = 227.0 / 72.0;

/// Used for `x_offset` when no [`PageLayout`] supplies a page width (A4-ish, in points).
pub const DEFAULT_TARGET_PAGE_WIDTH: f32 = 595.0;

/// The device's native page resolution, used for the default `view_box` when no [`PageLayout`]
/// supplies explicit page dimensions.
pub const DEVICE_PAGE_WIDTH: f64 = 1404.0;
pub const DEVICE_PAGE_HEIGHT: f64 = 1872.0;

const MIN_STROKE_WIDTH: f32 = 0.5;
const TRANSPARENT_OPACITY: f32 = 0.4;
const OPAQUE_OPACITY: f32 = 1.0;

/// A read-only mapping from document id to its ordered pages and their target dimensions, owned
/// by whatever drives batch export. The core renderer only needs a page's `(width, height)`; a
/// missing entry falls back to the defaults above.
pub trait PageLayout {
    fn page_ids(&self, document_id: &str) -> Vec<String>;
    fn page_size(&self, document_id: &str, page_id: &str) -> Option<(f32, f32)>;
}

/// The sink the renderer writes vector paths to. Two concrete implementations are expected: an
/// SVG writer ([`svg::SvgCanvas`]) and a PDF overlay (behind the `pdf` feature).
pub trait Canvas {
    type Error: std::error::Error;

    fn begin_group(&mut self, id: &str, data_name: Option<&str>, hidden: bool) -> Result<(), Self::Error>;
    fn end_group(&mut self) -> Result<(), Self::Error>;
    fn emit_path(&mut self, path: &EmittedPath) -> Result<(), Self::Error>;
    fn set_view_box(&mut self, x: f32, y: f32, w: f32, h: f32) -> Result<(), Self::Error>;
    fn set_background(&mut self, color: &str) -> Result<(), Self::Error>;
}

/// One stroke's worth of vector path data, ready for a [`Canvas`] to write out.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedPath {
    pub d: String,
    pub stroke: String,
    pub width: f32,
    pub opacity: f32,
    pub line_cap: &'static str,
    pub line_join: &'static str,
    pub fill: &'static str,
}

/// Target geometry for one rendered page: the view box size and the horizontal device-to-output
/// offset derived from its width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub view_box: (f32, f32),
    pub x_offset: f64,
}

impl PageGeometry {
    pub fn new(target_width: f32) -> Self {
        Self {
            view_box: ((DEVICE_PAGE_WIDTH / SCALE) as f32, (DEVICE_PAGE_HEIGHT / SCALE) as f32),
            x_offset: (target_width as f64 / 2.0) * SCALE,
        }
    }

    pub fn with_view_box(target_width: f32, view_box: (f32, f32)) -> Self {
        Self { view_box, x_offset: (target_width as f64 / 2.0) * SCALE }
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_PAGE_WIDTH)
    }
}

/// Renders every layer of `document` onto `canvas` using `geometry`.
pub fn render<C: Canvas>(document: &Document, canvas: &mut C, geometry: PageGeometry) -> Result<(), C::Error> {
    let (w, h) = geometry.view_box;
    canvas.set_view_box(0.0, 0.0, w, h)?;
    canvas.set_background("#ffffff")?;

    for (index, layer) in document.layers.iter().enumerate() {
        render_layer(index, layer, canvas, geometry)?;
    }

    Ok(())
}

fn render_layer<C: Canvas>(
    index: usize,
    layer: &Layer,
    canvas: &mut C,
    geometry: PageGeometry,
) -> Result<(), C::Error> {
    let id = format!("layer-{index}");
    canvas.begin_group(&id, Some(layer.name.as_str()), !layer.visible)?;

    for stroke in &layer.strokes {
        if let Some(path) = emit_stroke(stroke, geometry) {
            canvas.emit_path(&path)?;
        }
    }

    canvas.end_group()
}

/// Applies the per-stroke pipeline (§4.D): eraser/empty-point filtering, color and width
/// resolution, then path emission. Returns `None` for strokes that shouldn't reach the canvas.
fn emit_stroke(stroke: &Stroke, geometry: PageGeometry) -> Option<EmittedPath> {
    if stroke.pen.is_eraser() || stroke.points.is_empty() {
        return None;
    }

    let stroke_color = format_color(&stroke.color);
    let opacity = if stroke.pen.is_transparent() { TRANSPARENT_OPACITY } else { OPAQUE_OPACITY };
    let width = stroke_width(stroke);
    let d = path_data(&stroke.points, geometry);

    Some(EmittedPath {
        d,
        stroke: stroke_color,
        width,
        opacity,
        line_cap: "round",
        line_join: "round",
        fill: "none",
    })
}

fn format_color(color: &Color) -> String {
    let rgb = color.rgb();
    format!("#{:02x}{:02x}{:02x}", rgb.0, rgb.1, rgb.2)
}

fn stroke_width(stroke: &Stroke) -> f32 {
    let widths: Vec<f32> = stroke.points.iter().map(|p| p.width as f32).collect();
    let mean_width = widths.iter().sum::<f32>() / widths.len() as f32;

    let from_points = mean_width / SCALE as f32 / 4.0;
    let width = if mean_width > 0.0 {
        from_points
    } else {
        stroke.pen.base_width() * stroke.thickness_scale as f32 / SCALE as f32
    };

    width.max(MIN_STROKE_WIDTH)
}

fn transform(point: &Point, geometry: PageGeometry) -> (f64, f64) {
    let x = (point.x as f64 + geometry.x_offset) / SCALE;
    let y = point.y as f64 / SCALE;
    (x, y)
}

fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

fn fmt2(value: f64) -> String {
    format!("{value:.2}")
}

/// Builds the SVG-style path `d` string per the documented emission rules: a degenerate dot for a
/// single point, a straight segment for two, and piecewise quadratic smoothing through midpoints
/// for three or more.
fn path_data(points: &[Point], geometry: PageGeometry) -> String {
    let mapped: Vec<(f64, f64)> = points.iter().map(|p| transform(p, geometry)).collect();

    match mapped.as_slice() {
        [] => String::new(),
        [p0] => format!(
            "M {} {} l {} {}",
            fmt2(p0.0),
            fmt2(p0.1),
            fmt2(0.1),
            fmt2(0.1)
        ),
        [p0, p1] => {
            format!("M {} {} L {} {}", fmt2(p0.0), fmt2(p0.1), fmt2(p1.0), fmt2(p1.1))
        }
        points => {
            let mut d = format!("M {} {}", fmt2(points[0].0), fmt2(points[0].1));
            let last = points.len() - 1;

            for i in 1..points.len() {
                if i == 1 {
                    let mid = midpoint(points[0], points[1]);
                    d.push_str(&format!(" L {} {}", fmt2(mid.0), fmt2(mid.1)));
                } else if i == last {
                    d.push_str(&format!(
                        " Q {} {} {} {}",
                        fmt2(points[i - 1].0),
                        fmt2(points[i - 1].1),
                        fmt2(points[i].0),
                        fmt2(points[i].1)
                    ));
                } else {
                    let end = midpoint(points[i - 1], points[i]);
                    d.push_str(&format!(
                        " Q {} {} {} {}",
                        fmt2(points[i - 1].0),
                        fmt2(points[i - 1].1),
                        fmt2(end.0),
                        fmt2(end.1)
                    ));
                }
            }

            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{color::Color, pen::Pen};

    fn point(x: f32, y: f32, width: u16) -> Point {
        Point { x, y, speed: 0, width, direction: 0, pressure: 0 }
    }

    #[test]
    fn coordinate_transform_matches_the_documented_formula() {
        let geometry = PageGeometry::new(595.0);
        let (x, y) = transform(&point(0.0, 0.0, 16), geometry);
        assert!((x - 297.50).abs() < 1e-2);
        assert!((y - 0.0).abs() < 1e-2);
    }

    #[test]
    fn three_point_stroke_matches_the_documented_scenario() {
        let geometry = PageGeometry::new(595.0);
        let points = vec![point(0.0, 0.0, 16), point(100.0, 200.0, 16), point(200.0, 400.0, 16)];
        let d = path_data(&points, geometry);

        assert!(d.starts_with("M 297.50 0.00 L 313.36 31.72 Q"));
    }

    #[test]
    fn stroke_width_falls_back_when_point_widths_are_all_zero() {
        let stroke = Stroke {
            pen: Pen::new(4),
            color: Color::new(0),
            thickness_scale: 1.0,
            points: vec![point(0.0, 0.0, 0), point(1.0, 1.0, 0)],
        };

        let width = stroke_width(&stroke);
        let expected = stroke.pen.base_width() / SCALE as f32;
        assert!((width - expected).abs() < 1e-4);
    }

    #[test]
    fn width_formula_matches_the_documented_scenario() {
        let stroke = Stroke {
            pen: Pen::new(4),
            color: Color::new(0),
            thickness_scale: 1.0,
            points: vec![point(0.0, 0.0, 16), point(100.0, 200.0, 16), point(200.0, 400.0, 16)],
        };

        assert!((stroke_width(&stroke) - 1.27).abs() < 1e-2);
    }

    #[test]
    fn erasers_never_emit() {
        let stroke = Stroke {
            pen: Pen::new(6),
            color: Color::new(0),
            thickness_scale: 1.0,
            points: vec![point(0.0, 0.0, 16)],
        };

        assert!(emit_stroke(&stroke, PageGeometry::default()).is_none());
    }

    #[test]
    fn opacity_partitions_on_transparent_pens() {
        let transparent = Stroke {
            pen: Pen::new(5),
            color: Color::new(0),
            thickness_scale: 1.0,
            points: vec![point(0.0, 0.0, 16), point(1.0, 1.0, 16)],
        };
        let opaque = Stroke { pen: Pen::new(4), ..transparent.clone() };

        assert_eq!(emit_stroke(&transparent, PageGeometry::default()).unwrap().opacity, 0.4);
        assert_eq!(emit_stroke(&opaque, PageGeometry::default()).unwrap().opacity, 1.0);
    }
}
