//! Overlays rendered strokes onto an existing PDF page using `printpdf`.
//!
//! Pulled in with `default-features = false`: the overlay only ever draws line geometry, so the
//! crate's HTML/text-layout feature chain (and the `azul-layout` dependencies it drags in) is
//! never needed here.

use super::{Canvas, EmittedPath};
use printpdf::{Color as PdfColor, Line, LineCapStyle, LineJoinStyle, Mm, PdfLayerReference, Point, Rgb};
use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub struct Error(String);

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Error {}

/// Draws onto one existing `printpdf` layer. Output-space units map 1:1 to PDF points; the
/// caller is responsible for picking a layer that belongs to the right page.
pub struct PdfCanvas<'a> {
    layer: &'a PdfLayerReference,
    hidden_depth: usize,
}

impl<'a> PdfCanvas<'a> {
    pub fn new(layer: &'a PdfLayerReference) -> Self {
        Self { layer, hidden_depth: 0 }
    }
}

fn parse_hex_color(hex: &str) -> PdfColor {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);

    PdfColor::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

/// Turns the SVG-flavoured path grammar `path_data` builds (`M`/`L`/`Q`/`l`) into the flat point
/// list `printpdf::Line` draws. Quadratic control points are dropped rather than reproduced,
/// since a PDF overlay only needs a visually close polyline, not an exact Bezier match.
fn points_from_path(d: &str) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    let mut tokens = d.split_whitespace().peekable();
    let mut cursor = (0.0, 0.0);

    while let Some(command) = tokens.next() {
        match command {
            "M" | "L" => {
                let x: f64 = tokens.next().and_then(|s| s.parse().ok()).unwrap_or(cursor.0);
                let y: f64 = tokens.next().and_then(|s| s.parse().ok()).unwrap_or(cursor.1);
                cursor = (x, y);
                points.push(cursor);
            }
            "l" => {
                let dx: f64 = tokens.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
                let dy: f64 = tokens.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
                cursor = (cursor.0 + dx, cursor.1 + dy);
                points.push(cursor);
            }
            "Q" => {
                let _control_x = tokens.next();
                let _control_y = tokens.next();
                let x: f64 = tokens.next().and_then(|s| s.parse().ok()).unwrap_or(cursor.0);
                let y: f64 = tokens.next().and_then(|s| s.parse().ok()).unwrap_or(cursor.1);
                cursor = (x, y);
                points.push(cursor);
            }
            _ => {}
        }
    }

    points
}

impl Canvas for PdfCanvas<'_> {
    type Error = Error;

    fn begin_group(&mut self, _id: &str, _data_name: Option<&str>, hidden: bool) -> Result<(), Self::Error> {
        if hidden {
            self.hidden_depth += 1;
        }
        Ok(())
    }

    fn end_group(&mut self) -> Result<(), Self::Error> {
        if self.hidden_depth > 0 {
            self.hidden_depth -= 1;
        }
        Ok(())
    }

    fn emit_path(&mut self, path: &EmittedPath) -> Result<(), Self::Error> {
        if self.hidden_depth > 0 {
            return Ok(());
        }

        let points = points_from_path(&path.d);
        if points.len() < 2 {
            return Ok(());
        }

        let line = Line {
            points: points
                .into_iter()
                .map(|(x, y)| (Point::new(Mm(x as f32), Mm(y as f32)), false))
                .collect(),
            is_closed: false,
        };

        self.layer.set_outline_color(parse_hex_color(&path.stroke));
        self.layer.set_outline_thickness(path.width);
        self.layer.set_line_cap_style(LineCapStyle::Round);
        self.layer.set_line_join_style(LineJoinStyle::Round);
        self.layer.add_line(line);

        Ok(())
    }

    fn set_view_box(&mut self, _x: f32, _y: f32, _w: f32, _h: f32) -> Result<(), Self::Error> {
        // The page already exists; its media box is fixed before the overlay runs.
        Ok(())
    }

    fn set_background(&mut self, _color: &str) -> Result<(), Self::Error> {
        // Overlays draw onto an existing page; the background is whatever is already there.
        Ok(())
    }
}
