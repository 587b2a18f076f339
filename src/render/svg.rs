//! A hand-rolled SVG writer: the renderer's vector output is small and regular enough that
//! string formatting is simpler than pulling in a templating dependency.

use super::{Canvas, EmittedPath};
use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub struct Error(fmt::Error);

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Error {}

impl From<fmt::Error> for Error {
    fn from(err: fmt::Error) -> Self {
        Self(err)
    }
}

/// Accumulates `<svg>` markup in memory; call [`SvgCanvas::into_document`] once rendering is done.
pub struct SvgCanvas {
    body: String,
    view_box: (f32, f32, f32, f32),
    background: Option<String>,
    open_groups: usize,
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self { body: String::new(), view_box: (0.0, 0.0, 0.0, 0.0), background: None, open_groups: 0 }
    }

    /// Wraps the accumulated body in the `<svg>` root and returns the finished document. Panics
    /// if called with unclosed groups — a renderer bug, not a runtime condition.
    pub fn into_document(self) -> String {
        assert_eq!(self.open_groups, 0, "SvgCanvas dropped with unclosed groups");

        let (x, y, w, h) = self.view_box;
        let mut out = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{x} {y} {w} {h}\" width=\"{w}\" height=\"{h}\">\n"
        );

        if let Some(background) = &self.background {
            out.push_str(&format!(
                "  <rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" fill=\"{background}\"/>\n"
            ));
        }

        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }
}

impl Default for SvgCanvas {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;").replace('>', "&gt;")
}

impl Canvas for SvgCanvas {
    type Error = Error;

    fn begin_group(&mut self, id: &str, data_name: Option<&str>, hidden: bool) -> Result<(), Self::Error> {
        self.body.push_str(&format!("  <g id=\"{}\"", escape_attr(id)));

        if let Some(name) = data_name {
            self.body.push_str(&format!(" data-name=\"{}\"", escape_attr(name)));
        }

        if hidden {
            self.body.push_str(" visibility=\"hidden\"");
        }

        self.body.push_str(">\n");
        self.open_groups += 1;
        Ok(())
    }

    fn end_group(&mut self) -> Result<(), Self::Error> {
        self.body.push_str("  </g>\n");
        self.open_groups -= 1;
        Ok(())
    }

    fn emit_path(&mut self, path: &EmittedPath) -> Result<(), Self::Error> {
        self.body.push_str(&format!(
            "    <path d=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-opacity=\"{:.2}\" \
             stroke-linecap=\"{}\" stroke-linejoin=\"{}\" fill=\"{}\"/>\n",
            escape_attr(&path.d),
            path.stroke,
            path.width,
            path.opacity,
            path.line_cap,
            path.line_join,
            path.fill,
        ));
        Ok(())
    }

    fn set_view_box(&mut self, x: f32, y: f32, w: f32, h: f32) -> Result<(), Self::Error> {
        self.view_box = (x, y, w, h);
        Ok(())
    }

    fn set_background(&mut self, color: &str) -> Result<(), Self::Error> {
        self.background = Some(color.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{doc::Document, render::PageGeometry};

    #[test]
    fn empty_document_renders_a_single_empty_group() {
        let doc = Document { layers: vec![crate::doc::Layer { name: "Layer 1".into(), visible: true, strokes: vec![] }] };
        let mut canvas = SvgCanvas::new();
        super::super::render(&doc, &mut canvas, PageGeometry::default()).unwrap();

        let xml = canvas.into_document();
        assert!(xml.contains("<rect"));
        assert!(xml.contains("id=\"layer-0\""));
        assert!(!xml.contains("<path"));
    }
}
