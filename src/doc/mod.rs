//! Parses a reMarkable `.lines` file into a [`Document`] of stroke geometry.
//!
//! This is a one-way decoder: text, CRDT genealogy, and tombstones are discarded, and nothing in
//! this module can produce or edit the source format.

pub mod color;
pub mod pen;
pub mod point;

mod parser;

use self::{color::Color, pen::Pen, point::Point};
use std::{
    fmt::{self, Display, Formatter},
    fs::File,
    io::{self, BufReader},
    path::Path,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// The first 44 bytes didn't match the expected v6 magic.
    BadHeader,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "{err}"),
            Error::BadHeader => write!(f, "not a reMarkable v6 .lines file"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// One continuous pen trace. `points` is insertion-ordered and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub pen: Pen,
    pub color: Color,
    pub thickness_scale: f64,
    pub points: Vec<Point>,
}

/// A named group of strokes painted in source order (painter's algorithm: later strokes paint
/// over earlier ones).
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub strokes: Vec<Stroke>,
}

/// The result of decoding a `.lines` file: always at least one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub layers: Vec<Layer>,
}

impl Document {
    /// Reads and parses a `.lines` file from disk.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parses a `.lines` file from any seekable byte source.
    pub fn parse<R>(reader: R) -> Result<Self>
    where
        R: io::Read + io::Seek,
    {
        parser::parse(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internals::tests::{file, line_item_block};

    #[test]
    fn bad_header_is_fatal() {
        let bytes = b"not a reMarkable file at all................".to_vec();
        assert!(matches!(Document::parse(io::Cursor::new(bytes)), Err(Error::BadHeader)));
    }

    #[test]
    fn truncation_between_blocks_is_normal_termination() -> eyre::Result<()> {
        let bytes = file(&[]);
        let doc = Document::parse(io::Cursor::new(bytes))?;
        assert_eq!(doc.layers.len(), 1);
        assert!(doc.layers[0].strokes.is_empty());
        Ok(())
    }

    #[test]
    fn parses_a_single_line_item_into_one_stroke() -> eyre::Result<()> {
        let bytes = file(&line_item_block(0));
        let doc = Document::parse(io::Cursor::new(bytes))?;

        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.layers[0].strokes.len(), 1);

        let stroke = &doc.layers[0].strokes[0];
        assert_eq!(stroke.points.len(), 2);
        assert_eq!(stroke.points[1].x, 10.0);
        assert_eq!(stroke.points[1].y, 20.0);
        Ok(())
    }

    #[test]
    fn tombstoned_items_contribute_no_stroke() -> eyre::Result<()> {
        let bytes = file(&line_item_block(64));
        let doc = Document::parse(io::Cursor::new(bytes))?;
        assert!(doc.layers[0].strokes.is_empty());
        Ok(())
    }

    #[test]
    fn decoding_the_same_bytes_twice_is_idempotent() -> eyre::Result<()> {
        let bytes = file(&line_item_block(0));
        let first = Document::parse(io::Cursor::new(bytes.clone()))?;
        let second = Document::parse(io::Cursor::new(bytes))?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn unrecognized_block_types_are_skipped() -> eyre::Result<()> {
        let mut block = vec![4u32.to_le_bytes().to_vec(), vec![0, 0, 1], vec![0x01]].concat();
        block.extend([1, 2, 3, 4]); // garbage payload, never interpreted
        assert_eq!(block.len(), 12);

        let bytes = file(&block);
        let doc = Document::parse(io::Cursor::new(bytes))?;
        assert!(doc.layers[0].strokes.is_empty());
        Ok(())
    }
}
