//! Drives the tagged block reader over a whole file and materialises a [`Document`].

use super::{color::Color, pen::Pen, point::Point, Document, Error, Layer, Stroke};
use crate::block::{self, BlockType, TaggedBlockReader, HEADER};
use std::io::{Read, Seek};

const LINE_ITEM_TYPE: u8 = 0x03;

pub(super) fn parse<R>(reader: R) -> Result<Document, Error>
where
    R: Read + Seek,
{
    let mut reader = TaggedBlockReader::new(reader);
    check_header(&mut reader)?;

    let mut layer = Layer { name: "Layer 1".to_string(), visible: true, strokes: Vec::new() };

    loop {
        let Some(header) = read_block_header(&mut reader) else {
            break;
        };

        let header_end = reader.tell()?;
        let block_end = header_end + header.length as u64;

        if matches!(BlockType::from(header.block_type), BlockType::LineItem) {
            if let Some(stroke) = parse_line_item(&mut reader, block_end) {
                layer.strokes.push(stroke);
            }
        }

        reader.seek(block_end)?;
    }

    Ok(Document { layers: vec![layer] })
}

fn check_header<R>(reader: &mut TaggedBlockReader<R>) -> Result<(), Error>
where
    R: Read + Seek,
{
    let mut magic = [0u8; HEADER.len()];
    for byte in magic.iter_mut() {
        *byte = reader.read_u8_raw().map_err(|_| Error::BadHeader)?;
    }

    if &magic != HEADER {
        return Err(Error::BadHeader);
    }

    Ok(())
}

struct RawBlockHeader {
    length: u32,
    block_type: u8,
}

/// Reads the 8-byte top-level block header. `None` signals EOF at the length field, which is
/// normal termination; any other short read is also treated as end of file, per the truncation
/// policy.
fn read_block_header<R>(reader: &mut TaggedBlockReader<R>) -> Option<RawBlockHeader>
where
    R: Read + Seek,
{
    let length = u32::from_le_bytes(reader.read_array_raw::<4>().ok()?);
    let _reserved = reader.read_u8_raw().ok()?;
    let _min_version = reader.read_u8_raw().ok()?;
    let _current_version = reader.read_u8_raw().ok()?;
    let block_type = reader.read_u8_raw().ok()?;

    Some(RawBlockHeader { length, block_type })
}

/// Parses one `LineItem` block's scene-item envelope and, if it's a live line, the stroke inside
/// it. Any error anywhere in this path means "discard and move on" — the caller always seeks to
/// `block_end` regardless of what this returns.
fn parse_line_item<R>(reader: &mut TaggedBlockReader<R>, block_end: u64) -> Option<Stroke>
where
    R: Read + Seek,
{
    let outer = reader.enter_scope(block_end);
    let stroke = try_parse_line_item(reader);
    reader.exit_scope(outer);
    stroke.ok().flatten()
}

fn try_parse_line_item<R>(reader: &mut TaggedBlockReader<R>) -> block::Result<Option<Stroke>>
where
    R: Read + Seek,
{
    reader.read_id(1)?; // parent id
    reader.read_id(2)?; // item id
    reader.read_id(3)?; // left sibling id
    reader.read_id(4)?; // right sibling id

    let deleted_length = reader.read_int(5)?;
    if deleted_length != 0 {
        return Ok(None);
    }

    if !reader.has_subblock(6) {
        return Ok(None);
    }

    let value_length = reader.read_subblock(6)?;
    let value_end = reader.tell()? + value_length as u64;
    let inner = reader.enter_scope(value_end);
    let item_type = reader.read_u8_raw()?;

    let stroke = if item_type == LINE_ITEM_TYPE {
        parse_line_payload(reader)?
    } else {
        None
    };

    reader.exit_scope(inner);
    Ok(stroke)
}

fn parse_line_payload<R>(reader: &mut TaggedBlockReader<R>) -> block::Result<Option<Stroke>>
where
    R: Read + Seek,
{
    let tool_id = reader.read_int(1)?;
    let color_id = reader.read_int(2)?;
    let thickness_scale = reader.read_double(3)?;
    let _starting_length = reader.read_float(4)?;

    let points_length = reader.read_subblock(5)?;
    let num_points = points_length as usize / Point::SIZE;

    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        points.push(Point::from_bytes(reader.read_array_raw::<{ Point::SIZE }>()?));
    }

    let remainder = points_length as usize % Point::SIZE;
    if remainder != 0 {
        // Tolerated per the format's own documented leeway: skip whatever is left of the
        // subblock rather than treating it as a hard failure.
        for _ in 0..remainder {
            reader.read_u8_raw()?;
        }
    }

    reader.read_id(6)?; // timestamp id

    if points.is_empty() {
        return Ok(None);
    }

    Ok(Some(Stroke {
        pen: Pen::new(tool_id),
        color: Color::new(color_id),
        thickness_scale,
        points,
    }))
}
