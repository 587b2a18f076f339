//! The v6 "tagged block" container: every field and nested block is prefixed with a tag that
//! says where it is and what it holds, so a reader can skip anything it doesn't recognise without
//! knowing its shape in advance.

use crate::internals::reader::{BinStreamReader, CrdtId};
use std::{
    fmt::{self, Display, Formatter},
    io::{Read, Seek},
};

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// The literal 44-byte magic every v6 `.lines` file starts with, space-padded.
pub(crate) const HEADER: &[u8; 44] = b"reMarkable .lines file, version=6          ";

#[derive(Debug)]
pub(crate) enum Error {
    /// A read ran past the end of the stream or the current block/subblock.
    UnexpectedEof,
    /// `expect_tag` didn't find what it was told to expect. The cursor has already been rewound
    /// to `pos` by the time this is returned.
    TagMismatch { expected: (u64, u8), got: (u64, u8), pos: u64 },
    /// A `Length4` subblock declared a length that doesn't make sense for its contents (e.g. a
    /// points subblock whose length isn't a multiple of 14).
    BadSubblockLength,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEof => write!(f, "unexpected end of block"),
            Error::TagMismatch { expected, got, pos } => write!(
                f,
                "tag mismatch at {pos}: expected (index={}, type={:#x}), got (index={}, type={:#x})",
                expected.0, expected.1, got.0, got.1
            ),
            Error::BadSubblockLength => write!(f, "subblock length is not valid for its contents"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::UnexpectedEof
    }
}

/// The low nibble of a tag varuint; the high bits are the field/subblock index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagType {
    Byte1 = 0x1,
    Byte4 = 0x4,
    Byte8 = 0x8,
    Length4 = 0xC,
    Id = 0xF,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum BlockType {
    MigrationInfo,
    SceneTree,
    TreeNode,
    GlyphItem,
    GroupItem,
    LineItem,
    TextItem,
    RootText,
    TombstoneItem,
    AuthorIds,
    PageInfo,
    SceneInfo,
    Unknown(u8),
}

impl From<u8> for BlockType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::MigrationInfo,
            0x01 => Self::SceneTree,
            0x02 => Self::TreeNode,
            0x03 => Self::GlyphItem,
            0x04 => Self::GroupItem,
            0x05 => Self::LineItem,
            0x06 => Self::TextItem,
            0x07 => Self::RootText,
            0x08 => Self::TombstoneItem,
            0x09 => Self::AuthorIds,
            0x0A => Self::PageInfo,
            0x0D => Self::SceneInfo,
            other => Self::Unknown(other),
        }
    }
}

/// Bounds for the tagged fields currently being read: either the enclosing block/subblock's end,
/// or "no bound" when reading top-level block headers.
struct Scope {
    end: u64,
}

/// The save/restore primitive [`TaggedBlockReader::check_tag`] and
/// [`TaggedBlockReader::expect_tag`] build on: capture a position up front, attempt the read, and
/// seek back to it unless the read turned out to be what was expected.
///
/// A prior version of this tried to express "restore unless committed" as an RAII guard holding
/// `&mut self.reader`, which then made it impossible to call any other `&mut self` method (like
/// `read_tag`) while the guard was alive. Plain capture-then-seek sidesteps that entirely.
#[derive(Clone, Copy)]
struct Mark {
    start: u64,
}

impl Mark {
    fn capture<R>(reader: &mut BinStreamReader<R>) -> std::io::Result<Self>
    where
        R: Read + Seek,
    {
        Ok(Self { start: reader.tell()? })
    }

    fn rewind<R>(self, reader: &mut BinStreamReader<R>)
    where
        R: Read + Seek,
    {
        let _ = reader.seek(self.start);
    }
}

/// Reads the self-describing field/subblock protocol laid on top of [`BinStreamReader`].
pub(crate) struct TaggedBlockReader<R> {
    reader: BinStreamReader<R>,
    scope: Option<Scope>,
}

impl<R> TaggedBlockReader<R>
where
    R: Read + Seek,
{
    pub(crate) fn new(reader: R) -> Self {
        Self { reader: BinStreamReader::new(reader), scope: None }
    }

    #[inline]
    pub(crate) fn tell(&mut self) -> std::io::Result<u64> {
        self.reader.tell()
    }

    #[inline]
    pub(crate) fn seek(&mut self, pos: u64) -> std::io::Result<()> {
        self.reader.seek(pos)
    }

    /// How many bytes remain in the current block/subblock; `u64::MAX` outside of one.
    pub(crate) fn bytes_remaining(&mut self) -> u64 {
        match &self.scope {
            Some(scope) => scope.end.saturating_sub(self.reader.tell().unwrap_or(scope.end)),
            None => u64::MAX,
        }
    }

    /// Enters a new block/subblock bounded by `end`, returning the previous scope so the caller
    /// can restore it once done.
    pub(crate) fn enter_scope(&mut self, end: u64) -> Option<u64> {
        self.scope.replace(Scope { end }).map(|s| s.end)
    }

    pub(crate) fn exit_scope(&mut self, previous: Option<u64>) {
        self.scope = previous.map(|end| Scope { end });
    }

    fn read_tag(&mut self) -> Result<(u64, u8)> {
        if self.bytes_remaining() == 0 {
            return Err(Error::UnexpectedEof);
        }

        let tag = self.reader.read_varuint()?;
        Ok((tag >> 4, (tag & 0x0F) as u8))
    }

    /// Reads the next tag and fails with [`Error::TagMismatch`] (cursor rewound) if it isn't
    /// `(index, type)`.
    pub(crate) fn expect_tag(&mut self, index: u64, ty: TagType) -> Result<()> {
        let mark = Mark::capture(&mut self.reader)?;

        match self.read_tag() {
            Ok((got_index, got_type)) if got_index == index && got_type == ty as u8 => Ok(()),
            Ok((got_index, got_type)) => {
                mark.rewind(&mut self.reader);
                Err(Error::TagMismatch { expected: (index, ty as u8), got: (got_index, got_type), pos: mark.start })
            }
            Err(_) => {
                mark.rewind(&mut self.reader);
                Err(Error::UnexpectedEof)
            }
        }
    }

    /// Lookahead-only: never advances the cursor, never fails. `false` at block end or on any
    /// read failure.
    pub(crate) fn check_tag(&mut self, index: u64, ty: TagType) -> bool {
        if self.bytes_remaining() == 0 {
            return false;
        }

        let Ok(mark) = Mark::capture(&mut self.reader) else { return false };
        let result = self.read_tag();
        mark.rewind(&mut self.reader);

        matches!(result, Ok((got_index, got_type)) if got_index == index && got_type == ty as u8)
    }

    pub(crate) fn read_bool(&mut self, index: u64) -> Result<bool> {
        self.expect_tag(index, TagType::Byte1)?;
        Ok(self.reader.read_bool()?)
    }

    pub(crate) fn read_byte(&mut self, index: u64) -> Result<u8> {
        self.expect_tag(index, TagType::Byte1)?;
        Ok(self.reader.read_u8()?)
    }

    pub(crate) fn read_int(&mut self, index: u64) -> Result<u32> {
        self.expect_tag(index, TagType::Byte4)?;
        Ok(self.reader.read_u32()?)
    }

    pub(crate) fn read_float(&mut self, index: u64) -> Result<f32> {
        self.expect_tag(index, TagType::Byte4)?;
        Ok(self.reader.read_f32()?)
    }

    pub(crate) fn read_double(&mut self, index: u64) -> Result<f64> {
        self.expect_tag(index, TagType::Byte8)?;
        Ok(self.reader.read_f64()?)
    }

    pub(crate) fn read_id(&mut self, index: u64) -> Result<CrdtId> {
        self.expect_tag(index, TagType::Id)?;
        Ok(self.reader.read_crdt_id()?)
    }

    /// Expects a `Length4` tag and returns the declared byte length of the nested content; the
    /// caller is responsible for bounding its own reads (usually via [`enter_scope`]).
    ///
    /// [`enter_scope`]: Self::enter_scope
    pub(crate) fn read_subblock(&mut self, index: u64) -> Result<u32> {
        self.expect_tag(index, TagType::Length4)?;
        Ok(self.reader.read_u32()?)
    }

    pub(crate) fn has_subblock(&mut self, index: u64) -> bool {
        self.check_tag(index, TagType::Length4)
    }

    /// Reads raw, untagged bytes (point arrays, the `item_type` discriminant byte) directly from
    /// the underlying stream.
    pub(crate) fn read_u8_raw(&mut self) -> Result<u8> {
        Ok(self.reader.read_u8()?)
    }

    pub(crate) fn read_array_raw<const N: usize>(&mut self) -> Result<[u8; N]> {
        Ok(self.reader.read_array()?)
    }
}
