use std::io::{self, Read, Seek, SeekFrom};

macro_rules! read_int {
    ($fn:ident, $Ty:ty) => {
        #[inline]
        pub(crate) fn $fn(&mut self) -> io::Result<$Ty> {
            self.read_array().map(<$Ty>::from_le_bytes)
        }
    };
}

/// An identifier pair used throughout the CRDT scene-tree envelope.
///
/// Opaque to everything above the reader: the only thing that ever happens to one is that it gets
/// read, so the cursor advances past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CrdtId(pub(crate) u8, pub(crate) u64);

/// Byte-level primitive decoding over a seekable little-endian source.
///
/// Every typed read either succeeds or fails with [`io::ErrorKind::UnexpectedEof`]; callers that
/// want to recover from a short read just need to remember the position and seek back to it.
pub(crate) struct BinStreamReader<R> {
    inner: R,
}

impl<R> BinStreamReader<R>
where
    R: Read + Seek,
{
    #[inline]
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }

    #[inline]
    pub(crate) fn tell(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }

    #[inline]
    pub(crate) fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    #[inline]
    pub(crate) fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    #[inline]
    pub(crate) fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_exact(buf)
    }

    read_int! {  read_u8,  u8 }
    read_int! { read_u16, u16 }
    read_int! { read_u32, u32 }
    read_int! { read_f32, f32 }
    read_int! { read_f64, f64 }

    #[inline]
    pub(crate) fn read_bool(&mut self) -> io::Result<bool> {
        Ok(self.read_u8()? >= 1)
    }

    /// Reads an unsigned LEB128 varuint: 7 bits per byte, low byte first, top bit signals
    /// continuation.
    ///
    /// There is no length prefix for these, so an unterminated sequence would otherwise read
    /// forever; 10 bytes is enough to hold a full `u64`, so anything longer is corrupt input.
    pub(crate) fn read_varuint(&mut self) -> io::Result<u64> {
        let mut value: u64 = 0;

        for i in 0..10 {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as u64) << (i * 7);

            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "varuint did not terminate within 10 bytes",
        ))
    }

    pub(crate) fn read_crdt_id(&mut self) -> io::Result<CrdtId> {
        let first = self.read_u8()?;
        let second = self.read_varuint()?;

        Ok(CrdtId(first, second))
    }
}
