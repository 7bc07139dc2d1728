//! Byte-order-aware decoding of fixed-width values.
//!
//! The byte order of a BBI file is detected once from its magic number. Every later read goes
//! through a [`PrimitiveReader`] carrying that [`Endianness`], so nothing downstream has to care
//! which order the file was written in.

use std::io;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    #[inline]
    pub fn swapped(self) -> Self {
        match self {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        }
    }
}

macro_rules! read_fixed {
    ($name:ident, $ty:ty, $width:expr) => {
        #[inline]
        pub fn $name(&mut self) -> io::Result<$ty> {
            let bytes = self.take($width)?;
            Ok(match self.order {
                Endianness::Little => LittleEndian::$name(bytes),
                Endianness::Big => BigEndian::$name(bytes),
            })
        }
    };
}

/// A cursor over an in-memory buffer that decodes values in one fixed byte order.
///
/// Reads past the end of the buffer fail with [`io::ErrorKind::UnexpectedEof`]; callers decide
/// whether that means a corrupt index or a corrupt block.
#[derive(Debug, Clone)]
pub struct PrimitiveReader<'a> {
    buf: &'a [u8],
    pos: usize,
    order: Endianness,
}

impl<'a> PrimitiveReader<'a> {
    pub fn new(buf: &'a [u8], order: Endianness) -> Self {
        PrimitiveReader { buf, pos: 0, order }
    }

    pub fn order(&self) -> Endianness {
        self.order
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> io::Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "needed {} bytes at position {} but only {} remain",
                    n,
                    self.pos,
                    self.remaining()
                ),
            ));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize) -> io::Result<()> {
        self.take(n).map(|_| ())
    }

    pub fn read_bytes(&mut self, n: usize) -> io::Result<&'a [u8]> {
        self.take(n)
    }

    #[inline]
    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    read_fixed!(read_u16, u16, 2);
    read_fixed!(read_u32, u32, 4);
    read_fixed!(read_i32, i32, 4);
    read_fixed!(read_u64, u64, 8);
    read_fixed!(read_f32, f32, 4);
    read_fixed!(read_f64, f64, 8);

    /// Read a NUL-terminated byte string, consuming the terminator.
    ///
    /// The returned slice excludes the NUL. A missing terminator is reported as
    /// [`io::ErrorKind::InvalidData`].
    pub fn read_cstring(&mut self) -> io::Result<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(len) => {
                let bytes = &rest[..len];
                self.pos += len + 1;
                Ok(bytes)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unterminated string at position {}", self.pos),
            )),
        }
    }
}
