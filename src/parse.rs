//! Byte-level readers shared by the database walkers.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::errors::Error;

/// Bounds-checked cursor over an in-memory buffer.
///
/// BerkeleyDB picks its byte order per file, so the order is a runtime
/// property of the reader rather than a type parameter. Every read names
/// the field it is decoding; running off the end of the buffer fails with
/// [`Error::ShortRead`] carrying that name.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8], big_endian: bool) -> Self {
        Self {
            buf,
            pos: 0,
            big_endian,
        }
    }

    /// Header blobs and OpenPGP packets are big-endian regardless of the
    /// database that carried them.
    pub(crate) fn big_endian(buf: &'a [u8]) -> Self {
        Self::new(buf, true)
    }

    pub(crate) fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(n).ok_or(Error::ShortRead(field))?;
        if end > self.buf.len() {
            return Err(Error::ShortRead(field));
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn skip(&mut self, n: usize, field: &'static str) -> Result<(), Error> {
        self.take(n, field).map(|_| ())
    }

    pub(crate) fn u8(&mut self, field: &'static str) -> Result<u8, Error> {
        Ok(self.take(1, field)?[0])
    }

    pub(crate) fn u16(&mut self, field: &'static str) -> Result<u16, Error> {
        let raw = self.take(2, field)?;
        Ok(if self.big_endian {
            BigEndian::read_u16(raw)
        } else {
            LittleEndian::read_u16(raw)
        })
    }

    pub(crate) fn u32(&mut self, field: &'static str) -> Result<u32, Error> {
        let raw = self.take(4, field)?;
        Ok(if self.big_endian {
            BigEndian::read_u32(raw)
        } else {
            LittleEndian::read_u32(raw)
        })
    }

    pub(crate) fn u64(&mut self, field: &'static str) -> Result<u64, Error> {
        let raw = self.take(8, field)?;
        Ok(if self.big_endian {
            BigEndian::read_u64(raw)
        } else {
            LittleEndian::read_u64(raw)
        })
    }

    pub(crate) fn i32(&mut self, field: &'static str) -> Result<i32, Error> {
        let raw = self.take(4, field)?;
        Ok(if self.big_endian {
            BigEndian::read_i32(raw)
        } else {
            LittleEndian::read_i32(raw)
        })
    }
}

/// Read exactly `n` bytes from a reader into a variably sized vec.
pub(crate) fn read_vec(r: &mut impl Read, n: usize) -> Result<Vec<u8>, Error> {
    let mut buf = vec![0; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
