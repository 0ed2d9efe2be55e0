//! The hash database meta page.

use crate::errors::Error;
use crate::parse::ByteReader;

use super::page::HASH_META_PAGE_TYPE;

pub(crate) const HASH_MAGIC_NUMBER: u32 = 0x0006_1561;
/// The magic as it reads back when the file's byte order is the opposite
/// of the initial little-endian guess.
pub(crate) const HASH_MAGIC_NUMBER_SWAPPED: u32 = 0x6115_0600;

const NO_ENCRYPTION_ALGORITHM: u8 = 0;
const VALID_PAGE_SIZES: [u32; 8] = [512, 1024, 2048, 4096, 8192, 16384, 32768, 65536];

/// Number of meta page bytes consulted; the hash-specific fields that
/// follow (bucket masks, fill factor, key counts) are not needed for
/// iteration.
pub(crate) const HASH_METADATA_SIZE: usize = 36;

/// The fields of the page-0 metadata that drive the walk. Laid out on
/// disk as: lsn[8], pgno, magic, version, pagesize, encrypt_alg, type,
/// metaflags, unused, free, last_pgno, …
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HashMetadata {
    pub(crate) magic: u32,
    pub(crate) page_size: u32,
    pub(crate) encryption_alg: u8,
    pub(crate) page_type: u8,
    pub(crate) last_page_no: u32,
}

impl HashMetadata {
    /// Parse and validate the meta page, deciding the file's endianness
    /// from the stored magic along the way.
    pub(crate) fn parse(buf: &[u8]) -> Result<(Self, bool), Error> {
        if buf.len() < HASH_METADATA_SIZE {
            return Err(Error::InvalidFormat);
        }

        let mut meta = Self::parse_order(buf, false)?;
        let big_endian = meta.magic == HASH_MAGIC_NUMBER_SWAPPED;
        if big_endian {
            meta = Self::parse_order(buf, true)?;
        }

        meta.validate()?;
        Ok((meta, big_endian))
    }

    fn parse_order(buf: &[u8], big_endian: bool) -> Result<Self, Error> {
        let mut r = ByteReader::new(buf, big_endian);
        r.skip(8, "meta lsn")?;
        r.skip(4, "meta page number")?;
        let magic = r.u32("meta magic")?;
        r.skip(4, "meta version")?;
        let page_size = r.u32("meta page size")?;
        let encryption_alg = r.u8("meta encryption algorithm")?;
        let page_type = r.u8("meta page type")?;
        r.skip(2, "meta flags")?;
        r.skip(4, "meta free list")?;
        let last_page_no = r.u32("meta last page number")?;

        Ok(Self {
            magic,
            page_size,
            encryption_alg,
            page_type,
            last_page_no,
        })
    }

    fn validate(&self) -> Result<(), Error> {
        if self.magic != HASH_MAGIC_NUMBER {
            return Err(Error::InvalidFormat);
        }

        if self.page_type != HASH_META_PAGE_TYPE {
            return Err(Error::corrupt_page(
                0,
                format!("unexpected meta page type: {}", self.page_type),
            ));
        }

        if self.encryption_alg != NO_ENCRYPTION_ALGORITHM {
            return Err(Error::Encrypted(self.encryption_alg));
        }

        if !VALID_PAGE_SIZES.contains(&self.page_size) {
            return Err(Error::corrupt_page(
                0,
                format!("unexpected page size: {}", self.page_size),
            ));
        }

        Ok(())
    }
}
