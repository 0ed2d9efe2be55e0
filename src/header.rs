//! Decoding of the self-describing header blob stored per package.
//!
//! A blob is a 16-byte preamble, `il` index records of 16 bytes each, and
//! a data store of `dl` bytes the records point into. Everything is
//! big-endian regardless of the database the blob came from.

use nom::bytes::complete;
use nom::number::complete::{be_u16, be_u32, be_u64, be_u8};

use crate::constants::{HEADER_MAGIC, HEADER_VERSION, INDEX_ENTRY_SIZE, INDEX_HEADER_SIZE};
use crate::errors::Error;
use crate::parse::ByteReader;

/// The fixed preamble of a header blob.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct IndexHeader {
    /// number of index records
    pub(crate) num_entries: u32,
    /// total amount of data stored
    pub(crate) data_section_size: u32,
}

impl IndexHeader {
    // 16 bytes
    pub(crate) fn parse(input: &[u8]) -> Result<Self, Error> {
        let (rest, magic) = complete::take(4usize)(input)?;
        // Blobs exported by rpm carry the header magic; the ones stored
        // in the database usually have it zeroed. Both are fine, anything
        // else is not a header.
        let expected = [HEADER_MAGIC[0], HEADER_MAGIC[1], HEADER_MAGIC[2], HEADER_VERSION];
        if magic != [0, 0, 0, 0] && magic != expected {
            return Err(Error::InvalidFormat);
        }
        // 4 bytes reserved
        let (rest, _) = complete::take(4usize)(rest)?;
        let (rest, num_entries) = be_u32(rest)?;
        let (_rest, data_section_size) = be_u32(rest)?;

        Ok(IndexHeader {
            num_entries,
            data_section_size,
        })
    }
}

/// A decoded header blob: the index records in file order plus the data
/// store they point into.
#[derive(Debug, PartialEq)]
pub(crate) struct HeaderBlob {
    pub(crate) entries: Vec<IndexEntry>,
    pub(crate) store: Vec<u8>,
}

impl HeaderBlob {
    pub(crate) fn parse(blob: &[u8]) -> Result<Self, Error> {
        if blob.len() < INDEX_HEADER_SIZE {
            return Err(Error::ShortRead("header preamble"));
        }
        let preamble = IndexHeader::parse(&blob[..INDEX_HEADER_SIZE])?;

        let il = preamble.num_entries as usize;
        let dl = preamble.data_section_size as usize;
        let index_size = il
            .checked_mul(INDEX_ENTRY_SIZE)
            .ok_or(Error::ShortRead("index records"))?;
        let body = &blob[INDEX_HEADER_SIZE..];
        if body.len() < index_size + dl {
            return Err(Error::ShortRead("header store"));
        }
        let store = &body[index_size..index_size + dl];

        let mut entries: Vec<IndexEntry> = Vec::with_capacity(il);
        let mut index = ByteReader::big_endian(&body[..index_size]);
        for _ in 0..il {
            let mut entry = IndexEntry::parse(&mut index)?;
            entry.read_store(store)?;
            entries.push(entry);
        }

        Ok(HeaderBlob {
            entries,
            store: store.to_vec(),
        })
    }
}

/// A single record within the index of a header blob.
#[derive(Debug, PartialEq)]
pub(crate) struct IndexEntry {
    pub(crate) tag: i32,
    pub(crate) data: IndexData,
    pub(crate) offset: u32,
    pub(crate) num_items: u32,
}

impl IndexEntry {
    // 16 bytes
    pub(crate) fn parse(r: &mut ByteReader) -> Result<Self, Error> {
        // first 4 bytes are the tag.
        let tag = r.i32("index entry tag")?;
        // next 4 bytes is the tag type
        let tag_type = r.u32("index entry type")?;

        // initialize the datatype; the store is sliced in `read_store`
        // once the whole index section has been consumed.
        let data = IndexData::from_type_as_u32(tag_type).ok_or(Error::InvalidTagDataType {
            tag,
            raw_data_type: tag_type,
        })?;

        // next 4 bytes is the offset relative to the beginning of the store
        let offset = r.u32("index entry offset")?;
        // last 4 bytes are the number of data items pointed to by the entry
        let num_items = r.u32("index entry count")?;

        Ok(IndexEntry {
            tag,
            data,
            offset,
            num_items,
        })
    }

    /// Decode this entry's data region out of the store.
    ///
    /// Fixed-width regions are bounds-checked up front; string regions
    /// are scanned and fail if a terminator never shows up inside the
    /// store.
    fn read_store(&mut self, store: &[u8]) -> Result<(), Error> {
        let offset = self.offset as usize;
        let count = self.num_items;

        let fixed_width = match &self.data {
            IndexData::Null => Some(0),
            IndexData::Char(_) | IndexData::Int8(_) | IndexData::Bin(_) => Some(1),
            IndexData::Int16(_) => Some(2),
            IndexData::Int32(_) => Some(4),
            IndexData::Int64(_) => Some(8),
            IndexData::StringTag(_) | IndexData::StringArray(_) | IndexData::I18NString(_) => None,
        };
        if let Some(width) = fixed_width {
            let size = width * count as usize;
            let end = offset
                .checked_add(size)
                .ok_or_else(|| self.out_of_bounds(size, store.len()))?;
            if end > store.len() {
                return Err(self.out_of_bounds(size, store.len()));
            }
        } else if offset >= store.len() {
            return Err(self.out_of_bounds(0, store.len()));
        }

        let mut remaining = &store[offset..];
        match &mut self.data {
            IndexData::Null => {}
            IndexData::Char(ref mut chars) => {
                parse_entry_data_number(remaining, count, chars, be_u8)?;
            }
            IndexData::Int8(ref mut ints) => {
                parse_entry_data_number(remaining, count, ints, be_u8)?;
            }
            IndexData::Int16(ref mut ints) => {
                parse_entry_data_number(remaining, count, ints, be_u16)?;
            }
            IndexData::Int32(ref mut ints) => {
                parse_entry_data_number(remaining, count, ints, be_u32)?;
            }
            IndexData::Int64(ref mut ints) => {
                parse_entry_data_number(remaining, count, ints, be_u64)?;
            }
            IndexData::Bin(ref mut bin) => {
                parse_entry_data_number(remaining, count, bin, be_u8)?;
            }
            IndexData::StringTag(ref mut string) => {
                let (_rest, raw) = take_cstr(remaining, self.tag)?;
                string.push_str(String::from_utf8_lossy(raw).as_ref());
            }
            IndexData::StringArray(ref mut strings) | IndexData::I18NString(ref mut strings) => {
                for _ in 0..count {
                    let (rest, raw) = take_cstr(remaining, self.tag)?;
                    remaining = rest;
                    strings.push(String::from_utf8_lossy(raw).into_owned());
                }
            }
        }

        Ok(())
    }

    fn out_of_bounds(&self, size: usize, store_len: usize) -> Error {
        Error::corrupt_header(
            self.tag,
            format!(
                "{size} bytes at offset {} exceed store of {store_len}",
                self.offset
            ),
        )
    }

    /// The entry with its payload dropped, as retained on a package record.
    pub(crate) fn info(&self) -> IndexEntryInfo {
        IndexEntryInfo {
            tag: self.tag,
            tag_type: self.data.type_as_u32(),
            offset: self.offset,
            count: self.num_items,
        }
    }
}

/// Tag metadata of one index record, without the decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntryInfo {
    pub tag: i32,
    pub tag_type: u32,
    pub offset: u32,
    pub count: u32,
}

/// Data as present in an [`IndexEntry`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum IndexData {
    Null,
    Char(Vec<u8>),
    Int8(Vec<u8>),
    Int16(Vec<u16>),
    Int32(Vec<u32>),
    Int64(Vec<u64>),
    StringTag(String),
    Bin(Vec<u8>),
    StringArray(Vec<String>),
    I18NString(Vec<String>),
}

impl IndexData {
    pub(crate) fn from_type_as_u32(i: u32) -> Option<Self> {
        match i {
            0 => Some(IndexData::Null),
            1 => Some(IndexData::Char(Vec::new())),
            2 => Some(IndexData::Int8(Vec::new())),
            3 => Some(IndexData::Int16(Vec::new())),
            4 => Some(IndexData::Int32(Vec::new())),
            5 => Some(IndexData::Int64(Vec::new())),
            6 => Some(IndexData::StringTag(String::new())),
            7 => Some(IndexData::Bin(Vec::new())),
            8 => Some(IndexData::StringArray(Vec::new())),
            9 => Some(IndexData::I18NString(Vec::new())),
            _ => None,
        }
    }

    pub(crate) fn type_as_u32(&self) -> u32 {
        match self {
            IndexData::Null => 0,
            IndexData::Char(_) => 1,
            IndexData::Int8(_) => 2,
            IndexData::Int16(_) => 3,
            IndexData::Int32(_) => 4,
            IndexData::Int64(_) => 5,
            IndexData::StringTag(_) => 6,
            IndexData::Bin(_) => 7,
            IndexData::StringArray(_) => 8,
            IndexData::I18NString(_) => 9,
        }
    }

    pub(crate) fn as_str(&self) -> Option<&str> {
        match self {
            IndexData::StringTag(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_i18n_str(&self) -> Option<&str> {
        match self {
            IndexData::I18NString(s) => s.first().map(String::as_str),
            _ => None,
        }
    }

    pub(crate) fn as_string_array(&self) -> Option<&[String]> {
        match self {
            IndexData::StringArray(d) | IndexData::I18NString(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn as_u16_array(&self) -> Option<&[u16]> {
        match self {
            IndexData::Int16(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_u32(&self) -> Option<u32> {
        match self {
            IndexData::Int32(s) => s.first().copied(),
            _ => None,
        }
    }

    pub(crate) fn as_u32_array(&self) -> Option<&[u32]> {
        match self {
            IndexData::Int32(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_binary(&self) -> Option<&[u8]> {
        match self {
            IndexData::Bin(d) => Some(d.as_slice()),
            _ => None,
        }
    }
}

fn parse_entry_data_number<'a, T, F>(
    mut input: &'a [u8],
    num_items: u32,
    items: &mut Vec<T>,
    parser: F,
) -> Result<(), Error>
where
    F: Fn(&'a [u8]) -> nom::IResult<&'a [u8], T>,
{
    items.reserve_exact(num_items as usize);
    for _ in 0..num_items {
        let (rest, data) = parser(input)?;
        items.push(data);
        input = rest;
    }
    Ok(())
}

fn take_cstr<'a>(input: &'a [u8], tag: i32) -> Result<(&'a [u8], &'a [u8]), Error> {
    match input.iter().position(|&b| b == 0) {
        Some(nul) => Ok((&input[nul + 1..], &input[..nul])),
        None => Err(Error::corrupt_header(tag, "unterminated string")),
    }
}
