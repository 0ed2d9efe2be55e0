//! Walker for the classic BerkeleyDB hash database (`Packages`).
//!
//! The file is a sequence of fixed-size pages. Page 0 is the hash meta
//! page; it decides the page size and the byte order of everything that
//! follows. Package headers are stored as the *values* of the hash table:
//! small ones inline in their home page, large ones spilled onto a chain
//! of overflow pages.

mod metadata;
mod page;

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::db::{DbMetadata, Entry};
use crate::errors::Error;
use crate::parse::read_vec;

pub(crate) use metadata::HashMetadata;
use metadata::HASH_METADATA_SIZE;
use page::{
    slot_offsets, OffPageEntry, PageHeader, HASH_KEYDATA, HASH_OFFPAGE, OVERFLOW_PAGE_TYPE,
    PAGE_HEADER_SIZE,
};

pub(crate) struct BdbReader {
    file: File,
    metadata: HashMetadata,
    big_endian: bool,

    /// A page yields several values at once; they are buffered here for
    /// the iterator to drain one at a time.
    queued: VecDeque<Result<Entry, Error>>,

    /// Last page handed to [`Self::read_page`].
    page_no: u32,
    done: bool,
}

impl BdbReader {
    pub(crate) fn open(path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)?;

        let mut head = Vec::with_capacity(HASH_METADATA_SIZE);
        (&mut file)
            .take(HASH_METADATA_SIZE as u64)
            .read_to_end(&mut head)?;
        let (metadata, big_endian) = HashMetadata::parse(&head)?;

        debug!(
            "opened BerkeleyDB hash database {}: page size {}, last page {}, big endian {}",
            path.display(),
            metadata.page_size,
            metadata.last_page_no,
            big_endian
        );

        Ok(Self {
            file,
            metadata,
            big_endian,
            queued: VecDeque::new(),
            page_no: 0,
            done: false,
        })
    }

    pub(crate) fn metadata(&self) -> DbMetadata {
        DbMetadata {
            page_size: self.metadata.page_size,
            last_page_no: self.metadata.last_page_no,
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.queued.clear();
        self.page_no = 0;
        self.done = false;
    }

    fn page_bytes(&mut self, page_no: u32) -> Result<Vec<u8>, Error> {
        let page_size = self.metadata.page_size;
        self.file
            .seek(SeekFrom::Start(u64::from(page_no) * u64::from(page_size)))?;
        read_vec(&mut self.file, page_size as usize).map_err(|err| match err {
            Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Error::corrupt_page(page_no, "page truncated")
            }
            other => other,
        })
    }

    /// Read one page, pushing every package value it holds onto the queue.
    ///
    /// A returned error is structural and ends the walk; a value-level
    /// problem is queued as an `Err` item and iteration continues.
    fn read_page(&mut self, page_no: u32) -> Result<(), Error> {
        let page = self.page_bytes(page_no)?;
        let header = PageHeader::parse(&page, self.big_endian)?;
        if !header.is_hash() {
            return Ok(());
        }

        let offsets = slot_offsets(&page, header.num_entries, self.big_endian, page_no)?;

        // Slots come in key/value pairs; rpm keeps the package number in
        // the key and the header blob in the value, so only odd slots
        // matter here.
        for slot in (1..offsets.len()).step_by(2) {
            let offset = usize::from(offsets[slot]);
            let boundary = usize::from(offsets[slot - 1]);
            if offset < PAGE_HEADER_SIZE || offset >= page.len() {
                return Err(Error::corrupt_page(
                    page_no,
                    format!("slot {slot} offset {offset} outside page"),
                ));
            }

            match page[offset] {
                HASH_KEYDATA => {
                    // Inline value: it fills the gap up to the previous
                    // slot's item, minus the type byte.
                    if boundary <= offset || boundary > page.len() {
                        return Err(Error::corrupt_page(
                            page_no,
                            format!("slot {slot} data boundary {boundary} invalid"),
                        ));
                    }
                    let data = &page[offset + 1..boundary];
                    if data.is_empty() {
                        // zero-length value: a deleted record
                        continue;
                    }
                    self.queued.push_back(Ok(Entry {
                        blob: data.to_vec(),
                        first_overflow_page: 0,
                    }));
                }
                HASH_OFFPAGE => {
                    if offset + OffPageEntry::SIZE > page.len() {
                        return Err(Error::corrupt_page(
                            page_no,
                            format!("slot {slot} off-page entry truncated"),
                        ));
                    }
                    let descriptor =
                        OffPageEntry::parse(&page[offset..offset + OffPageEntry::SIZE], self.big_endian)?;
                    match self.read_overflow(descriptor.page_no, descriptor.length) {
                        Ok(blob) => {
                            if blob.is_empty() {
                                continue;
                            }
                            self.queued.push_back(Ok(Entry {
                                blob,
                                first_overflow_page: descriptor.page_no,
                            }));
                        }
                        Err(err) => return Err(err),
                    }
                }
                other => {
                    // Not a value representation we know; give it up but
                    // keep walking the rest of the database.
                    self.queued.push_back(Err(Error::corrupt_page(
                        page_no,
                        format!("unsupported value slot type {other}"),
                    )));
                }
            }
        }

        Ok(())
    }

    /// Collect a value that spilled onto overflow pages.
    ///
    /// Every page on the chain contributes its full payload area except
    /// the tail, where `hf_offset` holds the number of payload bytes.
    fn read_overflow(&mut self, first_page_no: u32, length: u32) -> Result<Vec<u8>, Error> {
        let page_size = self.metadata.page_size as usize;
        let total = length as usize;
        let mut value = Vec::with_capacity(total);
        let mut page_no = first_page_no;
        let mut visited: u32 = 0;

        loop {
            if page_no == 0 || page_no > self.metadata.last_page_no {
                return Err(Error::corrupt_page(
                    page_no,
                    "overflow chain escapes the file",
                ));
            }
            visited += 1;
            if visited > self.metadata.last_page_no {
                return Err(Error::corrupt_page(
                    page_no,
                    "overflow chain does not terminate",
                ));
            }

            let page = self.page_bytes(page_no)?;
            let header = PageHeader::parse(&page, self.big_endian)?;
            if header.page_type != OVERFLOW_PAGE_TYPE {
                return Err(Error::corrupt_page(
                    page_no,
                    format!("expected overflow page, found type {}", header.page_type),
                ));
            }

            let available = if header.next_page_no == 0 {
                usize::from(header.hf_offset)
            } else {
                page_size - PAGE_HEADER_SIZE
            };
            if PAGE_HEADER_SIZE + available > page.len() {
                return Err(Error::corrupt_page(page_no, "overflow payload exceeds page"));
            }

            let take = available.min(total - value.len());
            value.extend_from_slice(&page[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + take]);

            if value.len() == total {
                return Ok(value);
            }
            if header.next_page_no == 0 {
                return Err(Error::corrupt_page(
                    page_no,
                    format!(
                        "overflow chain truncated: got {} of {} bytes",
                        value.len(),
                        total
                    ),
                ));
            }
            page_no = header.next_page_no;
        }
    }
}

impl Iterator for BdbReader {
    type Item = Result<Entry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.queued.pop_front() {
                return Some(item);
            }
            if self.done || self.page_no >= self.metadata.last_page_no {
                return None;
            }

            self.page_no += 1;
            if let Err(err) = self.read_page(self.page_no) {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}
