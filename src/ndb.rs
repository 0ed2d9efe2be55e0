//! Walker for the packed-block "NDB" database (`Packages.db`).
//!
//! The file opens with a small header and a slot table; each occupied
//! slot points at a run of contiguous blocks holding one record, which
//! carries its own 16-byte header in front of the package blob. All
//! integers are little-endian.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::db::{DbMetadata, Entry};
use crate::errors::Error;
use crate::parse::{read_vec, ByteReader};

pub(crate) const NDB_HEADER_MAGIC: u32 = 0xFEFE_0001;
const NDB_HEADER_SIZE: usize = 16;
const NDB_SLOT_SIZE: usize = 12;

const NDB_RECORD_MAGIC: u32 = 0x5362_6C42; // "BlbS" on disk
const NDB_RECORD_HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    pkg_index: u32,
    blk_offset: u32,
    blk_count: u32,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.pkg_index == 0 || self.blk_count == 0
    }
}

pub(crate) struct NdbReader {
    file: File,
    blk_size: u32,
    slots: Vec<Slot>,
    cursor: usize,
    done: bool,
}

impl NdbReader {
    pub(crate) fn open(path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)?;

        let mut head = Vec::with_capacity(NDB_HEADER_SIZE);
        (&mut file)
            .take(NDB_HEADER_SIZE as u64)
            .read_to_end(&mut head)?;

        let mut r = ByteReader::new(&head, false);
        let magic = r.u32("ndb magic").map_err(|_| Error::InvalidNdb)?;
        if magic != NDB_HEADER_MAGIC {
            return Err(Error::InvalidNdb);
        }
        let version = r.u32("ndb version")?;
        let slot_count = r.u32("ndb slot count")?;
        let blk_size = r.u32("ndb block size")?;
        if blk_size == 0 || blk_size > 65536 {
            return Err(Error::corrupt_page(0, format!("bad block size {blk_size}")));
        }

        let raw_slots = read_vec(&mut file, slot_count as usize * NDB_SLOT_SIZE)?;
        let mut r = ByteReader::new(&raw_slots, false);
        let mut slots = Vec::with_capacity(slot_count as usize);
        for _ in 0..slot_count {
            slots.push(Slot {
                pkg_index: r.u32("slot package index")?,
                blk_offset: r.u32("slot block offset")?,
                blk_count: r.u32("slot block count")?,
            });
        }

        debug!(
            "opened NDB database {}: version {}, {} slots, block size {}",
            path.display(),
            version,
            slot_count,
            blk_size
        );

        Ok(Self {
            file,
            blk_size,
            slots,
            cursor: 0,
            done: false,
        })
    }

    pub(crate) fn metadata(&self) -> DbMetadata {
        DbMetadata {
            page_size: self.blk_size,
            last_page_no: 0,
        }
    }

    pub(crate) fn rewind(&mut self) {
        self.cursor = 0;
        self.done = false;
    }

    fn read_record(&mut self, slot: Slot) -> Result<Vec<u8>, Error> {
        let blk_size = u64::from(self.blk_size);
        let length = slot.blk_count as usize * self.blk_size as usize;
        if length < NDB_RECORD_HEADER_SIZE {
            return Err(Error::corrupt_page(
                slot.blk_offset,
                format!("record for package {} too small", slot.pkg_index),
            ));
        }

        self.file
            .seek(SeekFrom::Start(u64::from(slot.blk_offset) * blk_size))?;
        let raw = read_vec(&mut self.file, length)?;

        let mut r = ByteReader::new(&raw, false);
        let magic = r.u32("record magic")?;
        if magic != NDB_RECORD_MAGIC {
            return Err(Error::corrupt_page(
                slot.blk_offset,
                format!("record magic mismatch for package {}", slot.pkg_index),
            ));
        }
        let pkg_index = r.u32("record package index")?;
        if pkg_index != slot.pkg_index {
            return Err(Error::corrupt_page(
                slot.blk_offset,
                format!("record belongs to package {pkg_index}, slot says {}", slot.pkg_index),
            ));
        }
        let blob_len = r.u32("record blob length")? as usize;
        if NDB_RECORD_HEADER_SIZE + blob_len > raw.len() {
            return Err(Error::corrupt_page(
                slot.blk_offset,
                format!("blob of {blob_len} bytes exceeds {} allocated blocks", slot.blk_count),
            ));
        }

        Ok(raw[NDB_RECORD_HEADER_SIZE..NDB_RECORD_HEADER_SIZE + blob_len].to_vec())
    }
}

impl Iterator for NdbReader {
    type Item = Result<Entry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.cursor >= self.slots.len() {
                return None;
            }
            let slot = self.slots[self.cursor];
            self.cursor += 1;
            if slot.is_empty() {
                continue;
            }

            match self.read_record(slot) {
                Ok(blob) if blob.is_empty() => continue,
                Ok(blob) => {
                    return Some(Ok(Entry {
                        blob,
                        first_overflow_page: 0,
                    }))
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
