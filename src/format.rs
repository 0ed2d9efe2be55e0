//! On-disk format detection.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::errors::Error;
use crate::ndb::NDB_HEADER_MAGIC;

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// The database flavors rpm has shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbFormat {
    /// `rpmdb.sqlite`, rpm >= 4.16 default
    Sqlite,
    /// `Packages.db`, the packed-block format used by SUSE
    Ndb,
    /// `Packages`, the classic BerkeleyDB hash database
    Bdb,
}

impl DbFormat {
    /// Classify a database file from its leading bytes.
    ///
    /// Anything that is neither SQLite nor NDB is treated as BerkeleyDB;
    /// the hash meta page validation rejects files that are none of the
    /// three.
    pub fn detect(path: &Path) -> Result<Self, Error> {
        let mut prefix = Vec::with_capacity(SQLITE_MAGIC.len());
        File::open(path)?
            .take(SQLITE_MAGIC.len() as u64)
            .read_to_end(&mut prefix)?;
        Ok(Self::from_prefix(&prefix))
    }

    pub(crate) fn from_prefix(prefix: &[u8]) -> Self {
        if prefix.len() >= SQLITE_MAGIC.len() && prefix[..SQLITE_MAGIC.len()] == SQLITE_MAGIC[..] {
            DbFormat::Sqlite
        } else if prefix.len() >= 4 && LittleEndian::read_u32(&prefix[..4]) == NDB_HEADER_MAGIC {
            DbFormat::Ndb
        } else {
            DbFormat::Bdb
        }
    }
}
