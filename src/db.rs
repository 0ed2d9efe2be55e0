//! Opening a database and streaming its packages.

use std::path::Path;

use log::debug;

use crate::bdb::BdbReader;
use crate::errors::Error;
use crate::format::DbFormat;
use crate::header::HeaderBlob;
use crate::ndb::NdbReader;
use crate::package::PackageInfo;
use crate::sqlite::SqliteReader;

/// One value streamed out of a database walker: the raw header blob plus,
/// for BerkeleyDB values that spilled off-page, the first overflow page
/// number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub blob: Vec<u8>,
    pub first_overflow_page: u32,
}

/// Page-level facts about the underlying file; zero where the format has
/// no such notion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbMetadata {
    pub page_size: u32,
    pub last_page_no: u32,
}

/// The three walkers behind one dispatch point. Static dispatch is all
/// that is needed; no database will ever be a fourth thing.
enum Walker {
    Bdb(BdbReader),
    Ndb(NdbReader),
    Sqlite(SqliteReader),
}

impl Walker {
    fn next_entry(&mut self) -> Option<Result<Entry, Error>> {
        match self {
            Walker::Bdb(reader) => reader.next(),
            Walker::Ndb(reader) => reader.next(),
            Walker::Sqlite(reader) => reader.next(),
        }
    }

    fn rewind(&mut self) {
        match self {
            Walker::Bdb(reader) => reader.rewind(),
            Walker::Ndb(reader) => reader.rewind(),
            Walker::Sqlite(reader) => reader.rewind(),
        }
    }

    fn metadata(&self) -> DbMetadata {
        match self {
            Walker::Bdb(reader) => reader.metadata(),
            Walker::Ndb(reader) => reader.metadata(),
            Walker::Sqlite(reader) => reader.metadata(),
        }
    }

    fn close(self) -> Result<(), Error> {
        match self {
            // file-backed walkers release their handle on drop
            Walker::Bdb(_) | Walker::Ndb(_) => Ok(()),
            Walker::Sqlite(reader) => reader.close(),
        }
    }
}

/// An opened package database.
pub struct RpmDb {
    walker: Walker,
}

impl RpmDb {
    /// Detect the database format and open the matching walker.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let format = DbFormat::detect(path)?;
        debug!("{} detected as {:?}", path.display(), format);

        let walker = match format {
            DbFormat::Sqlite => Walker::Sqlite(SqliteReader::open(path)?),
            DbFormat::Ndb => Walker::Ndb(NdbReader::open(path)?),
            DbFormat::Bdb => Walker::Bdb(BdbReader::open(path)?),
        };
        Ok(RpmDb { walker })
    }

    /// Decode every installed package, in file order.
    pub fn list_packages(&mut self) -> Result<Vec<PackageInfo>, Error> {
        self.walker.rewind();

        let mut packages = Vec::new();
        while let Some(entry) = self.walker.next_entry() {
            let entry = entry?;
            let blob = HeaderBlob::parse(&entry.blob)?;

            let mut pkg = PackageInfo::from_entries(&blob.entries)?;
            pkg.index_entries = blob.entries.iter().map(|e| e.info()).collect();
            pkg.bdb_first_overflow_page = entry.first_overflow_page;
            pkg.raw_header = entry.blob;

            packages.push(pkg);
        }
        Ok(packages)
    }

    /// Look up one package by name.
    pub fn package(&mut self, name: &str) -> Result<PackageInfo, Error> {
        self.list_packages()?
            .into_iter()
            .find(|pkg| pkg.name == name)
            .ok_or_else(|| Error::PackageNotInstalled(name.to_owned()))
    }

    /// The raw header blobs, for callers that do their own decoding.
    /// Restarts the walk from the first page.
    pub fn entries(&mut self) -> impl Iterator<Item = Result<Entry, Error>> + '_ {
        self.walker.rewind();
        std::iter::from_fn(move || self.walker.next_entry())
    }

    pub fn metadata(&self) -> DbMetadata {
        self.walker.metadata()
    }

    /// Release the database. Equivalent to dropping, except that close
    /// errors are reported.
    pub fn close(self) -> Result<(), Error> {
        self.walker.close()
    }
}
