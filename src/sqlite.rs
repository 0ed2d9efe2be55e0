//! Walker for the SQLite-backed database (`rpmdb.sqlite`).
//!
//! rpm keeps one row per installed package in the `Packages` table; the
//! header blob sits in the `blob` column and everything else in the file
//! is an index over it. One query covers the whole walk.

use std::path::Path;

use log::debug;
use rusqlite::{Connection, OpenFlags};

use crate::db::{DbMetadata, Entry};
use crate::errors::Error;

pub(crate) struct SqliteReader {
    conn: Connection,
    blobs: Vec<Vec<u8>>,
    cursor: usize,
}

impl SqliteReader {
    pub(crate) fn open(path: &Path) -> Result<Self, Error> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        // rusqlite statements borrow the connection, so the rows are
        // drained here; package decoding still streams lazily.
        let blobs = {
            let mut stmt = conn
                .prepare("SELECT blob FROM Packages")
                .map_err(classify)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))
                .map_err(classify)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(classify)?
        };

        debug!(
            "opened SQLite database {}: {} package rows",
            path.display(),
            blobs.len()
        );

        Ok(Self {
            conn,
            blobs,
            cursor: 0,
        })
    }

    pub(crate) fn metadata(&self) -> DbMetadata {
        DbMetadata::default()
    }

    pub(crate) fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn close(self) -> Result<(), Error> {
        self.conn.close().map_err(|(_, err)| Error::Sqlite(err))
    }
}

fn classify(err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::NotADatabase =>
        {
            Error::InvalidSqlite
        }
        other => Error::Sqlite(other),
    }
}

impl Iterator for SqliteReader {
    type Item = Result<Entry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let blob = self.blobs.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(Ok(Entry {
            blob,
            first_overflow_page: 0,
        }))
    }
}
