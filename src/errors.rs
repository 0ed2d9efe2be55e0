use std::io;

use thiserror::Error;

/// Errors surfaced while reading a package database.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Hex(#[from] hex::FromHexError),

    #[error("{0}")]
    Nom(String),

    #[error("unrecognized package database format")]
    InvalidFormat,

    #[error("not an NDB package database")]
    InvalidNdb,

    #[error("not a SQLite package database")]
    InvalidSqlite,

    #[error("encrypted database unsupported (algorithm {0})")]
    Encrypted(u8),

    #[error("page {page_no}: {reason}")]
    CorruptPage { page_no: u32, reason: String },

    #[error("short read while decoding {0}")]
    ShortRead(&'static str),

    #[error("invalid data type for tag {tag}: expected 0 - 9 but got {raw_data_type}")]
    InvalidTagDataType { tag: i32, raw_data_type: u32 },

    #[error("tag {tag}: {reason}")]
    CorruptHeader { tag: i32, reason: String },

    #[error("header blob is missing the mandatory {0} tag")]
    MissingTag(&'static str),

    #[error("{0} is not installed")]
    PackageNotInstalled(String),

    #[error("file list incomplete: missing {0}")]
    FileListIncomplete(&'static str),

    #[error("unsupported signature packet: {0}")]
    Signature(&'static str),
}

impl Error {
    pub(crate) fn corrupt_page(page_no: u32, reason: impl Into<String>) -> Self {
        Error::CorruptPage {
            page_no,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_header(tag: i32, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            tag,
            reason: reason.into(),
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(error: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match error {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                Error::Nom(e.code.description().to_string())
            }
            nom::Err::Incomplete(_) => Error::Nom("unhandled incomplete".to_string()),
        }
    }
}
