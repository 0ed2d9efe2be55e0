//! # rpmdb
//!
//! A read-only library for extracting installed-package metadata from an
//! RPM package database, across every on-disk format rpm has shipped:
//! the classic BerkeleyDB hash file (`Packages`), the packed-block NDB
//! format (`Packages.db`) and the SQLite database (`rpmdb.sqlite`).
//!
//! The format is detected from the file's leading bytes; the matching
//! walker streams each stored header blob, which is then decoded into a
//! [`PackageInfo`] record.
//!
//! # Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), rpmdb::Error> {
//! let mut db = rpmdb::RpmDb::open("/var/lib/rpm/Packages")?;
//!
//! for pkg in db.list_packages()? {
//!     println!("{}-{}-{}.{}", pkg.name, pkg.version, pkg.release, pkg.arch);
//! }
//!
//! let bash = db.package("bash")?;
//! for file in bash.installed_files()? {
//!     println!("{:o} {}", file.mode, file.path);
//! }
//! # Ok(())
//! # }
//! ```

mod errors;
pub use crate::errors::Error;

pub(crate) mod constants;
pub use crate::constants::{DigestAlgorithm, FileFlags, Tag};

mod parse;

mod format;
pub use crate::format::DbFormat;

mod bdb;
mod ndb;
mod sqlite;

mod header;
pub use crate::header::IndexEntryInfo;

mod pgp;

mod package;
pub use crate::package::{FileInfo, PackageInfo};

mod db;
pub use crate::db::{DbMetadata, Entry, RpmDb};
