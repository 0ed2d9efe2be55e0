//! RPM specific constants
//!
//! Tag values were extracted from the rpm upstream project C headers.

use std::fmt::Display;

use bitflags::bitflags;

/// Size (in bytes) of the fixed preamble of a header blob
pub const INDEX_HEADER_SIZE: usize = 16;
/// Size (in bytes) of each record in the index
pub const INDEX_ENTRY_SIZE: usize = 16;

/// header magic recognition; rpmdb blobs frequently store it zeroed out
pub const HEADER_MAGIC: [u8; 3] = [0x8e, 0xad, 0xe8];
/// header version, always 1
pub const HEADER_VERSION: u8 = 0x01;

/// Tags read out of a package header.
///
/// Every tag rpm writes is accepted on disk; only the tags that feed a
/// [`PackageInfo`](crate::PackageInfo) field are enumerated here, the rest
/// are skipped during assembly.
#[repr(u32)]
#[derive(
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    enum_display_derive::Display,
)]
#[allow(non_camel_case_types)]
pub enum Tag {
    RPMTAG_SIGPGP = 259,
    RPMTAG_SIGMD5 = 261,
    RPMTAG_RSAHEADER = 268,

    RPMTAG_NAME = 1000,
    RPMTAG_VERSION = 1001,
    RPMTAG_RELEASE = 1002,
    RPMTAG_EPOCH = 1003,
    RPMTAG_SUMMARY = 1004,
    RPMTAG_DESCRIPTION = 1005,
    RPMTAG_INSTALLTIME = 1008,
    RPMTAG_SIZE = 1009,
    RPMTAG_VENDOR = 1011,
    RPMTAG_LICENSE = 1014,
    RPMTAG_ARCH = 1022,
    RPMTAG_FILESIZES = 1028,
    RPMTAG_FILEMODES = 1030,
    RPMTAG_FILEDIGESTS = 1035,
    RPMTAG_FILEFLAGS = 1037,
    RPMTAG_FILEUSERNAME = 1039,
    RPMTAG_FILEGROUPNAME = 1040,
    RPMTAG_SOURCERPM = 1044,
    RPMTAG_PROVIDENAME = 1047,
    RPMTAG_REQUIRENAME = 1049,
    RPMTAG_DIRINDEXES = 1116,
    RPMTAG_BASENAMES = 1117,
    RPMTAG_DIRNAMES = 1118,
    RPMTAG_FILEDIGESTALGO = 5011,
    RPMTAG_MODULARITYLABEL = 5096,
}

/// Digest algorithm used for the per-file digests of a package.
///
/// The discriminants are the PGP hash algorithm ids rpm stores in
/// `RPMTAG_FILEDIGESTALGO`.
#[repr(u32)]
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    num_derive::FromPrimitive,
    num_derive::ToPrimitive,
)]
pub enum DigestAlgorithm {
    Md5 = 1,
    Sha1 = 2,
    Ripemd160 = 3,
    Md2 = 5,
    Tiger192 = 6,
    Haval5_160 = 7,
    Sha2_256 = 8,
    Sha2_384 = 9,
    Sha2_512 = 10,
    Sha2_224 = 11,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
    pub struct FileFlags: u32 {
        const CONFIG = 1;  // %%config
        const DOC = 1 << 1;  // %%doc
        const DONOTUSE = 1 << 2;  // %%donotuse
        const MISSINGOK = 1 << 3;  // %%config(missingok)
        const NOREPLACE = 1 << 4;  // %%config(noreplace)
        const GHOST = 1 << 6;  // %%ghost
        const LICENSE = 1 << 7;  // %%license
        const README = 1 << 8;  // %%readme
        const PUBKEY = 1 << 11;  // %%pubkey
        const ARTIFACT = 1 << 12;  // %%artifact
    }
}
