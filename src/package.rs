//! Assembled package records and the derived file inventory.

use num::FromPrimitive;

use crate::constants::{DigestAlgorithm, FileFlags, Tag};
use crate::errors::Error;
use crate::header::{IndexEntry, IndexEntryInfo};
use crate::pgp::describe_signature;

/// Metadata of one installed package.
///
/// Every field mirrors a header tag; tags absent from the header leave
/// their field at the default. The parallel `base_names`/`dir_indexes`/…
/// arrays carry the file inventory and are zipped together by
/// [`installed_files`](Self::installed_files).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PackageInfo {
    pub epoch: Option<u32>,
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub source_rpm: String,
    pub size: u64,
    pub license: String,
    pub vendor: String,
    pub modularity_label: String,
    pub summary: String,
    pub description: String,
    /// `RSA/SHA256, …, Key ID …` from the legacy PGP tag; empty on newer
    /// databases that only carry the header signature.
    pub pgp: String,
    /// Same rendering for the header-only RSA signature.
    pub rsa_header: String,
    /// Hex-encoded MD5 of header and payload.
    pub sig_md5: String,
    pub digest_algorithm: Option<DigestAlgorithm>,
    pub install_time: u32,
    pub provides: Vec<String>,
    pub requires: Vec<String>,

    pub base_names: Vec<String>,
    pub dir_indexes: Vec<u32>,
    pub dir_names: Vec<String>,
    pub file_sizes: Vec<u32>,
    pub file_digests: Vec<String>,
    pub file_modes: Vec<u16>,
    pub file_flags: Vec<u32>,
    pub user_names: Vec<String>,
    pub group_names: Vec<String>,

    /// The undecoded header blob this record was assembled from.
    pub raw_header: Vec<u8>,
    /// The blob's index records with their payloads dropped.
    pub index_entries: Vec<IndexEntryInfo>,
    /// First overflow page the value spilled onto; zero unless the record
    /// came out of a BerkeleyDB database and was stored off-page.
    pub bdb_first_overflow_page: u32,
}

/// One file of a package's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String,
    pub mode: u16,
    pub digest: String,
    pub size: u32,
    pub username: String,
    pub groupname: String,
    pub flags: FileFlags,
}

impl PackageInfo {
    /// Collect the decoded index entries into a record.
    ///
    /// Unknown tags are skipped for forward compatibility; a duplicated
    /// tag keeps its last occurrence. Only a missing name is fatal.
    pub(crate) fn from_entries(entries: &[IndexEntry]) -> Result<Self, Error> {
        let mut pkg = PackageInfo::default();

        for entry in entries {
            let Some(tag) = Tag::from_i32(entry.tag) else {
                continue;
            };
            match tag {
                Tag::RPMTAG_NAME => pkg.name = owned_string(entry),
                Tag::RPMTAG_VERSION => pkg.version = owned_string(entry),
                Tag::RPMTAG_RELEASE => pkg.release = owned_string(entry),
                Tag::RPMTAG_EPOCH => pkg.epoch = entry.data.as_u32(),
                Tag::RPMTAG_SUMMARY => pkg.summary = owned_i18n(entry),
                Tag::RPMTAG_DESCRIPTION => pkg.description = owned_i18n(entry),
                Tag::RPMTAG_INSTALLTIME => pkg.install_time = entry.data.as_u32().unwrap_or(0),
                Tag::RPMTAG_SIZE => pkg.size = u64::from(entry.data.as_u32().unwrap_or(0)),
                Tag::RPMTAG_VENDOR => pkg.vendor = owned_string(entry),
                Tag::RPMTAG_LICENSE => pkg.license = owned_string(entry),
                Tag::RPMTAG_ARCH => pkg.arch = owned_string(entry),
                Tag::RPMTAG_SOURCERPM => pkg.source_rpm = owned_string(entry),
                Tag::RPMTAG_MODULARITYLABEL => pkg.modularity_label = owned_string(entry),
                Tag::RPMTAG_PROVIDENAME => pkg.provides = owned_string_array(entry),
                Tag::RPMTAG_REQUIRENAME => pkg.requires = owned_string_array(entry),
                Tag::RPMTAG_SIGMD5 => {
                    pkg.sig_md5 = entry.data.as_binary().map(hex::encode).unwrap_or_default()
                }
                Tag::RPMTAG_SIGPGP => {
                    // legacy tag; absent or empty on newer databases
                    if let Some(raw) = entry.data.as_binary().filter(|raw| !raw.is_empty()) {
                        pkg.pgp = describe_signature(raw)?;
                    }
                }
                Tag::RPMTAG_RSAHEADER => {
                    if let Some(raw) = entry.data.as_binary().filter(|raw| !raw.is_empty()) {
                        pkg.rsa_header = describe_signature(raw)?;
                    }
                }
                Tag::RPMTAG_FILEDIGESTALGO => {
                    pkg.digest_algorithm =
                        entry.data.as_u32().and_then(DigestAlgorithm::from_u32)
                }
                Tag::RPMTAG_BASENAMES => pkg.base_names = owned_string_array(entry),
                Tag::RPMTAG_DIRINDEXES => {
                    pkg.dir_indexes = entry.data.as_u32_array().unwrap_or_default().to_vec()
                }
                Tag::RPMTAG_DIRNAMES => pkg.dir_names = owned_string_array(entry),
                Tag::RPMTAG_FILESIZES => {
                    pkg.file_sizes = entry.data.as_u32_array().unwrap_or_default().to_vec()
                }
                Tag::RPMTAG_FILEDIGESTS => pkg.file_digests = owned_string_array(entry),
                Tag::RPMTAG_FILEMODES => {
                    pkg.file_modes = entry.data.as_u16_array().unwrap_or_default().to_vec()
                }
                Tag::RPMTAG_FILEFLAGS => {
                    pkg.file_flags = entry.data.as_u32_array().unwrap_or_default().to_vec()
                }
                Tag::RPMTAG_FILEUSERNAME => pkg.user_names = owned_string_array(entry),
                Tag::RPMTAG_FILEGROUPNAME => pkg.group_names = owned_string_array(entry),
            }
        }

        if pkg.name.is_empty() {
            return Err(Error::MissingTag("name"));
        }

        Ok(pkg)
    }

    /// Just the absolute paths of the package's files.
    pub fn installed_file_names(&self) -> Result<Vec<String>, Error> {
        if self.base_names.is_empty() {
            return Err(Error::FileListIncomplete("base names"));
        }
        if self.dir_names.is_empty() {
            return Err(Error::FileListIncomplete("dir names"));
        }
        if self.dir_indexes.len() != self.base_names.len() {
            return Err(Error::FileListIncomplete("dir indexes"));
        }

        let mut names = Vec::with_capacity(self.base_names.len());
        for (base, &dir_index) in self.base_names.iter().zip(&self.dir_indexes) {
            let dir = self
                .dir_names
                .get(dir_index as usize)
                .ok_or(Error::FileListIncomplete("dir name for index"))?;
            if dir.ends_with('/') {
                names.push(format!("{dir}{base}"));
            } else {
                names.push(format!("{dir}/{base}"));
            }
        }
        Ok(names)
    }

    /// The full file inventory, zipped out of the parallel tag arrays.
    pub fn installed_files(&self) -> Result<Vec<FileInfo>, Error> {
        let names = self.installed_file_names()?;

        let count = names.len();
        let parallel = [
            ("file sizes", self.file_sizes.len()),
            ("file digests", self.file_digests.len()),
            ("file modes", self.file_modes.len()),
            ("file flags", self.file_flags.len()),
            ("user names", self.user_names.len()),
            ("group names", self.group_names.len()),
        ];
        for (what, len) in parallel {
            if len != count {
                return Err(Error::FileListIncomplete(what));
            }
        }

        let files = names
            .into_iter()
            .enumerate()
            .map(|(i, path)| FileInfo {
                path,
                mode: self.file_modes[i],
                digest: self.file_digests[i].clone(),
                size: self.file_sizes[i],
                username: self.user_names[i].clone(),
                groupname: self.group_names[i].clone(),
                flags: FileFlags::from_bits_retain(self.file_flags[i]),
            })
            .collect();
        Ok(files)
    }
}

fn owned_string(entry: &IndexEntry) -> String {
    entry.data.as_str().unwrap_or_default().to_owned()
}

fn owned_i18n(entry: &IndexEntry) -> String {
    entry
        .data
        .as_i18n_str()
        .or_else(|| entry.data.as_str())
        .unwrap_or_default()
        .to_owned()
}

fn owned_string_array(entry: &IndexEntry) -> Vec<String> {
    entry.data.as_string_array().unwrap_or_default().to_vec()
}
