#![allow(dead_code)]

//! Fixture builders for the end-to-end tests: header blobs plus small
//! but structurally faithful databases in each of the three formats.

use rpmdb::Tag;

/// A v4 RSA signature packet (truncated to the metadata the reader
/// consumes) and the description rpm renders for it.
pub const RSA_SIG_HEX: &str = concat!(
    "89024a04000108003416210421cb256ae16fc54c6e652949702d426d350d275d",
    "050262804369161c72656c656e6740726f636b796c696e75782e6f7267000a09",
    "10702d426d350d275dc8910ffd14f0f80297481fea648e7ba5a74bce10c5facc",
);
pub const RSA_SIG_DESCRIPTION: &str =
    "RSA/SHA256, Sun May 15 00:03:53 2022, Key ID 702d426d350d275d";

pub const SIG_MD5_HEX: &str = "ebfb56be33b146ef39180a090e581258";

// ---------------------------------------------------------------------
// header blobs

pub enum TagValue<'a> {
    Int16(Vec<u16>),
    Int32(Vec<u32>),
    Str(&'a str),
    StrArray(Vec<&'a str>),
    I18n(Vec<&'a str>),
    Bin(Vec<u8>),
}

/// Serialize tag entries into a header blob the way rpm lays them out:
/// preamble, index records, then the aligned data store.
pub fn build_header_blob(entries: &[(i32, TagValue)]) -> Vec<u8> {
    let mut store = Vec::new();
    let mut index = Vec::new();

    for (tag, value) in entries {
        let (type_id, count, offset) = append_value(&mut store, value);
        index.extend_from_slice(&tag.to_be_bytes());
        index.extend_from_slice(&type_id.to_be_bytes());
        index.extend_from_slice(&(offset as u32).to_be_bytes());
        index.extend_from_slice(&count.to_be_bytes());
    }

    let mut blob = Vec::new();
    // the stored form zeroes the header magic
    blob.extend_from_slice(&[0u8; 8]);
    blob.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    blob.extend_from_slice(&(store.len() as u32).to_be_bytes());
    blob.extend_from_slice(&index);
    blob.extend_from_slice(&store);
    blob
}

fn append_value(store: &mut Vec<u8>, value: &TagValue) -> (u32, u32, usize) {
    match value {
        TagValue::Int16(vals) => {
            while store.len() % 2 != 0 {
                store.push(0);
            }
            let offset = store.len();
            for v in vals {
                store.extend_from_slice(&v.to_be_bytes());
            }
            (3, vals.len() as u32, offset)
        }
        TagValue::Int32(vals) => {
            while store.len() % 4 != 0 {
                store.push(0);
            }
            let offset = store.len();
            for v in vals {
                store.extend_from_slice(&v.to_be_bytes());
            }
            (4, vals.len() as u32, offset)
        }
        TagValue::Str(s) => {
            let offset = store.len();
            store.extend_from_slice(s.as_bytes());
            store.push(0);
            (6, 1, offset)
        }
        TagValue::StrArray(strings) => {
            let offset = store.len();
            for s in strings {
                store.extend_from_slice(s.as_bytes());
                store.push(0);
            }
            (8, strings.len() as u32, offset)
        }
        TagValue::I18n(strings) => {
            let offset = store.len();
            for s in strings {
                store.extend_from_slice(s.as_bytes());
                store.push(0);
            }
            (9, strings.len() as u32, offset)
        }
        TagValue::Bin(bytes) => {
            let offset = store.len();
            store.extend_from_slice(bytes);
            (7, bytes.len() as u32, offset)
        }
    }
}

/// A package with the full set of fields, including a two-file inventory
/// and signature material.
pub fn bash_blob() -> Vec<u8> {
    let sig = hex::decode(RSA_SIG_HEX).unwrap();
    let md5 = hex::decode(SIG_MD5_HEX).unwrap();
    build_header_blob(&[
        (Tag::RPMTAG_NAME as i32, TagValue::Str("bash")),
        (Tag::RPMTAG_VERSION as i32, TagValue::Str("5.1.8")),
        (Tag::RPMTAG_RELEASE as i32, TagValue::Str("6.el9")),
        (Tag::RPMTAG_ARCH as i32, TagValue::Str("x86_64")),
        (
            Tag::RPMTAG_SUMMARY as i32,
            TagValue::I18n(vec!["The GNU Bourne Again shell"]),
        ),
        (
            Tag::RPMTAG_DESCRIPTION as i32,
            TagValue::I18n(vec!["The GNU Bourne Again shell (Bash) is a shell."]),
        ),
        (Tag::RPMTAG_INSTALLTIME as i32, TagValue::Int32(vec![1_650_000_000])),
        (Tag::RPMTAG_SIZE as i32, TagValue::Int32(vec![7_736_132])),
        (Tag::RPMTAG_VENDOR as i32, TagValue::Str("Rocky Enterprise Software Foundation")),
        (Tag::RPMTAG_LICENSE as i32, TagValue::Str("GPLv3+")),
        (
            Tag::RPMTAG_SOURCERPM as i32,
            TagValue::Str("bash-5.1.8-6.el9.src.rpm"),
        ),
        (Tag::RPMTAG_SIGMD5 as i32, TagValue::Bin(md5)),
        (Tag::RPMTAG_SIGPGP as i32, TagValue::Bin(sig.clone())),
        (Tag::RPMTAG_RSAHEADER as i32, TagValue::Bin(sig)),
        (Tag::RPMTAG_FILEDIGESTALGO as i32, TagValue::Int32(vec![8])),
        (
            Tag::RPMTAG_PROVIDENAME as i32,
            TagValue::StrArray(vec!["bash", "bash(x86-64)", "/bin/bash"]),
        ),
        (
            Tag::RPMTAG_REQUIRENAME as i32,
            TagValue::StrArray(vec![
                "libc.so.6()(64bit)",
                "rpmlib(CompressedFileNames)",
                "rtld(GNU_HASH)",
            ]),
        ),
        (
            Tag::RPMTAG_BASENAMES as i32,
            TagValue::StrArray(vec!["bash", "bashbug"]),
        ),
        (Tag::RPMTAG_DIRINDEXES as i32, TagValue::Int32(vec![0, 0])),
        (
            Tag::RPMTAG_DIRNAMES as i32,
            TagValue::StrArray(vec!["/usr/bin/"]),
        ),
        (Tag::RPMTAG_FILESIZES as i32, TagValue::Int32(vec![1_390_784, 8_597])),
        (
            Tag::RPMTAG_FILEDIGESTS as i32,
            TagValue::StrArray(vec!["3c9050b4a4b4e647b0f92a6178943b13", "a97b317daca0a0bbc1c5f23d06a3a216"]),
        ),
        (
            Tag::RPMTAG_FILEMODES as i32,
            TagValue::Int16(vec![0o100_755, 0o100_644]),
        ),
        (Tag::RPMTAG_FILEFLAGS as i32, TagValue::Int32(vec![0, 2])),
        (
            Tag::RPMTAG_FILEUSERNAME as i32,
            TagValue::StrArray(vec!["root", "root"]),
        ),
        (
            Tag::RPMTAG_FILEGROUPNAME as i32,
            TagValue::StrArray(vec!["root", "root"]),
        ),
    ])
}

/// A modular package with an epoch but no file inventory.
pub fn nodejs_blob() -> Vec<u8> {
    build_header_blob(&[
        (Tag::RPMTAG_NAME as i32, TagValue::Str("nodejs")),
        (Tag::RPMTAG_EPOCH as i32, TagValue::Int32(vec![1])),
        (Tag::RPMTAG_VERSION as i32, TagValue::Str("10.21.0")),
        (
            Tag::RPMTAG_RELEASE as i32,
            TagValue::Str("3.module_el8.2.0+391+8da3adc6"),
        ),
        (Tag::RPMTAG_ARCH as i32, TagValue::Str("x86_64")),
        (
            Tag::RPMTAG_MODULARITYLABEL as i32,
            TagValue::Str("nodejs:10:8020020200707141642:6a468ee4"),
        ),
        (Tag::RPMTAG_SUMMARY as i32, TagValue::I18n(vec!["JavaScript runtime"])),
    ])
}

/// A package whose description is large enough to spill any BerkeleyDB
/// value off-page several times over.
pub fn oversized_blob(name: &str, description_len: usize) -> Vec<u8> {
    let description = "x".repeat(description_len);
    build_header_blob(&[
        (Tag::RPMTAG_NAME as i32, TagValue::Str(name)),
        (Tag::RPMTAG_VERSION as i32, TagValue::Str("1.0")),
        (Tag::RPMTAG_RELEASE as i32, TagValue::Str("1")),
        (Tag::RPMTAG_ARCH as i32, TagValue::Str("noarch")),
        (
            Tag::RPMTAG_DESCRIPTION as i32,
            TagValue::I18n(vec![description.as_str()]),
        ),
    ])
}

// ---------------------------------------------------------------------
// BerkeleyDB

const BDB_PAGE_HEADER_SIZE: usize = 26;
const BDB_HASH_MAGIC: u32 = 0x0006_1561;

pub enum BdbValue<'a> {
    /// Value stored inline in its home hash page.
    Inline(&'a [u8]),
    /// Value pushed onto a chain of overflow pages.
    Overflow(&'a [u8]),
    /// Zero-length value, as left behind by `rpm -e`.
    Deleted,
    /// A slot carrying an item type the walker does not handle (an
    /// off-page duplicate, which rpm never stores).
    Unsupported,
}

pub struct BdbFixture {
    pub bytes: Vec<u8>,
    /// Parallel to the input values: the first overflow page for spilled
    /// values, zero otherwise.
    pub first_overflow_pages: Vec<u32>,
}

/// Lay out a hash database: the meta page, hash pages packing as many
/// key/value pairs as fit, overflow chains for the spilled values and a
/// trailing non-hash page the walker has to skip.
pub fn build_bdb(values: &[BdbValue], page_size: usize, big_endian: bool) -> BdbFixture {
    let capacity = page_size - BDB_PAGE_HEADER_SIZE;

    // group pairs onto hash pages greedily
    let mut pages: Vec<Vec<usize>> = Vec::new();
    let mut used = capacity;
    for (i, value) in values.iter().enumerate() {
        let value_block = match value {
            BdbValue::Inline(data) => 1 + data.len(),
            BdbValue::Deleted | BdbValue::Unsupported => 1,
            BdbValue::Overflow(_) => 12,
        };
        let need = 4 + 5 + value_block; // two slots, the key block, the value block
        if used + need > capacity {
            pages.push(Vec::new());
            used = 0;
        }
        pages.last_mut().unwrap().push(i);
        used += need;
    }
    let hash_page_count = pages.len() as u32;

    // overflow chains follow the hash pages
    let mut next_page = hash_page_count + 1;
    let mut first_overflow_pages = vec![0u32; values.len()];
    let mut chains: Vec<Vec<(u32, &[u8])>> = Vec::new();
    for (i, value) in values.iter().enumerate() {
        if let BdbValue::Overflow(data) = value {
            let mut chain = Vec::new();
            for chunk in data.chunks(capacity) {
                chain.push((next_page, chunk));
                next_page += 1;
            }
            first_overflow_pages[i] = chain[0].0;
            chains.push(chain);
        }
    }
    let foreign_page_no = next_page;
    let last_page_no = foreign_page_no;

    let mut file = vec![0u8; (last_page_no as usize + 1) * page_size];
    let w16 = |file: &mut Vec<u8>, at: usize, val: u16| {
        let bytes = if big_endian {
            val.to_be_bytes()
        } else {
            val.to_le_bytes()
        };
        file[at..at + 2].copy_from_slice(&bytes);
    };
    let w32 = |file: &mut Vec<u8>, at: usize, val: u32| {
        let bytes = if big_endian {
            val.to_be_bytes()
        } else {
            val.to_le_bytes()
        };
        file[at..at + 4].copy_from_slice(&bytes);
    };

    // meta page
    w32(&mut file, 12, BDB_HASH_MAGIC);
    w32(&mut file, 16, 9); // version
    w32(&mut file, 20, page_size as u32);
    file[24] = 0; // unencrypted
    file[25] = 8; // hash meta page type
    w32(&mut file, 32, last_page_no);

    // hash pages
    for (p, members) in pages.iter().enumerate() {
        let page_no = p as u32 + 1;
        let base = page_no as usize * page_size;
        w32(&mut file, base + 8, page_no);
        file[base + 25] = 13; // hash page type

        let mut cursor = page_size;
        let mut offsets: Vec<u16> = Vec::new();
        for &i in members {
            let key = (i as u32 + 1).to_be_bytes();
            cursor -= 1 + key.len();
            file[base + cursor] = 1; // inline key item
            file[base + cursor + 1..base + cursor + 1 + key.len()].copy_from_slice(&key);
            offsets.push(cursor as u16);

            match &values[i] {
                BdbValue::Inline(data) => {
                    cursor -= 1 + data.len();
                    file[base + cursor] = 1;
                    file[base + cursor + 1..base + cursor + 1 + data.len()].copy_from_slice(data);
                }
                BdbValue::Deleted => {
                    cursor -= 1;
                    file[base + cursor] = 1;
                }
                BdbValue::Unsupported => {
                    cursor -= 1;
                    file[base + cursor] = 4; // H_OFFDUP
                }
                BdbValue::Overflow(data) => {
                    cursor -= 12;
                    file[base + cursor] = 3;
                    w32(&mut file, base + cursor + 4, first_overflow_pages[i]);
                    w32(&mut file, base + cursor + 8, data.len() as u32);
                }
            }
            offsets.push(cursor as u16);
        }

        w16(&mut file, base + 20, offsets.len() as u16);
        w16(&mut file, base + 22, cursor as u16);
        for (slot, offset) in offsets.iter().enumerate() {
            w16(&mut file, base + BDB_PAGE_HEADER_SIZE + 2 * slot, *offset);
        }
    }

    // overflow chains
    for chain in &chains {
        for (link, (page_no, chunk)) in chain.iter().enumerate() {
            let base = *page_no as usize * page_size;
            w32(&mut file, base + 8, *page_no);
            if link > 0 {
                w32(&mut file, base + 12, chain[link - 1].0);
            }
            if link + 1 < chain.len() {
                w32(&mut file, base + 16, chain[link + 1].0);
            }
            w16(&mut file, base + 22, chunk.len() as u16);
            file[base + 25] = 7; // overflow page type
            file[base + BDB_PAGE_HEADER_SIZE..base + BDB_PAGE_HEADER_SIZE + chunk.len()]
                .copy_from_slice(chunk);
        }
    }

    // a btree leaf page; present in real databases, never walked
    let base = foreign_page_no as usize * page_size;
    w32(&mut file, base + 8, foreign_page_no);
    file[base + 25] = 5;

    BdbFixture {
        bytes: file,
        first_overflow_pages,
    }
}

// ---------------------------------------------------------------------
// NDB

const NDB_BLK_SIZE: usize = 64;

/// Lay out an NDB file: header, slot table (with one empty slot in the
/// middle), then each record in its run of blocks.
pub fn build_ndb(blobs: &[&[u8]]) -> Vec<u8> {
    let slot_count = blobs.len() + 1; // plus the empty slot
    let table_len = 16 + slot_count * 12;
    let mut next_blk = table_len.div_ceil(NDB_BLK_SIZE);

    let mut slots: Vec<(u32, u32, u32)> = Vec::new();
    let mut records: Vec<(usize, Vec<u8>)> = Vec::new();
    for (i, blob) in blobs.iter().enumerate() {
        let pkg_index = i as u32 + 1;
        let blk_count = (16 + blob.len()).div_ceil(NDB_BLK_SIZE);

        let mut record = vec![0u8; blk_count * NDB_BLK_SIZE];
        record[0..4].copy_from_slice(&0x5362_6C42u32.to_le_bytes());
        record[4..8].copy_from_slice(&pkg_index.to_le_bytes());
        record[8..12].copy_from_slice(&(blob.len() as u32).to_le_bytes());
        record[16..16 + blob.len()].copy_from_slice(blob);

        slots.push((pkg_index, next_blk as u32, blk_count as u32));
        records.push((next_blk * NDB_BLK_SIZE, record));
        next_blk += blk_count;
    }

    let mut file = vec![0u8; next_blk * NDB_BLK_SIZE];
    file[0..4].copy_from_slice(&0xFEFE_0001u32.to_le_bytes());
    file[4..8].copy_from_slice(&0u32.to_le_bytes()); // version
    file[8..12].copy_from_slice(&(slot_count as u32).to_le_bytes());
    file[12..16].copy_from_slice(&(NDB_BLK_SIZE as u32).to_le_bytes());

    let mut at = 16;
    for (i, &(pkg_index, blk_offset, blk_count)) in slots.iter().enumerate() {
        if i == 1 {
            at += 12; // leave one slot empty
        }
        file[at..at + 4].copy_from_slice(&pkg_index.to_le_bytes());
        file[at + 4..at + 8].copy_from_slice(&blk_offset.to_le_bytes());
        file[at + 8..at + 12].copy_from_slice(&blk_count.to_le_bytes());
        at += 12;
    }

    for (offset, record) in records {
        file[offset..offset + record.len()].copy_from_slice(&record);
    }
    file
}

// ---------------------------------------------------------------------
// SQLite

pub fn build_sqlite(path: &std::path::Path, blobs: &[&[u8]]) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute(
        "CREATE TABLE Packages (hnum INTEGER PRIMARY KEY AUTOINCREMENT, blob BLOB NOT NULL)",
        [],
    )
    .unwrap();
    for blob in blobs {
        conn.execute(
            "INSERT INTO Packages (blob) VALUES (?1)",
            rusqlite::params![blob.to_vec()],
        )
        .unwrap();
    }
}
