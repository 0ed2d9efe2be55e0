//! Textual description of the OpenPGP signature packet a header carries.
//!
//! rpm stores the raw signature packet in the PGP/RSA header tags and
//! renders it as e.g. `RSA/SHA256, Tue Jul  7 16:08:24 2020, Key ID
//! 05b555b38483c65d` when queried. This module reproduces that string.
//! Nothing is verified; the packet is only read for its metadata.

use chrono::{TimeZone, Utc};

use crate::errors::Error;
use crate::parse::ByteReader;

const PACKET_TAG_SIGNATURE: u8 = 2;

const SUBPACKET_CREATION_TIME: u8 = 2;
const SUBPACKET_ISSUER: u8 = 16;
const SUBPACKET_ISSUER_FINGERPRINT: u8 = 33;

#[derive(Debug, Default, PartialEq, Eq)]
struct SignatureInfo {
    pubkey_algo: u8,
    hash_algo: u8,
    creation_time: u32,
    key_id: Option<u64>,
}

/// Decode a signature packet into its one-line description.
pub(crate) fn describe_signature(data: &[u8]) -> Result<String, Error> {
    let mut r = ByteReader::big_endian(data);

    let tag_byte = r.u8("packet tag")?;
    if tag_byte & 0x80 == 0 {
        return Err(Error::Signature("not an OpenPGP packet"));
    }

    let new_format = tag_byte & 0x40 != 0;
    let tag = if new_format {
        tag_byte & 0x3f
    } else {
        (tag_byte >> 2) & 0x0f
    };
    if tag != PACKET_TAG_SIGNATURE {
        return Err(Error::Signature("not a signature packet"));
    }

    // The packet length only frames the body; the descriptor does not
    // need it beyond skipping the right number of octets.
    if new_format {
        read_new_format_length(&mut r)?;
    } else {
        match tag_byte & 0x03 {
            0 => r.skip(1, "packet length")?,
            1 => r.skip(2, "packet length")?,
            2 => r.skip(4, "packet length")?,
            // 3: indeterminate, the body runs to the end of the field
            _ => {}
        }
    }

    let version = r.u8("signature version")?;
    let sig = match version {
        3 => parse_v3(&mut r)?,
        4 => parse_v4(&mut r)?,
        _ => return Err(Error::Signature("unsupported signature version")),
    };

    render(&sig)
}

fn read_new_format_length(r: &mut ByteReader) -> Result<u32, Error> {
    let first = r.u8("packet length")?;
    match first {
        0..=191 => Ok(u32::from(first)),
        192..=223 => {
            let second = r.u8("packet length")?;
            Ok((u32::from(first) - 192) * 256 + u32::from(second) + 192)
        }
        255 => r.u32("packet length"),
        _ => Err(Error::Signature("partial body length unsupported")),
    }
}

fn parse_v3(r: &mut ByteReader) -> Result<SignatureInfo, Error> {
    r.skip(1, "hashed material length")?;
    r.skip(1, "signature type")?;
    let creation_time = r.u32("creation time")?;
    let key_id = r.u64("issuer key id")?;
    Ok(SignatureInfo {
        creation_time,
        key_id: Some(key_id),
        pubkey_algo: r.u8("public key algorithm")?,
        hash_algo: r.u8("hash algorithm")?,
    })
}

fn parse_v4(r: &mut ByteReader) -> Result<SignatureInfo, Error> {
    r.skip(1, "signature type")?;
    let pubkey_algo = r.u8("public key algorithm")?;
    let hash_algo = r.u8("hash algorithm")?;

    let hashed_len = r.u16("hashed subpackets length")?;
    let hashed = r.take(usize::from(hashed_len), "hashed subpackets")?;
    let unhashed_len = r.u16("unhashed subpackets length")?;
    let unhashed = r.take(usize::from(unhashed_len), "unhashed subpackets")?;

    let creation_time = match find_subpacket(hashed, SUBPACKET_CREATION_TIME)? {
        Some(body) => ByteReader::big_endian(body).u32("creation time")?,
        None => return Err(Error::Signature("missing creation time subpacket")),
    };

    // The issuer normally sits in the unhashed area; newer keys may only
    // leave a fingerprint, whose trailing eight bytes are the key id.
    let issuer = match find_subpacket(unhashed, SUBPACKET_ISSUER)? {
        Some(body) => Some(body),
        None => find_subpacket(hashed, SUBPACKET_ISSUER)?,
    };
    let key_id = match issuer {
        Some(body) => Some(ByteReader::big_endian(body).u64("issuer key id")?),
        None => {
            let fingerprint = match find_subpacket(unhashed, SUBPACKET_ISSUER_FINGERPRINT)? {
                Some(body) => Some(body),
                None => find_subpacket(hashed, SUBPACKET_ISSUER_FINGERPRINT)?,
            };
            match fingerprint {
                Some(body) if body.len() >= 8 => {
                    Some(ByteReader::big_endian(&body[body.len() - 8..]).u64("issuer key id")?)
                }
                Some(_) => return Err(Error::Signature("issuer fingerprint too short")),
                None => None,
            }
        }
    };

    Ok(SignatureInfo {
        pubkey_algo,
        hash_algo,
        creation_time,
        key_id,
    })
}

/// Scan a subpacket area for the first subpacket of the wanted type,
/// returning its body.
fn find_subpacket<'a>(mut area: &'a [u8], want: u8) -> Result<Option<&'a [u8]>, Error> {
    while !area.is_empty() {
        let (length, rest) = subpacket_length(area)?;
        if length == 0 {
            return Err(Error::Signature("empty subpacket"));
        }
        if rest.len() < length {
            return Err(Error::Signature("truncated subpacket"));
        }
        let (body, tail) = rest.split_at(length);
        // high bit of the type octet is the "critical" flag
        if body[0] & 0x7f == want {
            return Ok(Some(&body[1..]));
        }
        area = tail;
    }
    Ok(None)
}

fn subpacket_length(area: &[u8]) -> Result<(usize, &[u8]), Error> {
    let mut r = ByteReader::big_endian(area);
    let first = r.u8("subpacket length")?;
    let length = match first {
        0..=191 => usize::from(first),
        192..=254 => {
            let second = r.u8("subpacket length")?;
            (usize::from(first) - 192) * 256 + usize::from(second) + 192
        }
        255 => r.u32("subpacket length")? as usize,
    };
    let consumed = match first {
        0..=191 => 1,
        192..=254 => 2,
        255 => 5,
    };
    Ok((length, &area[consumed..]))
}

fn render(sig: &SignatureInfo) -> Result<String, Error> {
    let pubkey = match sig.pubkey_algo {
        1 => "RSA",
        17 => "DSA",
        _ => return Err(Error::Signature("unsupported public key algorithm")),
    };
    let hash = match sig.hash_algo {
        2 => "SHA1",
        8 => "SHA256",
        10 => "SHA512",
        11 => "SHA224",
        _ => return Err(Error::Signature("unsupported hash algorithm")),
    };
    let key_id = sig.key_id.ok_or(Error::Signature("missing issuer key id"))?;
    let when = Utc
        .timestamp_opt(i64::from(sig.creation_time), 0)
        .single()
        .ok_or(Error::Signature("invalid creation time"))?;

    Ok(format!(
        "{}/{}, {}, Key ID {:016x}",
        pubkey,
        hash,
        when.format("%a %b %e %H:%M:%S %Y"),
        key_id
    ))
}
