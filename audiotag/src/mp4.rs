//! ISO Base Media atoms: `ftyp` identification and the
//! `moov.udta.meta.ilst` iTunes metadata convention.

use std::future::Future;
use std::pin::Pin;

use byteorder::{BigEndian, ByteOrder};

use crate::bytes::{base64_encode, bytes_to_int};
use crate::error::TagError;
use crate::model::{normalize_year, Metadata, RequestedTags, TagKey, TagValue, TaggedFile};
use crate::reader::Reader;

struct AtomHeader {
    atom_type: [u8; 4],
    body_start: u64,
    body_len: u64,
    next_offset: u64,
}

/// Reads one atom header at `offset`, resolving the 64-bit extended-size and
/// extends-to-end-of-container (`size == 0`) forms. `container_end` supplies
/// the end-of-container length for the latter.
async fn read_atom_header(
    reader: &mut Reader<'_>,
    offset: u64,
    container_end: u64,
) -> Result<AtomHeader, TagError> {
    reader.load(offset, 8).await?;
    let head = reader.read_n(8);
    if head.len() < 8 {
        return Err(TagError::FormatInvalid("truncated atom header".into()));
    }
    let mut size = BigEndian::read_u32(&head[0..4]) as u64;
    let atom_type: [u8; 4] = head[4..8].try_into().unwrap();
    let mut header_len = 8u64;

    if size == 1 {
        reader.load(offset + 8, 8).await?;
        let ext = reader.read_n(8);
        if ext.len() < 8 {
            return Err(TagError::FormatInvalid("truncated extended atom size".into()));
        }
        size = BigEndian::read_u64(&ext);
        header_len = 16;
    } else if size == 0 {
        size = container_end.saturating_sub(offset);
    }

    let body_start = offset + header_len;
    let body_len = size.saturating_sub(header_len);
    Ok(AtomHeader { atom_type, body_start, body_len, next_offset: offset + size })
}

/// Parses the `ftyp`-led ISO Base Media container starting at the beginning
/// of the file. `file_type` is supplied by the dispatcher (`"m4a"` or
/// `"mp4"`, per the extension that selected this parser).
pub async fn extract(
    reader: &mut Reader<'_>,
    file_size: u64,
    file_type: &str,
    requested: &RequestedTags,
) -> Result<TaggedFile, TagError> {
    let ftyp = read_atom_header(reader, 0, file_size).await?;
    if &ftyp.atom_type != b"ftyp" {
        return Err(TagError::FormatInvalid("first atom is not ftyp".into()));
    }
    reader.load(ftyp.body_start, ftyp.body_len.min(8)).await?;
    let payload = reader.read_n(8.min(ftyp.body_len as usize));
    if payload.len() < 8 {
        return Err(TagError::FormatInvalid("truncated ftyp atom".into()));
    }
    let major_brand = String::from_utf8_lossy(&payload[0..4]).into_owned();
    let minor_version = BigEndian::read_u32(&payload[4..8]);
    let format = format!("{major_brand} ({minor_version})");

    let mut metadata = Metadata::new();
    let mut offset = ftyp.next_offset;
    while offset < file_size && !metadata.is_satisfied(requested) {
        let header = read_atom_header(reader, offset, file_size).await?;
        if &header.atom_type == b"moov" {
            walk_container(
                reader,
                header.body_start,
                header.body_start + header.body_len,
                requested,
                &mut metadata,
            )
            .await?;
        }
        offset = header.next_offset;
    }

    Ok(TaggedFile {
        file_type: file_type.to_string(),
        format,
        metadata: metadata.into_result(requested),
    })
}

/// Recurses through `udta`/`meta` containers, handing `ilst` off to the leaf
/// walker. `meta` atoms have a 4-byte version/flags field immediately after
/// their header that every draft agrees must always be skipped.
fn walk_container<'a>(
    reader: &'a mut Reader<'_>,
    offset: u64,
    end: u64,
    requested: &'a RequestedTags,
    metadata: &'a mut Metadata,
) -> Pin<Box<dyn Future<Output = Result<(), TagError>> + 'a>> {
    Box::pin(async move {
        let mut offset = offset;
        while offset < end && !metadata.is_satisfied(requested) {
            let header = read_atom_header(reader, offset, end).await?;
            match &header.atom_type {
                b"ilst" => {
                    walk_ilst(
                        reader,
                        header.body_start,
                        header.body_start + header.body_len,
                        requested,
                        metadata,
                    )
                    .await?;
                }
                b"udta" => {
                    walk_container(
                        reader,
                        header.body_start,
                        header.body_start + header.body_len,
                        requested,
                        metadata,
                    )
                    .await?;
                }
                b"meta" => {
                    walk_container(
                        reader,
                        header.body_start + 4,
                        header.body_start + header.body_len,
                        requested,
                        metadata,
                    )
                    .await?;
                }
                _ => {}
            }
            offset = header.next_offset;
        }
        Ok(())
    })
}

async fn walk_ilst(
    reader: &mut Reader<'_>,
    offset: u64,
    end: u64,
    requested: &RequestedTags,
    metadata: &mut Metadata,
) -> Result<(), TagError> {
    let mut offset = offset;
    while offset < end && !metadata.is_satisfied(requested) {
        let header = read_atom_header(reader, offset, end).await?;
        if let Some(key) = canonical_atom(&header.atom_type) {
            if requested.contains(&key) {
                reader.load(header.body_start, header.body_len).await?;
                let body = reader.read_n(header.body_len as usize);
                if body.len() >= 16 {
                    let flag = BigEndian::read_u24(&body[9..12]);
                    let payload = &body[16..];
                    if let Some(value) = decode_item_value(key, flag, payload) {
                        metadata.store(requested, key, value);
                    }
                }
            }
        }
        offset = header.next_offset;
    }
    Ok(())
}

fn canonical_atom(atom_type: &[u8; 4]) -> Option<TagKey> {
    match atom_type {
        b"\xa9alb" => Some(TagKey::Album),
        b"\xa9ART" => Some(TagKey::Artist),
        b"\xa9nam" => Some(TagKey::Name),
        b"trkn" => Some(TagKey::Track),
        b"\xa9day" => Some(TagKey::Year),
        b"covr" => Some(TagKey::Artwork),
        b"aART" => Some(TagKey::AlbumArtist),
        _ => None,
    }
}

fn decode_item_value(key: TagKey, flag: u32, payload: &[u8]) -> Option<TagValue> {
    match key {
        TagKey::Track => Some(TagValue::Integer(bytes_to_int(payload, 8, true))),
        TagKey::Artwork => {
            let mime = if flag == 14 { "image/png" } else { "image/jpeg" };
            Some(TagValue::Text(format!(
                "data:{mime};base64,{}",
                base64_encode(payload)
            )))
        }
        TagKey::Year => {
            let text = String::from_utf8_lossy(payload).into_owned();
            Some(normalize_year(&text))
        }
        _ => Some(TagValue::Text(String::from_utf8_lossy(payload).into_owned())),
    }
}
