//! ID3v2.2 / v2.3 / v2.4: header, optional extended header, frame loop,
//! text/picture frame decoding, and ID3v2.4 un-synchronisation.

use byteorder::{BigEndian, ByteOrder};

use crate::bytes::{base64_encode, bytes_to_int, bytes_to_string, TextEncoding};
use crate::error::TagError;
use crate::model::{normalize_track, normalize_year, Metadata, RequestedTags, TagKey, TagValue, TaggedFile};
use crate::reader::Reader;

const HEADER_SIZE: u64 = 10;

/// Parses an ID3v2.x tag whose 10-byte header starts at `tag_start`.
pub async fn extract(
    reader: &mut Reader<'_>,
    tag_start: u64,
    requested: &RequestedTags,
) -> Result<TaggedFile, TagError> {
    reader.load(tag_start, HEADER_SIZE).await?;
    let header = reader.read_n(HEADER_SIZE as usize);
    if header.len() < 10 || &header[0..3] != b"ID3" {
        return Err(TagError::FormatInvalid("missing ID3 header magic".into()));
    }
    let major = header[3];
    if !(2..=4).contains(&major) {
        return Err(TagError::UnsupportedVersion(format!(
            "ID3v2.{major} is not supported"
        )));
    }
    let flags = header[5];
    let tag_unsynch = flags & 0b1000_0000 != 0;
    let extended_or_compression = flags & 0b0100_0000 != 0;
    if major == 2 && extended_or_compression {
        return Err(TagError::UnsupportedVersion(
            "ID3v2.2 compression is not supported".into(),
        ));
    }
    let size = bytes_to_int(&header[6..10], 7, true);

    reader.load(tag_start + HEADER_SIZE, size).await?;
    if tag_unsynch {
        let len = reader.window().len();
        reader.unsynchronise(0, len);
    }

    if major >= 3 && extended_or_compression {
        skip_extended_header(reader, major);
    }

    let mut metadata = Metadata::new();
    loop {
        if metadata.is_satisfied(requested) || reader.finished() {
            break;
        }

        let id_len = if major == 2 { 3 } else { 4 };
        let header_len = if major == 2 { 6 } else { 10 };
        if reader.remaining() < header_len {
            break;
        }

        let frame_header = reader.read_n(header_len);
        if frame_header[..id_len].iter().all(|&b| b == 0) {
            break; // padding reached
        }
        let identifier = String::from_utf8_lossy(&frame_header[..id_len]).into_owned();

        let frame_size = if major == 2 {
            BigEndian::read_u24(&frame_header[3..6]) as usize
        } else if major == 4 {
            bytes_to_int(&frame_header[4..8], 7, true) as usize
        } else {
            BigEndian::read_u32(&frame_header[4..8]) as usize
        };
        let frame_flags = if major == 2 { 0 } else { BigEndian::read_u16(&frame_header[8..10]) };
        let frame_unsynch = major == 4 && frame_flags & 0x0002 != 0;

        if tag_unsynch && major == 4 && !frame_unsynch {
            return Err(TagError::Inconsistency(format!(
                "frame {identifier} lacks its per-frame unsynchronisation flag under a tag-level one"
            )));
        }

        let key = canonical_key(&identifier);
        let wanted = key.is_some_and(|k| requested.contains(&k));
        if !wanted {
            reader.skip_n(frame_size);
            continue;
        }

        let cursor = reader.window().cursor();
        let effective_len = if frame_unsynch && !tag_unsynch {
            reader.unsynchronise(cursor, frame_size)
        } else {
            frame_size
        };
        let payload = reader.read_n(effective_len);

        let key = key.unwrap();
        match key {
            TagKey::Artwork => {
                if let Some(value) = decode_picture_frame(&payload, major) {
                    metadata.store(requested, TagKey::Artwork, value);
                } else {
                    log::debug!(target: "audiotag::id3v2", "dropped unreadable picture frame {identifier}");
                }
            }
            TagKey::Track => {
                if let Some(text) = decode_text_frame(&payload) {
                    metadata.store(requested, TagKey::Track, normalize_track(&text));
                }
            }
            TagKey::Year => {
                if let Some(text) = decode_text_frame(&payload) {
                    metadata.store(requested, TagKey::Year, normalize_year(&text));
                }
            }
            other => {
                if let Some(text) = decode_text_frame(&payload) {
                    metadata.store(requested, other, TagValue::Text(text));
                }
            }
        }
    }

    Ok(TaggedFile {
        file_type: "mp3".into(),
        format: format!("ID3v2.{major}"),
        metadata: metadata.into_result(requested),
    })
}

fn skip_extended_header(reader: &mut Reader<'_>, major: u8) {
    if reader.remaining() < 4 {
        return;
    }
    let prefix = reader.read_n(4);
    let ext_len = if major == 4 {
        bytes_to_int(&prefix, 7, true) as usize
    } else {
        BigEndian::read_u32(&prefix) as usize
    };
    reader.skip_n(ext_len.saturating_sub(4));
}

fn canonical_key(identifier: &str) -> Option<TagKey> {
    match identifier {
        "TAL" | "TALB" => Some(TagKey::Album),
        "TP1" | "TPE1" => Some(TagKey::Artist),
        "TT2" | "TIT2" => Some(TagKey::Name),
        "TRK" | "TRCK" => Some(TagKey::Track),
        "TYE" | "TYER" | "TDRC" => Some(TagKey::Year),
        "PIC" | "APIC" => Some(TagKey::Artwork),
        _ => None,
    }
}

fn decode_text_frame(payload: &[u8]) -> Option<String> {
    let (&encoding_byte, rest) = payload.split_first()?;
    let encoding = TextEncoding::from_byte(encoding_byte).ok()?;
    bytes_to_string(rest, encoding).ok()
}

fn decode_picture_frame(payload: &[u8], major: u8) -> Option<TagValue> {
    let (&encoding_byte, rest) = payload.split_first()?;
    let encoding = TextEncoding::from_byte(encoding_byte).ok()?;

    let (mime, rest) = if major == 2 {
        if rest.len() < 3 {
            return None;
        }
        let (mime_bytes, rest) = rest.split_at(3);
        let mime = match mime_bytes {
            b"PNG" => "image/png",
            b"JPG" => "image/jpeg",
            _ => return None,
        };
        (mime.to_string(), rest)
    } else {
        let nul = rest.iter().position(|&b| b == 0)?;
        let mime = bytes_to_string(&rest[..nul], TextEncoding::Latin1).ok()?;
        (mime, &rest[nul + 1..])
    };

    let (&picture_type, rest) = rest.split_first()?;
    if picture_type != 0 && picture_type != 3 {
        return None;
    }

    let desc_end = description_terminator_len(rest, encoding);
    let data = rest.get(desc_end..)?;

    Some(TagValue::Text(format!(
        "data:{mime};base64,{}",
        base64_encode(data)
    )))
}

/// Length of the NUL-terminated description prefix, including the
/// terminator, under `encoding`.
fn description_terminator_len(bytes: &[u8], encoding: TextEncoding) -> usize {
    match encoding {
        TextEncoding::Utf16Bom | TextEncoding::Utf16Be => {
            let mut i = 0;
            while i + 1 < bytes.len() {
                if bytes[i] == 0 && bytes[i + 1] == 0 {
                    return i + 2;
                }
                i += 2;
            }
            bytes.len()
        }
        _ => bytes
            .iter()
            .position(|&b| b == 0)
            .map(|p| p + 1)
            .unwrap_or(bytes.len()),
    }
}
