//! FLAC metadata blocks: the `fLaC` magic, the Vorbis comment block, and the
//! PICTURE block.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::bytes::{base64_encode, bytes_to_string, TextEncoding};
use crate::error::TagError;
use crate::model::{normalize_track, normalize_year, Metadata, RequestedTags, TagKey, TagValue, TaggedFile};
use crate::reader::Reader;

const MAGIC: &[u8] = b"fLaC";
const VORBIS_COMMENT: u8 = 4;
const PICTURE: u8 = 6;

/// Parses a FLAC stream starting at the beginning of the file.
pub async fn extract(reader: &mut Reader<'_>, requested: &RequestedTags) -> Result<TaggedFile, TagError> {
    reader.load(0, 4).await?;
    if reader.read_n(4) != MAGIC {
        return Err(TagError::FormatInvalid("missing fLaC magic".into()));
    }

    let mut offset: u64 = 4;
    let mut metadata = Metadata::new();

    loop {
        if metadata.is_satisfied(requested) {
            break;
        }

        reader.load(offset, 4).await?;
        let header = reader.read_n(4);
        if header.len() < 4 {
            break;
        }
        let is_last = header[0] & 0b1000_0000 != 0;
        let block_type = header[0] & 0b0111_1111;
        let block_len = BigEndian::read_u24(&header[1..4]) as u64;

        reader.load(offset + 4, block_len).await?;
        let body = reader.read_n(block_len as usize);

        match block_type {
            VORBIS_COMMENT => parse_vorbis_comment(&body, requested, &mut metadata),
            PICTURE => {
                if let Some(value) = parse_picture(&body) {
                    metadata.store(requested, TagKey::Artwork, value);
                }
            }
            _ => {}
        }

        offset += 4 + block_len;
        if is_last {
            break;
        }
    }

    Ok(TaggedFile {
        file_type: "flac".into(),
        format: "FLAC".into(),
        metadata: metadata.into_result(requested),
    })
}

fn parse_vorbis_comment(body: &[u8], requested: &RequestedTags, metadata: &mut Metadata) {
    let mut cursor = 0usize;
    let read_u32 = |body: &[u8], at: usize| -> Option<u32> {
        body.get(at..at + 4).map(LittleEndian::read_u32)
    };

    let vendor_len = match read_u32(body, cursor) {
        Some(v) => v as usize,
        None => return,
    };
    cursor += 4 + vendor_len;

    let count = match read_u32(body, cursor) {
        Some(v) => v,
        None => return,
    };
    cursor += 4;

    for _ in 0..count {
        if metadata.is_satisfied(requested) {
            return;
        }
        let len = match read_u32(body, cursor) {
            Some(v) => v as usize,
            None => return,
        };
        cursor += 4;
        let entry = match body.get(cursor..cursor + len) {
            Some(bytes) => bytes,
            None => return,
        };
        cursor += len;

        let text = String::from_utf8_lossy(entry);
        if let Some((field, value)) = text.split_once('=') {
            if let Some(key) = canonical_field(field) {
                let value = match key {
                    TagKey::Track => normalize_track(value),
                    TagKey::Year => normalize_year(value),
                    _ => TagValue::Text(value.to_string()),
                };
                metadata.store(requested, key, value);
            }
        }
    }
}

fn canonical_field(field: &str) -> Option<TagKey> {
    match field.to_ascii_uppercase().as_str() {
        "ALBUM" => Some(TagKey::Album),
        "ARTIST" => Some(TagKey::Artist),
        "ALBUMARTIST" => Some(TagKey::AlbumArtist),
        "TITLE" => Some(TagKey::Name),
        "TRACKNUMBER" => Some(TagKey::Track),
        "DATE" | "ORIGINALDATE" | "ORIGINALYEAR" => Some(TagKey::Year),
        _ => None,
    }
}

fn parse_picture(body: &[u8]) -> Option<TagValue> {
    let picture_type = body.get(0..4).map(BigEndian::read_u32)?;
    if picture_type != 0 && picture_type != 3 {
        return None;
    }

    let mime_len = body.get(4..8).map(BigEndian::read_u32)? as usize;
    let mime_start = 8;
    let mime_end = mime_start + mime_len;
    let mime = bytes_to_string(body.get(mime_start..mime_end)?, TextEncoding::Latin1).ok()?;

    let desc_len = body.get(mime_end..mime_end + 4).map(BigEndian::read_u32)? as usize;
    let after_desc = mime_end + 4 + desc_len;

    // 16 bytes of width/height/depth/indexed-colour-count, ignored.
    let picture_len_at = after_desc + 16;
    let picture_len = body.get(picture_len_at..picture_len_at + 4).map(BigEndian::read_u32)? as usize;
    let data_start = picture_len_at + 4;
    let data = body.get(data_start..data_start + picture_len)?;

    Some(TagValue::Text(format!(
        "data:{mime};base64,{}",
        base64_encode(data)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryProvider;

    fn vorbis_comment_block(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        let vendor = b"audiotag";
        body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        body.extend_from_slice(vendor);
        body.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (k, v) in entries {
            let entry = format!("{k}={v}");
            body.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            body.extend_from_slice(entry.as_bytes());
        }
        block(VORBIS_COMMENT, &body, false)
    }

    fn picture_block(picture_type: u32, mime: &str, data: &[u8], is_last: bool) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&picture_type.to_be_bytes());
        body.extend_from_slice(&(mime.len() as u32).to_be_bytes());
        body.extend_from_slice(mime.as_bytes());
        body.extend_from_slice(&0u32.to_be_bytes()); // description length
        body.extend_from_slice(&[0u8; 16]); // width/height/depth/colours
        body.extend_from_slice(&(data.len() as u32).to_be_bytes());
        body.extend_from_slice(data);
        block(PICTURE, &body, is_last)
    }

    fn block(block_type: u8, body: &[u8], is_last: bool) -> Vec<u8> {
        let mut out = Vec::new();
        let flag = if is_last { 0x80 } else { 0x00 };
        out.push(flag | block_type);
        let len = body.len() as u32;
        out.extend_from_slice(&len.to_be_bytes()[1..4]);
        out.extend_from_slice(body);
        out
    }

    fn flac_file(blocks: &[u8]) -> Vec<u8> {
        let mut file = MAGIC.to_vec();
        file.extend_from_slice(blocks);
        file
    }

    #[tokio::test]
    async fn parses_comment_and_cover_picture() {
        let mut blocks = vorbis_comment_block(&[
            ("ALBUM", "Void"),
            ("ARTIST", "Nothing"),
            ("ARTIST", "Ignored Second Artist"),
            ("TITLE", "Silence"),
            ("TRACKNUMBER", "1"),
            ("DATE", "2024-01-01"),
        ]);
        blocks.extend(picture_block(3, "image/png", b"\x89PNG...", true));
        let file = flac_file(&blocks);

        let provider = InMemoryProvider::new().with_file("song.flac", file);
        let mut reader = Reader::new(&provider, "song.flac");
        let requested: RequestedTags = TagKey::ALL.into_iter().collect();

        let result = extract(&mut reader, &requested).await.unwrap();
        assert_eq!(result.format, "FLAC");
        assert_eq!(result.metadata[&TagKey::Album], Some(TagValue::Text("Void".into())));
        assert_eq!(
            result.metadata[&TagKey::Artist],
            Some(TagValue::Text("Nothing".into()))
        );
        assert_eq!(result.metadata[&TagKey::Track], Some(TagValue::Integer(1)));
        assert_eq!(result.metadata[&TagKey::Year], Some(TagValue::Integer(2024)));
        let artwork = result.metadata[&TagKey::Artwork].clone().unwrap();
        match artwork {
            TagValue::Text(uri) => assert!(uri.starts_with("data:image/png;base64,")),
            _ => panic!("expected text artwork uri"),
        }
    }

    #[tokio::test]
    async fn non_cover_picture_type_is_skipped() {
        let mut blocks = vorbis_comment_block(&[("TITLE", "Silence")]);
        blocks.extend(picture_block(1, "image/png", b"icon", true));
        let file = flac_file(&blocks);

        let provider = InMemoryProvider::new().with_file("song.flac", file);
        let mut reader = Reader::new(&provider, "song.flac");
        let requested: RequestedTags = [TagKey::Artwork].into_iter().collect();

        let result = extract(&mut reader, &requested).await.unwrap();
        assert_eq!(result.metadata[&TagKey::Artwork], None);
    }

    #[tokio::test]
    async fn missing_magic_is_format_invalid() {
        let provider = InMemoryProvider::new().with_file("song.flac", b"OggS".to_vec());
        let mut reader = Reader::new(&provider, "song.flac");
        let requested: RequestedTags = TagKey::ALL.into_iter().collect();

        let err = extract(&mut reader, &requested).await.unwrap_err();
        assert!(matches!(err, TagError::FormatInvalid(_)));
    }
}
