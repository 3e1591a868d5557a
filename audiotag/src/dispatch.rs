//! Picks a parser by filename extension, and for `mp3` locates the ID3v2 tag
//! by probing a handful of bytes at the start and end of the file.

use crate::bytes::bytes_to_int;
use crate::error::TagError;
use crate::model::{RequestedTags, TaggedFile};
use crate::reader::Reader;
use crate::{flac, id3v1, id3v2, mp4};

const TAIL_PROBE_LEN: u64 = 138;

/// Dispatches `extract` based on the final extension of `reader`'s URI.
pub async fn dispatch(
    reader: &mut Reader<'_>,
    requested: &RequestedTags,
) -> Result<TaggedFile, TagError> {
    let extension = final_extension(reader.uri());
    let file_size = reader.stat().await?.size;
    log::debug!(
        target: "audiotag::dispatch",
        "dispatching {} ({file_size} bytes) by extension {extension:?}",
        reader.uri()
    );

    match extension.as_deref() {
        Some("flac") => flac::extract(reader, requested).await,
        Some("mp3") => dispatch_mp3(reader, file_size, requested).await,
        Some("m4a") => mp4::extract(reader, file_size, "m4a", requested).await,
        Some("mp4") => mp4::extract(reader, file_size, "mp4", requested).await,
        _ => Err(TagError::UnsupportedFile(reader.uri().to_string())),
    }
}

fn final_extension(uri: &str) -> Option<String> {
    uri.rsplit('.').next().map(|ext| ext.to_ascii_lowercase())
}

async fn dispatch_mp3(
    reader: &mut Reader<'_>,
    file_size: u64,
    requested: &RequestedTags,
) -> Result<TaggedFile, TagError> {
    reader.load(0, 3).await?;
    if reader.read_n(3) == b"ID3" {
        return id3v2::extract(reader, 0, requested).await;
    }

    match locate_tail_id3v2(reader, file_size).await? {
        Some(tag_start) => id3v2::extract(reader, tag_start, requested).await,
        None => id3v1::extract(reader, file_size, requested).await,
    }
}

/// Probes the last [`TAIL_PROBE_LEN`] bytes for an ID3v2.4 footer, either at
/// the very end of the file or just before an ID3v1 trailer. Returns the
/// offset of the *header* of that tag (parsed the normal way), if found.
async fn locate_tail_id3v2(
    reader: &mut Reader<'_>,
    file_size: u64,
) -> Result<Option<u64>, TagError> {
    let probe_len = TAIL_PROBE_LEN.min(file_size);
    let probe_start = file_size - probe_len;
    reader.load(probe_start, probe_len).await?;
    let tail = reader.read_n(probe_len as usize);

    let precedes_id3v1 = tail.get(0..3) == Some(b"3DI");
    let at_file_end = !precedes_id3v1 && tail.get(128..131) == Some(b"3DI");

    if !precedes_id3v1 && !at_file_end {
        return Ok(None);
    }

    let footer_offset_in_tail = if precedes_id3v1 { 0 } else { 128 };
    let size_bytes = tail
        .get(footer_offset_in_tail + 6..footer_offset_in_tail + 10)
        .ok_or_else(|| TagError::FormatInvalid("truncated ID3v2 footer".into()))?;
    let size = bytes_to_int(size_bytes, 7, true);

    let trailer = if precedes_id3v1 { 128 } else { 0 };
    let tag_start = file_size
        .checked_sub(20 + size + trailer)
        .ok_or_else(|| TagError::FormatInvalid("ID3v2 footer size exceeds file length".into()))?;
    log::trace!(
        target: "audiotag::dispatch",
        "found ID3v2.4 footer ({}), tag starts at byte {tag_start}",
        if precedes_id3v1 { "precedes ID3v1 trailer" } else { "at file end" }
    );
    Ok(Some(tag_start))
}
