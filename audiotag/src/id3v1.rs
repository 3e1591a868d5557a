//! ID3v1 and ID3v1.1: the fixed 128-byte trailer at the end of an MP3 file.

use crate::bytes::{bytes_to_string, TextEncoding};
use crate::error::TagError;
use crate::model::{normalize_year, Metadata, RequestedTags, TagKey, TagValue, TaggedFile};
use crate::reader::Reader;

pub const TRAILER_SIZE: u64 = 128;

/// Parses the trailer, assuming it starts at `file_size - TRAILER_SIZE`.
/// Performs the single window load itself.
pub async fn extract(
    reader: &mut Reader<'_>,
    file_size: u64,
    requested: &RequestedTags,
) -> Result<TaggedFile, TagError> {
    if file_size < TRAILER_SIZE {
        return Err(TagError::FormatInvalid(
            "file is smaller than an ID3v1 trailer".into(),
        ));
    }
    reader.load(file_size - TRAILER_SIZE, TRAILER_SIZE).await?;

    let tag = reader.read_n(3);
    if tag != b"TAG" {
        return Err(TagError::FormatInvalid("not an ID3v1 tag".into()));
    }

    let title = latin1_field(reader, 30)?;
    let artist = latin1_field(reader, 30)?;
    let album = latin1_field(reader, 30)?;
    let year = latin1_field(reader, 4)?;
    let comment = reader.read_n(30);
    let _genre = reader.read_n(1);

    let is_v11 = comment.len() == 30 && comment[28] == 0 && comment[29] != 0;
    let track = is_v11.then(|| comment[29] as u64);

    let mut metadata = Metadata::new();
    if !title.is_empty() {
        metadata.store(requested, TagKey::Name, TagValue::Text(title));
    }
    if !artist.is_empty() {
        metadata.store(requested, TagKey::Artist, TagValue::Text(artist));
    }
    if !album.is_empty() {
        metadata.store(requested, TagKey::Album, TagValue::Text(album));
    }
    if !year.is_empty() {
        metadata.store(requested, TagKey::Year, normalize_year(&year));
    }
    if let Some(track) = track {
        metadata.store(requested, TagKey::Track, TagValue::Integer(track));
    }

    Ok(TaggedFile {
        file_type: "mp3".into(),
        format: if is_v11 { "ID3v1.1" } else { "ID3v1" }.into(),
        metadata: metadata.into_result(requested),
    })
}

fn latin1_field(reader: &mut Reader<'_>, len: usize) -> Result<String, TagError> {
    let bytes = reader.read_n(len);
    bytes_to_string(&bytes, TextEncoding::Latin1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryProvider;

    fn trailer(title: &str, artist: &str, album: &str, year: &str, track: Option<u8>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(b"TAG");
        buf.extend(pad(title, 30));
        buf.extend(pad(artist, 30));
        buf.extend(pad(album, 30));
        buf.extend(pad(year, 4));
        let mut comment = pad("", 30);
        if let Some(track) = track {
            comment[28] = 0;
            comment[29] = track;
        }
        buf.extend(comment);
        buf.push(0); // genre
        buf
    }

    fn pad(s: &str, len: usize) -> Vec<u8> {
        let mut bytes = s.as_bytes().to_vec();
        bytes.resize(len, 0);
        bytes
    }

    #[tokio::test]
    async fn parses_v11_trailer_with_track_number() {
        let trailer = trailer("Silence", "Nothing", "Void", "2024", Some(1));
        let provider = InMemoryProvider::new().with_file("song.mp3", trailer.clone());
        let mut reader = Reader::new(&provider, "song.mp3");
        let requested: RequestedTags = TagKey::ALL.into_iter().collect();

        let result = extract(&mut reader, trailer.len() as u64, &requested)
            .await
            .unwrap();

        assert_eq!(result.file_type, "mp3");
        assert_eq!(result.format, "ID3v1.1");
        assert_eq!(
            result.metadata[&TagKey::Name],
            Some(TagValue::Text("Silence".into()))
        );
        assert_eq!(
            result.metadata[&TagKey::Track],
            Some(TagValue::Integer(1))
        );
        assert_eq!(
            result.metadata[&TagKey::Year],
            Some(TagValue::Integer(2024))
        );
    }

    #[tokio::test]
    async fn v1_without_track_pair_omits_track() {
        let trailer = trailer("Title", "Artist", "Album", "1999", None);
        let provider = InMemoryProvider::new().with_file("song.mp3", trailer.clone());
        let mut reader = Reader::new(&provider, "song.mp3");
        let requested: RequestedTags = [TagKey::Track].into_iter().collect();

        let result = extract(&mut reader, trailer.len() as u64, &requested)
            .await
            .unwrap();
        assert_eq!(result.format, "ID3v1");
        assert_eq!(result.metadata[&TagKey::Track], None);
    }

    #[tokio::test]
    async fn blank_title_is_absent_not_an_empty_string() {
        let trailer = trailer("", "Artist", "Album", "1999", None);
        let provider = InMemoryProvider::new().with_file("song.mp3", trailer.clone());
        let mut reader = Reader::new(&provider, "song.mp3");
        let requested: RequestedTags = [TagKey::Name].into_iter().collect();

        let result = extract(&mut reader, trailer.len() as u64, &requested)
            .await
            .unwrap();
        assert_eq!(result.metadata[&TagKey::Name], None);
    }

    #[tokio::test]
    async fn missing_tag_literal_is_format_invalid() {
        let mut bytes = trailer("A", "B", "C", "2000", None);
        bytes[0] = b'X';
        let provider = InMemoryProvider::new().with_file("song.mp3", bytes.clone());
        let mut reader = Reader::new(&provider, "song.mp3");
        let requested: RequestedTags = TagKey::ALL.into_iter().collect();

        let err = extract(&mut reader, bytes.len() as u64, &requested)
            .await
            .unwrap_err();
        assert!(matches!(err, TagError::FormatInvalid(_)));
    }
}
