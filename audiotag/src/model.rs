//! The tag data model: the closed key enumeration, tag values, the
//! requested-tag set, and the result record every parser converges on.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Closed enumeration of every tag this crate knows how to extract. Every
/// parser maps its native frame/field identifier onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKey {
    Album,
    AlbumArtist,
    Artist,
    Artwork,
    Name,
    Track,
    Year,
}

impl TagKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKey::Album => "album",
            TagKey::AlbumArtist => "albumArtist",
            TagKey::Artist => "artist",
            TagKey::Artwork => "artwork",
            TagKey::Name => "name",
            TagKey::Track => "track",
            TagKey::Year => "year",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "album" => Some(TagKey::Album),
            "albumArtist" => Some(TagKey::AlbumArtist),
            "artist" => Some(TagKey::Artist),
            "artwork" => Some(TagKey::Artwork),
            "name" => Some(TagKey::Name),
            "track" => Some(TagKey::Track),
            "year" => Some(TagKey::Year),
            _ => None,
        }
    }

    pub const ALL: [TagKey; 7] = [
        TagKey::Album,
        TagKey::AlbumArtist,
        TagKey::Artist,
        TagKey::Artwork,
        TagKey::Name,
        TagKey::Track,
        TagKey::Year,
    ];
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-negative integer (`track`, `year`) or a UTF-8 string (everything
/// else, plus `artwork` as a `data:<mime>;base64,<payload>` URI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Text(String),
    Integer(u64),
}

/// An ordered, duplicate-free set of requested tag keys.
pub type RequestedTags = BTreeSet<TagKey>;

/// `track` is the numerator before any `/` separator.
pub fn normalize_track(raw: &str) -> TagValue {
    let numerator = raw.split('/').next().unwrap_or(raw).trim();
    match numerator.parse::<u64>() {
        Ok(n) => TagValue::Integer(n),
        Err(_) => TagValue::Text(raw.to_string()),
    }
}

/// `year` is the first four decimal digits found in the raw string.
pub fn normalize_year(raw: &str) -> TagValue {
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(4).collect();
    if digits.len() == 4 {
        if let Ok(n) = digits.parse::<u64>() {
            return TagValue::Integer(n);
        }
    }
    TagValue::Text(raw.to_string())
}

/// Accumulates tag values while a parser walks a container, enforcing
/// first-occurrence-wins and the requested-tag filter.
#[derive(Debug, Clone, Default)]
pub struct Metadata(BTreeMap<TagKey, TagValue>);

impl Metadata {
    pub fn new() -> Self {
        Metadata(BTreeMap::new())
    }

    /// Records `value` under `key`, unless `key` was not requested or a
    /// value was already stored for it.
    pub fn store(&mut self, requested: &RequestedTags, key: TagKey, value: TagValue) {
        if !requested.contains(&key) {
            return;
        }
        self.0.entry(key).or_insert(value);
    }

    /// True once every requested key has a stored value: the early-exit
    /// condition every parser checks after each store.
    pub fn is_satisfied(&self, requested: &RequestedTags) -> bool {
        requested.iter().all(|key| self.0.contains_key(key))
    }

    /// Produces the final map: every requested key present, `None` where no
    /// value was ever stored for it.
    pub fn into_result(self, requested: &RequestedTags) -> BTreeMap<TagKey, Option<TagValue>> {
        requested
            .iter()
            .map(|&key| (key, self.0.get(&key).cloned()))
            .collect()
    }
}

/// The uniform result record every container parser converges on.
#[derive(Debug, Clone)]
pub struct TaggedFile {
    pub file_type: String,
    pub format: String,
    pub metadata: BTreeMap<TagKey, Option<TagValue>>,
}
