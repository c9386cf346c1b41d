//! Embedded tag extraction: title, artist, declared BPM and declared key.

pub mod key;

use std::sync::Arc;

use symphonia::core::meta::{MetadataRevision, StandardTagKey, Value};

use crate::audio::decode::probe;
use crate::error::AnalysisError;
pub use key::MusicalKey;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

const BPM_TAGS: [&str; 3] = ["BPM", "TBPM", "TMPO"];
const BPM_CUSTOM_TAGS: [&str; 1] = ["fBPM"];
const KEY_TAGS: [&str; 3] = ["KEY", "TKEY", "INITIALKEY"];
const KEY_CUSTOM_TAGS: [&str; 2] = ["INITIAL KEY", "INITIAL_KEY"];

/// A tag value as it arrives from the container.
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    Text(String),
    Number(f64),
    /// User-defined frame (ID3 `TXXX`, MP4 freeform atom).
    Custom { description: String, data: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawTag {
    pub name: String,
    pub value: TagValue,
}

/// Every tag found in a file, in container order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub entries: Vec<RawTag>,
}

impl RawTags {
    pub fn push_text(&mut self, name: &str, text: &str) {
        self.entries.push(RawTag {
            name: name.to_string(),
            value: TagValue::Text(text.to_string()),
        });
    }

    pub fn push_custom(&mut self, description: &str, data: &str) {
        self.entries.push(RawTag {
            name: "TXXX".to_string(),
            value: TagValue::Custom {
                description: description.to_string(),
                data: data.to_string(),
            },
        });
    }

    /// First standard entry matching `names`, tried in priority order.
    fn standard(&self, names: &[&str]) -> Option<&TagValue> {
        names.iter().find_map(|wanted| {
            self.entries
                .iter()
                .filter(|t| !matches!(t.value, TagValue::Custom { .. }))
                .find(|t| t.name.eq_ignore_ascii_case(wanted))
                .map(|t| &t.value)
        })
    }

    /// First user-defined entry whose description matches `descriptions`.
    fn custom(&self, descriptions: &[&str]) -> Option<&TagValue> {
        descriptions.iter().find_map(|wanted| {
            self.entries
                .iter()
                .find(|t| match &t.value {
                    TagValue::Custom { description, .. } => description.eq_ignore_ascii_case(wanted),
                    _ => false,
                })
                .map(|t| &t.value)
        })
    }
}

/// Values recovered from tags; each is `None` when absent or invalid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<MusicalKey>,
}

impl TrackTags {
    pub fn title_or_default(&self) -> String {
        self.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    pub fn artist_or_default(&self) -> String {
        self.artist.clone().unwrap_or_else(|| UNKNOWN_ARTIST.to_string())
    }
}

/// Probe the container and collect its tags. An unreadable container is
/// the only hard failure.
pub fn read_tags(bytes: Arc<[u8]>, extension: Option<&str>) -> Result<RawTags, AnalysisError> {
    let mut probed = probe(bytes, extension).map_err(|e| AnalysisError::Metadata(e.to_string()))?;

    let mut tags = RawTags::default();
    if let Some(metadata) = probed.metadata.get() {
        if let Some(revision) = metadata.current() {
            collect_revision(revision, &mut tags);
        }
    }
    if let Some(revision) = probed.format.metadata().current() {
        collect_revision(revision, &mut tags);
    }

    log::debug!("Read {} tag entries", tags.entries.len());
    Ok(tags)
}

fn collect_revision(revision: &MetadataRevision, tags: &mut RawTags) {
    for tag in revision.tags() {
        match tag.std_key {
            Some(StandardTagKey::TrackTitle) => {
                if tags.title.is_none() {
                    tags.title = non_empty(&tag.value.to_string());
                }
                continue;
            }
            Some(StandardTagKey::Artist) => {
                if tags.artist.is_none() {
                    tags.artist = non_empty(&tag.value.to_string());
                }
                continue;
            }
            _ => {}
        }

        if let Some(description) = custom_description(&tag.key) {
            tags.push_custom(description, &tag.value.to_string());
            continue;
        }

        let value = match &tag.value {
            Value::String(s) => TagValue::Text(s.clone()),
            Value::Float(f) => TagValue::Number(*f),
            Value::SignedInt(i) => TagValue::Number(*i as f64),
            Value::UnsignedInt(u) => TagValue::Number(*u as f64),
            _ => continue,
        };

        let name = if tag.std_key == Some(StandardTagKey::Bpm) {
            "BPM".to_string()
        } else {
            tag.key.clone()
        };
        tags.entries.push(RawTag { name, value });
    }
}

/// Description of a user-defined tag key: `TXXX:desc` or `----:mean:desc`.
fn custom_description(key: &str) -> Option<&str> {
    if let Some(desc) = key.strip_prefix("TXXX:") {
        return Some(desc);
    }
    if key.starts_with("----:") {
        return key.rsplit(':').next();
    }
    None
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Resolve title, artist, BPM and key from raw tags.
pub fn extract(raw: &RawTags) -> TrackTags {
    let bpm = raw
        .standard(&BPM_TAGS)
        .or_else(|| raw.custom(&BPM_CUSTOM_TAGS))
        .and_then(coerce_bpm);

    let key = raw
        .standard(&KEY_TAGS)
        .or_else(|| raw.custom(&KEY_CUSTOM_TAGS))
        .and_then(coerce_key);

    TrackTags {
        title: raw.title.clone(),
        artist: raw.artist.clone(),
        bpm,
        key,
    }
}

fn coerce_bpm(value: &TagValue) -> Option<f64> {
    let bpm = match value {
        TagValue::Number(n) => *n,
        TagValue::Text(s) | TagValue::Custom { data: s, .. } => s.trim().parse::<f64>().ok()?,
    };
    if bpm.is_finite() && bpm > 0.0 {
        Some(bpm)
    } else {
        log::warn!("Ignoring invalid BPM tag value: {}", bpm);
        None
    }
}

fn coerce_key(value: &TagValue) -> Option<MusicalKey> {
    let raw = match value {
        TagValue::Number(n) => n.to_string(),
        TagValue::Text(s) | TagValue::Custom { data: s, .. } => s.trim().to_string(),
    };
    let key = MusicalKey::parse(&raw);
    if key.is_none() {
        log::warn!("Unrecognized key notation in tags: {:?}", raw);
    }
    key
}

/// ID3v2.4 frame payloads for building tagged test files.
#[cfg(test)]
pub(crate) enum Id3Frame<'a> {
    Text(&'a str, &'a str),
    UserText(&'a str, &'a str),
}

/// Prefix `body` with an ID3v2.4 tag holding UTF-8 frames.
#[cfg(test)]
pub(crate) fn id3v2_tagged(frames: &[Id3Frame], body: &[u8]) -> Vec<u8> {
    fn synchsafe(n: usize) -> [u8; 4] {
        [
            ((n >> 21) & 0x7f) as u8,
            ((n >> 14) & 0x7f) as u8,
            ((n >> 7) & 0x7f) as u8,
            (n & 0x7f) as u8,
        ]
    }

    let mut tag = Vec::new();
    for frame in frames {
        let (id, mut payload) = match frame {
            Id3Frame::Text(id, text) => (*id, text.as_bytes().to_vec()),
            Id3Frame::UserText(description, text) => {
                let mut payload = description.as_bytes().to_vec();
                payload.push(0);
                payload.extend_from_slice(text.as_bytes());
                ("TXXX", payload)
            }
        };
        payload.insert(0, 3); // UTF-8
        tag.extend_from_slice(id.as_bytes());
        tag.extend_from_slice(&synchsafe(payload.len()));
        tag.extend_from_slice(&[0, 0]);
        tag.extend_from_slice(&payload);
    }

    let mut out = Vec::with_capacity(10 + tag.len() + body.len());
    out.extend_from_slice(b"ID3");
    out.extend_from_slice(&[4, 0, 0]);
    out.extend_from_slice(&synchsafe(tag.len()));
    out.extend_from_slice(&tag);
    out.extend_from_slice(body);
    out
}
