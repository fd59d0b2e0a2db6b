//! Stem identities and the immutable set of media URLs a separation job yields.
//!
//! The five stems are fixed at compile time. Every fan-out in the playback
//! core walks [`Stem::ALL`] so cross-track operations are always issued in
//! the same order.

use crate::error::PlayerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of stems a separation job produces.
pub const STEM_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    /// Full mix; the only stem the user scrubs directly.
    Original,
    Bass,
    Drums,
    Other,
    Vocals,
}

impl Stem {
    pub const ALL: [Stem; STEM_COUNT] = [
        Stem::Original,
        Stem::Bass,
        Stem::Drums,
        Stem::Other,
        Stem::Vocals,
    ];

    pub const MASTER: Stem = Stem::Original;

    pub fn as_str(&self) -> &'static str {
        match self {
            Stem::Original => "original",
            Stem::Bass => "bass",
            Stem::Drums => "drums",
            Stem::Other => "other",
            Stem::Vocals => "vocals",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stem::Original => "Original Track",
            Stem::Bass => "Bass",
            Stem::Drums => "Drums",
            Stem::Other => "Other",
            Stem::Vocals => "Vocals",
        }
    }

    pub fn is_master(&self) -> bool {
        *self == Stem::MASTER
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stem {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(Stem::Original),
            "bass" => Ok(Stem::Bass),
            "drums" => Ok(Stem::Drums),
            "other" => Ok(Stem::Other),
            "vocals" => Ok(Stem::Vocals),
            other => Err(PlayerError::InvalidStemSet(format!("unknown stem '{other}'"))),
        }
    }
}

/// Resolved media URLs for one separation result. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StemSet {
    original: String,
    bass: String,
    drums: String,
    other: String,
    vocals: String,
}

impl StemSet {
    /// Build from a folder or URL prefix holding `<stem>.<extension>` files.
    pub fn from_base(base: &str, extension: &str) -> Self {
        let base = base.trim_end_matches('/');
        let extension = extension.trim_start_matches('.');
        let url = |stem: Stem| format!("{base}/{stem}.{extension}");

        Self {
            original: url(Stem::Original),
            bass: url(Stem::Bass),
            drums: url(Stem::Drums),
            other: url(Stem::Other),
            vocals: url(Stem::Vocals),
        }
    }

    /// Build from a stem-name → URL map. All five stems must be present and
    /// non-empty; unknown keys are logged and skipped.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, PlayerError> {
        let mut urls: [Option<String>; STEM_COUNT] = Default::default();

        for (key, url) in map {
            match key.parse::<Stem>() {
                Ok(stem) => {
                    if url.trim().is_empty() {
                        return Err(PlayerError::InvalidStemSet(format!("empty url for {stem}")));
                    }
                    urls[stem.index()] = Some(url.trim().to_string());
                }
                Err(_) => log::warn!("Ignoring unknown stem key '{key}'"),
            }
        }

        let mut take = |stem: Stem| {
            urls[stem.index()]
                .take()
                .ok_or_else(|| PlayerError::InvalidStemSet(format!("missing {stem}")))
        };

        Ok(Self {
            original: take(Stem::Original)?,
            bass: take(Stem::Bass)?,
            drums: take(Stem::Drums)?,
            other: take(Stem::Other)?,
            vocals: take(Stem::Vocals)?,
        })
    }

    /// Parse either a flat `{ "original": .., "bass": .. }` object or the
    /// backend's `{ "stem_urls": {..}, "status": 200 }` envelope.
    pub fn from_json(text: &str) -> Result<Self, PlayerError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PlayerError::InvalidStemSet(format!("invalid JSON: {e}")))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, PlayerError> {
        if let Some(status) = value.get("status").and_then(Value::as_u64)
            && status != 200
        {
            return Err(PlayerError::InvalidStemSet(format!(
                "separation job reported status {status}"
            )));
        }

        let urls = value.get("stem_urls").unwrap_or(value);
        let map: BTreeMap<String, String> = serde_json::from_value(urls.clone())
            .map_err(|e| PlayerError::InvalidStemSet(format!("expected stem url map: {e}")))?;

        Self::from_map(&map)
    }

    pub fn url(&self, stem: Stem) -> &str {
        match stem {
            Stem::Original => &self.original,
            Stem::Bass => &self.bass,
            Stem::Drums => &self.drums,
            Stem::Other => &self.other,
            Stem::Vocals => &self.vocals,
        }
    }

    /// Entries in fixed stem order.
    pub fn iter(&self) -> impl Iterator<Item = (Stem, &str)> {
        Stem::ALL.into_iter().map(move |stem| (stem, self.url(stem)))
    }

    pub fn len(&self) -> usize {
        STEM_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_order_is_fixed() {
        let names: Vec<&str> = Stem::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["original", "bass", "drums", "other", "vocals"]);
        assert_eq!(Stem::ALL.len(), STEM_COUNT);
    }

    #[test]
    fn test_only_original_is_master() {
        let masters: Vec<Stem> = Stem::ALL.into_iter().filter(Stem::is_master).collect();
        assert_eq!(masters, vec![Stem::Original]);
    }

    #[test]
    fn test_stem_parse() {
        assert_eq!("Vocals".parse::<Stem>().unwrap(), Stem::Vocals);
        assert_eq!(" drums ".parse::<Stem>().unwrap(), Stem::Drums);
        assert!("guitar".parse::<Stem>().is_err());
    }

    #[test]
    fn test_from_base_appends_file_names() {
        let set = StemSet::from_base("https://cdn.example.com/abc123/", "mp3");
        assert_eq!(set.url(Stem::Original), "https://cdn.example.com/abc123/original.mp3");
        assert_eq!(set.url(Stem::Vocals), "https://cdn.example.com/abc123/vocals.mp3");

        let set = StemSet::from_base("/tmp/job", ".ogg");
        assert_eq!(set.url(Stem::Bass), "/tmp/job/bass.ogg");
    }

    #[test]
    fn test_iter_follows_stem_order() {
        let set = StemSet::from_base("x", "mp3");
        let stems: Vec<Stem> = set.iter().map(|(s, _)| s).collect();
        assert_eq!(stems, Stem::ALL.to_vec());
    }

    #[test]
    fn test_from_json_flat() {
        let set = StemSet::from_json(
            r#"{"original":"a.mp3","bass":"b.mp3","drums":"d.mp3","other":"o.mp3","vocals":"v.mp3"}"#,
        )
        .unwrap();
        assert_eq!(set.url(Stem::Drums), "d.mp3");
        assert_eq!(set.url(Stem::Other), "o.mp3");
    }

    #[test]
    fn test_from_json_backend_envelope() {
        let set = StemSet::from_json(
            r#"{"stem_urls":{"bass":"b","drums":"d","vocals":"v","other":"o","original":"a"},"status":200}"#,
        )
        .unwrap();
        assert_eq!(set.url(Stem::Original), "a");
    }

    #[test]
    fn test_from_json_failed_status() {
        let err = StemSet::from_json(
            r#"{"stem_urls":{"bass":"b","drums":"d","vocals":"v","other":"o","original":"a"},"status":500}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_from_json_missing_stem() {
        let err = StemSet::from_json(r#"{"original":"a","bass":"b","drums":"d","other":"o"}"#)
            .unwrap_err();
        assert_eq!(err, PlayerError::InvalidStemSet("missing vocals".to_string()));
    }

    #[test]
    fn test_from_map_ignores_unknown_keys() {
        let mut map = BTreeMap::new();
        for stem in Stem::ALL {
            map.insert(stem.to_string(), format!("{stem}.mp3"));
        }
        map.insert("guitar".to_string(), "g.mp3".to_string());
        let set = StemSet::from_map(&map).unwrap();
        assert_eq!(set.url(Stem::Bass), "bass.mp3");
    }

    #[test]
    fn test_from_map_rejects_empty_url() {
        let mut map = BTreeMap::new();
        for stem in Stem::ALL {
            map.insert(stem.to_string(), String::new());
        }
        assert!(StemSet::from_map(&map).is_err());
    }
}
