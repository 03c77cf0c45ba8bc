//! Static per-track metadata.
//!
//! The registry is embedded at compile time from `data/tracks.json` and is
//! read-only for the lifetime of the page. It answers two questions: is a
//! slug a known track (for the URL codec) and which file patterns locate a
//! track's versions, stubs and tests (for the fetchers).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static BUILTIN: Lazy<TrackRegistry> = Lazy::new(|| {
    TrackRegistry::from_json(include_str!("data/tracks.json")).unwrap_or_else(|err| {
        log::warn!("Embedded track list is invalid: {}", err);
        TrackRegistry::default()
    })
});

/// Exercises a track opted out of reporting for a specific check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unactionable {
    #[serde(default)]
    pub versioning: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackData {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub core_enabled: bool,
    /// Path pattern of the file holding an exercise's version
    #[serde(default)]
    pub versioning: Option<String>,
    /// Path pattern of an exercise's stub file
    #[serde(default)]
    pub stub_file: Option<String>,
    /// Path pattern of an exercise's test file
    #[serde(default)]
    pub test_file: Option<String>,
    #[serde(default)]
    pub unactionable: Unactionable,
}

impl TrackData {
    /// A track with nothing but a slug and name configured.
    pub fn bare(slug: &str, name: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            core_enabled: false,
            versioning: None,
            stub_file: None,
            test_file: None,
            unactionable: Unactionable::default(),
        }
    }

    pub fn is_versioning_actionable(&self, exercise: &str) -> bool {
        !self.unactionable.versioning.iter().any(|slug| slug == exercise)
    }

    pub fn is_topics_actionable(&self, exercise: &str) -> bool {
        !self.unactionable.topics.iter().any(|slug| slug == exercise)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRegistry {
    tracks: Vec<TrackData>,
}

impl TrackRegistry {
    pub fn new(tracks: Vec<TrackData>) -> Self {
        Self { tracks }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    /// The registry compiled into the binary.
    pub fn builtin() -> &'static TrackRegistry {
        &BUILTIN
    }

    pub fn get(&self, slug: &str) -> Option<&TrackData> {
        self.tracks.iter().find(|track| track.slug == slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackData> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_loads_embedded_tracks() {
        let registry = TrackRegistry::builtin();
        assert!(!registry.is_empty());
        assert!(registry.contains("ruby"));
        assert!(!registry.contains("cobol-on-wheels"));

        let ruby = registry.get("ruby").unwrap();
        assert_eq!(ruby.stub_file.as_deref(), Some("exercises/{slug}/{slug_}.rb"));
        assert!(!ruby.is_topics_actionable("hello-world"));
        assert!(ruby.is_versioning_actionable("hello-world"));
    }

    #[test]
    fn optional_fields_default_when_missing() {
        let registry =
            TrackRegistry::from_json(r#"[{ "slug": "demo", "name": "Demo" }]"#).unwrap();
        let demo = registry.get("demo").unwrap();
        assert_eq!(demo, &TrackData::bare("demo", "Demo"));
    }
}
