//! Response parsers for every remote document the dashboard reads.

use crate::error::FetchError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// `version: 1.2.0`, `Version 1.2.0`, `vsn: "1.2.0"`, `version = "1.2.0"`, `@ v1.2.0`
static VERSION_SCAN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:V|v|vsn)(?:ersion:?)?(?:\s*?| | = "|: "|, ")([0-9]+\.[0-9]+\.[0-9]+)"#).unwrap()
});
static CANONICAL_VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"version: ?([0-9]+\.[0-9]+\.[0-9]+)").unwrap());

/// Per-exercise entry of a track's `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    pub slug: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub core: bool,
    #[serde(default)]
    pub unlocked_by: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u32>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub auto_approve: bool,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub foregone: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl ExerciseConfig {
    pub fn is_deprecated(&self) -> bool {
        self.deprecated || self.status.as_deref() == Some("deprecated")
    }

    pub fn has_topics(&self) -> bool {
        self.topics.as_ref().is_some_and(|topics| !topics.is_empty())
    }
}

/// Legacy configs list exercises flat; newer ones split them by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exercises {
    Flat(Vec<ExerciseConfig>),
    Split {
        #[serde(default)]
        concept: Vec<ExerciseConfig>,
        #[serde(default)]
        practice: Vec<ExerciseConfig>,
    },
}

impl Default for Exercises {
    fn default() -> Self {
        Exercises::Flat(Vec::new())
    }
}

impl Exercises {
    pub fn all(&self) -> Vec<&ExerciseConfig> {
        match self {
            Exercises::Flat(exercises) => exercises.iter().collect(),
            Exercises::Split { concept, practice } => concept.iter().chain(practice).collect(),
        }
    }

    /// Exercises that map onto the problem specifications.
    pub fn practice(&self) -> &[ExerciseConfig] {
        match self {
            Exercises::Flat(exercises) => exercises,
            Exercises::Split { practice, .. } => practice,
        }
    }

    pub fn find(&self, slug: &str) -> Option<&ExerciseConfig> {
        self.all().into_iter().find(|exercise| exercise.slug == slug)
    }
}

/// A track's `config.json`, read leniently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub blurb: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub test_pattern: Option<String>,
    #[serde(default)]
    pub foregone: Vec<String>,
    #[serde(default)]
    pub exercises: Exercises,
}

pub fn track_config(url: &str, body: &str) -> Result<TrackConfig, FetchError> {
    serde_json::from_str(body).map_err(|err| FetchError::parse(url, err.to_string()))
}

fn json_version(body: &str) -> Option<String> {
    let document: serde_json::Value = serde_json::from_str(body).ok()?;
    let version = document.get("version")?.as_str()?.trim();
    (!version.is_empty()).then(|| version.to_string())
}

fn bare_version(body: &str) -> Option<String> {
    let version = body.trim();
    (!version.is_empty()).then(|| version.to_string())
}

fn scanned_version(body: &str) -> Option<String> {
    VERSION_SCAN_REGEX
        .captures(body)
        .map(|caps| caps[1].to_string())
}

/// Finds the version in a track's versioning file.
///
/// JSON documents are asked for their `version` field and files named
/// `*version` are taken verbatim; otherwise, or when that yields nothing,
/// the body is scanned for a version-like token.
pub fn track_version(url: &str, body: &str) -> Result<String, FetchError> {
    let structured = if url.ends_with(".json") {
        json_version(body)
    } else if url.ends_with("version") {
        bare_version(body)
    } else {
        None
    };

    structured
        .or_else(|| scanned_version(body))
        .ok_or_else(|| FetchError::parse(url, "no version found"))
}

/// Version of a canonical data document; `None` when it declares none.
pub fn canonical_version(url: &str, body: &str) -> Option<String> {
    if url.ends_with(".json") {
        if let Some(version) = json_version(body) {
            return Some(version);
        }
    }
    CANONICAL_VERSION_REGEX
        .captures(body)
        .map(|caps| caps[1].to_string())
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    path: String,
    #[serde(default)]
    git_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitTree {
    #[serde(default)]
    tree: Vec<GitTreeLeaf>,
}

#[derive(Debug, Deserialize)]
struct GitTreeLeaf {
    path: String,
}

/// Recursive tree URL of the `exercises` entry in a directory listing.
pub fn exercises_tree_url(url: &str, body: &str) -> Result<String, FetchError> {
    let entries: Vec<ContentsEntry> =
        serde_json::from_str(body).map_err(|err| FetchError::parse(url, err.to_string()))?;

    let git_url = entries
        .into_iter()
        .find(|entry| entry.path == "exercises")
        .and_then(|entry| entry.git_url)
        .ok_or_else(|| FetchError::MissingEntry {
            url: url.to_string(),
            entry: "exercises".to_string(),
        })?;

    let separator = if git_url.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}recursive=1", git_url, separator))
}

/// Marker files found for one canonical exercise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalExercise {
    pub slug: String,
    pub deprecated: bool,
    pub description: bool,
    pub meta: bool,
    pub tests: bool,
}

/// Every exercise in the problem specifications, by slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalList {
    pub exercises: BTreeMap<String, CanonicalExercise>,
}

impl CanonicalList {
    pub fn from_slugs<'a>(slugs: impl IntoIterator<Item = &'a str>) -> Self {
        let exercises = slugs
            .into_iter()
            .map(|slug| {
                let exercise = CanonicalExercise {
                    slug: slug.to_string(),
                    ..CanonicalExercise::default()
                };
                (slug.to_string(), exercise)
            })
            .collect();
        Self { exercises }
    }

    pub fn get(&self, slug: &str) -> Option<&CanonicalExercise> {
        self.exercises.get(slug)
    }

    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.exercises.keys().map(String::as_str)
    }

    /// Slugs without a deprecation marker.
    pub fn active(&self) -> impl Iterator<Item = &CanonicalExercise> {
        self.exercises.values().filter(|exercise| !exercise.deprecated)
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// Builds the exercise lookup from a recursive git tree of `exercises/`.
pub fn canonical_list(url: &str, body: &str) -> Result<CanonicalList, FetchError> {
    let tree: GitTree =
        serde_json::from_str(body).map_err(|err| FetchError::parse(url, err.to_string()))?;

    let mut exercises: BTreeMap<String, CanonicalExercise> = BTreeMap::new();
    for leaf in tree.tree {
        let mut parts = leaf.path.splitn(2, '/');
        let Some(slug) = parts.next().filter(|slug| !slug.is_empty()) else {
            continue;
        };
        let exercise = exercises
            .entry(slug.to_string())
            .or_insert_with(|| CanonicalExercise {
                slug: slug.to_string(),
                ..CanonicalExercise::default()
            });

        match parts.next() {
            Some("description.md") => exercise.description = true,
            Some("canonical-data.json" | "canonical-data.yml") => exercise.tests = true,
            Some("metadata.yml" | "metadata.toml") => exercise.meta = true,
            Some(".deprecated") => exercise.deprecated = true,
            _ => {}
        }
    }

    Ok(CanonicalList { exercises })
}

/// Topic names from `TOPICS.txt`.
///
/// Bullet lines (`- ...`) are dropped, and so is any line directly
/// followed by a bullet, since that is a category heading.
pub fn topics(body: &str) -> Vec<String> {
    let lines: Vec<&str> = body.lines().map(str::trim).collect();
    lines
        .iter()
        .enumerate()
        .filter(|(index, line)| {
            let next_is_bullet = lines
                .get(index + 1)
                .is_some_and(|next| next.starts_with('-'));
            !line.is_empty() && !line.starts_with('-') && !next_is_bullet
        })
        .map(|(_, line)| line.to_string())
        .collect()
}
