//! Placeholder substitution for per-exercise file locations.
//!
//! Track metadata describes where an exercise's files live with patterns
//! such as `exercises/{slug}/{Slug}Tests.cs`. Substitution runs in two
//! passes: first the cross-references to other track fields (`{stub_file}`,
//! `{test_file}`, `{versioning}`, case-insensitive), then the slug tokens
//! (case-sensitive), so a referenced pattern gets its slug tokens expanded
//! too. A cross-reference the track does not configure becomes `{}`; an
//! unknown token is left as it is.

use crate::config::MISSING_PLACEHOLDER;
use crate::tracks::TrackData;
use crate::utils::{capitalized_flat_case, flat_case, pascal_case, snake_case};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([A-Za-z_-]*)\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrossReference {
    Stub,
    Test,
    Versioning,
}

impl CrossReference {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "stub" | "stub_file" | "stubfile" => Some(CrossReference::Stub),
            "test" | "test_file" | "testfile" => Some(CrossReference::Test),
            "versioning" => Some(CrossReference::Versioning),
            _ => None,
        }
    }

    fn resolve(self, track: &TrackData) -> Option<&str> {
        match self {
            CrossReference::Stub => track.stub_file.as_deref(),
            CrossReference::Test => track.test_file.as_deref(),
            CrossReference::Versioning => track.versioning.as_deref(),
        }
    }
}

fn slug_token(token: &str, slug: &str) -> Option<String> {
    let value = match token {
        "slug" | "exercise-slug" => slug.to_string(),
        "slug_" | "exercise_slug" => snake_case(slug),
        "Slug" | "ExerciseSlug" => pascal_case(slug),
        "exerciseslug" => flat_case(slug),
        "Exerciseslug" => capitalized_flat_case(slug),
        _ => return None,
    };
    Some(value)
}

/// Expands `pattern` for the exercise `slug` of `track`.
pub fn substitute(pattern: &str, slug: &str, track: &TrackData) -> String {
    let referenced = TOKEN_REGEX.replace_all(pattern, |caps: &Captures| {
        match CrossReference::parse(&caps[1]) {
            Some(reference) => reference
                .resolve(track)
                .unwrap_or(MISSING_PLACEHOLDER)
                .to_string(),
            None => caps[0].to_string(),
        }
    });

    TOKEN_REGEX
        .replace_all(&referenced, |caps: &Captures| {
            slug_token(&caps[1], slug).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Path of the file holding the exercise's version, if the track has one.
pub fn version_path(track: &TrackData, slug: &str) -> Option<String> {
    track
        .versioning
        .as_deref()
        .map(|pattern| substitute(pattern, slug, track))
}

pub fn stub_path(track: &TrackData, slug: &str) -> Option<String> {
    track
        .stub_file
        .as_deref()
        .map(|pattern| substitute(pattern, slug, track))
}

pub fn test_path(track: &TrackData, slug: &str) -> Option<String> {
    track
        .test_file
        .as_deref()
        .map(|pattern| substitute(pattern, slug, track))
}
