//! Pure computations over fetched data, recomputed on every render.

use crate::config::{MINIMUM_STUB_LENGTH, TOPIC_DISTANCE_THRESHOLD};
use crate::parse::{CanonicalList, ExerciseConfig, TrackConfig};
use crate::tracks::TrackData;
use crate::utils::edit_distance;
use semver::{BuildMetadata, Version};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Parses a `major.minor.patch[-pre][+build]` version, tolerating a
/// leading `v`. Build metadata does not take part in ordering.
pub fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches(['v', 'V']);
    let mut version = Version::parse(raw).ok()?;
    version.build = BuildMetadata::EMPTY;
    Some(version)
}

/// Whether the track's `remote` version has caught up with `canonical`.
///
/// Without a canonical version there is nothing to catch up with. Versions
/// that do not parse only match when they are identical.
pub fn is_up_to_date(canonical: Option<&str>, remote: Option<&str>) -> bool {
    match (canonical, remote) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(canonical), Some(remote)) => {
            match (parse_version(canonical), parse_version(remote)) {
                (Some(canonical), Some(remote)) => remote >= canonical,
                _ => canonical.trim() == remote.trim(),
            }
        }
    }
}

/// Canonical exercises the track neither implements nor has foregone.
/// Deprecated canonical exercises are never reported.
pub fn unimplemented_exercises(canonical: &CanonicalList, config: &TrackConfig) -> Vec<String> {
    let known: HashSet<&str> = config
        .exercises
        .all()
        .into_iter()
        .map(|exercise| exercise.slug.as_str())
        .chain(config.foregone.iter().map(String::as_str))
        .collect();

    canonical
        .active()
        .filter(|exercise| !known.contains(exercise.slug.as_str()))
        .map(|exercise| exercise.slug.clone())
        .collect()
}

fn is_foregone(config: &TrackConfig, exercise: &ExerciseConfig) -> bool {
    exercise.foregone || config.foregone.iter().any(|slug| slug == &exercise.slug)
}

/// Practice exercises that are neither foregone nor deprecated.
pub fn valid_exercises(config: &TrackConfig) -> Vec<&ExerciseConfig> {
    config
        .exercises
        .practice()
        .iter()
        .filter(|exercise| !is_foregone(config, exercise) && !exercise.is_deprecated())
        .collect()
}

/// Slugs a track has declined or retired: the foregone list, flagged
/// foregone exercises and deprecated ones, each once.
pub fn invalid_exercises(config: &TrackConfig) -> Vec<String> {
    let mut invalid: Vec<String> = config.foregone.clone();
    for exercise in config.exercises.practice() {
        let excluded = exercise.foregone || exercise.is_deprecated();
        if excluded && !invalid.contains(&exercise.slug) {
            invalid.push(exercise.slug.clone());
        }
    }
    invalid
}

pub fn core_exercises(config: &TrackConfig) -> Vec<&ExerciseConfig> {
    valid_exercises(config)
        .into_iter()
        .filter(|exercise| exercise.core)
        .collect()
}

/// Whether a stub of `length` characters is more than a placeholder.
pub fn is_real_stub(length: usize) -> bool {
    length > MINIMUM_STUB_LENGTH
}

/// Valid exercises without topics that the track has not opted out of.
pub fn exercises_missing_topics<'a>(config: &'a TrackConfig, track: &TrackData) -> Vec<&'a ExerciseConfig> {
    valid_exercises(config)
        .into_iter()
        .filter(|exercise| !exercise.has_topics() && track.is_topics_actionable(&exercise.slug))
        .collect()
}

/// Slugs whose version mismatch should be reported for `track`.
pub fn actionable_versioning<'a>(track: &TrackData, slugs: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    slugs
        .into_iter()
        .filter(|slug| track.is_versioning_actionable(slug))
        .collect()
}

/// Summary of the launch checklist for one track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackChecklist {
    pub has_blurb: bool,
    pub has_auto_approve: bool,
    pub core_count: usize,
    pub with_topics_count: usize,
    pub valid_count: usize,
}

impl TrackChecklist {
    pub fn from_config(config: &TrackConfig) -> Self {
        let valid = valid_exercises(config);
        Self {
            has_blurb: config
                .blurb
                .as_deref()
                .is_some_and(|blurb| !blurb.trim().is_empty()),
            has_auto_approve: valid.iter().any(|exercise| exercise.auto_approve),
            core_count: valid.iter().filter(|exercise| exercise.core).count(),
            with_topics_count: valid.iter().filter(|exercise| exercise.has_topics()).count(),
            valid_count: valid.len(),
        }
    }

    pub fn has_core(&self) -> bool {
        self.core_count > 0
    }

    pub fn has_topics(&self) -> bool {
        self.with_topics_count > 0
    }
}

fn is_nearby(topic: &str, candidate: &str) -> bool {
    edit_distance(topic, candidate) < TOPIC_DISTANCE_THRESHOLD
        || candidate.split('_').any(|part| part == topic)
        || topic.split('_').any(|part| part == candidate)
}

/// Suggestions from the canonical topic vocabulary, memoized per topic.
///
/// The vocabulary is fixed for the lifetime of the value, so a topic's
/// suggestions never change once computed.
#[derive(Debug, Default)]
pub struct NearbyTopics {
    vocabulary: Rc<Vec<String>>,
    memo: RefCell<HashMap<String, Rc<Vec<String>>>>,
}

impl NearbyTopics {
    pub fn new(vocabulary: Rc<Vec<String>>) -> Self {
        Self {
            vocabulary,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn is_known(&self, topic: &str) -> bool {
        self.vocabulary.iter().any(|known| known == topic)
    }

    pub fn suggest(&self, topic: &str) -> Rc<Vec<String>> {
        if let Some(found) = self.memo.borrow().get(topic) {
            return found.clone();
        }

        let nearby: Rc<Vec<String>> = Rc::new(
            self.vocabulary
                .iter()
                .filter(|candidate| is_nearby(topic, candidate))
                .cloned()
                .collect(),
        );
        self.memo
            .borrow_mut()
            .insert(topic.to_string(), nearby.clone());
        nearby
    }

    pub fn memoized(&self) -> usize {
        self.memo.borrow().len()
    }
}
