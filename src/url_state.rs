//! Bidirectional mapping between the browser path and the dashboard state.
//!
//! The path is the single source of truth:
//!
//! ```text
//! /{track}/{branch}/{view}/{exercise}
//! ```
//!
//! Every segment has its own sanitizer. Unknown or missing segments fall
//! back to a default instead of failing, so a stale or hand-edited link
//! always lands somewhere sensible. Because state is never kept outside the
//! path, back/forward navigation only has to re-decode the new location.

use crate::config::{DEFAULT_BRANCH, DEFAULT_VIEW, HOME_TITLE};
use crate::location::Location;
use crate::tracks::TrackRegistry;
use crate::utils::percent_decode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Problem-specification branch the track is audited against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Branch {
    #[default]
    Master,
    TrackAnatomy,
}

impl Branch {
    pub const ALL: [Branch; 2] = [Branch::Master, Branch::TrackAnatomy];

    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Master => DEFAULT_BRANCH,
            Branch::TrackAnatomy => "track-anatomy",
        }
    }

    /// Git reference used when reading the problem specifications.
    pub fn problem_spec_ref(self) -> &'static str {
        match self {
            Branch::Master => DEFAULT_BRANCH,
            Branch::TrackAnatomy => "trackanatomy",
        }
    }

    pub fn sanitize(raw: Option<&str>) -> Branch {
        raw.and_then(|raw| Branch::ALL.into_iter().find(|branch| branch.as_str() == raw))
            .unwrap_or_default()
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    #[default]
    Versions,
    Unimplemented,
    Topics,
    Stubs,
    Details,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Versions,
        View::Unimplemented,
        View::Topics,
        View::Stubs,
        View::Details,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            View::Versions => DEFAULT_VIEW,
            View::Unimplemented => "unimplemented",
            View::Topics => "topics",
            View::Stubs => "stubs",
            View::Details => "details",
        }
    }

    pub fn sanitize(raw: Option<&str>) -> View {
        raw.and_then(|raw| View::ALL.into_iter().find(|view| view.as_str() == raw))
            .unwrap_or_default()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalises an exercise slug: spaces and underscores become dashes.
///
/// Anything left that is not a slug character makes the segment invalid,
/// which decodes to "no exercise".
pub fn sanitize_exercise(raw: Option<&str>) -> Option<String> {
    let slug: String = raw?
        .trim()
        .chars()
        .map(|c| if c == ' ' || c == '_' { '-' } else { c })
        .collect();

    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    valid.then_some(slug)
}

pub fn sanitize_track(raw: Option<&str>, tracks: &TrackRegistry) -> Option<String> {
    raw.filter(|slug| tracks.contains(slug)).map(str::to_string)
}

/// The selection encoded in the current path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppState {
    pub track_id: Option<String>,
    pub branch: Branch,
    pub view: View,
    pub exercise: Option<String>,
}

impl AppState {
    pub fn for_track(track_id: &str) -> Self {
        Self {
            track_id: Some(track_id.to_string()),
            ..Self::default()
        }
    }

    pub fn is_home(&self) -> bool {
        self.track_id.is_none()
    }
}

/// Opaque blob stored with each history entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    #[serde(flatten)]
    pub state: AppState,
    #[serde(default)]
    pub previous: Option<AppState>,
}

impl HistoryState {
    pub fn from_location(location: &Location) -> Option<HistoryState> {
        let blob = location.state.clone()?;
        serde_json::from_value(blob).ok()
    }
}

/// How one field of [`StateUpdate`] changes the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
    Unset,
}

impl<T> Patch<T> {
    fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }
}

/// A partial state change requested by a component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub track_id: Patch<String>,
    pub branch: Patch<Branch>,
    pub view: Patch<View>,
    pub exercise: Patch<String>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Go back to the track selection.
    pub fn home() -> Self {
        Self {
            track_id: Patch::Unset,
            ..Self::default()
        }
    }

    pub fn track(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Patch::Set(track_id.into());
        self
    }

    pub fn branch(mut self, branch: Branch) -> Self {
        self.branch = Patch::Set(branch);
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = Patch::Set(view);
        self
    }

    pub fn exercise(mut self, exercise: impl Into<String>) -> Self {
        self.exercise = Patch::Set(exercise.into());
        self
    }

    pub fn clear_exercise(mut self) -> Self {
        self.exercise = Patch::Unset;
        self
    }

    /// True when applying the update cannot change the state.
    pub fn is_noop(&self) -> bool {
        self.track_id.is_keep()
            && self.branch.is_keep()
            && self.view.is_keep()
            && self.exercise.is_keep()
    }
}

/// Everything needed to push one history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub state: HistoryState,
    pub title: String,
    pub href: String,
}

/// Decodes `path` into the state it represents.
///
/// A path whose first segment is not a known track is the home page, no
/// matter what follows it.
pub fn decode(path: &str, tracks: &TrackRegistry) -> AppState {
    let path = percent_decode(path);
    let mut segments = path.split('/').skip(1);
    let mut next = || segments.next().filter(|segment| !segment.is_empty());

    let Some(track_id) = sanitize_track(next(), tracks) else {
        return AppState::default();
    };

    AppState {
        track_id: Some(track_id),
        branch: Branch::sanitize(next()),
        view: View::sanitize(next()),
        exercise: sanitize_exercise(next()),
    }
}

/// Merges `update` onto `current` and serialises the result.
///
/// Unsetting the track ignores every other field of the update and returns
/// to the root path with a default state.
pub fn encode(current: &AppState, update: &StateUpdate, tracks: &TrackRegistry) -> Navigation {
    let track_id = match &update.track_id {
        Patch::Unset => None,
        Patch::Set(track_id) => sanitize_track(Some(track_id), tracks),
        Patch::Keep => current.track_id.clone(),
    };

    let Some(track_id) = track_id else {
        return Navigation {
            state: HistoryState::default(),
            title: HOME_TITLE.to_string(),
            href: "/".to_string(),
        };
    };

    let branch = match update.branch {
        Patch::Set(branch) => branch,
        Patch::Unset => Branch::default(),
        Patch::Keep => current.branch,
    };

    let exercise = match &update.exercise {
        Patch::Set(exercise) => sanitize_exercise(Some(exercise)),
        Patch::Unset => None,
        Patch::Keep => current.exercise.clone(),
    };

    let newly_set_exercise = matches!(&update.exercise, Patch::Set(_)) && exercise.is_some();
    let view = match update.view {
        Patch::Set(view) => view,
        Patch::Unset => View::default(),
        Patch::Keep if newly_set_exercise => View::Details,
        Patch::Keep => current.view,
    };

    let title = format!(
        "Exercism: Track {} maintenance tool ({}) - {}",
        track_id, branch, view
    );

    let mut href = format!("/{}/{}/{}", track_id, branch, view);
    if let Some(exercise) = &exercise {
        href.push('/');
        href.push_str(exercise);
    }

    Navigation {
        state: HistoryState {
            state: AppState {
                track_id: Some(track_id),
                branch,
                view,
                exercise,
            },
            previous: Some(current.clone()),
        },
        title,
        href,
    }
}

/// Target of a link that would apply `update`, without navigating.
pub fn href_for(current: &AppState, update: &StateUpdate, tracks: &TrackRegistry) -> String {
    encode(current, update, tracks).href
}

/// What closing the exercise details should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HideExercise {
    /// The previous entry belongs to the same track; pop it.
    Back,
    Navigate(StateUpdate),
}

/// Prefers history navigation over pushing a new entry when the entry we
/// came from is for the same track.
pub fn hide_exercise(location: &Location, track_id: &str) -> HideExercise {
    let came_from_same_track = HistoryState::from_location(location)
        .and_then(|entry| entry.previous)
        .is_some_and(|previous| previous.track_id.as_deref() == Some(track_id));

    if came_from_same_track {
        HideExercise::Back
    } else {
        HideExercise::Navigate(StateUpdate::new().view(View::default()).clear_exercise())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::TrackData;

    fn registry() -> TrackRegistry {
        TrackRegistry::new(vec![
            TrackData::bare("ruby", "Ruby"),
            TrackData::bare("demo", "Demo"),
        ])
    }

    fn state(track: &str, branch: Branch, view: View, exercise: Option<&str>) -> AppState {
        AppState {
            track_id: Some(track.to_string()),
            branch,
            view,
            exercise: exercise.map(str::to_string),
        }
    }

    #[test]
    fn decode_maps_segments_in_order() {
        let decoded = decode("/ruby/track-anatomy/topics/two-fer", &registry());
        assert_eq!(
            decoded,
            state("ruby", Branch::TrackAnatomy, View::Topics, Some("two-fer"))
        );
    }

    #[test]
    fn decode_defaults_missing_and_unknown_segments() {
        let tracks = registry();
        assert_eq!(
            decode("/ruby", &tracks),
            state("ruby", Branch::Master, View::Versions, None)
        );
        assert_eq!(
            decode("/ruby/nope/whatever/", &tracks),
            state("ruby", Branch::Master, View::Versions, None)
        );
        assert_eq!(decode("/unknown/master/topics", &tracks), AppState::default());
        assert_eq!(decode("", &tracks), AppState::default());
        assert_eq!(decode("/", &tracks), AppState::default());
    }

    #[test]
    fn decode_normalises_exercise_slugs() {
        let tracks = registry();
        let decoded = decode("/ruby/master/details/two%20fer", &tracks);
        assert_eq!(decoded.exercise.as_deref(), Some("two-fer"));

        let decoded = decode("/ruby/master/details/rna_transcription", &tracks);
        assert_eq!(decoded.exercise.as_deref(), Some("rna-transcription"));

        let decoded = decode("/ruby/master/details/<script>", &tracks);
        assert_eq!(decoded.exercise, None);
    }

    #[test]
    fn encoding_without_changes_round_trips() {
        let tracks = registry();
        let states = [
            AppState::default(),
            state("ruby", Branch::Master, View::Versions, None),
            state("ruby", Branch::TrackAnatomy, View::Stubs, None),
            state("demo", Branch::Master, View::Details, Some("two-fer")),
            state("demo", Branch::TrackAnatomy, View::Topics, Some("leap")),
        ];

        for expected in states {
            let navigation = encode(&expected, &StateUpdate::new(), &tracks);
            assert_eq!(decode(&navigation.href, &tracks), expected, "{}", navigation.href);
            assert_eq!(navigation.state.state, expected);
        }
    }

    #[test]
    fn setting_an_exercise_switches_to_details() {
        let tracks = registry();
        let current = state("ruby", Branch::Master, View::Topics, None);

        let navigation = encode(&current, &StateUpdate::new().exercise("two-fer"), &tracks);
        assert_eq!(navigation.state.state.view, View::Details);
        assert_eq!(navigation.href, "/ruby/master/details/two-fer");

        let navigation = encode(
            &current,
            &StateUpdate::new().exercise("two-fer").view(View::Stubs),
            &tracks,
        );
        assert_eq!(navigation.state.state.view, View::Stubs);
    }

    #[test]
    fn unsetting_the_track_goes_home() {
        let tracks = registry();
        let current = state("ruby", Branch::TrackAnatomy, View::Details, Some("leap"));
        let update = StateUpdate {
            view: Patch::Set(View::Topics),
            ..StateUpdate::home()
        };

        let navigation = encode(&current, &update, &tracks);
        assert_eq!(navigation.href, "/");
        assert_eq!(navigation.title, HOME_TITLE);
        assert_eq!(navigation.state.state, AppState::default());
        assert_eq!(navigation.state.previous, None);
    }

    #[test]
    fn fields_not_in_the_update_are_kept() {
        let tracks = registry();
        let current = state("ruby", Branch::TrackAnatomy, View::Details, Some("leap"));

        let navigation = encode(&current, &StateUpdate::new().track("demo"), &tracks);
        assert_eq!(
            navigation.state.state,
            state("demo", Branch::TrackAnatomy, View::Details, Some("leap"))
        );
        assert_eq!(navigation.state.previous, Some(current.clone()));
        assert_eq!(
            navigation.title,
            "Exercism: Track demo maintenance tool (track-anatomy) - details"
        );

        let navigation = encode(&current, &StateUpdate::new().clear_exercise(), &tracks);
        assert_eq!(navigation.href, "/ruby/track-anatomy/details");
    }

    #[test]
    fn an_empty_exercise_clears_it_without_forcing_details() {
        let tracks = registry();
        let current = state("ruby", Branch::Master, View::Topics, Some("leap"));
        let navigation = encode(&current, &StateUpdate::new().exercise(""), &tracks);
        assert_eq!(navigation.state.state.exercise, None);
        assert_eq!(navigation.state.state.view, View::Topics);
    }

    #[test]
    fn hide_exercise_goes_back_within_the_same_track() {
        let tracks = registry();
        let list = state("ruby", Branch::Master, View::Versions, None);
        let navigation = encode(&list, &StateUpdate::new().exercise("leap"), &tracks);
        let location = Location::new(
            &navigation.href,
            serde_json::to_value(&navigation.state).ok(),
        );

        assert_eq!(hide_exercise(&location, "ruby"), HideExercise::Back);
        assert_eq!(
            hide_exercise(&location, "demo"),
            HideExercise::Navigate(StateUpdate::new().view(View::Versions).clear_exercise())
        );
        assert!(matches!(
            hide_exercise(&Location::new("/ruby/master/details/leap", None), "ruby"),
            HideExercise::Navigate(_)
        ));
    }

    #[test]
    fn links_are_built_without_navigating() {
        let tracks = registry();
        let current = state("ruby", Branch::Master, View::Versions, None);
        assert_eq!(
            href_for(&current, &StateUpdate::new().branch(Branch::TrackAnatomy), &tracks),
            "/ruby/track-anatomy/versions"
        );
        assert_eq!(href_for(&current, &StateUpdate::home(), &tracks), "/");
        assert_eq!(Branch::TrackAnatomy.problem_spec_ref(), "trackanatomy");
        assert_eq!(Branch::Master.problem_spec_ref(), "master");
    }
}
