//! Yew view components for the dashboard.
//!
//! Rendering is kept plain: every remote cell distinguishes loading, absent
//! and failed data, and everything else is a table or a list.

use crate::cache::{Remote, Status};
use crate::derived::{
    core_exercises, exercises_missing_topics, invalid_exercises, is_real_stub, is_up_to_date,
    unimplemented_exercises, valid_exercises, NearbyTopics, TrackChecklist,
};
use crate::hooks::{
    use_canonical_list, use_canonical_version, use_companion, use_hide_exercise, use_href,
    use_remote, use_remote_version, use_stub, use_topics, use_track_config, use_url_state,
    LocationContext, UrlState,
};
use crate::location::LocationStore;
use crate::remote::Companion;
use crate::url_state::{Branch, StateUpdate, View};
use std::rc::Rc;
use yew::prelude::*;

/// Renders a remote value, or the state it is stuck in.
pub fn render_remote<T>(remote: &Remote<T>, render: impl Fn(&T) -> Html) -> Html {
    match &remote.status {
        Status::Loading => html! { <span class="loading">{ "…" }</span> },
        Status::Absent => html! { <span class="absent">{ "—" }</span> },
        Status::Failed(err) => html! {
            <span class="failed" title={err.to_string()}>{ "failed" }</span>
        },
        Status::Resolved(value) => render(value),
    }
}

fn external_link(url: Option<&str>, content: Html) -> Html {
    match url {
        Some(url) => html! { <a href={url.to_string()} target="_blank" rel="noopener">{ content }</a> },
        None => content,
    }
}

fn check_mark(passed: bool) -> Html {
    html! { <span class={if passed { "check pass" } else { "check fail" }}>{ if passed { "✔" } else { "✘" } }</span> }
}

#[derive(Properties)]
pub struct LocationProviderProps {
    pub store: Rc<LocationStore>,
    #[prop_or_default]
    pub children: Html,
}

impl PartialEq for LocationProviderProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store) && self.children == other.children
    }
}

/// Re-renders its children with a fresh [`LocationContext`] after every
/// navigation.
#[function_component(LocationProvider)]
pub fn location_provider(props: &LocationProviderProps) -> Html {
    let location = use_state(|| props.store.snapshot());

    {
        let store = props.store.clone();
        let location = location.clone();
        use_effect_with((), move |_| {
            let subscription = store.subscribe(move |next| location.set(next.clone()));
            move || subscription.unsubscribe()
        });
    }

    let context = LocationContext {
        store: props.store.clone(),
        location: (*location).clone(),
    };

    html! {
        <ContextProvider<LocationContext> {context}>
            { props.children.clone() }
        </ContextProvider<LocationContext>>
    }
}

#[derive(Properties, PartialEq)]
pub struct NavLinkProps {
    pub update: StateUpdate,
    #[prop_or_default]
    pub class: Classes,
    #[prop_or_default]
    pub children: Html,
}

/// An anchor that navigates through the location store.
#[function_component(NavLink)]
pub fn nav_link(props: &NavLinkProps) -> Html {
    let href = use_href(&props.update);
    let UrlState { navigate, .. } = use_url_state();

    let onclick = {
        let update = props.update.clone();
        Callback::from(move |event: MouseEvent| {
            event.prevent_default();
            navigate.emit(update.clone());
        })
    };

    html! {
        <a {href} class={props.class.clone()} {onclick}>{ props.children.clone() }</a>
    }
}

/// The page for the current location.
#[function_component(Dashboard)]
pub fn dashboard() -> Html {
    let UrlState { state, .. } = use_url_state();

    let Some(track_id) = state.track_id.clone() else {
        return html! { <TrackSelection /> };
    };

    let content = match state.view {
        View::Versions => html! { <VersionsView track_id={track_id.clone()} branch={state.branch} /> },
        View::Unimplemented => html! { <UnimplementedView track_id={track_id.clone()} branch={state.branch} /> },
        View::Topics => html! { <TopicsView track_id={track_id.clone()} branch={state.branch} /> },
        View::Stubs => html! { <StubsView track_id={track_id.clone()} /> },
        View::Details => match state.exercise.clone() {
            Some(slug) => html! { <ExerciseDetails track_id={track_id.clone()} {slug} branch={state.branch} /> },
            None => html! { <VersionsView track_id={track_id.clone()} branch={state.branch} /> },
        },
    };

    html! {
        <div class="track">
            <TrackHeader track_id={track_id.clone()} branch={state.branch} view={state.view} />
            <div class="track-content">
                <main>{ content }</main>
                <TrackAside {track_id} />
            </div>
        </div>
    }
}

#[function_component(TrackSelection)]
pub fn track_selection() -> Html {
    let remote = use_remote();

    html! {
        <section class="track-selection">
            <h1>{ "Select your track" }</h1>
            <ul>
                { for remote.tracks().iter().map(|track| html! {
                    <li key={track.slug.clone()}>
                        <NavLink update={StateUpdate::new().track(track.slug.clone())}>
                            { track.name.clone() }
                        </NavLink>
                    </li>
                }) }
            </ul>
        </section>
    }
}

#[derive(Properties, PartialEq)]
pub struct TrackHeaderProps {
    pub track_id: AttrValue,
    pub branch: Branch,
    pub view: View,
}

#[function_component(TrackHeader)]
pub fn track_header(props: &TrackHeaderProps) -> Html {
    let remote = use_remote();
    let name = remote.track_data(&props.track_id).name;

    html! {
        <header>
            <NavLink update={StateUpdate::home()}>{ "All tracks" }</NavLink>
            <h1>{ name }</h1>
            <nav class="branches">
                { for Branch::ALL.into_iter().map(|branch| html! {
                    <NavLink
                        update={StateUpdate::new().branch(branch)}
                        class={classes!((branch == props.branch).then_some("active"))}
                    >
                        { branch.as_str() }
                    </NavLink>
                }) }
            </nav>
            <nav class="views">
                { for [View::Versions, View::Unimplemented, View::Topics, View::Stubs].into_iter().map(|view| html! {
                    <NavLink
                        update={StateUpdate::new().view(view).clear_exercise()}
                        class={classes!((view == props.view).then_some("active"))}
                    >
                        { view.as_str() }
                    </NavLink>
                }) }
            </nav>
        </header>
    }
}

#[derive(Properties, PartialEq)]
pub struct TrackViewProps {
    pub track_id: AttrValue,
    #[prop_or_default]
    pub branch: Branch,
}

#[function_component(VersionsView)]
pub fn versions_view(props: &TrackViewProps) -> Html {
    let config = use_track_config(&props.track_id);

    render_remote(&config, |config| {
        html! {
            <table class="versions">
                <thead>
                    <tr><th>{ "Exercise" }</th><th>{ "Canonical" }</th><th>{ "Track" }</th><th></th></tr>
                </thead>
                <tbody>
                    { for valid_exercises(config).into_iter().map(|exercise| html! {
                        <VersionRow
                            key={exercise.slug.clone()}
                            track_id={props.track_id.clone()}
                            slug={exercise.slug.clone()}
                            branch={props.branch}
                        />
                    }) }
                </tbody>
            </table>
        }
    })
}

#[derive(Properties, PartialEq)]
pub struct ExerciseProps {
    pub track_id: AttrValue,
    pub slug: AttrValue,
    #[prop_or_default]
    pub branch: Branch,
}

#[function_component(VersionRow)]
pub fn version_row(props: &ExerciseProps) -> Html {
    let remote = use_remote();
    let canonical = use_canonical_version(&props.slug, props.branch);
    let version = use_remote_version(&props.track_id, &props.slug);

    let verdict = if canonical.done() && version.done() {
        let track = remote.track_data(&props.track_id);
        let up_to_date = is_up_to_date(
            canonical.value().map(String::as_str),
            version.value().map(String::as_str),
        );
        if up_to_date || !track.is_versioning_actionable(&props.slug) {
            check_mark(true)
        } else {
            check_mark(false)
        }
    } else {
        html! {}
    };

    html! {
        <tr>
            <td>
                <NavLink update={StateUpdate::new().exercise(props.slug.to_string())}>
                    { props.slug.clone() }
                </NavLink>
            </td>
            <td>{ external_link(canonical.url.as_deref(), render_remote(&canonical, |v| html! { <>{ v.clone() }</> })) }</td>
            <td>{ external_link(version.url.as_deref(), render_remote(&version, |v| html! { <>{ v.clone() }</> })) }</td>
            <td>{ verdict }</td>
        </tr>
    }
}

#[function_component(UnimplementedView)]
pub fn unimplemented_view(props: &TrackViewProps) -> Html {
    let config = use_track_config(&props.track_id);
    let canonical = use_canonical_list(props.branch);

    match (config.value(), canonical.value()) {
        (Some(config), Some(canonical)) => {
            let missing = unimplemented_exercises(canonical, config);
            if missing.is_empty() {
                return html! { <p>{ "Every canonical exercise is implemented or foregone." }</p> };
            }
            html! {
                <ul class="unimplemented">
                    { for missing.into_iter().map(|slug| html! { <li key={slug.clone()}>{ slug }</li> }) }
                </ul>
            }
        }
        _ if config.value().is_none() => render_remote(&config, |_| html! {}),
        _ => render_remote(&canonical, |_| html! {}),
    }
}

#[function_component(TopicsView)]
pub fn topics_view(props: &TrackViewProps) -> Html {
    let remote = use_remote();
    let config = use_track_config(&props.track_id);
    let vocabulary = use_topics(props.branch);
    let nearby = use_memo(vocabulary.value().cloned(), |vocabulary| {
        NearbyTopics::new(vocabulary.clone().unwrap_or_default())
    });

    let Some(config) = config.value() else {
        return render_remote(&config, |_| html! {});
    };
    let track = remote.track_data(&props.track_id);
    let missing = exercises_missing_topics(config, &track);

    html! {
        <div class="topics">
            <table>
                <tbody>
                    { for valid_exercises(config).into_iter().map(|exercise| {
                        let topics = exercise.topics.clone().unwrap_or_default();
                        html! {
                            <tr key={exercise.slug.clone()}>
                                <td>{ exercise.slug.clone() }</td>
                                <td>
                                    { for topics.into_iter().map(|topic| {
                                        let known = !vocabulary.done() || nearby.is_known(&topic);
                                        let hint = if known {
                                            String::new()
                                        } else {
                                            nearby.suggest(&topic).join(", ")
                                        };
                                        html! {
                                            <span class={classes!("topic", (!known).then_some("unknown"))} title={hint}>
                                                { topic }
                                            </span>
                                        }
                                    }) }
                                </td>
                            </tr>
                        }
                    }) }
                </tbody>
            </table>
            if !missing.is_empty() {
                <p class="missing-topics">
                    { format!("{} exercise(s) without topics", missing.len()) }
                </p>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct StubsViewProps {
    pub track_id: AttrValue,
}

#[function_component(StubsView)]
pub fn stubs_view(props: &StubsViewProps) -> Html {
    let config = use_track_config(&props.track_id);

    render_remote(&config, |config| {
        html! {
            <table class="stubs">
                <tbody>
                    { for valid_exercises(config).into_iter().map(|exercise| html! {
                        <StubRow
                            key={exercise.slug.clone()}
                            track_id={props.track_id.clone()}
                            slug={exercise.slug.clone()}
                        />
                    }) }
                </tbody>
            </table>
        }
    })
}

#[function_component(StubRow)]
pub fn stub_row(props: &ExerciseProps) -> Html {
    let stub = use_stub(&props.track_id, &props.slug);

    html! {
        <tr>
            <td>{ props.slug.clone() }</td>
            <td>{ external_link(stub.url.as_deref(), render_remote(&stub, |length| check_mark(is_real_stub(*length)))) }</td>
        </tr>
    }
}

#[function_component(ExerciseDetails)]
pub fn exercise_details(props: &ExerciseProps) -> Html {
    let hide = use_hide_exercise();
    let canonical = use_canonical_list(props.branch);
    let version = use_remote_version(&props.track_id, &props.slug);
    let canonical_version = use_canonical_version(&props.slug, props.branch);
    let stub = use_stub(&props.track_id, &props.slug);

    let flags = render_remote(&canonical, |list| match list.get(&props.slug) {
        Some(exercise) => html! {
            <ul class="canonical-flags">
                <li>{ check_mark(exercise.description) }{ " description" }</li>
                <li>{ check_mark(exercise.tests) }{ " canonical data" }</li>
                <li>{ check_mark(exercise.meta) }{ " metadata" }</li>
                <li>{ check_mark(!exercise.deprecated) }{ " not deprecated" }</li>
            </ul>
        },
        None => html! { <p>{ "Not a canonical exercise." }</p> },
    });

    html! {
        <section class="exercise-details">
            <button onclick={move |_| hide.emit(())}>{ "Close" }</button>
            <h2>{ props.slug.clone() }</h2>
            { flags }
            <dl>
                <dt>{ "Canonical version" }</dt>
                <dd>{ render_remote(&canonical_version, |v| html! { <>{ v.clone() }</> }) }</dd>
                <dt>{ "Track version" }</dt>
                <dd>{ render_remote(&version, |v| html! { <>{ v.clone() }</> }) }</dd>
                <dt>{ "Stub" }</dt>
                <dd>{ render_remote(&stub, |length| html! { <>{ format!("{} characters", length) }</> }) }</dd>
            </dl>
        </section>
    }
}

#[derive(Properties, PartialEq)]
pub struct TrackAsideProps {
    pub track_id: AttrValue,
}

#[function_component(TrackAside)]
pub fn track_aside(props: &TrackAsideProps) -> Html {
    let config = use_track_config(&props.track_id);
    let test_runner = use_companion(&props.track_id, Companion::TestRunner);
    let analyzer = use_companion(&props.track_id, Companion::Analyzer);
    let representer = use_companion(&props.track_id, Companion::Representer);

    let checklist = render_remote(&config, |config| {
        let checklist = TrackChecklist::from_config(config);
        html! {
            <ul class="checklist">
                <li>{ check_mark(checklist.has_blurb) }{ " blurb" }</li>
                <li>{ check_mark(checklist.has_auto_approve) }{ " auto-approve" }</li>
                <li>{ check_mark(checklist.has_core()) }{ format!(" {} core exercise(s)", core_exercises(config).len()) }</li>
                <li>{ check_mark(checklist.has_topics()) }{ format!(" {} exercise(s) with topics", checklist.with_topics_count) }</li>
                <li>{ format!("{} foregone or deprecated", invalid_exercises(config).len()) }</li>
            </ul>
        }
    });

    html! {
        <aside>
            { checklist }
            <ul class="companions">
                { for [(Companion::TestRunner, test_runner), (Companion::Analyzer, analyzer), (Companion::Representer, representer)]
                    .into_iter()
                    .map(|(companion, found)| html! {
                        <li>
                            { render_remote(&found, |found| check_mark(*found)) }
                            { format!(" {}", companion.repository(&props.track_id)) }
                        </li>
                    }) }
            </ul>
        </aside>
    }
}
