//! Statistics over the active dataset. Re-fetched once for every dataset
//! version; results that arrive for an older version are dropped.

use std::sync::{Arc, Mutex};

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use weatherite_core::dataset::{Commit, VersionedView};
use weatherite_core::weather::{self, month_label, WeatherStats};

use crate::api;
use crate::app::DatasetContext;

#[component]
pub fn WeatherVisualizations() -> impl IntoView {
    let dataset = expect_context::<DatasetContext>();
    let shown = Arc::new(Mutex::new(VersionedView::<WeatherStats>::new()));
    // Committed stats tagged with the dataset version they were fetched at.
    let (stats, set_stats) = signal::<Option<(u64, WeatherStats)>>(None);
    let (error, set_error) = signal::<Option<String>>(None);

    let version = dataset.version;
    let controller = dataset.controller;
    Effect::new(move |_| {
        let current = version.get();
        let ticket = match shown.lock() {
            Ok(mut view) => view.refetch_needed(current),
            Err(_) => None,
        };
        let Some(ticket) = ticket else {
            return;
        };
        set_error.set(None);
        let controller = controller.clone();
        let shown = shown.clone();
        spawn_local(async move {
            let result = match api::gateway() {
                Ok(gateway) => weather::stats(&gateway).await.map_err(api::inline_error),
                Err(e) => Err(Some(e)),
            };
            let Ok(mut view) = shown.lock() else {
                return;
            };
            let now = controller.version().current();
            match result {
                Ok(fetched) => {
                    if view.commit(ticket, fetched, now) == Commit::Applied {
                        set_stats.set(view.value().cloned().map(|s| (ticket.version(), s)));
                        set_error.set(None);
                    }
                }
                // A failure of a superseded fetch says nothing about what is shown now.
                Err(Some(e)) if view.is_latest(ticket, now) => {
                    api::console_error(&format!("Failed to load statistics: {}", e));
                    set_error.set(Some(e));
                }
                Err(_) => {}
            }
        });
    });

    view! {
        <section class="visualizations">
            <h3>"Dataset Statistics"</h3>
            <Show when=move || error.get().is_some()>
                <p class="error-text">{move || error.get().unwrap_or_default()}</p>
            </Show>
            {move || {
                let current = version.get();
                match stats.get() {
                    Some((fetched_at, stats)) if fetched_at == current => view! {
                        <StateCounts stats=stats.clone() />
                        <MonthlyTable stats=stats.clone() />
                        <TransitionMatrix stats=stats />
                    }
                    .into_any(),
                    // Nothing shown, or data from a replaced dataset.
                    _ if error.get().is_some() => ().into_any(),
                    _ => view! { <p class="loading">"Loading visualizations..."</p> }.into_any(),
                }
            }}
        </section>
    }
}

#[component]
fn StateCounts(stats: WeatherStats) -> impl IntoView {
    let total = stats.total_days().max(1) as f64;
    let rows = stats
        .state_counts
        .iter()
        .map(|(state, count)| {
            let width = format!("width: {:.1}%", *count as f64 / total * 100.0);
            view! {
                <div class="count-row">
                    <span class="count-state">{state.clone()}</span>
                    <div class="count-track"><div class="count-bar" style=width></div></div>
                    <span class="count-value">{count.to_string()}</span>
                </div>
            }
        })
        .collect_view();

    view! {
        <div class="state-counts">
            <h4>{format!("Days per state ({} total)", stats.total_days())}</h4>
            {rows}
        </div>
    }
}

#[component]
fn MonthlyTable(stats: WeatherStats) -> impl IntoView {
    if stats.monthly_counts.is_empty() {
        return ().into_any();
    }
    let header = stats
        .states
        .iter()
        .map(|s| view! { <th>{s.clone()}</th> })
        .collect_view();
    let rows = stats
        .months()
        .into_iter()
        .map(|(month, _)| {
            let cells = stats
                .states
                .iter()
                .map(|s| view! { <td>{stats.monthly_count(month, s).to_string()}</td> })
                .collect_view();
            view! { <tr><th>{month_label(month)}</th>{cells}</tr> }
        })
        .collect_view();

    view! {
        <table class="monthly-table">
            <thead><tr><th>"Month"</th>{header}</tr></thead>
            <tbody>{rows}</tbody>
        </table>
    }
    .into_any()
}

#[component]
fn TransitionMatrix(stats: WeatherStats) -> impl IntoView {
    if stats.transitions.is_empty() {
        return ().into_any();
    }
    let header = stats
        .states
        .iter()
        .map(|s| view! { <th>{s.clone()}</th> })
        .collect_view();
    let rows = stats
        .states
        .iter()
        .map(|from| {
            let cells = stats
                .states
                .iter()
                .map(|to| view! { <td>{format!("{:.2}", stats.transition(from, to))}</td> })
                .collect_view();
            view! { <tr><th>{from.clone()}</th>{cells}</tr> }
        })
        .collect_view();

    view! {
        <table class="transition-matrix">
            <caption>"Transitions (from row to column)"</caption>
            <thead><tr><th></th>{header}</tr></thead>
            <tbody>{rows}</tbody>
        </table>
    }
    .into_any()
}
