use leptos::prelude::*;

use weatherite_core::ForecastResult;

/// Horizontal bar per state; the most likely one is highlighted.
#[component]
pub fn ForecastChart(result: ForecastResult, horizon_days: u32) -> impl IntoView {
    let most_likely = result.most_likely_state.clone();
    let rows = result
        .entries()
        .map(|(state, p)| {
            let class = if state == most_likely {
                "forecast-bar forecast-bar-top"
            } else {
                "forecast-bar"
            };
            let width = format!("width: {:.1}%", (p * 100.0).clamp(0.0, 100.0));
            view! {
                <div class="forecast-row">
                    <span class="forecast-state">{state.to_string()}</span>
                    <div class="forecast-track">
                        <div class=class style=width></div>
                    </div>
                    <span class="forecast-value">{format!("{:.2}%", p * 100.0)}</span>
                </div>
            }
        })
        .collect_view();

    view! {
        <div class="forecast-chart">
            <h3>{format!("Weather probabilities after {} day(s)", horizon_days)}</h3>
            {rows}
            <p class="forecast-summary">
                "Most likely: " <strong>{result.most_likely_state.clone()}</strong>
            </p>
            {result.data_source.clone().map(|source| view! {
                <p class="forecast-source">{format!("Dataset: {}", source)}</p>
            })}
        </div>
    }
}
