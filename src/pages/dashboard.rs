//! Dashboard page: forecast query, dataset upload/clear, and statistics.

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use weatherite_core::forecast::{self, ForecastParams, ForecastResult, LatestRequest, WeatherState};

use crate::api;
use crate::app::DatasetContext;
use crate::components::forecast_chart::ForecastChart;
use crate::components::weather_visualizations::WeatherVisualizations;

#[derive(Debug, Clone, PartialEq)]
enum ForecastState {
    Idle,
    Loading,
    Ready(ForecastResult, u32),
    Error(String),
}

#[component]
pub fn DashboardPage() -> impl IntoView {
    let dataset = expect_context::<DatasetContext>();
    let defaults = api::config().default_forecast().unwrap_or_default();

    let (current_state, set_current_state) = signal(defaults.current_state().to_string());
    let (horizon_days, set_horizon_days) = signal(defaults.horizon_days().to_string());
    let (forecast_state, set_forecast_state) = signal(ForecastState::Idle);

    let (upload_status, set_upload_status) = signal::<Option<String>>(None);
    let (upload_error, set_upload_error) = signal::<Option<String>>(None);
    let (is_busy, set_is_busy) = signal(false);

    let forecasts = StoredValue::new(LatestRequest::new());
    let run_forecast = move |state: String, days: String| {
        // Numbered even when invalid, so the error replaces any reply still in flight.
        let latest = forecasts.get_value();
        let seq = latest.issue();
        // Validation happens before any request is issued.
        let params = match ForecastParams::parse(&state, &days) {
            Ok(params) => params,
            Err(e) => {
                set_forecast_state.set(ForecastState::Error(e.to_string()));
                return;
            }
        };
        set_forecast_state.set(ForecastState::Loading);
        spawn_local(async move {
            let result = match api::gateway() {
                Ok(gateway) => forecast::fetch(&gateway, &params).await.map_err(api::inline_error),
                Err(e) => Err(Some(e)),
            };
            // A later Predict (or the mount-time fetch racing a click) owns the chart.
            if !latest.is_latest(seq) {
                return;
            }
            match result {
                Ok(result) => {
                    set_forecast_state.set(ForecastState::Ready(result, params.horizon_days()))
                }
                Err(Some(e)) => set_forecast_state.set(ForecastState::Error(e)),
                Err(None) => set_forecast_state.set(ForecastState::Idle),
            }
        });
    };

    // One forecast with the defaults on mount; afterwards only on request.
    Effect::new(move |_| {
        run_forecast(current_state.get_untracked(), horizon_days.get_untracked());
    });

    let on_forecast = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        run_forecast(current_state.get(), horizon_days.get());
    };

    let version = dataset.version;
    let source = dataset.controller.clone();
    // Re-read on every version change; the controller records the source before bumping.
    let using_default = move || {
        version.get();
        source.using_default()
    };
    let show_reset = {
        let using_default = using_default.clone();
        move || !using_default()
    };

    let controller = dataset.controller.clone();
    let on_file_change = move |ev: web_sys::Event| {
        let Some(file) = input_element(&ev)
            .and_then(|input| input.files())
            .and_then(|files| files.get(0))
        else {
            return;
        };
        let controller = controller.clone();
        set_is_busy.set(true);
        set_upload_status.set(None);
        set_upload_error.set(None);
        spawn_local(async move {
            let name = file.name();
            let outcome = match read_file_bytes(file).await {
                Ok(bytes) => match api::gateway() {
                    Ok(gateway) => controller
                        .upload(&gateway, &name, bytes)
                        .await
                        .map_err(api::inline_error),
                    Err(e) => Err(Some(e)),
                },
                Err(e) => Err(Some(e)),
            };
            match outcome {
                Ok(message) => set_upload_status.set(Some(message)),
                Err(Some(e)) => {
                    api::console_error(&format!("Upload failed: {}", e));
                    set_upload_error.set(Some(e));
                }
                Err(None) => {}
            }
            set_is_busy.set(false);
        });
    };

    let controller = dataset.controller.clone();
    let on_clear = move |_: web_sys::MouseEvent| {
        let controller = controller.clone();
        set_is_busy.set(true);
        set_upload_status.set(None);
        set_upload_error.set(None);
        spawn_local(async move {
            let outcome = match api::gateway() {
                Ok(gateway) => controller.clear(&gateway).await.map_err(api::inline_error),
                Err(e) => Err(Some(e)),
            };
            match outcome {
                Ok(message) => set_upload_status.set(Some(message)),
                Err(Some(e)) => set_upload_error.set(Some(e)),
                Err(None) => {}
            }
            set_is_busy.set(false);
        });
    };

    let state_options = WeatherState::ALL
        .iter()
        .map(|s| view! { <option value=s.as_str()>{s.as_str()}</option> })
        .collect_view();

    view! {
        <div class="page dashboard-page">
            <h2>"Dashboard"</h2>

            <section class="dashboard-section">
                <h3>"Forecast"</h3>
                <form class="forecast-form" on:submit=on_forecast>
                    <div class="form-group">
                        <label for="current-state">"Current weather"</label>
                        <select
                            id="current-state"
                            class="input"
                            prop:value=move || current_state.get()
                            on:change=move |ev| set_current_state.set(event_target_value(&ev))
                        >
                            {state_options}
                        </select>
                    </div>
                    <div class="form-group">
                        <label for="horizon-days">"Days ahead"</label>
                        <input
                            id="horizon-days"
                            type="number"
                            min="1"
                            class="input"
                            prop:value=move || horizon_days.get()
                            on:input=move |ev| set_horizon_days.set(event_target_value(&ev))
                        />
                    </div>
                    <button type="submit" class="btn btn-primary">"Predict"</button>
                </form>
                {move || match forecast_state.get() {
                    ForecastState::Idle => ().into_any(),
                    ForecastState::Loading => view! { <p class="loading">"Predicting..."</p> }.into_any(),
                    ForecastState::Ready(result, days) => {
                        view! { <ForecastChart result=result horizon_days=days /> }.into_any()
                    }
                    ForecastState::Error(e) => view! { <p class="error-text">{e}</p> }.into_any(),
                }}
            </section>

            <section class="dashboard-section">
                <h3>"Dataset"</h3>
                <p class="section-description">
                    "Upload a CSV with a weather column to replace the dataset, or reset to the default."
                </p>
                <div class="input-row">
                    <input
                        type="file"
                        accept=".csv"
                        class="input"
                        disabled=move || is_busy.get()
                        on:change=on_file_change
                    />
                    <Show when=show_reset>
                        <button class="btn" disabled=move || is_busy.get() on:click=on_clear.clone()>
                            "Reset to default"
                        </button>
                    </Show>
                </div>
                <Show when=using_default>
                    <p class="status-text">"Using default CSV file."</p>
                </Show>
                <Show when=move || upload_status.get().is_some()>
                    <span class="status-text">{move || upload_status.get().unwrap_or_default()}</span>
                </Show>
                <Show when=move || upload_error.get().is_some()>
                    <span class="error-text">{move || upload_error.get().unwrap_or_default()}</span>
                </Show>
            </section>

            <WeatherVisualizations />
        </div>
    }
}

async fn read_file_bytes(file: web_sys::File) -> Result<Vec<u8>, String> {
    use js_sys::{ArrayBuffer, Uint8Array};
    use wasm_bindgen_futures::JsFuture;

    let array_buffer: ArrayBuffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("Failed to read file: {:?}", e))?
        .dyn_into()
        .map_err(|_| "Failed to convert to ArrayBuffer")?;

    Ok(Uint8Array::new(&array_buffer).to_vec())
}

fn input_element(ev: &web_sys::Event) -> Option<web_sys::HtmlInputElement> {
    ev.target().and_then(|t| t.dyn_into().ok())
}
