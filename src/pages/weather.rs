use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use weatherite_core::weather::{self, LiveConditions};

use crate::api;

#[component]
pub fn WeatherPage() -> impl IntoView {
    let (conditions, set_conditions) = signal::<Option<LiveConditions>>(None);
    let (error, set_error) = signal::<Option<String>>(None);

    // Load current conditions on mount
    Effect::new(move |_| {
        spawn_local(async move {
            let result = match api::gateway() {
                Ok(gateway) => weather::live(&gateway).await.map_err(api::inline_error),
                Err(e) => Err(Some(e)),
            };
            match result {
                Ok(live) => set_conditions.set(Some(live)),
                Err(Some(e)) => {
                    api::console_error(&format!("Failed to load weather: {}", e));
                    set_error.set(Some(e));
                }
                Err(None) => {}
            }
        });
    });

    view! {
        <div class="page weather-page">
            <h2>"Current Weather"</h2>
            <Show when=move || error.get().is_some()>
                <p class="error-text">{move || error.get().unwrap_or_default()}</p>
            </Show>
            {move || conditions.get().map(|live| {
                let headline = live.text("name").map(|name| {
                    let temp = live
                        .number("main.temp")
                        .map(|t| format!("{:.1}\u{b0}", t))
                        .unwrap_or_default();
                    view! { <h3 class="weather-headline">{format!("{} {}", name, temp)}</h3> }
                });
                let rows = live
                    .scalar_fields()
                    .into_iter()
                    .map(|(key, value)| view! {
                        <tr><th>{key}</th><td>{value}</td></tr>
                    })
                    .collect_view();
                view! {
                    {headline}
                    <table class="weather-table"><tbody>{rows}</tbody></table>
                }
            })}
        </div>
    }
}
