use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use weatherite_core::{auth, Navigator, View};

use crate::api::{self, BrowserNavigator};

#[component]
pub fn Header() -> impl IntoView {
    let logged_in = api::is_logged_in();

    let on_logout = move |_| {
        spawn_local(async move {
            match api::gateway() {
                Ok(gateway) => auth::logout(&gateway).await,
                Err(e) => api::console_error(&format!("Logout without gateway: {}", e)),
            }
            BrowserNavigator.hard_redirect(View::ENTRY);
        });
    };

    view! {
        <nav class="header">
            <div class="header-brand">
                <h1 class="header-title">"Weatherite"</h1>
                <p class="header-subtitle">"Weather Forecasts"</p>
            </div>
            <Show
                when=move || logged_in
                fallback=|| view! {
                    <ul class="nav-list">
                        <li class="nav-item"><a href="/login" class="nav-link">"Login"</a></li>
                        <li class="nav-item"><a href="/signup" class="nav-link">"Sign Up"</a></li>
                    </ul>
                }
            >
                <ul class="nav-list">
                    <li class="nav-item"><a href="/" class="nav-link">"Weather"</a></li>
                    <li class="nav-item"><a href="/dashboard" class="nav-link">"Dashboard"</a></li>
                    <li class="nav-item">
                        <button class="btn btn-logout" on:click=on_logout>"Logout"</button>
                    </li>
                </ul>
            </Show>
        </nav>
    }
}
