use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use weatherite_core::{auth, ClientError, Navigator, View};

use crate::api::{self, BrowserNavigator};

#[component]
pub fn LoginPage() -> impl IntoView {
    let (username, set_username) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (error, set_error) = signal::<Option<String>>(None);
    let (is_submitting, set_is_submitting) = signal(false);

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let (user, pass) = (username.get(), password.get());
        if user.trim().is_empty() || pass.is_empty() {
            set_error.set(Some("Enter your email or username and password".to_string()));
            return;
        }
        set_is_submitting.set(true);
        set_error.set(None);
        spawn_local(async move {
            let result = match api::gateway() {
                Ok(gateway) => auth::login(&gateway, user.trim(), &pass).await,
                Err(e) => Err(ClientError::Config(e)),
            };
            match result {
                // Full load so the header and every view see the new session.
                Ok(()) => BrowserNavigator.hard_redirect(View::Dashboard),
                Err(ClientError::Unauthorized) => {
                    set_error.set(Some("Invalid email or password".to_string()))
                }
                Err(e) => set_error.set(Some(e.to_string())),
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="page auth-page">
            <h2>"Login"</h2>
            <form class="auth-form" on:submit=on_submit>
                <div class="form-group">
                    <label for="username">"Email or username"</label>
                    <input
                        id="username"
                        type="text"
                        class="input"
                        autocomplete="username"
                        prop:value=move || username.get()
                        on:input=move |ev| set_username.set(event_target_value(&ev))
                    />
                </div>
                <div class="form-group">
                    <label for="password">"Password"</label>
                    <input
                        id="password"
                        type="password"
                        class="input"
                        autocomplete="current-password"
                        prop:value=move || password.get()
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                    />
                </div>
                <Show when=move || error.get().is_some()>
                    <p class="error-text">{move || error.get().unwrap_or_default()}</p>
                </Show>
                <button type="submit" class="btn btn-primary" disabled=move || is_submitting.get()>
                    {move || if is_submitting.get() { "Logging in..." } else { "Login" }}
                </button>
            </form>
            <p class="auth-switch">"No account? " <a href="/signup">"Sign up"</a></p>
        </div>
    }
}
