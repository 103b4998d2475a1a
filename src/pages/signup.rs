use leptos::prelude::*;
use leptos_router::hooks::use_navigate;
use wasm_bindgen_futures::spawn_local;

use weatherite_core::auth::{self, Registration};
use weatherite_core::{ClientError, View};

use crate::api;

const MIN_PASSWORD_LEN: usize = 6;

#[component]
pub fn SignupPage() -> impl IntoView {
    let navigate = use_navigate();
    let (email, set_email) = signal(String::new());
    let (username, set_username) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (confirm, set_confirm) = signal(String::new());
    let (error, set_error) = signal::<Option<String>>(None);
    let (is_submitting, set_is_submitting) = signal(false);

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let registration = Registration {
            email: email.get().trim().to_string(),
            username: username.get().trim().to_string(),
            password: password.get(),
        };
        if let Some(problem) = check_registration(&registration, &confirm.get()) {
            set_error.set(Some(problem));
            return;
        }
        set_is_submitting.set(true);
        set_error.set(None);
        let navigate = navigate.clone();
        spawn_local(async move {
            let result = match api::gateway() {
                Ok(gateway) => auth::register(&gateway, &registration).await,
                Err(e) => Err(ClientError::Config(e)),
            };
            match result {
                Ok(()) => navigate(View::Login.path(), Default::default()),
                Err(ClientError::Conflict(_)) => {
                    set_error.set(Some("Email or username already exists".to_string()))
                }
                Err(e) => set_error.set(Some(e.to_string())),
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="page auth-page">
            <h2>"Sign Up"</h2>
            <form class="auth-form" on:submit=on_submit>
                <div class="form-group">
                    <label for="email">"Email"</label>
                    <input
                        id="email"
                        type="email"
                        class="input"
                        prop:value=move || email.get()
                        on:input=move |ev| set_email.set(event_target_value(&ev))
                    />
                </div>
                <div class="form-group">
                    <label for="username">"Username"</label>
                    <input
                        id="username"
                        type="text"
                        class="input"
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
                        autocomplete="new-password"
                        prop:value=move || password.get()
                        on:input=move |ev| set_password.set(event_target_value(&ev))
                    />
                </div>
                <div class="form-group">
                    <label for="confirm">"Confirm password"</label>
                    <input
                        id="confirm"
                        type="password"
                        class="input"
                        autocomplete="new-password"
                        prop:value=move || confirm.get()
                        on:input=move |ev| set_confirm.set(event_target_value(&ev))
                    />
                </div>
                <Show when=move || error.get().is_some()>
                    <p class="error-text">{move || error.get().unwrap_or_default()}</p>
                </Show>
                <button type="submit" class="btn btn-primary" disabled=move || is_submitting.get()>
                    {move || if is_submitting.get() { "Creating account..." } else { "Sign Up" }}
                </button>
            </form>
            <p class="auth-switch">"Already registered? " <a href="/login">"Log in"</a></p>
        </div>
    }
}

/// Client-side checks; the server remains the authority on uniqueness.
fn check_registration(registration: &Registration, confirm: &str) -> Option<String> {
    if registration.email.is_empty() || !registration.email.contains('@') {
        return Some("Enter a valid email address".to_string());
    }
    if registration.username.is_empty() {
        return Some("Choose a username".to_string());
    }
    if registration.password.len() < MIN_PASSWORD_LEN {
        return Some(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if registration.password != confirm {
        return Some("Passwords do not match".to_string());
    }
    None
}
