use leptos::prelude::*;
use leptos_router::components::*;
use leptos_router::path;

use weatherite_core::{guard, Access, DatasetController, DatasetVersion, View};

use crate::api::LocalStorageCredentials;
use crate::components::header::Header;
use crate::pages::dashboard::DashboardPage;
use crate::pages::login::LoginPage;
use crate::pages::signup::SignupPage;
use crate::pages::weather::WeatherPage;

/// Shared dataset state. `version` mirrors `controller.version()` so views
/// can react to uploads and clears.
#[derive(Clone)]
pub struct DatasetContext {
    pub controller: DatasetController,
    pub version: ReadSignal<u64>,
}

#[component]
pub fn App() -> impl IntoView {
    let dataset_version = DatasetVersion::new();
    let (version, set_version) = signal(dataset_version.current());
    dataset_version.subscribe(move |v| set_version.set(v));
    provide_context(DatasetContext {
        controller: DatasetController::new(dataset_version),
        version,
    });

    view! {
        <Router>
            <div class="app-layout">
                <Header />
                <main class="content">
                    <Routes fallback=|| view! { <p>"Page not found"</p> }>
                        <Route path=path!("/login") view=LoginPage />
                        <Route path=path!("/signup") view=SignupPage />
                        <Route
                            path=path!("/")
                            view=|| view! { <Protected target=View::Weather><WeatherPage /></Protected> }
                        />
                        <Route
                            path=path!("/dashboard")
                            view=|| view! { <Protected target=View::Dashboard><DashboardPage /></Protected> }
                        />
                    </Routes>
                </main>
            </div>
        </Router>
    }
}

/// Renders `children` only while a credential is stored.
#[component]
fn Protected(target: View, children: ChildrenFn) -> impl IntoView {
    move || match guard(target, &LocalStorageCredentials::default()) {
        Access::Permit => children().into_any(),
        Access::Redirect(to) => view! { <Redirect path=to.path() /> }.into_any(),
    }
}
