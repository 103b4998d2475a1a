pub mod auth;
pub mod config;
pub mod credential;
pub mod dataset;
mod error;
pub mod forecast;
pub mod gateway;
pub mod navigation;
pub mod weather;

pub use config::ClientConfig;
pub use credential::{Credential, CredentialStore};
pub use dataset::{DatasetController, DatasetVersion, VersionedView};
pub use error::{ClientError, ErrorKind};
pub use forecast::{ForecastParams, ForecastResult, WeatherState};
pub use gateway::{Gateway, HttpTransport, Transport};
pub use navigation::{guard, Access, Navigator, View};

/// Install the `tracing` subscriber for native hosts. `RUST_LOG` overrides
/// the default `info` level.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
