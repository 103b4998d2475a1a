use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use weatherite_core::auth::{self, Registration};
use weatherite_core::credential::{is_authenticated, FileCredentialStore};
use weatherite_core::navigation::ViewState;
use weatherite_core::weather::{self, month_label};
use weatherite_core::{
    forecast, ClientConfig, ClientError, DatasetController, ForecastParams, Gateway,
    HttpTransport, View,
};

#[derive(Parser)]
#[command(name = "weatherite", version, about = "Weather forecasts from the Weatherite service")]
struct Cli {
    /// Config file (default: <config dir>/weatherite/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where to keep the session credential (default: <config dir>/weatherite/<storage_key>.json)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session credential
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        email: String,
        username: String,
        #[arg(long)]
        password: String,
    },
    /// End the session
    Logout,
    /// Show whether a session credential is stored
    Status,
    /// Current weather conditions
    Weather,
    /// Statistics over the active dataset
    Stats,
    /// Probability of each weather state after N days
    Forecast {
        /// drizzle, rain, sun, snow or fog
        #[arg(long)]
        state: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        days: Option<String>,
    },
    /// Replace the server-side dataset with a CSV file
    Upload { file: PathBuf },
    /// Reset the server-side dataset to its default
    Clear,
}

impl Command {
    /// The view this command corresponds to, if it renders one.
    fn view(&self) -> Option<View> {
        match self {
            Command::Login { .. } => Some(View::Login),
            Command::Signup { .. } => Some(View::Signup),
            Command::Weather => Some(View::Weather),
            Command::Stats | Command::Forecast { .. } | Command::Upload { .. } | Command::Clear => {
                Some(View::Dashboard)
            }
            Command::Logout | Command::Status => None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    weatherite_core::init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let config = match path.map(Path::to_path_buf).or_else(ClientConfig::default_path) {
        Some(path) => ClientConfig::load(&path)?,
        None => ClientConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let store = Rc::new(match cli.session {
        Some(path) => FileCredentialStore::new(path),
        None => FileCredentialStore::in_config_dir(&config.storage_key)
            .context("No config directory on this platform; pass --session")?,
    });
    debug!("Session file: {:?}", store.path());

    let views = Rc::new(ViewState::new(store.clone()));
    let gateway = Gateway::new(HttpTransport::new(&config)?, store.clone(), views.clone());

    if let Some(target) = cli.command.view() {
        let landed = views.navigate(target);
        if landed != target {
            println!("Not logged in. Run `weatherite login <username> --password ...` first.");
            return Ok(());
        }
    }

    match dispatch(cli.command, &config, &gateway, &store).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_session_expired() => {
            // The gateway already cleared the credential.
            println!("Session expired or credentials rejected. Please log in again.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn dispatch(
    command: Command,
    config: &ClientConfig,
    gateway: &Gateway<HttpTransport>,
    store: &FileCredentialStore,
) -> Result<(), ClientError> {
    match command {
        Command::Login { username, password } => {
            auth::login(gateway, &username, &password).await?;
            println!("Login successful.");
        }
        Command::Signup {
            email,
            username,
            password,
        } => {
            let registration = Registration {
                email,
                username,
                password,
            };
            match auth::register(gateway, &registration).await {
                Err(ClientError::Conflict(_)) => {
                    println!("Email or username already exists.");
                }
                other => {
                    other?;
                    println!("Account created. Please log in.");
                }
            }
        }
        Command::Logout => {
            auth::logout(gateway).await;
            println!("Logged out.");
        }
        Command::Status => {
            if is_authenticated(store) {
                match store.saved_at() {
                    Some(at) => println!("Logged in (since {}).", at.format("%Y-%m-%d %H:%M UTC")),
                    None => println!("Logged in."),
                }
            } else {
                println!("Not logged in.");
            }
        }
        Command::Weather => {
            let live = weather::live(gateway).await?;
            for (key, value) in live.scalar_fields() {
                println!("{:<16} {}", key, value);
            }
        }
        Command::Stats => print_stats(&weather::stats(gateway).await?),
        Command::Forecast { state, days } => {
            let defaults = config.default_forecast()?;
            let params = ForecastParams::parse(
                state.as_deref().unwrap_or(defaults.current_state().as_str()),
                &days.unwrap_or_else(|| defaults.horizon_days().to_string()),
            )?;
            let result = forecast::fetch(gateway, &params).await?;
            println!(
                "Weather probabilities after {} day(s), starting from {}:",
                params.horizon_days(),
                params.current_state()
            );
            for (state, p) in result.entries() {
                let bar = "#".repeat((p * 40.0).round() as usize);
                println!("  {:<8} {:>6.2}%  {}", state, p * 100.0, bar);
            }
            println!("Most likely: {}", result.most_likely_state);
        }
        Command::Upload { file } => {
            let bytes = std::fs::read(&file).map_err(|e| {
                ClientError::Validation(format!("Failed to read {:?}: {}", file, e))
            })?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.csv".to_string());
            let message = DatasetController::default().upload(gateway, &name, bytes).await?;
            println!("{}", message);
        }
        Command::Clear => {
            let message = DatasetController::default().clear(gateway).await?;
            println!("{}", message);
        }
    }
    Ok(())
}

fn print_stats(stats: &weather::WeatherStats) {
    println!("{} days observed", stats.total_days());
    for (state, count) in &stats.state_counts {
        println!("  {:<8} {}", state, count);
    }
    if !stats.monthly_counts.is_empty() {
        println!("By month:");
        for (month, counts) in stats.months() {
            let line: Vec<String> = stats
                .states
                .iter()
                .map(|s| format!("{}={}", s, counts.get(s).copied().unwrap_or(0)))
                .collect();
            println!("  {}  {}", month_label(month), line.join(" "));
        }
    }
}
