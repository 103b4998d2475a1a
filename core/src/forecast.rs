//! Forecast Query: n-day weather-state probabilities from the remote model.
//!
//! Forecasts are computed against whatever dataset is active when the query
//! runs. They are deliberately not tied to the dataset version; callers that
//! want a forecast reflecting a new upload must ask again.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherState {
    Drizzle,
    Rain,
    #[default]
    Sun,
    Snow,
    Fog,
}

impl WeatherState {
    pub const ALL: [WeatherState; 5] = [
        WeatherState::Drizzle,
        WeatherState::Rain,
        WeatherState::Sun,
        WeatherState::Snow,
        WeatherState::Fog,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherState::Drizzle => "drizzle",
            WeatherState::Rain => "rain",
            WeatherState::Sun => "sun",
            WeatherState::Snow => "snow",
            WeatherState::Fog => "fog",
        }
    }
}

impl fmt::Display for WeatherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherState {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        WeatherState::ALL
            .into_iter()
            .find(|state| state.as_str() == needle)
            .ok_or_else(|| {
                ClientError::Validation(format!(
                    "unknown weather state '{}', expected one of drizzle, rain, sun, snow, fog",
                    s
                ))
            })
    }
}

/// Validated query input. `horizon_days` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastParams {
    current_state: WeatherState,
    horizon_days: u32,
}

impl ForecastParams {
    pub const DEFAULT_HORIZON_DAYS: u32 = 3;

    pub fn new(current_state: WeatherState, horizon_days: u32) -> Result<Self, ClientError> {
        if horizon_days < 1 {
            return Err(ClientError::Validation(
                "number of days must be at least 1".into(),
            ));
        }
        Ok(Self {
            current_state,
            horizon_days,
        })
    }

    /// Parse raw form input (e.g. a number field that may hold "0", "-2" or "").
    pub fn parse(current_state: &str, horizon_days: &str) -> Result<Self, ClientError> {
        let state = current_state.parse()?;
        let days: i128 = horizon_days.trim().parse().map_err(|_| {
            ClientError::Validation(format!("'{}' is not a whole number of days", horizon_days))
        })?;
        if days < 1 {
            return Err(ClientError::Validation(
                "number of days must be at least 1".into(),
            ));
        }
        let days = u32::try_from(days).map_err(|_| {
            ClientError::Validation(format!(
                "number of days is too large (at most {})",
                u32::MAX
            ))
        })?;
        Self::new(state, days)
    }

    pub fn current_state(&self) -> WeatherState {
        self.current_state
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            current_state: WeatherState::Sun,
            horizon_days: Self::DEFAULT_HORIZON_DAYS,
        }
    }
}

/// Distribution over weather states `horizon_days` from now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub states: Vec<String>,
    pub probabilities: Vec<f64>,
    pub most_likely_state: String,
    /// Which dataset produced it, when the service says so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
}

impl ForecastResult {
    /// `(state, probability)` pairs in server order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.states
            .iter()
            .map(String::as_str)
            .zip(self.probabilities.iter().copied())
    }

    pub fn total_probability(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    /// State with the highest probability (first one on ties).
    pub fn argmax_state(&self) -> Option<&str> {
        let mut best = None;
        for (state, p) in self.entries() {
            match best {
                Some((_, bp)) if bp >= p => {}
                _ => best = Some((state, p)),
            }
        }
        best.map(|(state, _)| state)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastReply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<ForecastResult>,
    #[serde(default)]
    error: Option<String>,
}

/// `GET /predict`. Invalid parameters cannot be constructed, so every call
/// that reaches this function is sent.
pub async fn fetch<T: Transport>(
    gateway: &Gateway<T>,
    params: &ForecastParams,
) -> Result<ForecastResult, ClientError> {
    let request = ApiRequest::get("/predict")
        .query("current_state", params.current_state())
        .query("n_days", params.horizon_days());
    let reply: ForecastReply = gateway.fetch_json(request).await?;

    if let Some(error) = reply.error {
        warn!("Forecast rejected: {}", error);
        return Err(ClientError::Rejected(error));
    }
    let result = reply
        .data
        .ok_or_else(|| ClientError::Decode("forecast reply has no data".into()))?;
    if result.states.len() != result.probabilities.len() {
        return Err(ClientError::Decode(format!(
            "{} states but {} probabilities",
            result.states.len(),
            result.probabilities.len()
        )));
    }

    info!(
        "{}",
        reply
            .message
            .unwrap_or_else(|| format!("Forecast for {} day(s) fetched", params.horizon_days()))
    );
    Ok(result)
}

/// Numbers forecast requests so that only the most recently issued one is
/// shown. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct LatestRequest {
    issued: Arc<AtomicU64>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number for a request about to be sent.
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// False once a later request has been issued.
    pub fn is_latest(&self, seq: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == seq
    }
}

/// Validate raw input and fetch. Invalid input never reaches the network.
pub async fn fetch_raw<T: Transport>(
    gateway: &Gateway<T>,
    current_state: &str,
    horizon_days: &str,
) -> Result<ForecastResult, ClientError> {
    let params = ForecastParams::parse(current_state, horizon_days)?;
    fetch(gateway, &params).await
}
