//! Live conditions and aggregate statistics payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Transport};

/// `GET /weather` payload. The shape belongs to the live-conditions widgets,
/// so it is kept as a JSON object with a few typed accessors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveConditions(pub Map<String, Value>);

impl LiveConditions {
    /// Look up a dotted path such as `main.temp`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Top-level scalar fields, for a plain key/value rendering.
    pub fn scalar_fields(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k.clone(), s.clone())),
                Value::Number(n) => Some((k.clone(), n.to_string())),
                Value::Bool(b) => Some((k.clone(), b.to_string())),
                _ => None,
            })
            .collect()
    }
}

/// `GET /weather-data` payload: statistics over the active dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherStats {
    #[serde(default)]
    pub states: Vec<String>,
    /// Days observed per state.
    #[serde(default)]
    pub state_counts: BTreeMap<String, u64>,
    /// Month number ("1".."12") -> state -> days.
    #[serde(default)]
    pub monthly_counts: BTreeMap<String, BTreeMap<String, u64>>,
    /// From-state -> to-state -> transition count (or probability).
    #[serde(default)]
    pub transitions: BTreeMap<String, BTreeMap<String, f64>>,
}

impl WeatherStats {
    pub fn total_days(&self) -> u64 {
        self.state_counts.values().sum()
    }

    /// Months in calendar order, regardless of how the keys sort as strings.
    pub fn months(&self) -> Vec<(u32, &BTreeMap<String, u64>)> {
        let mut months: Vec<_> = self
            .monthly_counts
            .iter()
            .filter_map(|(k, v)| k.trim().parse::<u32>().ok().map(|m| (m, v)))
            .collect();
        months.sort_by_key(|(m, _)| *m);
        months
    }

    pub fn monthly_count(&self, month: u32, state: &str) -> u64 {
        self.monthly_counts
            .get(&month.to_string())
            .and_then(|m| m.get(state))
            .copied()
            .unwrap_or(0)
    }

    pub fn transition(&self, from: &str, to: &str) -> f64 {
        self.transitions
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(0.0)
    }
}

pub async fn live<T: Transport>(gateway: &Gateway<T>) -> Result<LiveConditions, ClientError> {
    gateway.fetch_json(ApiRequest::get("/weather")).await
}

/// Dataset-dependent: callers should commit the result through a
/// `VersionedView`.
pub async fn stats<T: Transport>(gateway: &Gateway<T>) -> Result<WeatherStats, ClientError> {
    gateway.fetch_json(ApiRequest::get("/weather-data")).await
}

/// Three-letter month label for 1..=12.
pub fn month_label(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    month
        .checked_sub(1)
        .and_then(|i| NAMES.get(i as usize))
        .copied()
        .unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats_fixture() -> WeatherStats {
        serde_json::from_value(json!({
            "states": ["rain", "sun"],
            "state_counts": {"rain": 10, "sun": 20},
            "monthly_counts": {
                "10": {"rain": 4},
                "2": {"rain": 3, "sun": 1},
                "1": {"sun": 5}
            },
            "transitions": {"rain": {"rain": 0.6, "sun": 0.4}}
        }))
        .unwrap()
    }

    #[test]
    fn test_months_sort_numerically() {
        let stats = stats_fixture();
        let order: Vec<u32> = stats.months().into_iter().map(|(m, _)| m).collect();
        assert_eq!(order, vec![1, 2, 10]);
        assert_eq!(stats.monthly_count(2, "rain"), 3);
        assert_eq!(stats.monthly_count(2, "snow"), 0);
        assert_eq!(stats.total_days(), 30);
    }

    #[test]
    fn test_missing_sections_default() {
        let stats: WeatherStats = serde_json::from_value(json!({"states": []})).unwrap();
        assert!(stats.transitions.is_empty());
        assert_eq!(stats.transition("rain", "sun"), 0.0);
    }

    #[test]
    fn test_live_conditions_paths() {
        let live: LiveConditions = serde_json::from_value(json!({
            "name": "Karachi",
            "main": {"temp": 31.5},
            "visibility": 6000
        }))
        .unwrap();
        assert_eq!(live.text("name"), Some("Karachi"));
        assert_eq!(live.number("main.temp"), Some(31.5));
        assert_eq!(live.get("main.pressure"), None);

        let fields = live.scalar_fields();
        assert!(fields.contains(&("visibility".to_string(), "6000".to_string())));
        assert!(!fields.iter().any(|(k, _)| k == "main"));
    }

    #[test]
    fn test_month_label_bounds() {
        assert_eq!(month_label(1), "Jan");
        assert_eq!(month_label(12), "Dec");
        assert_eq!(month_label(0), "?");
        assert_eq!(month_label(13), "?");
    }
}
