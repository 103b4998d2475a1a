//! In-process stand-in for the remote service.
//!
//! Implements just enough of the endpoints to drive the client end to end:
//! token auth, registration, dataset upload/clear, statistics, and a
//! Markov-chain forecast computed from the active dataset.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{json, Value};

use weatherite_core::credential::MemoryCredentialStore;
use weatherite_core::gateway::{ApiRequest, ApiResponse, Body, Method, Transport};
use weatherite_core::navigation::ViewState;
use weatherite_core::{ClientError, Gateway};

pub const VALID_TOKEN: &str = "fixture-token";

/// Default dataset: every state has at least one outgoing transition.
const DEFAULT_HISTORY: &[&str] = &[
    "drizzle", "rain", "sun", "sun", "snow", "fog", "rain", "sun", "drizzle", "fog", "sun",
    "rain", "snow", "sun", "rain", "rain", "fog", "drizzle",
];

pub struct FixtureServer {
    users: RefCell<Vec<(String, String, String)>>,
    history: RefCell<Vec<String>>,
    /// Endpoint and status to answer the next matching call with instead of processing it.
    fail_next: RefCell<Option<(String, u16)>>,
    /// Reject every bearer token from now on.
    sessions_expired: Cell<bool>,
    pub requests: RefCell<Vec<ApiRequest>>,
}

impl Default for FixtureServer {
    fn default() -> Self {
        Self {
            users: RefCell::new(vec![(
                "ada@example.com".into(),
                "ada".into(),
                "correct horse".into(),
            )]),
            history: RefCell::new(default_history()),
            fail_next: RefCell::new(None),
            sessions_expired: Cell::new(false),
            requests: RefCell::new(Vec::new()),
        }
    }
}

fn default_history() -> Vec<String> {
    DEFAULT_HISTORY.iter().map(|s| s.to_string()).collect()
}

impl FixtureServer {
    pub fn fail_next_upload(&self, status: u16) {
        self.fail_next("/upload", status);
    }

    pub fn fail_next(&self, path: &str, status: u16) {
        *self.fail_next.borrow_mut() = Some((path.to_string(), status));
    }

    fn take_failure(&self, path: &str) -> Option<u16> {
        let mut pending = self.fail_next.borrow_mut();
        if matches!(pending.as_ref(), Some((p, _)) if p == path) {
            pending.take().map(|(_, status)| status)
        } else {
            None
        }
    }

    pub fn expire_sessions(&self) {
        self.sessions_expired.set(true);
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    fn authorized(&self, request: &ApiRequest) -> bool {
        let expected = format!("Bearer {}", VALID_TOKEN);
        !self.sessions_expired.get() && request.header_value("Authorization") == Some(expected.as_str())
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let public = matches!(request.path.as_str(), "/token" | "/register");
        if !public && !self.authorized(request) {
            return ApiResponse::from_json(401, &json!({"detail": "Could not validate credentials"}));
        }
        if let Some(status) = self.take_failure(&request.path) {
            return ApiResponse::from_json(status, &json!({"detail": "Internal Server Error"}));
        }
        match (request.method, request.path.as_str()) {
            (Method::Post, "/token") => self.token(request),
            (Method::Post, "/register") => self.register(request),
            (Method::Post, "/logout") => ApiResponse::from_json(200, &json!({"message": "bye"})),
            (Method::Post, "/upload") => self.upload(request),
            (Method::Post, "/clear") => {
                *self.history.borrow_mut() = default_history();
                ApiResponse::from_json(
                    200,
                    &json!({"message": "Uploaded file cleared. Using default CSV file."}),
                )
            }
            (Method::Get, "/predict") => self.predict(request),
            (Method::Get, "/weather-data") => ApiResponse::from_json(200, &self.stats()),
            (Method::Get, "/weather") => ApiResponse::from_json(
                200,
                &json!({"name": "Seattle", "main": {"temp": 11.5}, "visibility": 8000}),
            ),
            _ => ApiResponse::from_json(404, &json!({"detail": "Not Found"})),
        }
    }

    fn token(&self, request: &ApiRequest) -> ApiResponse {
        let Body::Form(fields) = &request.body else {
            return ApiResponse::from_json(422, &json!({"detail": "form expected"}));
        };
        let field = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let (username, password) = (field("username"), field("password"));
        let ok = self
            .users
            .borrow()
            .iter()
            .any(|(email, name, pw)| (*email == username || *name == username) && *pw == password);
        if ok {
            ApiResponse::from_json(200, &json!({"access_token": VALID_TOKEN, "token_type": "bearer"}))
        } else {
            ApiResponse::from_json(401, &json!({"detail": "Incorrect username or password"}))
        }
    }

    fn register(&self, request: &ApiRequest) -> ApiResponse {
        let Body::Json(body) = &request.body else {
            return ApiResponse::from_json(422, &json!({"detail": "json expected"}));
        };
        let get = |k: &str| body.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
        let (email, username, password) = (get("email"), get("username"), get("password"));
        let mut users = self.users.borrow_mut();
        if users.iter().any(|(e, u, _)| *e == email || *u == username) {
            return ApiResponse::from_json(400, &json!({"detail": "Email already registered"}));
        }
        users.push((email.clone(), username.clone(), password));
        ApiResponse::from_json(200, &json!({"email": email, "username": username}))
    }

    fn upload(&self, request: &ApiRequest) -> ApiResponse {
        let Body::File { bytes, .. } = &request.body else {
            return ApiResponse::from_json(422, &json!({"detail": "file expected"}));
        };
        match parse_weather_column(bytes) {
            Some(rows) if rows.len() > 1 => {
                *self.history.borrow_mut() = rows;
                ApiResponse::from_json(200, &json!({"message": "CSV file uploaded successfully"}))
            }
            // The real service reports processing failures with a 200.
            _ => ApiResponse::from_json(
                200,
                &json!({"error": "Error processing CSV file: 'weather'"}),
            ),
        }
    }

    fn predict(&self, request: &ApiRequest) -> ApiResponse {
        let state = request.query_value("current_state").unwrap_or_default();
        let n: u32 = match request.query_value("n_days").and_then(|v| v.parse().ok()) {
            Some(n) => n,
            None => return ApiResponse::from_json(422, &json!({"detail": "n_days"})),
        };
        let chain = MarkovChain::from_history(&self.history.borrow());
        let Some(index) = chain.states.iter().position(|s| s == state) else {
            return ApiResponse::from_json(
                200,
                &json!({"error": format!("Invalid current_state. Must be one of: {}", chain.states.join(", "))}),
            );
        };
        let probabilities = chain.step_distribution(index, n);
        let best = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probabilities[best] { i } else { best });
        ApiResponse::from_json(
            200,
            &json!({
                "message": format!("Predictions for {}th Day fetched", n),
                "data": {
                    "states": chain.states,
                    "probabilities": probabilities,
                    "most_likely_state": chain.states[best],
                }
            }),
        )
    }

    fn stats(&self) -> Value {
        let history = self.history.borrow();
        let chain = MarkovChain::from_history(&history);
        let mut state_counts: BTreeMap<&str, u64> = BTreeMap::new();
        for s in history.iter() {
            *state_counts.entry(s.as_str()).or_default() += 1;
        }
        let transitions: BTreeMap<&str, BTreeMap<&str, f64>> = chain
            .states
            .iter()
            .enumerate()
            .map(|(i, from)| {
                let row = chain
                    .states
                    .iter()
                    .enumerate()
                    .map(|(j, to)| (to.as_str(), chain.matrix[i][j]))
                    .collect();
                (from.as_str(), row)
            })
            .collect();
        json!({
            "states": chain.states,
            "state_counts": state_counts,
            "monthly_counts": {},
            "transitions": transitions,
        })
    }
}

impl Transport for FixtureServer {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.handle(&request);
        self.requests.borrow_mut().push(request);
        Ok(response)
    }
}

fn parse_weather_column(bytes: &[u8]) -> Option<Vec<String>> {
    let text = std::str::from_utf8(bytes).ok()?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next()?;
    let column = header.split(',').position(|h| h.trim() == "weather")?;
    Some(
        lines
            .filter_map(|l| l.split(',').nth(column).map(|v| v.trim().to_string()))
            .collect(),
    )
}

/// First-order chain over states in order of first appearance.
struct MarkovChain {
    states: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

impl MarkovChain {
    fn from_history(history: &[String]) -> Self {
        let mut states: Vec<String> = Vec::new();
        for s in history {
            if !states.contains(s) {
                states.push(s.clone());
            }
        }
        let index = |s: &String| states.iter().position(|x| x == s).unwrap_or(0);
        let n = states.len();
        let mut counts = vec![vec![0.0; n]; n];
        for pair in history.windows(2) {
            counts[index(&pair[0])][index(&pair[1])] += 1.0;
        }
        let matrix = counts
            .into_iter()
            .map(|row| {
                let total: f64 = row.iter().sum();
                row.into_iter().map(|c| c / total).collect()
            })
            .collect();
        Self { states, matrix }
    }

    /// Row `from` of the matrix raised to the `n`th power.
    fn step_distribution(&self, from: usize, n: u32) -> Vec<f64> {
        let size = self.states.len();
        let mut dist = vec![0.0; size];
        dist[from] = 1.0;
        for _ in 0..n {
            let mut next = vec![0.0; size];
            for (i, p) in dist.iter().enumerate() {
                for (j, q) in self.matrix[i].iter().enumerate() {
                    next[j] += p * q;
                }
            }
            dist = next;
        }
        dist
    }
}

/// Everything a test needs: the fixture, a shared credential store, the
/// active-view tracker, and a gateway wired to all three.
pub struct Harness {
    pub store: Rc<MemoryCredentialStore>,
    pub views: Rc<ViewState>,
    pub gateway: Gateway<FixtureServer>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Rc::new(MemoryCredentialStore::new());
        let views = Rc::new(ViewState::new(store.clone()));
        let gateway = Gateway::new(FixtureServer::default(), store.clone(), views.clone());
        Self {
            store,
            views,
            gateway,
        }
    }

    pub fn server(&self) -> &FixtureServer {
        self.gateway.transport()
    }
}

pub fn csv(rows: &[&str]) -> Vec<u8> {
    let mut out = String::from("date,precipitation,temp_max,temp_min,wind,weather\n");
    for (i, state) in rows.iter().enumerate() {
        out.push_str(&format!("2024-01-{:02},0.0,10.0,2.0,3.1,{}\n", i + 1, state));
    }
    out.into_bytes()
}
