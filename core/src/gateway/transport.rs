use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// Single-part multipart upload.
    File {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

// Bodies carry passwords; keep them out of logs.
impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Json(_) => f.write_str("Json(..)"),
            Body::Form(fields) => write!(f, "Form({} fields)", fields.len()),
            Body::File {
                field,
                file_name,
                bytes,
            } => write!(f, "File({}={}, {} bytes)", field, file_name, bytes.len()),
        }
    }
}

/// A call to the remote service, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::Validation(format!("Failed to encode body: {}", e)))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn form<K: Into<String>, V: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.body = Body::File {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        };
        self
    }
}

/// Raw response: status plus undecoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn from_json<T: Serialize>(status: u16, body: &T) -> Self {
        // Serializing plain data types into a Vec cannot fail.
        Self::new(status, serde_json::to_vec(body).unwrap_or_default())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Best human-readable failure text: `detail`, `error` or `message` from
    /// a JSON body, otherwise the (truncated) raw body.
    pub fn error_message(&self) -> String {
        if let Ok(value) = serde_json::from_slice::<Value>(&self.body) {
            for key in ["detail", "error", "message"] {
                match value.get(key) {
                    Some(Value::String(s)) => return s.clone(),
                    Some(other) if !other.is_null() => return other.to_string(),
                    _ => {}
                }
            }
        }
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.is_empty() {
            format!("status {}", self.status)
        } else {
            text.chars().take(200).collect()
        }
    }
}

/// Sends requests to the remote service. Implementations report only
/// transport-level failures as errors; any HTTP status is a response.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_query_and_headers() {
        let req = ApiRequest::get("/predict")
            .query("current_state", "sun")
            .query("n_days", 3)
            .header("Authorization", "Bearer t");

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query_value("n_days"), Some("3"));
        assert_eq!(req.header_value("authorization"), Some("Bearer t"));
        assert_eq!(req.body, Body::Empty);
    }

    #[test]
    fn test_form_body_debug_hides_values() {
        let req = ApiRequest::post("/token").form([("username", "u"), ("password", "hunter2")]);
        let shown = format!("{:?}", req);
        assert!(!shown.contains("hunter2"), "password leaked: {}", shown);
        assert!(shown.contains("Form(2 fields)"));
    }

    #[test]
    fn test_error_message_prefers_detail() {
        let resp = ApiResponse::from_json(400, &json!({"detail": "Email already registered"}));
        assert_eq!(resp.error_message(), "Email already registered");

        let resp = ApiResponse::from_json(200, &json!({"error": "bad csv"}));
        assert_eq!(resp.error_message(), "bad csv");
    }

    #[test]
    fn test_error_message_falls_back_to_text_and_status() {
        assert_eq!(
            ApiResponse::new(502, "Bad Gateway").error_message(),
            "Bad Gateway"
        );
        assert_eq!(ApiResponse::new(500, "").error_message(), "status 500");
    }

    #[test]
    fn test_json_decode_failure_is_decode_error() {
        let resp = ApiResponse::new(200, "<html>");
        let err = resp.json::<Value>().unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
