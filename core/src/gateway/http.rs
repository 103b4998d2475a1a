use url::Url;

use super::transport::{ApiRequest, ApiResponse, Body, Method, Transport};
use crate::config::ClientConfig;
use crate::error::ClientError;

/// `reqwest`-backed transport. Works natively and in the browser (fetch).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url()?;

        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs));

        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Resolve an endpoint path under the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.endpoint(&request.path)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(fields) => builder.form(&fields),
            Body::File {
                field,
                file_name,
                bytes,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                builder.multipart(reqwest::multipart::Form::new().part(field, part))
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
