use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const X_CALLER_ID: &str = "X-Caller-Id";
pub const X_CALLER_SECRET: &str = "X-Caller-Secret";

/// Caller id and plaintext secret sent with every request.
#[derive(Clone)]
pub struct Credentials {
    pub caller_id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(caller_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("caller_id", &self.caller_id)
            .finish_non_exhaustive()
    }
}

/// Error body returned by the API for 401/403/404/405/500/504.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
    #[serde(default)]
    pub details: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} ({}): {}", self.error, self.code, details),
            None => write!(f, "{} ({})", self.error, self.code),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Clone)]
pub struct CaaspayClient {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl CaaspayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Send a request and hand back the raw response.
    pub async fn send(&self, method: Method, path: &str) -> Result<Response, reqwest::Error> {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(c) = &self.credentials {
            request = request
                .header(X_CALLER_ID, &c.caller_id)
                .header(X_CALLER_SECRET, &c.secret);
        }
        request.send().await
    }

    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.send(Method::GET, path).await
    }

    /// GET `path` and decode a JSON body, turning error statuses into [`ApiError`].
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
        let resp = self.get(path).await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiError>(&text) {
                Ok(api_error) => api_error.into(),
                Err(_) => format!("API returned status {}: {}", status, text).into(),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
