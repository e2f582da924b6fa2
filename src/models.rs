use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ThrottleError;

// Request description forwarded to the REST transport.
// `resource` is relative to the client's base url ("/api/tags", "users?page=2").
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    pub resource: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RestRequest {
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(Method::GET, resource)
    }

    pub fn post(resource: impl Into<String>) -> Self {
        Self::new(Method::POST, resource)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ThrottleError> {
        let (name, value) = crate::transport::parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    // Serializes `body` as JSON and sets the content type
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ThrottleError> {
        let encoded = serde_json::to_string(body)
            .map_err(|e| ThrottleError::invalid("body", e.to_string()))?;
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        self.body = Some(encoded);
        Ok(self)
    }
}

// Response handed back by the REST transport.
// Non-2xx statuses are still responses; only network/protocol failures are errors.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RestResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

// Response whose body was decoded as JSON
#[derive(Debug, Clone)]
pub struct TypedResponse<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub data: T,
}
