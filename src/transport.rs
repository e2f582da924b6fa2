use dashmap::DashMap;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::future::Future;
use std::time::Duration;

use crate::error::ThrottleError;
use crate::models::{RestRequest, RestResponse};

// Puts a request on the wire. Called exactly once per admitted request;
// whatever it returns goes back to the caller unchanged.
pub trait Transport: Send + Sync {
    type Request: Send;
    type Response: Send;
    type Error: std::error::Error + Send + 'static;

    // Runs before any throttling, so a bad request costs no window slot
    fn validate(&self, _request: &Self::Request) -> Result<(), ThrottleError> {
        Ok(())
    }

    fn issue(
        &self,
        request: Self::Request,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;
}

// Adds http:// if no scheme is present ("localhost:11434" -> "http://localhost:11434")
pub fn normalize_endpoint(endpoint: &str) -> Result<Url, ThrottleError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ThrottleError::invalid("endpoint", "must not be blank"));
    }

    let full_url = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    Url::parse(&full_url).map_err(|e| ThrottleError::invalid("endpoint", format!("{full_url}: {e}")))
}

pub(crate) fn parse_header(
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), ThrottleError> {
    let header_name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| ThrottleError::invalid("header", format!("{name:?}: {e}")))?;
    let header_value = HeaderValue::from_str(value.trim())
        .map_err(|e| ThrottleError::invalid("header", format!("{name}: {e}")))?;
    Ok((header_name, header_value))
}

// reqwest-backed transport bound to a single base url
pub struct RestTransport {
    client: reqwest::Client,
    base_url: Url,
    default_headers: DashMap<HeaderName, HeaderValue>,
    timeout: Option<Duration>,
}

impl RestTransport {
    pub fn new(endpoint: &str) -> Result<Self, ThrottleError> {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Result<Self, ThrottleError> {
        Ok(Self {
            client,
            base_url: normalize_endpoint(endpoint)?,
            default_headers: DashMap::new(),
            timeout: None,
        })
    }

    // Per-request timeout enforced by reqwest; the throttle itself never times out
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // Sent with every later request unless the request sets the same header
    pub fn add_default_header(&self, name: &str, value: &str) -> Result<(), ThrottleError> {
        let (name, value) = parse_header(name, value)?;
        self.default_headers.insert(name, value);
        Ok(())
    }

    fn resolve(&self, resource: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let resource = resource.trim().trim_start_matches('/');
        format!("{}/{}", base, resource)
    }

    fn merged_headers(&self, request_headers: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(self.default_headers.len() + request_headers.len());
        for entry in self.default_headers.iter() {
            headers.insert(entry.key().clone(), entry.value().clone());
        }
        for (name, value) in request_headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}

impl Transport for RestTransport {
    type Request = RestRequest;
    type Response = RestResponse;
    type Error = reqwest::Error;

    fn validate(&self, request: &RestRequest) -> Result<(), ThrottleError> {
        if request.resource.trim().is_empty() {
            return Err(ThrottleError::invalid("request", "resource must not be blank"));
        }
        let url = self.resolve(&request.resource);
        Url::parse(&url)
            .map(|_| ())
            .map_err(|e| ThrottleError::invalid("request", format!("{url}: {e}")))
    }

    async fn issue(&self, request: RestRequest) -> Result<RestResponse, reqwest::Error> {
        let url = self.resolve(&request.resource);
        log::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(self.merged_headers(&request.headers));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send().await?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.text().await?;

        Ok(RestResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_without_scheme_gets_http() {
        let url = normalize_endpoint(" localhost:11434 ").unwrap();
        assert_eq!(url.as_str(), "http://localhost:11434/");
    }

    #[test]
    fn host_starting_with_http_still_gets_scheme() {
        let url = normalize_endpoint("httpbin.org").unwrap();
        assert_eq!(url.as_str(), "http://httpbin.org/");
    }

    #[test]
    fn https_endpoint_is_kept() {
        let url = normalize_endpoint("https://api.example.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1");
    }

    #[test]
    fn blank_endpoint_is_rejected() {
        let err = normalize_endpoint("   ").unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidArgument { name: "endpoint", .. }));
    }

    #[test]
    fn resource_is_appended_to_base_path() {
        let transport = RestTransport::new("https://api.example.com/v1/").unwrap();
        assert_eq!(transport.resolve("/users"), "https://api.example.com/v1/users");
        assert_eq!(transport.resolve("users?page=2"), "https://api.example.com/v1/users?page=2");
        assert_eq!(transport.resolve("/"), "https://api.example.com/v1/");
    }

    #[test]
    fn blank_resource_fails_validation() {
        let transport = RestTransport::new("localhost:8080").unwrap();
        let err = transport.validate(&RestRequest::get("  ")).unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidArgument { name: "request", .. }));
        assert!(transport.validate(&RestRequest::get("/health")).is_ok());
    }

    #[test]
    fn request_headers_override_defaults() {
        let transport = RestTransport::new("localhost:8080").unwrap();
        transport.add_default_header("X-Api-Key", "default").unwrap();
        transport.add_default_header("Accept", "application/json").unwrap();

        let request = RestRequest::get("/").header("x-api-key", "override").unwrap();
        let headers = transport.merged_headers(&request.headers);
        assert_eq!(headers["x-api-key"], "override");
        assert_eq!(headers["accept"], "application/json");
    }

    #[test]
    fn invalid_default_header_is_rejected() {
        let transport = RestTransport::new("localhost:8080").unwrap();
        let err = transport.add_default_header("X-Ok", "bad\nvalue").unwrap_err();
        assert!(matches!(err, ThrottleError::InvalidArgument { name: "header", .. }));
    }
}
