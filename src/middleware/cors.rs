//! Cross-origin resource sharing stage

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::chain::{Middleware, Next};
use super::csrf::{default_allowed_origins, WILDCARD};

/// CORS allow-lists
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,
}

fn default_allowed_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_allowed_headers() -> Vec<String> {
    ["Content-Type", "Authorization", "X-Requested-With"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
        }
    }
}

/// Adds CORS headers and answers preflight requests.
///
/// A request without `Origin` gets `*`. A disallowed origin gets no
/// `Access-Control-Allow-Origin` at all, which browsers treat as a denial.
#[derive(Debug, Clone)]
pub struct Cors {
    allowed_origins: Vec<String>,
    methods: HeaderValue,
    headers: HeaderValue,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self {
            methods: join_header(&config.allowed_methods),
            headers: join_header(&config.allowed_headers),
            allowed_origins: config.allowed_origins,
        }
    }

    fn allow_origin(&self, request_headers: &HeaderMap) -> Option<HeaderValue> {
        match request_headers.get(ORIGIN) {
            None => Some(HeaderValue::from_static(WILDCARD)),
            Some(origin) if origin.as_bytes().is_empty() => {
                Some(HeaderValue::from_static(WILDCARD))
            }
            Some(origin) => {
                let text = origin.to_str().ok()?;
                self.allowed_origins
                    .iter()
                    .any(|o| o == WILDCARD || o == text)
                    .then(|| origin.clone())
            }
        }
    }

    fn decorate(&self, allow_origin: Option<HeaderValue>, response: &mut Response) {
        let headers = response.headers_mut();
        if let Some(origin) = allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.headers.clone());
    }
}

fn join_header(values: &[String]) -> HeaderValue {
    HeaderValue::from_str(&values.join(", ")).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[async_trait]
impl Middleware for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let allow_origin = self.allow_origin(req.headers());

        let mut response = if req.method() == Method::OPTIONS {
            StatusCode::OK.into_response()
        } else {
            next.run(req).await
        };

        self.decorate(allow_origin, &mut response);
        response
    }
}
