use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AppConfig;

const ALLOW_HEADERS: &str = "X-Requested-With, Content-Type, Accept, Origin, Authorization";
const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";

/// CorsPolicy
///
/// The origin allow-list. A request whose `Origin` is listed gets it echoed back;
/// every other request gets the first listed origin.
#[derive(Clone, Debug)]
pub struct CorsPolicy {
    allowed: Arc<Vec<String>>,
    fallback: String,
}

impl CorsPolicy {
    pub fn new(allowed: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            allowed: Arc::new(allowed),
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.allowed_origins.clone(), config.default_origin())
    }

    /// The value for `Access-Control-Allow-Origin` given the request's `Origin`.
    pub fn origin_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(origin) if self.allowed.iter().any(|allowed| allowed == origin) => origin,
            _ => &self.fallback,
        }
    }

    fn decorate(&self, requested: Option<&str>, headers: &mut HeaderMap) {
        if let Ok(origin) = HeaderValue::from_str(self.origin_for(requested)) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
}

/// apply_cors
///
/// Outermost middleware. `OPTIONS` requests are answered here with an empty 200 and
/// never reach the router; everything else is routed and then decorated.
pub async fn apply_cors(
    State(policy): State<CorsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let requested = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut response = if request.method() == Method::OPTIONS {
        (StatusCode::OK, Body::empty()).into_response()
    } else {
        next.run(request).await
    };

    policy.decorate(requested.as_deref(), response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_origin_is_reflected() {
        let policy = CorsPolicy::new(
            vec!["https://site.edu".into(), "http://localhost:5173".into()],
            "https://site.edu",
        );
        assert_eq!(
            policy.origin_for(Some("http://localhost:5173")),
            "http://localhost:5173"
        );
    }

    #[test]
    fn unknown_or_missing_origin_falls_back() {
        let policy = CorsPolicy::new(vec!["https://site.edu".into()], "https://site.edu");
        assert_eq!(policy.origin_for(Some("https://evil.test")), "https://site.edu");
        assert_eq!(policy.origin_for(None), "https://site.edu");
    }

    #[test]
    fn existing_vary_values_are_kept() {
        let policy = CorsPolicy::new(vec!["https://site.edu".into()], "https://site.edu");
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));

        policy.decorate(Some("https://site.edu"), &mut headers);

        let vary: Vec<&str> = headers
            .get_all(header::VARY)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        assert_eq!(vary, vec!["Accept-Encoding", "Origin"]);
    }
}
