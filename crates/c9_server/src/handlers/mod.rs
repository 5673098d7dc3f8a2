//! Request handlers and shared response plumbing.

pub mod blob;
pub mod entity;

use crate::error::{ServerError, ServerResult};
use crate::model::is_valid_name;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use c9_repo::{Fingerprint, ObjectStore, RecordId, RepoResult, Target};
use std::sync::Arc;

/// Cache policy for representations that may be reused.
pub const CACHE_PUBLIC: &str = "public, max-age=86400";
/// Cache policy for responses to writes.
pub const CACHE_NO_CACHE: &str = "no-cache";

/// Media type of JSON request and response bodies.
pub const MEDIA_TYPE_JSON: &str = "application/json";
/// Media type of blob content.
pub const MEDIA_TYPE_BINARY: &str = "application/octet-stream";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<ObjectStore>,
}

impl AppState {
    /// Wraps an opened store.
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// Runs a store operation on the blocking pool.
    ///
    /// Store calls wait on the single write slot and on fsync, so they are
    /// kept off the async workers.
    pub async fn run<T, F>(&self, op: F) -> ServerResult<T>
    where
        F: FnOnce(&ObjectStore) -> RepoResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| ServerError::Internal(format!("store task failed: {e}")))?;
        Ok(result?)
    }
}

/// Parses a path segment into a record address.
///
/// All digits is an id (zero is never valid); a letter followed by letters
/// and digits is a name. Anything else addresses nothing.
pub fn parse_target(segment: &str) -> Option<Target> {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        return match segment.parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(id) => Some(Target::Id(RecordId::new(id))),
        };
    }
    if is_valid_name(segment) {
        return Some(Target::Name(segment.to_string()));
    }
    None
}

/// Checks that the request carries exactly one `Content-Type` header.
pub(crate) fn single_content_type(headers: &HeaderMap) -> Option<&str> {
    let mut values = headers.get_all(header::CONTENT_TYPE).iter();
    match (values.next(), values.next()) {
        (Some(value), None) => value.to_str().ok(),
        _ => None,
    }
}

/// Decodes a JSON request body.
pub(crate) fn json_body<T: serde::de::DeserializeOwned>(
    headers: &HeaderMap,
    body: &[u8],
) -> ServerResult<T> {
    match single_content_type(headers) {
        Some(media_type) if media_type.eq_ignore_ascii_case(MEDIA_TYPE_JSON) => {}
        _ => return Err(ServerError::UnsupportedMediaType),
    }
    serde_json::from_slice(body).map_err(|e| ServerError::BadJson(e.to_string()))
}

/// Serializes a JSON response body, newline terminated.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> ServerResult<Vec<u8>> {
    let mut raw = serde_json::to_vec(value)
        .map_err(|e| ServerError::Internal(format!("failed to encode response: {e}")))?;
    raw.extend_from_slice(b"\r\n");
    Ok(raw)
}

fn if_none_match(headers: &HeaderMap, etag: &Fingerprint) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|tag| tag.trim() == "*" || etag.matches(tag))
}

/// A response body with its entity tag and cache policy.
pub(crate) struct Representation {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub cache_control: &'static str,
    pub etag: Fingerprint,
    pub location: Option<String>,
    pub body: Vec<u8>,
    /// Only cacheable reads may be answered with 304.
    pub cacheable: bool,
}

impl Representation {
    /// A cacheable read response.
    pub fn read(content_type: &'static str, etag: Fingerprint, body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            cache_control: CACHE_PUBLIC,
            etag,
            location: None,
            body,
            cacheable: true,
        }
    }

    /// A response to a write.
    pub fn written(status: StatusCode, etag: Fingerprint, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: MEDIA_TYPE_JSON,
            cache_control: CACHE_NO_CACHE,
            etag,
            location: None,
            body,
            cacheable: false,
        }
    }

    /// Adds a `Location` header.
    pub fn with_location(mut self, location: String) -> Self {
        self.location = Some(location);
        self
    }

    /// Builds the response, answering 304 to a read the client already holds.
    pub fn respond(self, request_headers: &HeaderMap) -> Response {
        let not_modified = self.cacheable && if_none_match(request_headers, &self.etag);

        let mut response = if not_modified {
            StatusCode::NOT_MODIFIED.into_response()
        } else {
            let mut response = (self.status, self.body).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(self.content_type),
            );
            response
        };

        let headers = response.headers_mut();
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(self.cache_control),
        );
        if let Ok(value) = HeaderValue::from_str(&self.etag.to_etag()) {
            headers.insert(header::ETAG, value);
        }
        if let Some(location) = self.location {
            if let Ok(value) = HeaderValue::from_str(&location) {
                headers.insert(header::LOCATION, value);
            }
        }
        response
    }
}

/// Answers methods a route does not serve.
///
/// `OPTIONS` gets 200, everything else 405; both carry `Allow`.
pub(crate) fn other_method(method: &Method, allow: &'static str) -> Response {
    let status = if method == Method::OPTIONS {
        StatusCode::OK
    } else {
        StatusCode::METHOD_NOT_ALLOWED
    };
    let body = if status == StatusCode::OK {
        String::new()
    } else {
        format!("requires one of: {allow}\n")
    };
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(allow));
    response
}

/// Fallback for paths no route serves.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_from_path() {
        assert_eq!(parse_target("42"), Some(Target::Id(RecordId::new(42))));
        assert_eq!(parse_target("alice"), Some(Target::Name("alice".into())));
        assert_eq!(parse_target("Bob7"), Some(Target::Name("Bob7".into())));
        assert_eq!(parse_target("0"), None);
        assert_eq!(parse_target("000"), None);
        assert_eq!(parse_target("99999999999999999999999"), None);
        assert_eq!(parse_target("7up"), None);
        assert_eq!(parse_target("a-b"), None);
        assert_eq!(parse_target(""), None);
    }

    #[test]
    fn json_body_checks_media_type() {
        let mut headers = HeaderMap::new();
        let result: ServerResult<serde_json::Value> = json_body(&headers, b"{}");
        assert!(matches!(result, Err(ServerError::UnsupportedMediaType)));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("Application/JSON"));
        let result: ServerResult<serde_json::Value> = json_body(&headers, b"{}");
        assert!(result.is_ok());

        let result: ServerResult<serde_json::Value> = json_body(&headers, b"{");
        assert!(matches!(result, Err(ServerError::BadJson(_))));

        headers.append(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let result: ServerResult<serde_json::Value> = json_body(&headers, b"{}");
        assert!(matches!(result, Err(ServerError::UnsupportedMediaType)));
    }

    #[test]
    fn not_modified_when_tag_matches() {
        let etag = Fingerprint::of(b"body");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&format!("\"abc\", {}", etag.to_etag())).unwrap(),
        );

        let response =
            Representation::read(MEDIA_TYPE_JSON, etag, b"body".to_vec()).respond(&headers);
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(
            response.headers().get(header::ETAG).unwrap(),
            etag.to_etag().as_str()
        );
    }

    #[test]
    fn writes_are_never_not_modified() {
        let etag = Fingerprint::of(b"body");
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));

        let response = Representation::written(StatusCode::CREATED, etag, b"{}".to_vec())
            .with_location("/user/alice".into())
            .respond(&headers);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/user/alice");
    }

    #[test]
    fn updated_representation_ignores_if_none_match() {
        let etag = Fingerprint::of(b"body");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&etag.to_etag()).unwrap(),
        );

        let response =
            Representation::written(StatusCode::OK, etag, b"{}".to_vec()).respond(&headers);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            MEDIA_TYPE_JSON
        );
    }

    #[test]
    fn options_and_405_carry_allow() {
        let response = other_method(&Method::OPTIONS, "HEAD, GET, POST");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "HEAD, GET, POST");

        let response = other_method(&Method::PATCH, "HEAD, GET");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
