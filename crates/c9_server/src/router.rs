//! HTTP routing.

use crate::config::ServerConfig;
use crate::handlers::{self, blob, entity, other_method, AppState};
use crate::model::{Group, Resource, User};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, Method, Request};
use axum::response::Response;
use axum::routing::{get, MethodRouter};
use axum::Router;
use std::future::{ready, Ready};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::RequestBodyTimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

const ALLOW_COLLECTION: &str = "HEAD, GET, POST";
const ALLOW_ITEM: &str = "HEAD, GET, PUT, DELETE";
const ALLOW_BLOB: &str = "HEAD, GET";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Client address reported by the nearest proxy: the last entry of
/// `X-Forwarded-For`, with repeated headers read as one list.
fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    let last_header = headers.get_all(X_FORWARDED_FOR).iter().last()?;
    let last_entry = last_header.to_str().ok()?.rsplit(',').next()?.trim();
    (!last_entry.is_empty()).then_some(last_entry)
}

fn make_trace_span<B>(request: &Request<B>) -> Span {
    let client = forwarded_client(request.headers()).unwrap_or("-");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        client = %client
    )
}

/// Handler for the methods a route does not list.
fn rest(allow: &'static str) -> impl Fn(Method) -> Ready<Response> + Clone + Send + Sync + 'static {
    move |method: Method| ready(other_method(&method, allow))
}

fn collection<R: Resource>() -> MethodRouter<AppState> {
    get(entity::list::<R>)
        .post(entity::create::<R>)
        .fallback(rest(ALLOW_COLLECTION))
}

fn item<R: Resource>() -> MethodRouter<AppState> {
    get(entity::fetch::<R>)
        .put(entity::update::<R>)
        .delete(entity::remove::<R>)
        .fallback(rest(ALLOW_ITEM))
}

/// Builds the resource router around an opened store.
///
/// The timeout bounds only how long the request body may take to arrive.
/// Once a handler has the body, its store call runs to completion.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let blobs = get(blob::list)
        .post(blob::create)
        .fallback(rest(ALLOW_COLLECTION));

    Router::new()
        .route("/blob", blobs.clone())
        .route("/blob/", blobs)
        .route("/blob/:key", get(blob::fetch).fallback(rest(ALLOW_BLOB)))
        .route("/user", collection::<User>())
        .route("/user/", collection::<User>())
        .route("/user/:key", item::<User>())
        .route("/group", collection::<Group>())
        .route("/group/", collection::<Group>())
        .route("/group/:key", item::<Group>())
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(RequestBodyTimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http().make_span_with(make_trace_span))
        .with_state(state)
}
