//! Handlers shared by the named JSON resources (users and groups).
//!
//! ```text
//! GET|HEAD /<collection>        list, ascending id order
//! POST     /<collection>        create             201 + Location
//! GET|HEAD /<collection>/<key>  fetch by id or name
//! PUT      /<collection>/<key>  conditional update, If-Match required
//! DELETE   /<collection>/<key>  delete and release the name
//! ```

use super::{json_body, parse_target, to_json, AppState, Representation, MEDIA_TYPE_JSON};
use crate::error::{ServerError, ServerResult};
use crate::model::Resource;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use c9_repo::{conditional, Fingerprint, Target};

fn target(key: &str) -> ServerResult<Target> {
    parse_target(key).ok_or(ServerError::NotFound)
}

/// `GET /<collection>`
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let items = state.run(|store| conditional::list::<R>(store)).await?;
    let raw = to_json(&items)?;
    let etag = Fingerprint::of(&raw);
    Ok(Representation::read(MEDIA_TYPE_JSON, etag, raw).respond(&headers))
}

/// `POST /<collection>`
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let patch: R::Patch = json_body(&headers, &body)?;
    let created = state
        .run(move |store| conditional::create::<R, R::Patch>(store, &patch))
        .await?;

    let raw = to_json(&created.entity)?;
    Ok(
        Representation::written(StatusCode::CREATED, created.fingerprint, raw)
            .with_location(created.entity.location())
            .respond(&headers),
    )
}

/// `GET /<collection>/<key>`
pub async fn fetch<R: Resource>(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let target = target(&key)?;
    let found = state
        .run(move |store| conditional::fetch::<R>(store, &target))
        .await?;

    let raw = to_json(&found.entity)?;
    Ok(Representation::read(MEDIA_TYPE_JSON, found.fingerprint, raw).respond(&headers))
}

/// `PUT /<collection>/<key>`
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let target = target(&key)?;
    let patch: R::Patch = json_body(&headers, &body)?;
    let if_match = headers
        .get(header::IF_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let updated = state
        .run(move |store| {
            conditional::modify::<R, R::Patch>(store, &target, if_match.as_deref(), &patch)
        })
        .await?;

    let raw = to_json(&updated.entity)?;
    Ok(Representation::written(StatusCode::OK, updated.fingerprint, raw).respond(&headers))
}

/// `DELETE /<collection>/<key>`
pub async fn remove<R: Resource>(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ServerResult<Response> {
    let target = target(&key)?;
    state
        .run(move |store| conditional::remove::<R>(store, &target))
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
