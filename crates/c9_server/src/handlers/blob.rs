//! Blob handlers.
//!
//! Blobs are opaque bytes addressed by id only. The entity tag of a blob is
//! the fingerprint of its content.

use super::{
    parse_target, single_content_type, to_json, AppState, Representation, MEDIA_TYPE_BINARY,
    MEDIA_TYPE_JSON,
};
use crate::error::{ServerError, ServerResult};
use crate::model::BlobRef;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use c9_repo::{EntityType, Fingerprint, Reader, RepoError, Target};

/// `GET /blob`
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> ServerResult<Response> {
    let refs = state
        .run(|store| {
            store.view(EntityType::Blob, |tx| {
                let mut refs = Vec::new();
                tx.for_each(|id, _| {
                    refs.push(BlobRef { id });
                    Ok(())
                })?;
                Ok::<_, RepoError>(refs)
            })
        })
        .await?;

    let raw = to_json(&refs)?;
    let etag = Fingerprint::of(&raw);
    Ok(Representation::read(MEDIA_TYPE_JSON, etag, raw).respond(&headers))
}

/// `POST /blob`
///
/// Accepts any single, non-multipart media type.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    match single_content_type(&headers) {
        Some(media_type) if !is_multipart(media_type) => {}
        _ => return Err(ServerError::UnsupportedMediaType),
    }

    let etag = Fingerprint::of(&body);
    let id = state
        .run(move |store| {
            store.update(EntityType::Blob, |tx| {
                let id = tx.allocate_id()?;
                tx.put(id, &body)?;
                Ok::<_, RepoError>(id)
            })
        })
        .await?;
    tracing::debug!(%id, "stored blob");

    let blob_ref = BlobRef { id };
    let raw = to_json(&blob_ref)?;
    Ok(Representation::written(StatusCode::CREATED, etag, raw)
        .with_location(blob_ref.location())
        .respond(&headers))
}

/// `GET /blob/<id>`
pub async fn fetch(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let id = match parse_target(&key) {
        Some(Target::Id(id)) => id,
        _ => return Err(ServerError::NotFound),
    };
    let blob = state
        .run(move |store| store.view(EntityType::Blob, |tx| tx.get(id)))
        .await?;

    let etag = Fingerprint::of(&blob);
    Ok(Representation::read(MEDIA_TYPE_BINARY, etag, blob).respond(&headers))
}

fn is_multipart(media_type: &str) -> bool {
    media_type
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}
