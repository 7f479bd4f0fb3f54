use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, LOCATION, ORIGIN};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use tos_core::WriteOutcome;
use tos_types::{BlobKey, Entity};

use crate::error::ServerResult;
use crate::icon::{best_in_range, parse_formats, SizeRange};
use crate::state::AppState;

/// Response header carrying the stored origin.
pub const X_DATA_ORIGIN: &str = "x-data-origin";

fn header_str(headers: &HeaderMap, name: &HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `POST /{id}`: bind the request body to `id`, once.
pub async fn put_blob(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let key = BlobKey::new(id)?;
    let entity = Entity::new(
        body.to_vec(),
        header_str(&headers, &CONTENT_TYPE),
        header_str(&headers, &ORIGIN),
    );
    let response = match state.service.put(&key, &entity).await? {
        WriteOutcome::Created => StatusCode::CREATED.into_response(),
        WriteOutcome::AlreadyExists => StatusCode::OK.into_response(),
        WriteOutcome::Conflict => (StatusCode::FORBIDDEN, "id already exists").into_response(),
    };
    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadParams {
    pub wait: Option<String>,
}

impl ReadParams {
    pub fn long_polling(&self) -> bool {
        matches!(self.wait.as_deref(), Some("1" | "true"))
    }
}

/// `GET /{id}?wait=1`: the stored content, waiting for it if asked to.
pub async fn get_blob(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReadParams>,
) -> ServerResult<Response> {
    let key = BlobKey::new(id)?;
    let cancel = state.shutdown.child_token();
    let Some(entity) = state
        .service
        .get_cancellable(&key, params.long_polling(), &cancel)
        .await?
    else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let content_type = entity.content_type().map(HeaderValue::from_str);
    let origin = entity.origin().map(HeaderValue::from_str);
    let mut response = Body::from(entity.content).into_response();
    let headers = response.headers_mut();
    match content_type {
        Some(Ok(value)) => {
            headers.insert(CONTENT_TYPE, value);
        }
        Some(Err(_)) => warn!(%key, "stored content type is not a valid header value"),
        None => {}
    }
    match origin {
        Some(Ok(value)) => {
            headers.insert(HeaderName::from_static(X_DATA_ORIGIN), value);
        }
        Some(Err(_)) => warn!(%key, "stored origin is not a valid header value"),
        None => {}
    }
    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
pub struct IconParams {
    pub size: Option<String>,
    pub formats: Option<String>,
}

/// `GET /{id}/icon?size=min..perfect..max&formats=png,ico`: redirect to the
/// best favicon of the entity's origin.
pub async fn get_icon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<IconParams>,
) -> ServerResult<Response> {
    let range: SizeRange = params.size.as_deref().unwrap_or_default().parse()?;
    let formats = parse_formats(params.formats.as_deref());
    let key = BlobKey::new(id)?;

    let Some(entity) = state.service.get(&key, false).await? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let Some(origin) = entity.origin() else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let icons = match state.icons.fetch_icons(origin).await {
        Ok(icons) => icons,
        Err(e) => {
            warn!(%key, origin, error = %e, "icon lookup failed");
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
    };
    match best_in_range(&icons, &range, &formats) {
        Some(icon) => {
            debug!(%key, url = %icon.url, size = icon.size, "icon resolved");
            Ok((StatusCode::FOUND, [(LOCATION, icon.url.to_string())]).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// `GET /-/healthz`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.service.backend_name(),
    }))
}
