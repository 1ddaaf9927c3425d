//! Feed route handlers.
//!
//! Handles `GET /event/{event_id}` and `GET /address/{address}`. Both
//! drive the assembler (cache → upstream → credential), serialize the
//! result, and return it with the RSS content type and a `Cache-Control`
//! matching the upstream response TTL.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::FeedError;
use crate::render;
use crate::state::AppState;
use crate::feed as assembler;

/// Query flags accepted by both feed routes.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    /// Suppress the synthetic inactivity entry. Does not affect caching.
    #[serde(default)]
    no_inactivity: bool,
}

/// Handle `GET /event/{event_id}`.
pub async fn event_feed(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, FeedError> {
    let event_id: u64 = event_id
        .trim()
        .parse()
        .map_err(|_| FeedError::BadRequest(format!("event id must be numeric, got '{event_id}'")))?;

    let feed = assembler::event_feed(&state, event_id, query.no_inactivity).await?;
    Ok(rss_response(&state, render::render_feed(&feed)))
}

/// Handle `GET /address/{address}`.
pub async fn address_feed(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, FeedError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(FeedError::BadRequest("address must not be empty".to_string()));
    }

    let feed = assembler::address_feed(&state, address, query.no_inactivity).await?;
    Ok(rss_response(&state, render::render_feed(&feed)))
}

/// Build a 200 response carrying an RSS body.
fn rss_response(state: &AppState, body: String) -> Response {
    let cache_control = format!("max-age={}", state.config.cache_ttl.as_secs());

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/rss+xml; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}
