//! Route definitions for the feed service.
//!
//! ## Routes
//!
//! - `GET /` - Usage hint (plain text)
//! - `GET /health` - Health check (JSON)
//! - `GET /event/{event_id}` - RSS feed for a POAP drop
//! - `GET /address/{address}` - RSS feed for a collector's wallet
//!
//! Feed routes accept `?no_inactivity=true` to suppress the dormant-feed
//! notice.

mod feed;
mod health;

use axum::Router;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::state::AppState;

/// Build the complete feed service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health::health_check))
        .route("/event/{event_id}", get(feed::event_feed))
        .route("/address/{address}", get(feed::address_feed))
        .with_state(state)
}

/// Minimal landing page pointing at the two feed shapes.
async fn home() -> impl IntoResponse {
    (
        [("content-type", "text/plain; charset=utf-8")],
        "poapfeed - RSS feeds for POAP activity\n\n\
         GET /event/{event_id}   feed of recent claims for a drop\n\
         GET /address/{address}  feed of a collector's badges\n",
    )
}
