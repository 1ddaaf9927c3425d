//! poapfeed - RSS feeds for POAP claim activity.
//!
//! This crate serves RSS 2.0 feeds generated on demand from the POAP HTTP
//! API: one feed per drop (`/event/{id}`) and one per collector wallet
//! (`/address/{address}`).
//!
//! # Architecture
//!
//! - **Auth**: delegated bearer credential via an OAuth client-credentials
//!   exchange, reused across requests while valid
//! - **Poap**: authenticated upstream client normalizing API responses into
//!   domain records
//! - **Cache**: in-process moka cache in front of the upstream client with
//!   explicit per-entry expiry, bounding call volume per resource per window
//! - **Feed**: assembles the ordered entry list (metadata, inactivity,
//!   claims) from cached records
//! - **Render**: serializes entries into RSS 2.0 with strict escaping

pub mod alias;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod poap;
pub mod render;
mod routes;
mod state;

pub use self::config::Config;
pub use self::error::FeedError;
pub use self::routes::router;
pub use self::state::AppState;
