//! Core types and pure logic for the poapfeed feed generator.
//!
//! This crate provides:
//! - Normalized POAP domain records (drops, claims) and feed entry types
//! - Tolerant parsing of the timestamp formats the POAP API emits
//! - Claim deduplication and ordering
//! - The inactivity quantization that drives synthetic "no new claims" entries
//!
//! Everything here is pure: no I/O, no wall clock. Callers pass `now` in,
//! which keeps feed assembly deterministic and directly testable.

pub mod inactivity;
pub mod model;

/// Default number of recent claims included in a feed.
pub const DEFAULT_RECENT_CLAIMS_LIMIT: usize = 20;

/// Default inactivity threshold before a dormant-feed notice appears.
pub const DEFAULT_INACTIVITY_THRESHOLD_WEEKS: i64 = 4;

/// Default cache TTL for upstream responses.
pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 15;

pub use inactivity::{InactivityState, inactivity_state};
pub use model::{
    ChannelMeta, ClaimRecord, DropRecord, Feed, FeedEntry, drop_url, order_claims,
    parse_poap_timestamp, scan_url, shorten_address, token_url,
};
