//! Feed assembly.
//!
//! Orchestrates the cache, upstream client, and alias resolver to produce
//! the ordered entry list for a feed request, then hands off to the
//! serializer. Assembly itself is split into pure builders that take the
//! fetched records plus `now`: re-rendering unchanged data at the same
//! instant produces identical entries, guids included, which is what lets
//! feed readers dedup correctly across polls.
//!
//! Entry order: drop metadata first (event feeds only), the synthetic
//! inactivity notice second when the feed is dormant, then claim entries
//! most-recent-first.

use chrono::{DateTime, Utc};
use maud::html;
use poapfeed_core::{
    ChannelMeta, ClaimRecord, DropRecord, Feed, FeedEntry, InactivityState, drop_url,
    inactivity_state, order_claims, scan_url, shorten_address, token_url,
};

use crate::alias;
use crate::cache;
use crate::error::FeedError;
use crate::state::AppState;

/// Assembly knobs derived from configuration and the request.
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions<'a> {
    /// Public base URL of this service.
    pub base_url: &'a str,
    /// Dormancy threshold in whole weeks.
    pub inactivity_threshold_weeks: i64,
    /// Maximum claim entries per feed.
    pub recent_claims_limit: usize,
    /// Request-level flag suppressing the inactivity entry. Does not
    /// affect caching.
    pub suppress_inactivity: bool,
}

impl<'a> FeedOptions<'a> {
    /// Build options for one request from the app state.
    pub fn from_state(state: &'a AppState, suppress_inactivity: bool) -> Self {
        Self {
            base_url: &state.config.base_url,
            inactivity_threshold_weeks: state.config.inactivity_threshold_weeks,
            recent_claims_limit: state.config.recent_claims_limit,
            suppress_inactivity,
        }
    }
}

/// Render an event-scoped feed: fetch the drop and its recent claims
/// (concurrently, each behind the cache), then assemble.
///
/// An unknown drop fails the whole request with `NotFound`; there is no
/// fallback metadata, so readers never see a partially-empty feed.
pub async fn event_feed(
    state: &AppState,
    event_id: u64,
    suppress_inactivity: bool,
) -> Result<Feed, FeedError> {
    let ttl = state.cache_ttl();
    let limit = state.config.recent_claims_limit;

    let event_key = cache::event_key(event_id);
    let claims_key = cache::claims_key(event_id);
    let (drop, claims) = tokio::try_join!(
        cache::get_or_fetch(&state.cache, &event_key, ttl, || state
            .poap
            .get_event(event_id)),
        cache::get_or_fetch(&state.cache, &claims_key, ttl, || state
            .poap
            .get_recent_claims(event_id, limit)),
    )?;

    let options = FeedOptions::from_state(state, suppress_inactivity);
    Ok(build_event_feed(&drop, claims, Utc::now(), &options))
}

/// Render an address-scoped feed for a wallet address or ENS name.
pub async fn address_feed(
    state: &AppState,
    address: &str,
    suppress_inactivity: bool,
) -> Result<Feed, FeedError> {
    let ttl = state.cache_ttl();
    let limit = state.config.recent_claims_limit;

    let claims = cache::get_or_fetch(&state.cache, &cache::address_key(address), ttl, || {
        state.poap.get_address_collection(address, limit)
    })
    .await?;

    let display = alias::resolve_address(&state.poap, address).await;

    let options = FeedOptions::from_state(state, suppress_inactivity);
    Ok(build_address_feed(address, &display, claims, Utc::now(), &options))
}

/// Assemble an event feed from fetched records. Pure.
pub fn build_event_feed(
    drop: &DropRecord,
    mut claims: Vec<ClaimRecord>,
    now: DateTime<Utc>,
    options: &FeedOptions<'_>,
) -> Feed {
    order_claims(&mut claims);
    claims.truncate(options.recent_claims_limit);

    let channel = ChannelMeta {
        title: format!("POAP: {}", drop.name),
        description: format!("Claim activity for the {} POAP drop.", drop.name),
        link: drop_url(drop.id),
        self_url: format!("{}/event/{}", options.base_url, drop.id),
    };

    let mut entries = vec![drop_metadata_entry(drop, now)];

    // Reference instant for dormancy: the newest claim, or the drop start
    // when nobody has claimed yet.
    let last_activity = claims
        .first()
        .map(|claim| claim.claimed_at)
        .or(drop.start_date);
    if !options.suppress_inactivity
        && let Some(last_activity) = last_activity
        && let Some(idle) = inactivity_state(now, last_activity, options.inactivity_threshold_weeks)
    {
        let guid = format!(
            "{}/inactive.html?event={}&week={}",
            options.base_url, drop.id, idle.week_index
        );
        entries.push(inactivity_entry("this drop", guid, idle));
    }

    entries.extend(claims.iter().map(|claim| event_claim_entry(drop, claim)));

    Feed { channel, entries }
}

/// Assemble an address feed from fetched records. Pure.
///
/// No metadata entry exists here: there is no single drop to describe.
pub fn build_address_feed(
    address: &str,
    display: &str,
    mut claims: Vec<ClaimRecord>,
    now: DateTime<Utc>,
    options: &FeedOptions<'_>,
) -> Feed {
    // Scan entries do not always repeat the owner; the subject fills in.
    for claim in &mut claims {
        if claim.claimant.is_empty() {
            claim.claimant = address.to_string();
        }
    }
    order_claims(&mut claims);
    claims.truncate(options.recent_claims_limit);

    let short = shorten_address(display);
    let channel = ChannelMeta {
        title: format!("POAP: {short} Collection"),
        description: format!("Latest POAP badges collected by {short}."),
        link: scan_url(address),
        self_url: format!("{}/address/{}", options.base_url, address),
    };

    let mut entries = Vec::with_capacity(claims.len() + 1);

    if !options.suppress_inactivity {
        match claims.first() {
            Some(newest) => {
                if let Some(idle) = inactivity_state(
                    now,
                    newest.claimed_at,
                    options.inactivity_threshold_weeks,
                ) {
                    let guid = format!(
                        "{}/inactive.html?address={}&week={}",
                        options.base_url,
                        address.to_lowercase(),
                        idle.week_index
                    );
                    entries.push(inactivity_entry("this collection", guid, idle));
                }
            }
            None => {
                // Nothing collected and no reference instant to escalate
                // from: a single stable notice.
                entries.push(empty_collection_entry(address, now, options));
            }
        }
    }

    entries.extend(claims.iter().map(|claim| address_claim_entry(display, claim)));

    Feed { channel, entries }
}

/// The one metadata entry of an event feed, derived from the drop record.
fn drop_metadata_entry(drop: &DropRecord, now: DateTime<Utc>) -> FeedEntry {
    let location = match (drop.city.is_empty(), drop.country.is_empty()) {
        (false, false) => Some(format!("{}, {}", drop.city, drop.country)),
        (false, true) => Some(drop.city.clone()),
        (true, false) => Some(drop.country.clone()),
        (true, true) => None,
    };

    let body = html! {
        h3 { (drop.name) }
        p { (drop.description) }
        @if !drop.image_url.is_empty() {
            p { img src=(drop.image_url) width="500" height="500"; }
        }
        @if let Some(location) = &location {
            p { strong { "Location: " } (location) }
        }
    }
    .into_string();

    FeedEntry {
        guid: drop_url(drop.id),
        guid_is_permalink: true,
        title: format!("{} Drop Details", drop.name),
        author: None,
        link: drop_url(drop.id),
        published_at: drop.start_date.unwrap_or(now),
        body,
    }
}

/// A claim entry in an event feed.
fn event_claim_entry(drop: &DropRecord, claim: &ClaimRecord) -> FeedEntry {
    let author = alias::claim_author(claim);
    let display = claim
        .claimant_alias
        .clone()
        .unwrap_or_else(|| shorten_address(&claim.claimant));

    let body = html! {
        p {
            strong { a href=(scan_url(&claim.claimant)) { (display) } }
            " claimed POAP "
            a href=(token_url(&claim.token_id)) { (claim.token_id) }
            " for "
            strong { a href=(drop_url(drop.id)) { (drop.name) } }
            "."
        }
        @if !drop.image_url.is_empty() {
            p { img src=(drop.image_url) width="500" height="500"; }
        }
        @if claim.transfer_count > 0 {
            p { em { "This badge has changed wallets " (claim.transfer_count) " time(s)." } }
        }
    }
    .into_string();

    FeedEntry {
        guid: claim_guid(claim),
        guid_is_permalink: false,
        title: format!("{} claimed by {}", drop.name, display),
        author: Some(author),
        link: token_url(&claim.token_id),
        published_at: claim.claimed_at,
        body,
    }
}

/// A collected-badge entry in an address feed.
fn address_claim_entry(display: &str, claim: &ClaimRecord) -> FeedEntry {
    let body = html! {
        p {
            "Collected POAP "
            a href=(token_url(&claim.token_id)) { (claim.token_id) }
            " for "
            strong { a href=(drop_url(claim.event_id)) { (claim.event_name) } }
            "."
        }
        @if !claim.event_image_url.is_empty() {
            p { img src=(claim.event_image_url) width="500" height="500"; }
        }
    }
    .into_string();

    FeedEntry {
        guid: claim_guid(claim),
        guid_is_permalink: false,
        title: format!("Collected {}", claim.event_name),
        author: Some(display.to_string()),
        link: token_url(&claim.token_id),
        published_at: claim.claimed_at,
        body,
    }
}

/// Deterministic claim guid from the record's identity triple.
///
/// Renders of unchanged data must agree byte-for-byte, so the guid uses
/// only `(event_id, claimant, claimed_at)`, never the wall clock, with
/// the claimant case-normalized.
fn claim_guid(claim: &ClaimRecord) -> String {
    format!(
        "poap:claim:{}:{}:{}",
        claim.event_id,
        claim.claimant.to_lowercase(),
        claim.claimed_at.timestamp()
    )
}

/// The synthetic dormant-feed notice.
///
/// The guid carries the week index, so crossing into a new week past the
/// threshold makes readers (which dedup by guid) surface the notice again.
fn inactivity_entry(subject: &str, guid: String, idle: InactivityState) -> FeedEntry {
    let title = if idle.week_index == 1 {
        format!("No POAP claims in the last {} weeks.", idle.weeks_idle)
    } else {
        format!("{} weeks with no claims", idle.weeks_idle)
    };

    let last = idle
        .last_activity
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string();
    let body = html! {
        p { "There have been no new POAP claims for " (subject) " in " (idle.weeks_idle) " weeks." }
        p { "The event may be over. Consider unsubscribing from this feed if no further activity is expected." }
        p { em { "Last claim was on " (last) } }
        p { a href=(guid) { "About dormant feeds" } }
    }
    .into_string();

    FeedEntry {
        link: guid.clone(),
        guid,
        guid_is_permalink: false,
        title,
        author: None,
        published_at: idle.window_opened_at(),
        body,
    }
}

/// Notice for an address feed with nothing collected at all.
fn empty_collection_entry(
    address: &str,
    now: DateTime<Utc>,
    options: &FeedOptions<'_>,
) -> FeedEntry {
    let guid = format!(
        "{}/inactive.html?address={}&week=1",
        options.base_url,
        address.to_lowercase()
    );
    let body = html! {
        p { "This collection has no POAP badges yet." }
        p { "Consider unsubscribing from this feed if no activity is expected." }
    }
    .into_string();

    FeedEntry {
        link: guid.clone(),
        guid,
        guid_is_permalink: false,
        title: "No POAPs collected".to_string(),
        author: None,
        published_at: now,
        body,
    }
}
