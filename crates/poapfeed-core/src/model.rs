//! Normalized POAP domain records and feed entry types.
//!
//! Upstream responses arrive in several shapes (event detail, event token
//! list, address scan); the serve crate flattens them all into the records
//! here. Timestamps are normalized to `DateTime<Utc>` at the boundary via
//! [`parse_poap_timestamp`] so everything downstream compares instants, not
//! strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gallery page for a POAP drop.
pub fn drop_url(event_id: u64) -> String {
    format!("https://poap.gallery/drops/{event_id}")
}

/// Collector page for a single minted token.
pub fn token_url(token_id: &str) -> String {
    format!("https://collectors.poap.xyz/token/{token_id}")
}

/// Collector scan page for a wallet address or ENS name.
pub fn scan_url(address: &str) -> String {
    format!("https://collectors.poap.xyz/scan/{address}")
}

/// Metadata for a POAP drop (event), immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropRecord {
    /// Numeric drop id.
    pub id: u64,
    /// Drop name.
    pub name: String,
    /// Drop description (untrusted text, escaped at render time).
    pub description: String,
    /// Badge artwork URL.
    pub image_url: String,
    /// Event city, if the drop has a physical location.
    pub city: String,
    /// Event country.
    pub country: String,
    /// Drop start date. `None` when upstream omitted or mangled it.
    pub start_date: Option<DateTime<Utc>>,
}

/// One POAP mint/claim: a collector receiving a badge for a drop.
///
/// Identity is `(claimant, claimed_at)`: the same wallet appearing again
/// with a different timestamp (re-claim or transfer) is a distinct record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Drop this claim belongs to.
    pub event_id: u64,
    /// Minted token id (opaque; upstream emits both numbers and strings).
    pub token_id: String,
    /// Claimant wallet address.
    pub claimant: String,
    /// Inline ENS alias when the upstream record carried one.
    pub claimant_alias: Option<String>,
    /// When the badge was minted.
    pub claimed_at: DateTime<Utc>,
    /// How many times the token has changed wallets.
    pub transfer_count: u32,
    /// Drop name, denormalized for address-scoped feeds.
    pub event_name: String,
    /// Drop artwork URL, denormalized for address-scoped feeds.
    pub event_image_url: String,
}

/// The unit the serializer consumes. Three kinds of entries exist (drop
/// metadata, claims, inactivity notices); by the time one reaches the
/// serializer the distinction no longer matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Stable identifier; feed readers dedup on this.
    pub guid: String,
    /// Whether `guid` is a fetchable URL (RSS `isPermaLink`).
    pub guid_is_permalink: bool,
    /// Entry title (plain text, escaped at render time).
    pub title: String,
    /// Resolved author alias or raw address; absent for synthetic entries.
    pub author: Option<String>,
    /// Entry link.
    pub link: String,
    /// Publication instant.
    pub published_at: DateTime<Utc>,
    /// HTML body; wrapped in CDATA by the serializer.
    pub body: String,
}

/// Channel-level feed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMeta {
    /// Channel title.
    pub title: String,
    /// Channel description.
    pub description: String,
    /// Human-facing page the channel points at.
    pub link: String,
    /// Self URL of this feed (atom:link rel=self).
    pub self_url: String,
}

/// A fully assembled feed, ready for serialization.
#[derive(Debug, Clone)]
pub struct Feed {
    /// Channel metadata.
    pub channel: ChannelMeta,
    /// Ordered entries: metadata first, inactivity (if any), then claims
    /// newest-first.
    pub entries: Vec<FeedEntry>,
}

/// Parse a timestamp in any of the formats the POAP API emits.
///
/// Observed shapes:
/// - RFC 3339 with `Z` or a numeric offset (`2025-07-03T03:55:35Z`)
/// - naive datetime (`2025-07-03 03:55:35`), implicitly UTC
/// - naive datetime with a trailing ` UTC` marker
/// - bare date (`2025-07-03`), taken as midnight UTC
pub fn parse_poap_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let value = value.strip_suffix("UTC").map(str::trim).unwrap_or(value);

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

/// Dedup and order claims for feed output.
///
/// Ordering is most-recent-first by claim time; ties are broken by claimant
/// address ascending so repeated renders of the same data agree byte-for-byte.
/// Duplicates share a `(claimant, claimed_at)` pair.
pub fn order_claims(claims: &mut Vec<ClaimRecord>) {
    claims.sort_by(|a, b| {
        b.claimed_at
            .cmp(&a.claimed_at)
            .then_with(|| a.claimant.cmp(&b.claimant))
    });
    claims.dedup_by(|a, b| a.claimant == b.claimant && a.claimed_at == b.claimed_at);
}

/// Shorten a wallet address for display: `0x1234...abcd`.
///
/// Strings too short to shorten (or non-address aliases) pass through
/// unchanged.
pub fn shorten_address(address: &str) -> String {
    if address.len() > 12 && address.starts_with("0x") {
        let head: String = address.chars().take(6).collect();
        let tail: String = address
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{head}...{tail}")
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claim(claimant: &str, secs: i64) -> ClaimRecord {
        ClaimRecord {
            event_id: 191490,
            token_id: format!("t{secs}"),
            claimant: claimant.to_string(),
            claimant_alias: None,
            claimed_at: Utc.timestamp_opt(secs, 0).unwrap(),
            transfer_count: 0,
            event_name: "Test Drop".to_string(),
            event_image_url: "https://example.com/badge.png".to_string(),
        }
    }

    // -- parse_poap_timestamp --

    #[test]
    fn parse_rfc3339_zulu() {
        let dt = parse_poap_timestamp("2025-07-03T03:55:35Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 7, 3, 3, 55, 35).unwrap());
    }

    #[test]
    fn parse_rfc3339_offset() {
        let dt = parse_poap_timestamp("2025-07-03T05:55:35+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 7, 3, 3, 55, 35).unwrap());
    }

    #[test]
    fn parse_naive_datetime_assumed_utc() {
        let dt = parse_poap_timestamp("2025-07-03 03:55:35").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 7, 3, 3, 55, 35).unwrap());
    }

    #[test]
    fn parse_trailing_utc_marker() {
        let dt = parse_poap_timestamp("2025-07-03 03:55:35 UTC").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 7, 3, 3, 55, 35).unwrap());
    }

    #[test]
    fn parse_bare_date_is_midnight() {
        let dt = parse_poap_timestamp("2025-07-03").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 7, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_garbage_is_none() {
        assert!(parse_poap_timestamp("next tuesday").is_none());
        assert!(parse_poap_timestamp("").is_none());
        assert!(parse_poap_timestamp("   ").is_none());
    }

    // -- order_claims --

    #[test]
    fn claims_ordered_newest_first() {
        let mut claims = vec![claim("0xaa", 100), claim("0xbb", 300), claim("0xcc", 200)];
        order_claims(&mut claims);
        let order: Vec<_> = claims.iter().map(|c| c.claimant.as_str()).collect();
        assert_eq!(order, vec!["0xbb", "0xcc", "0xaa"]);
    }

    #[test]
    fn claim_ties_broken_by_address() {
        let mut claims = vec![claim("0xbb", 100), claim("0xaa", 100), claim("0xcc", 100)];
        order_claims(&mut claims);
        let order: Vec<_> = claims.iter().map(|c| c.claimant.as_str()).collect();
        assert_eq!(order, vec!["0xaa", "0xbb", "0xcc"]);
    }

    #[test]
    fn duplicate_claimant_and_time_deduped() {
        let mut claims = vec![claim("0xaa", 100), claim("0xaa", 100), claim("0xaa", 100)];
        order_claims(&mut claims);
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn reclaim_at_different_time_is_distinct() {
        // A transfer shows the same wallet with a new timestamp: two records.
        let mut claims = vec![claim("0xaa", 100), claim("0xaa", 200)];
        order_claims(&mut claims);
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].claimed_at, Utc.timestamp_opt(200, 0).unwrap());
    }

    #[test]
    fn ordering_is_idempotent() {
        let mut once = vec![claim("0xbb", 100), claim("0xaa", 300), claim("0xcc", 100)];
        order_claims(&mut once);
        let mut twice = once.clone();
        order_claims(&mut twice);
        let a: Vec<_> = once.iter().map(|c| (&c.claimant, c.claimed_at)).collect();
        let b: Vec<_> = twice.iter().map(|c| (&c.claimant, c.claimed_at)).collect();
        assert_eq!(a, b);
    }

    // -- shorten_address --

    #[test]
    fn shorten_long_address() {
        let addr = "0x1234567890abcdef1234567890abcdef12345678";
        assert_eq!(shorten_address(addr), "0x1234...5678");
    }

    #[test]
    fn shorten_leaves_ens_names_alone() {
        assert_eq!(shorten_address("vitalik.eth"), "vitalik.eth");
    }

    #[test]
    fn shorten_leaves_short_strings_alone() {
        assert_eq!(shorten_address("0xabc"), "0xabc");
    }

    // -- serde round-trip (records are cached as JSON) --

    #[test]
    fn claim_record_json_round_trip() {
        let original = claim("0xaa", 1_700_000_000);
        let json = serde_json::to_string(&original).unwrap();
        let restored: ClaimRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.claimant, original.claimant);
        assert_eq!(restored.claimed_at, original.claimed_at);
        assert_eq!(restored.token_id, original.token_id);
    }

    // -- URL helpers --

    #[test]
    fn url_helpers() {
        assert_eq!(drop_url(191490), "https://poap.gallery/drops/191490");
        assert_eq!(
            token_url("7031945"),
            "https://collectors.poap.xyz/token/7031945"
        );
        assert_eq!(
            scan_url("vitalik.eth"),
            "https://collectors.poap.xyz/scan/vitalik.eth"
        );
    }
}
