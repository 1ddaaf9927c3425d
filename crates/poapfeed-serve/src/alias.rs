//! Claimant alias resolution.
//!
//! A wallet address is rendered as its ENS name when one is available.
//! Resolution must never fail a feed render: every error here is logged
//! and swallowed, and the raw address is used unchanged as the fallback.

use poapfeed_core::ClaimRecord;

use crate::poap::PoapClient;

/// Author string for a claim entry: the inline ENS alias when the
/// upstream record carried one, else the raw claimant address.
pub fn claim_author(claim: &ClaimRecord) -> String {
    claim
        .claimant_alias
        .clone()
        .unwrap_or_else(|| claim.claimant.clone())
}

/// Resolve the display alias for an address-scoped feed's subject.
///
/// ENS names pass through untouched. Raw addresses get one remote lookup;
/// absence, rate limits, and transport failures all fall back to the
/// address unchanged.
pub async fn resolve_address(client: &PoapClient, address: &str) -> String {
    // Already an ENS-style name, nothing to resolve.
    if address.contains('.') {
        return address.to_string();
    }

    match client.lookup_ens(address).await {
        Ok(Some(ens)) => ens,
        Ok(None) => address.to_string(),
        Err(e) => {
            tracing::debug!(address, error = %e, "alias lookup failed, using raw address");
            address.to_string()
        }
    }
}
