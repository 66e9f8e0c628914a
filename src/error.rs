//! Error types for the territory engine.
//!
//! Only precondition violations surface as errors. Empty input, stale ledger
//! owners and a rebalancer that hits its iteration cap are all resolved
//! internally and never reach the caller as an [`EngineError`].

use crate::territory::{RegionId, SiteId};

/// Errors raised by graph construction, configuration and the game session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// A region carries a centroid or area the partitioner cannot use.
    #[error("malformed region {region}: {reason}")]
    MalformedRegion {
        /// The offending region.
        region: RegionId,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Two regions share the same identifier.
    #[error("duplicate region id: {0}")]
    DuplicateRegion(RegionId),

    /// A site anchor is not a usable lon/lat pair.
    #[error("malformed site {site}: {reason}")]
    MalformedSite {
        /// The offending site.
        site: SiteId,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Two sites share the same identifier.
    #[error("duplicate site id: {0}")]
    DuplicateSite(SiteId),

    /// A conquest named a site the session has never seen.
    #[error("unknown site: {0}")]
    UnknownSite(SiteId),

    /// A conquest named a site that has already been eliminated.
    #[error("site {0} is no longer active")]
    InactiveSite(SiteId),

    /// A site cannot defeat itself.
    #[error("site {0} cannot conquer itself")]
    SelfConquest(SiteId),

    /// Engine tuning parameters are out of range.
    #[error("invalid engine config: {0}")]
    InvalidConfig(&'static str),
}
