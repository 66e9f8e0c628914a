//! Territorial assignment and conquest tracking.
//!
//! Pipeline: [`partition`] assigns every region to its nearest site,
//! [`rebalance`] evens out areas without breaking contiguity, the result seeds a
//! [`ConquestLedger`], and [`resolve`] combines ledger and proximity into the
//! final [`TerritoryAssignment`] on every query.

mod assignment;
mod centers;
mod contiguity;
mod ledger;
mod partition;
mod rebalance;
mod region;
mod resolve;
mod session;
mod site;

pub use assignment::TerritoryAssignment;
pub use centers::{territory_centers, CenterKind, TerritoryCenter};
pub use contiguity::{is_contiguous, Reachability};
pub use ledger::{ConquestLedger, LedgerUpdate};
pub use partition::{nearest_site, partition, Ownership};
pub use rebalance::{rebalance, RebalanceReport, SiteBalance};
pub use region::{Region, RegionGraph, RegionId};
pub use resolve::resolve;
pub use session::{ConquestOutcome, GameSession};
pub use site::{validate_sites, Site, SiteId};
