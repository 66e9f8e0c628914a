use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::assignment::TerritoryAssignment;
use super::region::RegionId;
use super::site::SiteId;

/// Persistent region -> conquering-site overrides.
///
/// Snapshots share storage; a conquest that changes anything copies the map,
/// so holders of an earlier ledger keep seeing the earlier state. The set of
/// regions never shrinks, only the owners change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConquestLedger {
    owners: Arc<BTreeMap<RegionId, SiteId>>,
}

/// A new ledger snapshot and how many regions changed hands
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerUpdate {
    pub ledger: ConquestLedger,
    pub transferred: usize,
}

impl ConquestLedger {
    /// Ledger holding exactly the regions of the initial assignment
    pub fn seed(assignment: &TerritoryAssignment) -> Self {
        Self {
            owners: Arc::new(assignment.assignments().clone()),
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (RegionId, SiteId)>) -> Self {
        Self {
            owners: Arc::new(entries.into_iter().collect()),
        }
    }

    /// Hand every region held by `loser` to `winner`. `self` is left untouched.
    pub fn apply_conquest(&self, winner: &SiteId, loser: &SiteId) -> LedgerUpdate {
        let transferred = if winner == loser {
            0
        } else {
            self.owners.values().filter(|owner| *owner == loser).count()
        };

        if transferred == 0 {
            return LedgerUpdate {
                ledger: self.clone(),
                transferred,
            };
        }

        let mut owners = (*self.owners).clone();
        for owner in owners.values_mut() {
            if *owner == *loser {
                *owner = winner.clone();
            }
        }

        info!(%winner, %loser, transferred, "conquest applied to ledger");

        LedgerUpdate {
            ledger: Self {
                owners: Arc::new(owners),
            },
            transferred,
        }
    }

    /// Recorded owner of a region
    pub fn owner(&self, region: RegionId) -> Option<&SiteId> {
        self.owners.get(&region)
    }

    /// Regions recorded for a site, in region id order
    pub fn regions_of<'a>(&'a self, site: &'a SiteId) -> impl Iterator<Item = RegionId> + 'a {
        self.owners
            .iter()
            .filter(move |(_, owner)| *owner == site)
            .map(|(&region, _)| region)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegionId, &SiteId)> {
        self.owners.iter().map(|(&region, owner)| (region, owner))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// True when both snapshots point at the same storage
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.owners, &other.owners)
    }
}
