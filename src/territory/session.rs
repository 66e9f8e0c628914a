use tracing::info;

use super::assignment::TerritoryAssignment;
use super::centers::{territory_centers, TerritoryCenter};
use super::ledger::ConquestLedger;
use super::partition::partition;
use super::rebalance::{rebalance, RebalanceReport};
use super::region::RegionGraph;
use super::resolve::resolve;
use super::site::{validate_sites, Site, SiteId};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Result of recording one game
#[derive(Clone, Debug, PartialEq)]
pub struct ConquestOutcome {
    pub winner: SiteId,
    pub loser: SiteId,
    /// Regions that changed hands
    pub transferred: usize,
    /// Sites still in the game
    pub remaining: usize,
}

/// One game from seeding to the last conquest.
///
/// The expensive partition + rebalance runs once in [`GameSession::new`];
/// afterwards territory only moves through ledger conquests.
pub struct GameSession {
    graph: RegionGraph,
    roster: Vec<Site>,
    ledger: ConquestLedger,
    report: RebalanceReport,
}

impl GameSession {
    /// Partition and rebalance the active part of `roster`, then seed the ledger.
    pub fn new(graph: RegionGraph, roster: Vec<Site>, config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        validate_sites(&roster)?;

        let active: Vec<Site> = roster.iter().filter(|s| s.active).cloned().collect();
        let initial = partition(&graph, &active);
        let (balanced, report) = rebalance(&graph, &active, initial, config);
        let ledger = ConquestLedger::seed(&balanced.to_assignment(&graph, &active));

        info!(
            regions = graph.len(),
            sites = active.len(),
            seeded = ledger.len(),
            converged = report.converged,
            "game session seeded"
        );

        Ok(Self {
            graph,
            roster,
            ledger,
            report,
        })
    }

    /// `winner` defeated `loser`: the loser's regions move to the winner and the
    /// loser leaves the game.
    pub fn record_result(&mut self, winner: &SiteId, loser: &SiteId) -> Result<ConquestOutcome, EngineError> {
        if winner == loser {
            return Err(EngineError::SelfConquest(winner.clone()));
        }
        self.require_active(winner)?;
        let loser_idx = self.require_active(loser)?;

        let update = self.ledger.apply_conquest(winner, loser);
        self.ledger = update.ledger;
        self.roster[loser_idx].active = false;

        let outcome = ConquestOutcome {
            winner: winner.clone(),
            loser: loser.clone(),
            transferred: update.transferred,
            remaining: self.roster.iter().filter(|s| s.active).count(),
        };
        info!(
            winner = %outcome.winner,
            loser = %outcome.loser,
            transferred = outcome.transferred,
            remaining = outcome.remaining,
            "result recorded"
        );
        Ok(outcome)
    }

    fn require_active(&self, id: &SiteId) -> Result<usize, EngineError> {
        let idx = self
            .roster
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| EngineError::UnknownSite(id.clone()))?;
        if !self.roster[idx].active {
            return Err(EngineError::InactiveSite(id.clone()));
        }
        Ok(idx)
    }

    /// Current territory for the active sites
    pub fn assignment(&self) -> TerritoryAssignment {
        resolve(&self.graph, &self.active_sites(), Some(&self.ledger))
    }

    /// Label anchors for an assignment produced by this session
    pub fn centers(&self, assignment: &TerritoryAssignment) -> Vec<TerritoryCenter> {
        territory_centers(&self.graph, &self.roster, assignment)
    }

    /// Snapshot of the sites still in the game, in roster order
    pub fn active_sites(&self) -> Vec<Site> {
        self.roster.iter().filter(|s| s.active).cloned().collect()
    }

    /// The last site standing, once only one remains
    pub fn champion(&self) -> Option<&Site> {
        let mut active = self.roster.iter().filter(|s| s.active);
        match (active.next(), active.next()) {
            (Some(site), None) => Some(site),
            _ => None,
        }
    }

    pub fn site(&self, id: &SiteId) -> Option<&Site> {
        self.roster.iter().find(|s| &s.id == id)
    }

    pub fn roster(&self) -> &[Site] {
        &self.roster
    }

    pub fn graph(&self) -> &RegionGraph {
        &self.graph
    }

    pub fn ledger(&self) -> &ConquestLedger {
        &self.ledger
    }

    /// Diagnostics from the seeding rebalance
    pub fn report(&self) -> &RebalanceReport {
        &self.report
    }
}
