//! Action payloads submitted by the phase driver.

use sectors_core::{CompanyId, MarketingTier, PhaseName, ResourceType};
use sectors_econ::construction::FactoryOrder;
use sectors_econ::operations::OperatingAction;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerAction {
    /// One vote for the company whose sub-turn is running.
    OperatingVote { company_id: CompanyId, action: OperatingAction },
    BuildFactory(FactoryOrder),
    LaunchCampaign { company_id: CompanyId, tier: MarketingTier, resources: Vec<ResourceType> },
    Research { company_id: CompanyId },
}

impl PlayerAction {
    /// Phase during which the action is accepted.
    pub fn phase(&self) -> PhaseName {
        match self {
            PlayerAction::OperatingVote { .. } => PhaseName::OperatingActionCompanyVote,
            PlayerAction::BuildFactory(_) => PhaseName::FactoryConstruction,
            PlayerAction::LaunchCampaign { .. } | PlayerAction::Research { .. } => {
                PhaseName::MarketingAndResearchAction
            }
        }
    }

    /// Phase whose resolution applies the action.
    pub fn resolved_in(&self) -> PhaseName {
        match self.phase() {
            PhaseName::OperatingActionCompanyVote => PhaseName::OperatingCompanyVoteResolve,
            PhaseName::FactoryConstruction => PhaseName::FactoryConstructionResolve,
            _ => PhaseName::MarketingAndResearchActionResolve,
        }
    }

    pub fn company_id(&self) -> CompanyId {
        match self {
            PlayerAction::OperatingVote { company_id, .. }
            | PlayerAction::LaunchCampaign { company_id, .. }
            | PlayerAction::Research { company_id } => *company_id,
            PlayerAction::BuildFactory(order) => order.company_id,
        }
    }
}

/// Pick the winning operating action from votes in submission order.
///
/// Most votes wins; ties go to the action that was voted for first.
/// No votes means a veto.
pub fn tally_votes(votes: &[OperatingAction]) -> OperatingAction {
    let mut counts: Vec<(&OperatingAction, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(a, _)| *a == vote) {
            Some((_, n)) => *n += 1,
            None => counts.push((vote, 1)),
        }
    }
    let best = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    counts
        .into_iter()
        .find(|(_, n)| *n == best)
        .map(|(a, _)| a.clone())
        .unwrap_or(OperatingAction::Veto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectors_core::FactoryId;

    #[test]
    fn majority_wins_and_ties_go_to_first() {
        let close = OperatingAction::CloseFactory { factory_id: FactoryId(1) };
        let votes = vec![OperatingAction::TakeLoan, close.clone(), close.clone()];
        assert_eq!(tally_votes(&votes), close);
        let tied = vec![OperatingAction::TakeLoan, close.clone(), close, OperatingAction::TakeLoan];
        assert_eq!(tally_votes(&tied), OperatingAction::TakeLoan);
        assert_eq!(tally_votes(&[]), OperatingAction::Veto);
    }

    #[test]
    fn actions_know_their_phases() {
        let a = PlayerAction::Research { company_id: CompanyId(1) };
        assert_eq!(a.phase(), PhaseName::MarketingAndResearchAction);
        assert_eq!(a.resolved_in(), PhaseName::MarketingAndResearchActionResolve);
        assert_eq!(a.company_id(), CompanyId(1));
    }
}
