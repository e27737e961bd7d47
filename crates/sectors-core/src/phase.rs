//! Phase names, round types and the fixed per-turn phase order.

use crate::error::ValidationError;
use crate::ids::CompanyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Round a phase belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundType {
    GameUpkeep,
    Influence,
    Prize,
    Stock,
    Operating,
    Forecast,
}

/// Every named phase of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseName {
    StartTurn,
    InfluenceBidAction,
    InfluenceBidResolve,
    PrizeVoteAction,
    PrizeVoteResolve,
    PrizeDistributeAction,
    PrizeDistributeResolve,
    StockResolveLimitOrder,
    StockActionOrder,
    StockActionResult,
    StockActionReveal,
    StockResolveMarketOrder,
    StockShortOrderInterest,
    StockActionShortOrder,
    StockResolvePendingShortOrder,
    StockResolveOptionOrder,
    StockActionOptionOrder,
    StockResolvePendingOptionOrder,
    StockOpenLimitOrders,
    OperatingActionCompanyVote,
    OperatingActionCompanyVoteResult,
    OperatingCompanyVoteResolve,
    FactoryConstruction,
    FactoryConstructionResolve,
    MarketingAndResearchAction,
    MarketingAndResearchActionResolve,
    ConsumptionPhase,
    EarningsCall,
    OperatingStockPriceAdjust,
    CapitalGains,
    Divestment,
    SectorNewCompany,
    EndTurnEconomy,
    ForecastCommitment,
    ForecastResolve,
    EndTurn,
}

/// The order phases are visited in within one turn.
pub const PHASE_ORDER: [PhaseName; 36] = [
    PhaseName::StartTurn,
    PhaseName::InfluenceBidAction,
    PhaseName::InfluenceBidResolve,
    PhaseName::PrizeVoteAction,
    PhaseName::PrizeVoteResolve,
    PhaseName::PrizeDistributeAction,
    PhaseName::PrizeDistributeResolve,
    PhaseName::StockResolveLimitOrder,
    PhaseName::StockActionOrder,
    PhaseName::StockActionResult,
    PhaseName::StockActionReveal,
    PhaseName::StockResolveMarketOrder,
    PhaseName::StockShortOrderInterest,
    PhaseName::StockActionShortOrder,
    PhaseName::StockResolvePendingShortOrder,
    PhaseName::StockResolveOptionOrder,
    PhaseName::StockActionOptionOrder,
    PhaseName::StockResolvePendingOptionOrder,
    PhaseName::StockOpenLimitOrders,
    PhaseName::OperatingActionCompanyVote,
    PhaseName::OperatingActionCompanyVoteResult,
    PhaseName::OperatingCompanyVoteResolve,
    PhaseName::FactoryConstruction,
    PhaseName::FactoryConstructionResolve,
    PhaseName::MarketingAndResearchAction,
    PhaseName::MarketingAndResearchActionResolve,
    PhaseName::ConsumptionPhase,
    PhaseName::EarningsCall,
    PhaseName::OperatingStockPriceAdjust,
    PhaseName::CapitalGains,
    PhaseName::Divestment,
    PhaseName::SectorNewCompany,
    PhaseName::EndTurnEconomy,
    PhaseName::ForecastCommitment,
    PhaseName::ForecastResolve,
    PhaseName::EndTurn,
];

impl PhaseName {
    /// Position in [`PHASE_ORDER`].
    pub fn position(self) -> usize {
        PHASE_ORDER
            .iter()
            .position(|p| *p == self)
            .unwrap_or(PHASE_ORDER.len())
    }

    /// Following entry of [`PHASE_ORDER`], wrapping after `EndTurn`.
    pub fn successor(self) -> PhaseName {
        PHASE_ORDER[(self.position() + 1) % PHASE_ORDER.len()]
    }

    pub fn round_type(self) -> RoundType {
        use PhaseName::*;
        match self {
            StartTurn | SectorNewCompany | EndTurnEconomy | EndTurn => RoundType::GameUpkeep,
            InfluenceBidAction | InfluenceBidResolve => RoundType::Influence,
            PrizeVoteAction | PrizeVoteResolve | PrizeDistributeAction | PrizeDistributeResolve => {
                RoundType::Prize
            }
            StockResolveLimitOrder
            | StockActionOrder
            | StockActionResult
            | StockActionReveal
            | StockResolveMarketOrder
            | StockShortOrderInterest
            | StockActionShortOrder
            | StockResolvePendingShortOrder
            | StockResolveOptionOrder
            | StockActionOptionOrder
            | StockResolvePendingOptionOrder
            | StockOpenLimitOrders => RoundType::Stock,
            OperatingActionCompanyVote
            | OperatingActionCompanyVoteResult
            | OperatingCompanyVoteResolve
            | FactoryConstruction
            | FactoryConstructionResolve
            | MarketingAndResearchAction
            | MarketingAndResearchActionResolve
            | ConsumptionPhase
            | EarningsCall
            | OperatingStockPriceAdjust
            | CapitalGains
            | Divestment => RoundType::Operating,
            ForecastCommitment | ForecastResolve => RoundType::Forecast,
        }
    }

    /// Phases played once per company, in turn order.
    pub fn is_company_phase(self) -> bool {
        matches!(
            self,
            PhaseName::OperatingActionCompanyVote
                | PhaseName::OperatingActionCompanyVoteResult
                | PhaseName::OperatingCompanyVoteResolve
        )
    }

    /// Phases whose exit runs an engine calculator.
    pub fn is_resolution(self) -> bool {
        matches!(
            self,
            PhaseName::OperatingCompanyVoteResolve
                | PhaseName::FactoryConstructionResolve
                | PhaseName::MarketingAndResearchActionResolve
                | PhaseName::ConsumptionPhase
                | PhaseName::EarningsCall
                | PhaseName::OperatingStockPriceAdjust
                | PhaseName::EndTurnEconomy
        )
    }

    pub fn as_str(self) -> &'static str {
        use PhaseName::*;
        match self {
            StartTurn => "START_TURN",
            InfluenceBidAction => "INFLUENCE_BID_ACTION",
            InfluenceBidResolve => "INFLUENCE_BID_RESOLVE",
            PrizeVoteAction => "PRIZE_VOTE_ACTION",
            PrizeVoteResolve => "PRIZE_VOTE_RESOLVE",
            PrizeDistributeAction => "PRIZE_DISTRIBUTE_ACTION",
            PrizeDistributeResolve => "PRIZE_DISTRIBUTE_RESOLVE",
            StockResolveLimitOrder => "STOCK_RESOLVE_LIMIT_ORDER",
            StockActionOrder => "STOCK_ACTION_ORDER",
            StockActionResult => "STOCK_ACTION_RESULT",
            StockActionReveal => "STOCK_ACTION_REVEAL",
            StockResolveMarketOrder => "STOCK_RESOLVE_MARKET_ORDER",
            StockShortOrderInterest => "STOCK_SHORT_ORDER_INTEREST",
            StockActionShortOrder => "STOCK_ACTION_SHORT_ORDER",
            StockResolvePendingShortOrder => "STOCK_RESOLVE_PENDING_SHORT_ORDER",
            StockResolveOptionOrder => "STOCK_RESOLVE_OPTION_ORDER",
            StockActionOptionOrder => "STOCK_ACTION_OPTION_ORDER",
            StockResolvePendingOptionOrder => "STOCK_RESOLVE_PENDING_OPTION_ORDER",
            StockOpenLimitOrders => "STOCK_OPEN_LIMIT_ORDERS",
            OperatingActionCompanyVote => "OPERATING_ACTION_COMPANY_VOTE",
            OperatingActionCompanyVoteResult => "OPERATING_ACTION_COMPANY_VOTE_RESULT",
            OperatingCompanyVoteResolve => "OPERATING_COMPANY_VOTE_RESOLVE",
            FactoryConstruction => "FACTORY_CONSTRUCTION",
            FactoryConstructionResolve => "FACTORY_CONSTRUCTION_RESOLVE",
            MarketingAndResearchAction => "MARKETING_AND_RESEARCH_ACTION",
            MarketingAndResearchActionResolve => "MARKETING_AND_RESEARCH_ACTION_RESOLVE",
            ConsumptionPhase => "CONSUMPTION_PHASE",
            EarningsCall => "EARNINGS_CALL",
            OperatingStockPriceAdjust => "OPERATING_STOCK_PRICE_ADJUST",
            CapitalGains => "CAPITAL_GAINS",
            Divestment => "DIVESTMENT",
            SectorNewCompany => "SECTOR_NEW_COMPANY",
            EndTurnEconomy => "END_TURN_ECONOMY",
            ForecastCommitment => "FORECAST_COMMITMENT",
            ForecastResolve => "FORECAST_RESOLVE",
            EndTurn => "END_TURN",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PHASE_ORDER
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownPhase(s.to_string()))
    }
}

/// One entry in a game's phase history. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: PhaseName,
    pub round_type: RoundType,
    pub turn: u32,
    pub stock_round_id: Option<u32>,
    pub operating_round_id: Option<u32>,
    pub influence_round_id: Option<u32>,
    pub company_id: Option<CompanyId>,
    pub created_at: DateTime<Utc>,
    /// Soft deadline enforced by the driver.
    pub phase_time_ms: u64,
}

/// A completed or in-progress turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTurn {
    pub turn: u32,
    pub created_at: DateTime<Utc>,
}
