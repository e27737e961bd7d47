//! Pure next-phase computation.
//!
//! The sequencer never mutates anything. Given the phase just finished and a
//! [`SequencerContext`], it walks the fixed [`PHASE_ORDER`] and returns the
//! first phase that has to be played, handling per-company sub-turns and the
//! reroute past the company block when no company is active.

use sectors_core::{Company, CompanyId, GameConfig, PhaseName, RoundType, PHASE_ORDER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Counts reported by the driver that decide whether optional phases run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundActivity {
    pub open_limit_orders: u32,
    pub open_short_orders: u32,
    pub pending_short_orders: u32,
    pub open_option_contracts: u32,
    pub pending_option_orders: u32,
    pub prize_winners: u32,
    pub divestment_candidates: u32,
    pub sectors_awaiting_company: u32,
}

/// Order types enabled for a game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFlags {
    pub use_limit_orders: bool,
    pub use_option_orders: bool,
    pub use_short_orders: bool,
}

impl From<&GameConfig> for OrderFlags {
    fn from(cfg: &GameConfig) -> Self {
        Self {
            use_limit_orders: cfg.use_limit_orders,
            use_option_orders: cfg.use_option_orders,
            use_short_orders: cfg.use_short_orders,
        }
    }
}

/// Everything the sequencer reads.
#[derive(Clone, Copy, Debug)]
pub struct SequencerContext<'a> {
    pub flags: OrderFlags,
    pub turn: u32,
    pub companies: &'a [Company],
    /// Companies that already finished their vote this operating round.
    pub voted: &'a BTreeSet<CompanyId>,
    pub activity: RoundActivity,
}

/// The phase to enter next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPhase {
    pub name: PhaseName,
    pub round_type: RoundType,
    pub company_id: Option<CompanyId>,
}

impl NextPhase {
    fn new(name: PhaseName, company_id: Option<CompanyId>) -> Self {
        Self { name, round_type: name.round_type(), company_id }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequencerError {
    #[error("no playable phase found after {0}")]
    NoPlayablePhase(PhaseName),
    #[error("{0} requires a company")]
    MissingCompany(PhaseName),
    #[error("{company} is not part of this game (phase {phase})")]
    UnknownCompany { phase: PhaseName, company: CompanyId },
}

/// Active companies by stock price descending, then id ascending.
pub fn turn_order(companies: &[Company]) -> Vec<CompanyId> {
    let mut active: Vec<&Company> = companies.iter().filter(|c| c.is_active()).collect();
    active.sort_by(|a, b| {
        b.current_stock_price
            .cmp(&a.current_stock_price)
            .then_with(|| a.id.cmp(&b.id))
    });
    active.into_iter().map(|c| c.id).collect()
}

/// Whether `name` is played this turn. Pure; company phases are decided in [`next_phase`].
pub fn needs_to_be_played(name: PhaseName, ctx: &SequencerContext<'_>) -> bool {
    use PhaseName::*;
    let flags = ctx.flags;
    let act = ctx.activity;
    let prize_turn = ctx.turn % 3 == 0;
    match name {
        InfluenceBidAction | InfluenceBidResolve => ctx.turn == 1,
        PrizeVoteAction | PrizeVoteResolve => prize_turn,
        PrizeDistributeAction | PrizeDistributeResolve => prize_turn && act.prize_winners > 0,
        StockResolveLimitOrder => flags.use_limit_orders && act.open_limit_orders > 0,
        StockOpenLimitOrders => flags.use_limit_orders,
        StockShortOrderInterest => flags.use_short_orders && act.open_short_orders > 0,
        StockActionShortOrder => flags.use_short_orders,
        StockResolvePendingShortOrder => flags.use_short_orders && act.pending_short_orders > 0,
        StockResolveOptionOrder => flags.use_option_orders && act.open_option_contracts > 0,
        StockActionOptionOrder => flags.use_option_orders,
        StockResolvePendingOptionOrder => flags.use_option_orders && act.pending_option_orders > 0,
        OperatingActionCompanyVote | OperatingActionCompanyVoteResult | OperatingCompanyVoteResolve => {
            ctx.companies.iter().any(Company::is_active)
        }
        Divestment => act.divestment_candidates > 0,
        SectorNewCompany => act.sectors_awaiting_company > 0,
        _ => true,
    }
}

fn require_company(
    phase: PhaseName,
    company_id: Option<CompanyId>,
    ctx: &SequencerContext<'_>,
) -> Result<CompanyId, SequencerError> {
    let id = company_id.ok_or(SequencerError::MissingCompany(phase))?;
    if !ctx.companies.iter().any(|c| c.id == id) {
        return Err(SequencerError::UnknownCompany { phase, company: id });
    }
    Ok(id)
}

/// First un-voted company in turn order, searching after `after` and wrapping.
fn next_unvoted(ctx: &SequencerContext<'_>, after: Option<CompanyId>) -> Option<CompanyId> {
    let order = turn_order(ctx.companies);
    let start = after
        .and_then(|id| order.iter().position(|c| *c == id))
        .map(|p| p + 1)
        .unwrap_or(0);
    (0..order.len())
        .map(|i| order[(start + i) % order.len()])
        .find(|id| Some(*id) != after && !ctx.voted.contains(id))
}

/// Next phase after `current` (played by `company_id` for per-company phases).
pub fn next_phase(
    current: PhaseName,
    company_id: Option<CompanyId>,
    ctx: &SequencerContext<'_>,
) -> Result<NextPhase, SequencerError> {
    match current {
        PhaseName::OperatingActionCompanyVote | PhaseName::OperatingActionCompanyVoteResult => {
            let id = require_company(current, company_id, ctx)?;
            return Ok(NextPhase::new(current.successor(), Some(id)));
        }
        PhaseName::OperatingCompanyVoteResolve => {
            let id = require_company(current, company_id, ctx)?;
            if let Some(next) = next_unvoted(ctx, Some(id)) {
                return Ok(NextPhase::new(PhaseName::OperatingActionCompanyVote, Some(next)));
            }
            return walk_from(PhaseName::FactoryConstruction, current, ctx);
        }
        _ => {}
    }
    walk_from(current.successor(), current, ctx)
}

fn walk_from(
    mut candidate: PhaseName,
    from: PhaseName,
    ctx: &SequencerContext<'_>,
) -> Result<NextPhase, SequencerError> {
    for _ in 0..PHASE_ORDER.len() {
        if candidate == PhaseName::OperatingActionCompanyVote {
            if !needs_to_be_played(candidate, ctx) {
                candidate = PhaseName::CapitalGains;
                continue;
            }
            match next_unvoted(ctx, None) {
                Some(id) => return Ok(NextPhase::new(candidate, Some(id))),
                None => {
                    candidate = PhaseName::FactoryConstruction;
                    continue;
                }
            }
        }
        if needs_to_be_played(candidate, ctx) {
            return Ok(NextPhase::new(candidate, None));
        }
        candidate = candidate.successor();
    }
    Err(SequencerError::NoPlayablePhase(from))
}
