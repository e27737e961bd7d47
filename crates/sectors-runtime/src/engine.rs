//! The per-game engine: queues actions, resolves phases and moves the phase clock.

use crate::actions::{tally_votes, PlayerAction};
use crate::sequencer::{
    next_phase, turn_order, NextPhase, OrderFlags, RoundActivity, SequencerContext, SequencerError,
};
use chrono::{DateTime, Utc};
use sectors_core::{
    validate_state, CompanyId, GameConfig, GameEconomyState, GameTurn, Phase, PhaseName, RoundType,
    ValidationError,
};
use sectors_econ::construction::{construct_factory, open_new_factories};
use sectors_econ::distribution::{resolve_consumption, ConsumptionReport};
use sectors_econ::earnings::{resolve_earnings, EarningsReport, LedgerPricing};
use sectors_econ::marketing::{advance_campaigns, create_campaign};
use sectors_econ::operations::{apply_operating_action, OperatingAction};
use sectors_econ::research::{release_research_grants, research_rng, submit_research, ResearchOutcome};
use sectors_econ::stock::{resolve_stock_prices, PriceMove};
use sectors_econ::EconError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error("invalid game: {0}")]
    Validation(#[from] ValidationError),
    #[error("action is only accepted during {expected}, current phase is {current}")]
    WrongPhase { expected: PhaseName, current: PhaseName },
    #[error("{company} cannot vote outside its own sub-turn")]
    NotCompanyTurn { company: CompanyId },
}

/// An action the resolvers turned down. The rest of the phase still resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedAction {
    pub phase: PhaseName,
    pub action: PlayerAction,
    pub reason: String,
}

/// Results collected while a turn resolves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnReports {
    pub turn: u32,
    pub consumption: Option<ConsumptionReport>,
    pub earnings: Option<EarningsReport>,
    pub research: Vec<ResearchOutcome>,
    pub price_moves: Vec<PriceMove>,
    pub rejections: Vec<RejectedAction>,
}

impl TurnReports {
    fn new(turn: u32) -> Self {
        Self { turn, ..Self::default() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RoundCounters {
    stock: u32,
    operating: u32,
    influence: u32,
}

/// One step of the phase clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: PhaseName,
    pub to: PhaseName,
    pub company_id: Option<CompanyId>,
    pub turn: u32,
    /// The driver forced the step after the phase deadline.
    pub forced: bool,
}

/// Owns the state of one game.
///
/// Resolution phases run on a clone of the economy state; the clone replaces
/// the live state only when the whole phase resolved and the next phase is known.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEngine {
    config: GameConfig,
    state: GameEconomyState,
    current: Phase,
    history: Vec<Phase>,
    turns: Vec<GameTurn>,
    rounds: RoundCounters,
    pending: Vec<PlayerAction>,
    voted: BTreeSet<CompanyId>,
    activity: RoundActivity,
    reports: TurnReports,
}

impl GameEngine {
    /// Start a game at `StartTurn` of the state's current turn.
    pub fn new(config: GameConfig, state: GameEconomyState, now: DateTime<Utc>) -> Result<Self, EngineError> {
        config.validate()?;
        validate_state(&state)?;
        let turn = state.turn;
        let current = Phase {
            name: PhaseName::StartTurn,
            round_type: RoundType::GameUpkeep,
            turn,
            stock_round_id: None,
            operating_round_id: None,
            influence_round_id: None,
            company_id: None,
            created_at: now,
            phase_time_ms: config.phase_time_for(PhaseName::StartTurn),
        };
        info!(turn, "game started");
        Ok(Self {
            config,
            state,
            history: vec![current.clone()],
            current,
            turns: vec![GameTurn { turn, created_at: now }],
            rounds: RoundCounters::default(),
            pending: Vec::new(),
            voted: BTreeSet::new(),
            activity: RoundActivity::default(),
            reports: TurnReports::new(turn),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameEconomyState {
        &self.state
    }

    pub fn current_phase(&self) -> &Phase {
        &self.current
    }

    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn turns(&self) -> &[GameTurn] {
        &self.turns
    }

    pub fn reports(&self) -> &TurnReports {
        &self.reports
    }

    pub fn pending(&self) -> &[PlayerAction] {
        &self.pending
    }

    pub fn turn_order(&self) -> Vec<CompanyId> {
        turn_order(&self.state.companies)
    }

    /// Whether the current phase has outlived its soft deadline.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.current.created_at).num_milliseconds();
        elapsed >= i64::try_from(self.current.phase_time_ms).unwrap_or(i64::MAX)
    }

    /// Replace the driver-reported counts for optional phases.
    pub fn set_activity(&mut self, activity: RoundActivity) {
        self.activity = activity;
    }

    /// Queue an action for the phase that resolves it.
    pub fn submit(&mut self, action: PlayerAction) -> Result<(), EngineError> {
        let expected = action.phase();
        if expected != self.current.name {
            return Err(EngineError::WrongPhase { expected, current: self.current.name });
        }
        if let PlayerAction::OperatingVote { company_id, .. } = &action {
            if self.current.company_id != Some(*company_id) {
                return Err(EngineError::NotCompanyTurn { company: *company_id });
            }
        }
        debug!(phase = %self.current.name, company = %action.company_id(), "action queued");
        self.pending.push(action);
        Ok(())
    }

    /// Resolve the current phase if needed and move to the next one.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Transition, EngineError> {
        self.step(now, false)
    }

    /// Move on after a missed deadline, resolving with whatever was submitted.
    pub fn force_next_phase(&mut self, now: DateTime<Utc>) -> Result<Transition, EngineError> {
        warn!(phase = %self.current.name, turn = self.state.turn, "phase deadline passed, forcing transition");
        self.step(now, true)
    }

    fn step(&mut self, now: DateTime<Utc>, forced: bool) -> Result<Transition, EngineError> {
        let from = self.current.clone();
        let resolved = if from.name.is_resolution() {
            let mut working = self.state.clone();
            let mut reports = self.reports.clone();
            self.resolve(&from, &mut working, &mut reports)?;
            Some((working, reports))
        } else {
            None
        };

        let mut voted = self.voted.clone();
        if from.name == PhaseName::OperatingCompanyVoteResolve {
            if let Some(id) = from.company_id {
                voted.insert(id);
            }
        }
        let companies = resolved
            .as_ref()
            .map(|(s, _)| s.companies.as_slice())
            .unwrap_or(self.state.companies.as_slice());
        let ctx = SequencerContext {
            flags: OrderFlags::from(&self.config),
            turn: self.state.turn,
            companies,
            voted: &voted,
            activity: self.activity,
        };
        let next = next_phase(from.name, from.company_id, &ctx)?;

        if let Some((state, reports)) = resolved {
            self.state = state;
            self.reports = reports;
        }
        self.voted = voted;
        self.pending.retain(|a| a.resolved_in() != from.name);
        if next.name == PhaseName::StartTurn {
            self.begin_turn(now);
        }
        self.enter(next, now);

        info!(
            turn = self.state.turn,
            from = %from.name,
            to = %next.name,
            company = ?next.company_id,
            forced,
            "phase transition"
        );
        Ok(Transition {
            from: from.name,
            to: next.name,
            company_id: next.company_id,
            turn: self.state.turn,
            forced,
        })
    }

    fn begin_turn(&mut self, now: DateTime<Utc>) {
        self.state.turn += 1;
        let turn = self.state.turn;
        self.turns.push(GameTurn { turn, created_at: now });
        self.reports = TurnReports::new(turn);
        self.voted.clear();
        self.pending.clear();
        self.activity = RoundActivity::default();
    }

    fn enter(&mut self, next: NextPhase, now: DateTime<Utc>) {
        if next.round_type != self.current.round_type {
            match next.round_type {
                RoundType::Stock => self.rounds.stock += 1,
                RoundType::Operating => self.rounds.operating += 1,
                RoundType::Influence => self.rounds.influence += 1,
                _ => {}
            }
        }
        let in_round = |round: RoundType, id: u32| (next.round_type == round).then_some(id);
        let phase = Phase {
            name: next.name,
            round_type: next.round_type,
            turn: self.state.turn,
            stock_round_id: in_round(RoundType::Stock, self.rounds.stock),
            operating_round_id: in_round(RoundType::Operating, self.rounds.operating),
            influence_round_id: in_round(RoundType::Influence, self.rounds.influence),
            company_id: next.company_id,
            created_at: now,
            phase_time_ms: self.config.phase_time_for(next.name),
        };
        self.history.push(phase.clone());
        self.current = phase;
    }

    fn queued_for(&self, phase: PhaseName) -> impl Iterator<Item = &PlayerAction> {
        self.pending.iter().filter(move |a| a.resolved_in() == phase)
    }

    fn resolve(
        &self,
        phase: &Phase,
        state: &mut GameEconomyState,
        reports: &mut TurnReports,
    ) -> Result<(), EngineError> {
        match phase.name {
            PhaseName::OperatingCompanyVoteResolve => {
                let company_id = phase
                    .company_id
                    .ok_or(SequencerError::MissingCompany(phase.name))?;
                let votes: Vec<OperatingAction> = self
                    .queued_for(phase.name)
                    .filter_map(|a| match a {
                        PlayerAction::OperatingVote { company_id: c, action } if *c == company_id => {
                            Some(action.clone())
                        }
                        _ => None,
                    })
                    .collect();
                let action = tally_votes(&votes);
                let outcome = apply_operating_action(state, company_id, &action);
                record(reports, phase.name, &PlayerAction::OperatingVote { company_id, action }, outcome)?;
            }
            PhaseName::FactoryConstructionResolve => {
                for action in self.queued_for(phase.name) {
                    if let PlayerAction::BuildFactory(order) = action {
                        let outcome = construct_factory(state, order).map(|_| ());
                        record(reports, phase.name, action, outcome)?;
                    }
                }
            }
            PhaseName::MarketingAndResearchActionResolve => {
                for action in self.queued_for(phase.name) {
                    let outcome = match action {
                        PlayerAction::LaunchCampaign { company_id, tier, resources } => {
                            create_campaign(state, *company_id, *tier, resources).map(|_| ())
                        }
                        PlayerAction::Research { company_id } => {
                            let mut rng = research_rng(state.rng_seed, state.turn, *company_id);
                            submit_research(state, *company_id, &mut rng)
                                .map(|outcome| reports.research.push(outcome))
                        }
                        _ => Ok(()),
                    };
                    record(reports, phase.name, action, outcome)?;
                }
            }
            PhaseName::ConsumptionPhase => {
                reports.consumption = Some(resolve_consumption(state)?);
            }
            PhaseName::EarningsCall => {
                let consumption = reports
                    .consumption
                    .clone()
                    .unwrap_or_else(|| ConsumptionReport { turn: state.turn, ..ConsumptionReport::default() });
                let pricing = LedgerPricing::from_state(state);
                reports.earnings = Some(resolve_earnings(state, &consumption, &pricing)?);
            }
            PhaseName::OperatingStockPriceAdjust => {
                let earnings = reports.earnings.clone().unwrap_or_default();
                reports.price_moves = resolve_stock_prices(state, |c| earnings.net_profit(c))?;
            }
            PhaseName::EndTurnEconomy => {
                let expired = advance_campaigns(state)?;
                let released = release_research_grants(state)?;
                let opened = open_new_factories(state);
                validate_state(state)?;
                info!(turn = state.turn, expired = expired.len(), released, opened, "end-turn economy resolved");
            }
            _ => {}
        }
        Ok(())
    }
}

/// Keep a rejection in the reports; any other error aborts the phase.
fn record(
    reports: &mut TurnReports,
    phase: PhaseName,
    action: &PlayerAction,
    outcome: Result<(), EconError>,
) -> Result<(), EngineError> {
    match outcome {
        Ok(()) => Ok(()),
        Err(EconError::Rejected(reason)) => {
            warn!(%phase, company = %action.company_id(), %reason, "action rejected");
            reports.rejections.push(RejectedAction {
                phase,
                action: action.clone(),
                reason: reason.to_string(),
            });
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
