//! Research submissions and sector technology progression.

use crate::{active_company, ensure_funds, workforce_error, EconError, Rejection};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use sectors_core::factory::MAX_TECHNOLOGY_LEVEL;
use sectors_core::sector::MAX_RESEARCH_MARKER;
use sectors_core::{
    size_bounds, technology_level_for, CompanyId, FactoryId, GameEconomyState, ResearchGrant,
    SectorId,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Cash paid per research submission.
pub const RESEARCH_COST: i64 = 100;

/// Workers held by a submission until end-turn economy.
pub const RESEARCH_WORKERS: u32 = 1;

/// Percent chance of advancing 0, 1 or 2 spaces.
pub const RESEARCH_ODDS_PERCENT: [u32; 3] = [25, 60, 15];

/// Deterministic generator for one company's research roll in one turn.
pub fn research_rng(game_seed: u64, turn: u32, company_id: CompanyId) -> ChaCha8Rng {
    let seed = game_seed ^ (u64::from(turn) << 32) ^ u64::from(company_id.0);
    ChaCha8Rng::seed_from_u64(seed)
}

/// Draw the number of research spaces gained.
pub fn roll_spaces<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    let roll = rng.gen_range(0..100u32);
    let mut acc = 0;
    for (spaces, pct) in RESEARCH_ODDS_PERCENT.iter().enumerate() {
        acc += pct;
        if roll < acc {
            return spaces as u8;
        }
    }
    0
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub company_id: CompanyId,
    pub sector_id: SectorId,
    pub spaces: u8,
    pub marker: u8,
    pub previous_level: u8,
    pub technology_level: u8,
    /// Factories rusted by a level increase.
    pub rusted: Vec<FactoryId>,
}

impl ResearchOutcome {
    pub fn level_changed(&self) -> bool {
        self.technology_level != self.previous_level
    }
}

/// Submit research for `company_id`, rolling with `rng`.
///
/// A company submits at most once per turn. Cash is spent immediately; the
/// worker is held as a [`ResearchGrant`] until [`release_research_grants`].
pub fn submit_research<R: Rng + ?Sized>(
    state: &mut GameEconomyState,
    company_id: CompanyId,
    rng: &mut R,
) -> Result<ResearchOutcome, EconError> {
    let company = active_company(state, company_id)?;
    let sector_id = company.sector_id;
    let turn = state.turn;
    if state
        .research_grants
        .iter()
        .any(|g| g.company_id == company_id && g.turn == turn)
    {
        return Err(Rejection::ResearchAlreadySubmitted(company_id).into());
    }
    let cost = Decimal::from(RESEARCH_COST);
    ensure_funds("research", cost, company.cash_on_hand)?;
    state
        .workforce
        .ensure_available(RESEARCH_WORKERS)
        .map_err(|e| workforce_error("research", e))?;
    let sector = state
        .sector(sector_id)
        .ok_or_else(|| EconError::invariant(format!("{company_id} points at missing {sector_id}")))?;
    let previous_marker = sector.research_marker;
    let previous_level = sector.technology_level;

    let spaces = roll_spaces(rng);
    let marker = previous_marker.saturating_add(spaces).min(MAX_RESEARCH_MARKER);
    let technology_level = technology_level_for(marker).max(previous_level);

    state
        .workforce
        .allocate(RESEARCH_WORKERS)
        .map_err(|e| workforce_error("research", e))?;
    state.research_grants.push(ResearchGrant { company_id, turn, workers: RESEARCH_WORKERS });
    if let Some(company) = state.company_mut(company_id) {
        company.cash_on_hand -= cost;
        company.research_progress += u32::from(spaces);
    }
    if let Some(sector) = state.sector_mut(sector_id) {
        sector.research_marker = marker;
        sector.technology_level = technology_level;
        sector.refresh_demand();
    }

    let mut rusted = Vec::new();
    if technology_level != previous_level {
        let min = size_bounds(technology_level).min;
        for f in state
            .factories
            .iter_mut()
            .filter(|f| f.sector_id == sector_id && !f.is_rusted && f.size < min)
        {
            f.is_rusted = true;
            rusted.push(f.id);
        }
        if !rusted.is_empty() {
            warn!(sector = %sector_id, level = technology_level, count = rusted.len(), "factories rusted");
        }
        if technology_level == MAX_TECHNOLOGY_LEVEL {
            info!(sector = %sector_id, "sector reached the last technology level");
        }
    }

    info!(company = %company_id, spaces, marker, level = technology_level, "research resolved");
    Ok(ResearchOutcome {
        company_id,
        sector_id,
        spaces,
        marker,
        previous_level,
        technology_level,
        rusted,
    })
}

/// Return the workers of every grant made on or before the current turn.
pub fn release_research_grants(state: &mut GameEconomyState) -> Result<u32, EconError> {
    let turn = state.turn;
    let released: u32 = state
        .research_grants
        .iter()
        .filter(|g| g.turn <= turn)
        .map(|g| g.workers)
        .sum();
    state
        .workforce
        .release(released)
        .map_err(|e| workforce_error("research grant", e))?;
    state.research_grants.retain(|g| g.turn > turn);
    Ok(released)
}
