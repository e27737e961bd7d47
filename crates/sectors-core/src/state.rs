//! The explicit per-game economy state threaded through every resolution.

use crate::company::{Company, CompanyStatus};
use crate::config::GameConfig;
use crate::error::ValidationError;
use crate::factory::{Factory, FactorySize, MAX_FACTORY_SLOTS};
use crate::ids::{CampaignId, CompanyId, FactoryId, SectorId};
use crate::marketing::MarketingCampaign;
use crate::production::ProductionLedger;
use crate::resource::{ResourceLedger, ResourceType, SectorKind};
use crate::sector::{ConsumptionBag, Sector, MAX_RESEARCH_MARKER};
use crate::stock::StockGrid;
use crate::workforce::WorkforcePool;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Workers committed to a research submission until the end of the turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchGrant {
    pub company_id: CompanyId,
    pub turn: u32,
    pub workers: u32,
}

/// Counters for newly created entities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    pub sector: u32,
    pub company: u32,
    pub factory: u32,
    pub campaign: u32,
}

/// All mutable economy data of one game.
///
/// Resolvers take this by `&mut` (or work on a clone) and never reach for
/// global state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEconomyState {
    pub turn: u32,
    pub rng_seed: u64,
    pub sectors: Vec<Sector>,
    pub companies: Vec<Company>,
    pub factories: Vec<Factory>,
    pub campaigns: Vec<MarketingCampaign>,
    pub research_grants: Vec<ResearchGrant>,
    pub bags: Vec<ConsumptionBag>,
    pub resources: ResourceLedger,
    pub workforce: WorkforcePool,
    /// Consumers not currently sitting in any sector.
    pub consumer_pool: u32,
    pub production: ProductionLedger,
    /// Turns whose earnings call already credited cash.
    pub earnings_resolved: BTreeSet<u32>,
    pub stock_grid: StockGrid,
    pub next_ids: IdCounters,
    starting_cash: Decimal,
    starting_stock_price: Decimal,
}

impl GameEconomyState {
    /// Empty economy for turn 1 with the configured pools.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            turn: 1,
            rng_seed: config.rng_seed,
            sectors: Vec::new(),
            companies: Vec::new(),
            factories: Vec::new(),
            campaigns: Vec::new(),
            research_grants: Vec::new(),
            bags: Vec::new(),
            resources: ResourceLedger::default(),
            workforce: WorkforcePool::new(config.total_workers),
            consumer_pool: config.consumer_pool,
            production: ProductionLedger::default(),
            earnings_resolved: BTreeSet::new(),
            stock_grid: StockGrid::default(),
            next_ids: IdCounters::default(),
            starting_cash: config.starting_cash,
            starting_stock_price: config.starting_stock_price,
        }
    }

    /// Add a sector with its starting consumption bag.
    pub fn add_sector(&mut self, name: &str, kind: SectorKind, base_demand: i32) -> SectorId {
        self.next_ids.sector += 1;
        let id = SectorId(self.next_ids.sector);
        self.sectors.push(Sector::new(id, name, kind, base_demand));
        self.bags.push(ConsumptionBag::starting(id, kind));
        id
    }

    /// Float a new active company in `sector_id` with the configured starting cash and price.
    pub fn add_company(&mut self, sector_id: SectorId, name: &str) -> CompanyId {
        self.next_ids.company += 1;
        let id = CompanyId(self.next_ids.company);
        self.companies.push(Company {
            id,
            sector_id,
            name: name.to_string(),
            cash_on_hand: self.starting_cash,
            brand_score: 0,
            research_progress: 0,
            current_stock_price: self.starting_stock_price,
            status: CompanyStatus::Active,
            has_loan: false,
        });
        id
    }

    /// Place a factory directly, staffing it from the pool. Used for game setup.
    pub fn place_factory(
        &mut self,
        company_id: CompanyId,
        size: FactorySize,
        slot: u8,
        resource_types: Vec<ResourceType>,
    ) -> Result<FactoryId, ValidationError> {
        let sector_id = self
            .company(company_id)
            .map(|c| c.sector_id)
            .ok_or_else(|| ValidationError::DanglingReference(company_id.to_string()))?;
        self.workforce
            .allocate(size.workers())
            .map_err(|e| ValidationError::Workforce(e.to_string()))?;
        let id = self.next_factory_id();
        self.factories.push(Factory {
            id,
            company_id,
            sector_id,
            size,
            slot,
            workers: size.workers(),
            resource_types,
            is_operational: true,
            is_rusted: false,
            original_construction_cost: size.base_cost(),
            built_turn: self.turn,
        });
        Ok(id)
    }

    pub fn next_factory_id(&mut self) -> FactoryId {
        self.next_ids.factory += 1;
        FactoryId(self.next_ids.factory)
    }

    pub fn next_campaign_id(&mut self) -> CampaignId {
        self.next_ids.campaign += 1;
        CampaignId(self.next_ids.campaign)
    }

    pub fn sector(&self, id: SectorId) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.id == id)
    }

    pub fn sector_mut(&mut self, id: SectorId) -> Option<&mut Sector> {
        self.sectors.iter_mut().find(|s| s.id == id)
    }

    pub fn company(&self, id: CompanyId) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }

    pub fn company_mut(&mut self, id: CompanyId) -> Option<&mut Company> {
        self.companies.iter_mut().find(|c| c.id == id)
    }

    pub fn factory(&self, id: FactoryId) -> Option<&Factory> {
        self.factories.iter().find(|f| f.id == id)
    }

    pub fn bag(&self, sector_id: SectorId) -> Option<&ConsumptionBag> {
        self.bags.iter().find(|b| b.sector_id == sector_id)
    }

    pub fn bag_mut(&mut self, sector_id: SectorId) -> Option<&mut ConsumptionBag> {
        self.bags.iter_mut().find(|b| b.sector_id == sector_id)
    }

    pub fn factories_of(&self, company_id: CompanyId) -> impl Iterator<Item = &Factory> {
        self.factories.iter().filter(move |f| f.company_id == company_id)
    }

    pub fn active_companies(&self) -> impl Iterator<Item = &Company> {
        self.companies.iter().filter(|c| c.is_active())
    }

    /// Campaigns of `company_id` that have not expired.
    pub fn running_campaigns(&self, company_id: CompanyId) -> usize {
        self.campaigns
            .iter()
            .filter(|c| c.company_id == company_id && c.is_running())
            .count()
    }

    /// Recompute each sector's demand bonus from its active companies' brand scores.
    pub fn refresh_demand_bonus(&mut self) {
        for sector in &mut self.sectors {
            let brand: u32 = self
                .companies
                .iter()
                .filter(|c| c.sector_id == sector.id && c.is_active())
                .map(|c| c.brand_score)
                .sum();
            sector.demand_bonus = i32::try_from(brand).unwrap_or(i32::MAX);
        }
    }

    /// Workers held by factories, running campaigns and research grants.
    pub fn committed_workers(&self) -> u32 {
        let factories: u32 = self.factories.iter().map(|f| f.workers).sum();
        let campaigns: u32 = self
            .campaigns
            .iter()
            .filter(|c| c.is_running())
            .map(|c| c.workers)
            .sum();
        let research: u32 = self.research_grants.iter().map(|g| g.workers).sum();
        factories + campaigns + research
    }

    /// Consumers sitting in sectors plus those in the pool.
    pub fn total_consumers(&self) -> u32 {
        self.consumer_pool + self.sectors.iter().map(|s| s.consumers).sum::<u32>()
    }
}

/// Validate cross references and invariants of a state snapshot.
pub fn validate_state(state: &GameEconomyState) -> Result<(), ValidationError> {
    let mut sector_ids = BTreeSet::new();
    for s in &state.sectors {
        if !sector_ids.insert(s.id) {
            return Err(ValidationError::DuplicateId(s.id.to_string()));
        }
        if s.research_marker > MAX_RESEARCH_MARKER {
            return Err(ValidationError::InvalidConfig(format!(
                "{} research marker {} past the track end",
                s.id, s.research_marker
            )));
        }
        if state.bag(s.id).is_none() {
            return Err(ValidationError::DanglingReference(format!("no bag for {}", s.id)));
        }
    }
    let mut company_ids = BTreeSet::new();
    for c in &state.companies {
        if !company_ids.insert(c.id) {
            return Err(ValidationError::DuplicateId(c.id.to_string()));
        }
        if !sector_ids.contains(&c.sector_id) {
            return Err(ValidationError::DanglingReference(format!(
                "{} -> {}",
                c.id, c.sector_id
            )));
        }
        if state.stock_grid.index_of(c.current_stock_price).is_none() {
            return Err(ValidationError::OffGridStockPrice {
                company: c.id.to_string(),
                price: c.current_stock_price.to_string(),
            });
        }
    }
    let mut factory_ids = BTreeSet::new();
    let mut slots = BTreeSet::new();
    for f in &state.factories {
        if !factory_ids.insert(f.id) {
            return Err(ValidationError::DuplicateId(f.id.to_string()));
        }
        let owner = state
            .company(f.company_id)
            .ok_or_else(|| ValidationError::DanglingReference(format!("{} -> {}", f.id, f.company_id)))?;
        if owner.sector_id != f.sector_id {
            return Err(ValidationError::InvalidFactory(format!(
                "{} sits in {} but its owner is in {}",
                f.id, f.sector_id, owner.sector_id
            )));
        }
        if f.slot >= MAX_FACTORY_SLOTS || !slots.insert((f.company_id, f.slot)) {
            return Err(ValidationError::InvalidFactory(format!("{} slot {}", f.id, f.slot)));
        }
    }
    if !state.workforce.is_consistent() {
        return Err(ValidationError::Workforce("available exceeds total".into()));
    }
    if state.committed_workers() != state.workforce.allocated() {
        return Err(ValidationError::Workforce(format!(
            "{} workers committed but {} allocated",
            state.committed_workers(),
            state.workforce.allocated()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (GameEconomyState, CompanyId) {
        let mut state = GameEconomyState::new(&GameConfig::default());
        let s = state.add_sector("Energy", SectorKind::Energy, 4);
        let c = state.add_company(s, "Volt");
        state
            .place_factory(c, FactorySize::I, 0, vec![ResourceType::Energy])
            .unwrap();
        (state, c)
    }

    #[test]
    fn setup_state_validates() {
        let (state, c) = sample();
        validate_state(&state).unwrap();
        assert_eq!(state.workforce.allocated(), 1);
        assert_eq!(state.factories_of(c).count(), 1);
        assert_eq!(state.total_consumers(), 75);
    }

    #[test]
    fn leaked_worker_is_detected() {
        let (mut state, _) = sample();
        state.workforce.allocate(2).unwrap();
        assert!(matches!(validate_state(&state), Err(ValidationError::Workforce(_))));
    }

    #[test]
    fn off_grid_price_is_detected() {
        let (mut state, c) = sample();
        state.company_mut(c).unwrap().current_stock_price = Decimal::from(26);
        assert!(matches!(
            validate_state(&state),
            Err(ValidationError::OffGridStockPrice { .. })
        ));
    }

    #[test]
    fn duplicate_slot_is_detected() {
        let (mut state, c) = sample();
        state
            .place_factory(c, FactorySize::I, 0, vec![ResourceType::Circle])
            .unwrap();
        assert!(matches!(validate_state(&state), Err(ValidationError::InvalidFactory(_))));
    }

    #[test]
    fn demand_bonus_tracks_brand() {
        let (mut state, c) = sample();
        state.company_mut(c).unwrap().brand_score = 3;
        state.refresh_demand_bonus();
        assert_eq!(state.sectors[0].demand_bonus, 3);
        assert_eq!(state.sectors[0].total_demand(), 7);
    }

    #[test]
    fn snapshot_roundtrip() {
        let (state, _) = sample();
        let s = serde_json::to_string(&state).unwrap();
        let back: GameEconomyState = serde_json::from_str(&s).unwrap();
        assert_eq!(back, state);
    }
}
