//! Consumer distribution: sector ranking, economy-score split and the
//! per-sector bag walk that assigns consumers to factories.
//!
//! Everything here is deterministic. The bag is walked cyclically in marker
//! order starting at its cursor, and the cursor carries over to the next turn,
//! so replaying a turn from the same snapshot yields the same sales.

use crate::EconError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sectors_core::{
    Company, CompanyId, ConsumptionBag, Factory, FactoryId, GameEconomyState, ResourceLedger,
    ResourceType, Sector, SectorId,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Percentage of the economy score given to ranks 1, 2 and 3.
pub const RANK_SHARE_PERCENT: [u32; 3] = [50, 30, 20];

/// Hard cap on factory scans in one sector walk, whatever the capacity.
pub const MAX_DISTRIBUTION_STEPS: usize = 100_000;

/// Position of one sector in the demand ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRank {
    pub sector_id: SectorId,
    /// Dense rank, 1-based. Tied sectors share it.
    pub rank: usize,
    /// Number of sectors sharing this rank.
    pub tied: usize,
    /// Fraction of the economy score this sector receives.
    pub share: Decimal,
    pub total_demand: i32,
}

/// Share of one sector at `rank` when `tied` sectors share it.
pub fn rank_share(rank: usize, tied: usize) -> Decimal {
    if rank == 0 || rank > RANK_SHARE_PERCENT.len() || tied == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(RANK_SHARE_PERCENT[rank - 1]) / Decimal::ONE_HUNDRED / Decimal::from(tied)
}

/// Rank sectors by `demand + demand_bonus`, highest first. Ties keep sector id order.
pub fn rank_sectors(sectors: &[Sector]) -> Vec<SectorRank> {
    let mut ordered: Vec<&Sector> = sectors.iter().collect();
    ordered.sort_by(|a, b| {
        b.total_demand()
            .cmp(&a.total_demand())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut ranks = Vec::with_capacity(ordered.len());
    let mut rank = 0;
    let mut prev: Option<i32> = None;
    for s in &ordered {
        if prev != Some(s.total_demand()) {
            rank += 1;
            prev = Some(s.total_demand());
        }
        let tied = ordered
            .iter()
            .filter(|o| o.total_demand() == s.total_demand())
            .count();
        ranks.push(SectorRank {
            sector_id: s.id,
            rank,
            tied,
            share: rank_share(rank, tied),
            total_demand: s.total_demand(),
        });
    }
    ranks
}

/// Consumers granted to one sector this turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorAllocation {
    pub sector_id: SectorId,
    pub rank: usize,
    pub share: Decimal,
    /// `floor(economy_score * share)`.
    pub from_economy: u32,
    /// The sector's own demand, granted regardless of rank.
    pub from_demand: u32,
    /// What the pool could actually cover.
    pub consumers: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub allocations: Vec<SectorAllocation>,
    pub remaining_pool: u32,
}

impl Distribution {
    pub fn consumers_for(&self, sector_id: SectorId) -> u32 {
        self.allocations
            .iter()
            .find(|a| a.sector_id == sector_id)
            .map(|a| a.consumers)
            .unwrap_or(0)
    }
}

/// Split `economy_score` across ranked sectors and add each sector's demand floor.
///
/// Sectors are served in rank order from `consumer_pool`; once the pool is
/// dry later sectors get what is left, possibly nothing.
pub fn distribute(
    sectors: &[Sector],
    economy_score: u32,
    consumer_pool: u32,
) -> Result<Distribution, EconError> {
    let ranks = rank_sectors(sectors);
    let share_sum: Decimal = ranks.iter().map(|r| r.share).sum();
    if share_sum > Decimal::ONE {
        return Err(EconError::invariant(format!("rank shares sum to {share_sum}")));
    }

    let mut remaining = consumer_pool;
    let mut allocations = Vec::with_capacity(ranks.len());
    for r in ranks.iter().take(sectors.len()) {
        let from_economy = (Decimal::from(economy_score) * r.share)
            .floor()
            .to_u32()
            .ok_or_else(|| EconError::invariant(format!("economy split overflow for {}", r.sector_id)))?;
        let from_demand = u32::try_from(r.total_demand.max(0)).unwrap_or(0);
        let wanted = from_economy.saturating_add(from_demand);
        let consumers = wanted.min(remaining);
        remaining -= consumers;
        debug!(sector = %r.sector_id, rank = r.rank, from_economy, from_demand, consumers, "sector allocation");
        allocations.push(SectorAllocation {
            sector_id: r.sector_id,
            rank: r.rank,
            share: r.share,
            from_economy,
            from_demand,
            consumers,
        });
    }
    Ok(Distribution { allocations, remaining_pool: remaining })
}

/// Consumers assigned to one factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryAllocation {
    pub factory_id: FactoryId,
    pub company_id: CompanyId,
    pub customers_served: u32,
    pub capacity: u32,
}

/// Outcome of the bag walk in one sector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorConsumption {
    pub sector_id: SectorId,
    /// Eligible factories in attraction order.
    pub factories: Vec<FactoryAllocation>,
    /// Draws that found no factory.
    pub discarded: u32,
}

impl SectorConsumption {
    pub fn served(&self) -> u32 {
        self.factories.iter().map(|f| f.customers_served).sum()
    }
}

struct Candidate<'a> {
    factory: &'a Factory,
    perceived_price: Decimal,
    brand: u32,
}

fn compare_attraction(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.perceived_price
        .cmp(&b.perceived_price)
        .then_with(|| b.brand.cmp(&a.brand))
        .then_with(|| b.factory.complexity().cmp(&a.factory.complexity()))
        .then_with(|| a.factory.id.cmp(&b.factory.id))
}

/// Factories of `sector_id` that can take consumers, best attraction first.
///
/// Perceived price is the factory's unit price minus the owner's brand score.
pub fn attraction_order<'a>(
    sector_id: SectorId,
    factories: &'a [Factory],
    companies: &[Company],
    resources: &ResourceLedger,
) -> Vec<&'a Factory> {
    let mut candidates: Vec<Candidate<'a>> = factories
        .iter()
        .filter(|f| f.sector_id == sector_id && f.can_produce())
        .filter_map(|f| {
            let owner = companies.iter().find(|c| c.id == f.company_id)?;
            if !owner.is_active() {
                return None;
            }
            Some(Candidate {
                factory: f,
                perceived_price: resources.price_sum(&f.resource_types)
                    - Decimal::from(owner.brand_score),
                brand: owner.brand_score,
            })
        })
        .collect();
    candidates.sort_by(compare_attraction);
    candidates.into_iter().map(|c| c.factory).collect()
}

/// Walk `bag` for `consumers` draws and assign each to the best factory that
/// makes the drawn resource and still has room.
///
/// Once every factory is full, or every resource in the bag has found no room,
/// the remaining draws are discarded at once. Factory scans are bounded by
/// total capacity; exceeding that bound means the factory list is inconsistent.
pub fn allocate_within_sector(
    sector_id: SectorId,
    consumers: u32,
    bag: &ConsumptionBag,
    factories: &[Factory],
    companies: &[Company],
    resources: &ResourceLedger,
) -> Result<SectorConsumption, EconError> {
    let ranked = attraction_order(sector_id, factories, companies, resources);
    let mut slots: Vec<FactoryAllocation> = ranked
        .iter()
        .map(|f| FactoryAllocation {
            factory_id: f.id,
            company_id: f.company_id,
            customers_served: 0,
            capacity: f.size.max_customers(),
        })
        .collect();

    let mut room: u32 = slots.iter().map(|s| s.capacity).sum();
    let kinds: BTreeSet<ResourceType> = bag.markers.iter().map(|m| m.resource_type).collect();
    let budget = (room as usize)
        .saturating_add(kinds.len())
        .saturating_mul(ranked.len() + 1)
        .min(MAX_DISTRIBUTION_STEPS);
    let mut steps = 0usize;
    let mut discarded = 0u32;
    // Room only shrinks, so a resource that found none once never will again.
    let mut exhausted: BTreeSet<ResourceType> = BTreeSet::new();

    for draw in 0..consumers {
        if room == 0 || exhausted.len() == kinds.len() {
            discarded += consumers - draw;
            break;
        }
        let Some(marker) = bag.draw(draw as usize) else {
            discarded += consumers - draw;
            break;
        };
        if exhausted.contains(&marker.resource_type) {
            discarded += 1;
            continue;
        }
        let mut placed = false;
        for (factory, slot) in ranked.iter().zip(slots.iter_mut()) {
            steps += 1;
            if steps > budget {
                return Err(EconError::invariant(format!(
                    "distribution in {sector_id} exceeded {budget} steps"
                )));
            }
            if slot.customers_served < slot.capacity
                && factory.resource_types.contains(&marker.resource_type)
            {
                slot.customers_served += 1;
                room -= 1;
                placed = true;
                break;
            }
        }
        if !placed {
            exhausted.insert(marker.resource_type);
            discarded += 1;
        }
    }

    Ok(SectorConsumption { sector_id, factories: slots, discarded })
}

/// Everything the consumption phase decided this turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionReport {
    pub turn: u32,
    pub economy_score: u32,
    pub distribution: Option<Distribution>,
    pub sectors: Vec<SectorConsumption>,
}

impl ConsumptionReport {
    /// Consumers served by `factory_id`; zero if it took part in no walk.
    pub fn served_by(&self, factory_id: FactoryId) -> u32 {
        self.sectors
            .iter()
            .flat_map(|s| s.factories.iter())
            .find(|f| f.factory_id == factory_id)
            .map(|f| f.customers_served)
            .unwrap_or(0)
    }

    pub fn total_served(&self) -> u32 {
        self.sectors.iter().map(SectorConsumption::served).sum()
    }
}

/// Resolve the consumption phase on `state`.
///
/// Ranking reads one snapshot of all sectors before any sector is changed.
/// Served consumers go back to the pool; unserved ones wait in their sector.
pub fn resolve_consumption(state: &mut GameEconomyState) -> Result<ConsumptionReport, EconError> {
    let economy_score = state.workforce.economy_score();
    let snapshot = state.sectors.clone();
    let distribution = distribute(&snapshot, economy_score, state.consumer_pool)?;

    for alloc in &distribution.allocations {
        let sector = state
            .sector_mut(alloc.sector_id)
            .ok_or_else(|| EconError::invariant(format!("ranked unknown {}", alloc.sector_id)))?;
        sector.consumers = sector.consumers.saturating_add(alloc.consumers);
    }
    state.consumer_pool = distribution.remaining_pool;

    let mut sectors = Vec::with_capacity(state.sectors.len());
    for sector in &snapshot {
        let waiting = state.sector(sector.id).map(|s| s.consumers).unwrap_or(0);
        let bag = state
            .bag(sector.id)
            .ok_or_else(|| EconError::invariant(format!("no consumption bag for {}", sector.id)))?;
        let outcome = allocate_within_sector(
            sector.id,
            waiting,
            bag,
            &state.factories,
            &state.companies,
            &state.resources,
        )?;
        if let Some(bag) = state.bag_mut(sector.id) {
            bag.advance(waiting as usize);
        }
        let served = outcome.served();
        if served > waiting {
            return Err(EconError::invariant(format!(
                "{} served {served} of {waiting} consumers",
                sector.id
            )));
        }
        if let Some(s) = state.sector_mut(sector.id) {
            s.consumers = waiting - served;
        }
        state.consumer_pool = state.consumer_pool.saturating_add(served);
        sectors.push(outcome);
    }

    let report = ConsumptionReport {
        turn: state.turn,
        economy_score,
        distribution: Some(distribution),
        sectors,
    };
    info!(
        turn = report.turn,
        economy_score,
        served = report.total_served(),
        pool = state.consumer_pool,
        "consumption resolved"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use proptest::prelude::*;
    use sectors_core::{CompanyStatus, FactorySize, ResourceType, SectorKind};

    fn sector(id: u32, demand: i32) -> Sector {
        Sector::new(SectorId(id), format!("S{id}"), SectorKind::Energy, demand)
    }

    #[test]
    fn scenario_two_tied_leaders_and_a_runner_up() {
        let sectors = vec![sector(1, 10), sector(2, 10), sector(3, 5)];
        let d = distribute(&sectors, 20, 1_000).unwrap();
        assert_eq!(d.consumers_for(SectorId(1)), 15);
        assert_eq!(d.consumers_for(SectorId(2)), 15);
        assert_eq!(d.consumers_for(SectorId(3)), 11);
        assert_eq!(d.remaining_pool, 1_000 - 41);
        let c = d.allocations.iter().find(|a| a.sector_id == SectorId(3)).unwrap();
        assert_eq!(c.rank, 2);
        assert_eq!(c.share, Decimal::new(30, 2));
    }

    #[test]
    fn three_way_tie_splits_rank_one_evenly() {
        let sectors = vec![sector(1, 4), sector(2, 4), sector(3, 4)];
        let ranks = rank_sectors(&sectors);
        assert!(ranks.iter().all(|r| r.rank == 1 && r.tied == 3));
        let one_sixth = Decimal::new(50, 2) / Decimal::from(3);
        assert!(ranks.iter().all(|r| r.share == one_sixth));
        let pct = (ranks[0].share * Decimal::ONE_HUNDRED).round_dp(4);
        assert_eq!(pct, Decimal::new(166_667, 4));
    }

    #[test]
    fn ranks_past_three_get_nothing_from_the_split() {
        let sectors = vec![sector(1, 9), sector(2, 7), sector(3, 5), sector(4, 3)];
        let d = distribute(&sectors, 40, 1_000).unwrap();
        let last = d.allocations.iter().find(|a| a.sector_id == SectorId(4)).unwrap();
        assert_eq!(last.rank, 4);
        assert_eq!(last.from_economy, 0);
        assert_eq!(last.consumers, 3);
    }

    #[test]
    fn pool_runs_dry_in_rank_order() {
        let sectors = vec![sector(1, 10), sector(2, 2)];
        let d = distribute(&sectors, 10, 12).unwrap();
        assert_eq!(d.consumers_for(SectorId(1)), 12);
        assert_eq!(d.consumers_for(SectorId(2)), 0);
        assert_eq!(d.remaining_pool, 0);
    }

    #[test]
    fn attraction_prefers_lower_perceived_price_then_brand() {
        let (mut state, s, c1) = fixtures::with_factory();
        let c2 = state.add_company(s, "Spark");
        state.place_factory(c2, FactorySize::I, 0, vec![ResourceType::Triangle]).unwrap();
        let order = attraction_order(s, &state.factories, &state.companies, &state.resources);
        assert_eq!(order[0].company_id, c2);

        // Brand 16 takes the Factory II (25) to a perceived 9, under the Factory I (10).
        state.company_mut(c1).unwrap().brand_score = 16;
        let order = attraction_order(s, &state.factories, &state.companies, &state.resources);
        assert_eq!(order[0].company_id, c1);

        // Equal perceived price: higher brand wins.
        state.company_mut(c1).unwrap().brand_score = 15;
        let order = attraction_order(s, &state.factories, &state.companies, &state.resources);
        assert_eq!(order[0].company_id, c1);
    }

    #[test]
    fn full_factories_roll_over_and_unmatched_draws_are_discarded() {
        let (mut state, s, _c1) = fixtures::with_factory();
        let c2 = state.add_company(s, "Spark");
        state.place_factory(c2, FactorySize::I, 0, vec![ResourceType::Triangle]).unwrap();
        let bag = ConsumptionBag {
            sector_id: s,
            markers: vec![sectors_core::ConsumptionMarker::permanent(ResourceType::Triangle)],
            cursor: 0,
        };
        let out = allocate_within_sector(s, 9, &bag, &state.factories, &state.companies, &state.resources)
            .unwrap();
        // Factory I takes 3, Factory II takes 4, the rest find no room.
        assert_eq!(out.factories[0].customers_served, 3);
        assert_eq!(out.factories[1].customers_served, 4);
        assert_eq!(out.discarded, 2);
    }

    #[test]
    fn empty_bag_discards_everything() {
        let (state, s, _) = fixtures::with_factory();
        let bag = ConsumptionBag::empty(s);
        let out = allocate_within_sector(s, 4, &bag, &state.factories, &state.companies, &state.resources)
            .unwrap();
        assert_eq!(out.served(), 0);
        assert_eq!(out.discarded, 4);
    }

    #[test]
    fn large_backlog_fills_factories_and_discards_the_rest() {
        let (mut state, s, _) = fixtures::single_company();
        for i in 0..7 {
            let c = state.add_company(s, &format!("E{i}"));
            state.place_factory(c, FactorySize::I, 0, vec![ResourceType::Energy]).unwrap();
        }
        let bag = state.bag(s).unwrap().clone();
        let out = allocate_within_sector(s, 20_000, &bag, &state.factories, &state.companies, &state.resources)
            .unwrap();
        assert_eq!(out.served(), 21);
        assert_eq!(out.discarded, 19_979);

        let out = allocate_within_sector(s, u32::MAX, &bag, &state.factories, &state.companies, &state.resources)
            .unwrap();
        assert_eq!(out.served(), 21);
        assert_eq!(out.discarded, u32::MAX - 21);
    }

    #[test]
    fn unmatched_resources_stop_the_walk_early() {
        let (state, s, _) = fixtures::with_factory();
        let bag = ConsumptionBag {
            sector_id: s,
            markers: vec![sectors_core::ConsumptionMarker::permanent(ResourceType::Energy)],
            cursor: 0,
        };
        let out = allocate_within_sector(s, 50_000, &bag, &state.factories, &state.companies, &state.resources)
            .unwrap();
        assert_eq!(out.served(), 0);
        assert_eq!(out.discarded, 50_000);
    }

    #[test]
    fn inconsistent_factory_list_trips_the_step_guard() {
        let (state, s, _) = fixtures::with_factory();
        let template = state.factories[0].clone();
        // A thousand factories for one company in one slot.
        let factories: Vec<Factory> = (1..=1_000)
            .map(|i| Factory { id: FactoryId(i), ..template.clone() })
            .collect();
        let bag = ConsumptionBag {
            sector_id: s,
            markers: vec![sectors_core::ConsumptionMarker::permanent(ResourceType::Triangle)],
            cursor: 0,
        };
        let err = allocate_within_sector(s, 4_000, &bag, &factories, &state.companies, &state.resources)
            .unwrap_err();
        match err {
            EconError::Invariant(msg) => {
                assert!(msg.contains(&format!("exceeded {MAX_DISTRIBUTION_STEPS} steps")), "{msg}")
            }
            other => panic!("expected invariant error, got {other:?}"),
        }
    }

    #[test]
    fn cursor_reaches_campaign_markers_on_short_walks() {
        let (mut state, s, _) = fixtures::single_company();
        let c = state.add_company(s, "Ring");
        state.place_factory(c, FactorySize::I, 0, vec![ResourceType::Circle]).unwrap();
        let mut bag = state.bag(s).unwrap().clone();
        bag.add_temporary(ResourceType::Circle, sectors_core::CampaignId(1));

        // Energy, Energy, Triangle: nothing sells.
        let first = allocate_within_sector(s, 3, &bag, &state.factories, &state.companies, &state.resources)
            .unwrap();
        assert_eq!(first.served(), 0);
        bag.advance(3);

        // Square, Circle and the campaign's Circle.
        let second = allocate_within_sector(s, 3, &bag, &state.factories, &state.companies, &state.resources)
            .unwrap();
        assert_eq!(second.served(), 2);
    }

    #[test]
    fn resolve_consumption_moves_the_bag_cursor() {
        let (mut state, s, _c) = fixtures::with_factory();
        let report = resolve_consumption(&mut state).unwrap();
        let waiting = state.sector(s).unwrap().consumers + report.total_served();
        let bag = state.bag(s).unwrap();
        assert!(waiting > 0);
        assert_eq!(bag.cursor, waiting as usize % bag.len());
    }

    #[test]
    fn insolvent_owners_and_rusted_factories_sell_nothing() {
        let (mut state, s, c) = fixtures::with_factory();
        state.company_mut(c).unwrap().status = CompanyStatus::Insolvent;
        assert!(attraction_order(s, &state.factories, &state.companies, &state.resources).is_empty());
        state.company_mut(c).unwrap().status = CompanyStatus::Active;
        state.factories[0].is_rusted = true;
        assert!(attraction_order(s, &state.factories, &state.companies, &state.resources).is_empty());
    }

    #[test]
    fn resolve_consumption_conserves_consumers() {
        let (mut state, _s, _c) = fixtures::with_factory();
        let before = state.total_consumers();
        let report = resolve_consumption(&mut state).unwrap();
        assert_eq!(state.total_consumers(), before);
        assert!(report.total_served() <= FactorySize::II.max_customers());
        assert_eq!(report.served_by(state.factories[0].id), report.total_served());
    }

    proptest! {
        #[test]
        fn shares_never_exceed_whole(demands in proptest::collection::vec(-5i32..20, 1..9)) {
            let sectors: Vec<Sector> = demands
                .iter()
                .enumerate()
                .map(|(i, d)| sector(i as u32 + 1, *d))
                .collect();
            let ranks = rank_sectors(&sectors);
            let total: Decimal = ranks.iter().map(|r| r.share).sum();
            prop_assert!(total <= Decimal::ONE);
            for r in &ranks {
                let peers: Vec<_> = ranks.iter().filter(|o| o.rank == r.rank).collect();
                prop_assert!(peers.iter().all(|p| p.share == r.share));
                prop_assert_eq!(peers.len(), r.tied);
            }
        }

        #[test]
        fn served_never_exceeds_capacity(consumers in 0u32..60, sizes in proptest::collection::vec(0usize..4, 1..5)) {
            let (mut state, s, _) = fixtures::single_company();
            for (i, size) in sizes.iter().enumerate() {
                let c = state.add_company(s, &format!("C{i}"));
                let size = FactorySize::ALL[*size];
                let resources = [ResourceType::Energy, ResourceType::Triangle, ResourceType::Square, ResourceType::Circle];
                state.place_factory(c, size, 0, resources[..size.resource_count()].to_vec()).unwrap();
            }
            let bag = state.bag(s).unwrap().clone();
            let out = allocate_within_sector(s, consumers, &bag, &state.factories, &state.companies, &state.resources).unwrap();
            for f in &out.factories {
                prop_assert!(f.customers_served <= f.capacity);
            }
            prop_assert_eq!(out.served() + out.discarded, consumers);
        }
    }
}
