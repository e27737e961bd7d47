//! Factory construction and upgrades.

use crate::{active_company, ensure_funds, validate_resources, workforce_error, EconError, Rejection};
use rust_decimal::Decimal;
use sectors_core::{
    size_bounds, CompanyId, Factory, FactoryId, FactorySize, GameEconomyState, ResourceType,
    MAX_FACTORY_SLOTS,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A request to build a factory in one of a company's slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryOrder {
    pub company_id: CompanyId,
    pub slot: u8,
    pub size: FactorySize,
    pub resources: Vec<ResourceType>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Construction {
    pub factory_id: FactoryId,
    pub cost: Decimal,
    /// Rusted factory that was replaced in the slot.
    pub replaced: Option<FactoryId>,
}

/// Schematic price of `size` built on `resources` at current track prices.
pub fn construction_cost(state: &GameEconomyState, size: FactorySize, resources: &[ResourceType]) -> Decimal {
    size.base_cost() + state.resources.price_sum(resources)
}

/// Build a factory for an order.
///
/// The new factory is staffed at once but stays non-operational until the
/// end-turn economy phase. A rusted factory in the slot is torn down and its
/// workers go back to the pool.
pub fn construct_factory(state: &mut GameEconomyState, order: &FactoryOrder) -> Result<Construction, EconError> {
    let company = active_company(state, order.company_id)?;
    let sector_id = company.sector_id;
    let sector = state.sector(sector_id).ok_or_else(|| {
        EconError::invariant(format!("{} points at missing {sector_id}", order.company_id))
    })?;
    if order.slot >= MAX_FACTORY_SLOTS {
        return Err(Rejection::InvalidSlot(order.slot).into());
    }
    let level = sector.technology_level;
    if !size_bounds(level).contains(order.size) {
        return Err(Rejection::SizeNotPermitted { size: order.size, level }.into());
    }
    validate_resources(&order.resources, order.size.resource_count(), sector.kind)?;

    let occupant = state
        .factories
        .iter()
        .find(|f| f.company_id == order.company_id && f.slot == order.slot);
    if occupant.is_some_and(|f| !f.is_rusted) {
        return Err(Rejection::SlotOccupied(order.slot).into());
    }
    let replaced = occupant.map(|f| (f.id, f.workers));

    let what = format!("{} schematic", order.size);
    let cost = construction_cost(state, order.size, &order.resources);
    ensure_funds(&what, cost, company.cash_on_hand)?;
    let freed = replaced.map(|(_, w)| w).unwrap_or(0);
    let need = order.size.workers();
    if state.workforce.available() + freed < need {
        return Err(Rejection::InsufficientWorkers {
            what,
            need,
            have: state.workforce.available() + freed,
        }
        .into());
    }

    // Checks passed; apply.
    if let Some((old, workers)) = replaced {
        state.workforce.release(workers).map_err(|e| workforce_error(&what, e))?;
        state.factories.retain(|f| f.id != old);
    }
    state.workforce.allocate(need).map_err(|e| workforce_error(&what, e))?;
    if let Some(company) = state.company_mut(order.company_id) {
        company.cash_on_hand -= cost;
    }
    state.resources.consume_all(&order.resources);
    let factory_id = state.next_factory_id();
    state.factories.push(Factory {
        id: factory_id,
        company_id: order.company_id,
        sector_id,
        size: order.size,
        slot: order.slot,
        workers: need,
        resource_types: order.resources.clone(),
        is_operational: false,
        is_rusted: false,
        original_construction_cost: cost,
        built_turn: state.turn,
    });

    info!(factory = %factory_id, company = %order.company_id, size = %order.size, %cost, "factory built");
    Ok(Construction { factory_id, cost, replaced: replaced.map(|(id, _)| id) })
}

/// Bring factories finished this turn online. Returns how many opened.
pub fn open_new_factories(state: &mut GameEconomyState) -> usize {
    let mut opened = 0;
    for f in state.factories.iter_mut().filter(|f| !f.is_operational) {
        f.is_operational = true;
        opened += 1;
    }
    opened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use sectors_core::validate_state;
    use ResourceType::{Circle, Energy, Square, Triangle};

    fn order(company_id: CompanyId, slot: u8, size: FactorySize, resources: &[ResourceType]) -> FactoryOrder {
        FactoryOrder { company_id, slot, size, resources: resources.to_vec() }
    }

    #[test]
    fn builds_idle_factory_and_moves_prices() {
        let (mut state, _, c) = fixtures::single_company();
        let built = construct_factory(&mut state, &order(c, 1, FactorySize::II, &[Triangle, Energy])).unwrap();
        // 200 + 10 + 30
        assert_eq!(built.cost, Decimal::from(240));
        assert_eq!(state.company(c).unwrap().cash_on_hand, Decimal::from(260));
        assert_eq!(state.workforce.allocated(), 2);
        assert_eq!(state.resources.price(Triangle), Decimal::from(9));
        assert_eq!(state.resources.price(Energy), Decimal::from(27));
        assert!(!state.factory(built.factory_id).unwrap().is_operational);
        validate_state(&state).unwrap();

        assert_eq!(open_new_factories(&mut state), 1);
        assert!(state.factory(built.factory_id).unwrap().can_produce());
    }

    #[test]
    fn size_outside_technology_bounds_is_rejected() {
        let (mut state, _, c) = fixtures::single_company();
        let err = construct_factory(&mut state, &order(c, 0, FactorySize::III, &[Triangle, Square, Circle]))
            .unwrap_err();
        assert_eq!(err, EconError::Rejected(Rejection::SizeNotPermitted { size: FactorySize::III, level: 0 }));
    }

    #[test]
    fn short_cash_message_names_the_schematic() {
        let (mut state, s, c) = fixtures::single_company();
        state.sector_mut(s).unwrap().technology_level = 2;
        state.company_mut(c).unwrap().cash_on_hand = Decimal::from(310);
        let before = state.clone();
        let err = construct_factory(&mut state, &order(c, 0, FactorySize::III, &[Triangle, Square, Circle]))
            .unwrap_err();
        assert_eq!(err.to_string(), "insufficient cash for Factory III schematic: need $345, have $310");
        assert_eq!(state, before);
    }

    #[test]
    fn working_slot_is_occupied_but_rusted_slot_is_upgraded() {
        let (mut state, s, c) = fixtures::with_factory();
        let err = construct_factory(&mut state, &order(c, 0, FactorySize::I, &[Circle])).unwrap_err();
        assert_eq!(err, EconError::Rejected(Rejection::SlotOccupied(0)));

        let old = state.factories[0].id;
        state.factories[0].is_rusted = true;
        state.sector_mut(s).unwrap().technology_level = 3;
        let built =
            construct_factory(&mut state, &order(c, 0, FactorySize::III, &[Triangle, Square, Energy])).unwrap();
        assert_eq!(built.replaced, Some(old));
        assert!(state.factory(old).is_none());
        assert_eq!(state.workforce.allocated(), 3);
        validate_state(&state).unwrap();
    }

    #[test]
    fn slot_past_the_board_is_rejected() {
        let (mut state, _, c) = fixtures::single_company();
        let err = construct_factory(&mut state, &order(c, MAX_FACTORY_SLOTS, FactorySize::I, &[Circle])).unwrap_err();
        assert_eq!(err, EconError::Rejected(Rejection::InvalidSlot(MAX_FACTORY_SLOTS)));
    }
}
