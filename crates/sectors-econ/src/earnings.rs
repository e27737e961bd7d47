//! Factory production and earnings.

use crate::distribution::ConsumptionReport;
use crate::operations::LOAN_INTEREST;
use crate::EconError;
use rust_decimal::Decimal;
pub use sectors_core::CompanyEarnings;
use sectors_core::{
    CompanyId, Factory, FactoryProduction, GameEconomyState, ResourceLedger, ResourceType,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Supplies resource prices and the worker salary when earnings are computed.
pub trait PricingSource {
    fn resource_prices(&self) -> BTreeMap<ResourceType, Decimal>;
    fn worker_salary(&self) -> Decimal;
}

/// Prices read from the game's own resource tracks and salary track.
#[derive(Clone, Debug)]
pub struct LedgerPricing {
    prices: BTreeMap<ResourceType, Decimal>,
    salary: Decimal,
}

impl LedgerPricing {
    pub fn new(resources: &ResourceLedger, salary: Decimal) -> Self {
        Self { prices: resources.price_map(), salary }
    }

    pub fn from_state(state: &GameEconomyState) -> Self {
        Self::new(&state.resources, state.workforce.salary())
    }
}

impl PricingSource for LedgerPricing {
    fn resource_prices(&self) -> BTreeMap<ResourceType, Decimal> {
        self.prices.clone()
    }

    fn worker_salary(&self) -> Decimal {
        self.salary
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Earnings {
    pub revenue: Decimal,
    pub costs: Decimal,
    pub profit: Decimal,
}

/// Revenue is `served × Σ prices`, costs are `workers × salary`.
pub fn compute_earnings(
    factory: &Factory,
    consumers_served: u32,
    prices: &BTreeMap<ResourceType, Decimal>,
    salary: Decimal,
) -> Earnings {
    let unit: Decimal = factory
        .resource_types
        .iter()
        .map(|r| prices.get(r).copied().unwrap_or(Decimal::ZERO))
        .sum();
    let revenue = Decimal::from(consumers_served) * unit;
    let costs = Decimal::from(factory.workers) * salary;
    Earnings { revenue, costs, profit: revenue - costs }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsReport {
    pub turn: u32,
    pub records: Vec<FactoryProduction>,
    pub companies: Vec<CompanyEarnings>,
    /// True when the turn had been resolved before and nothing was changed.
    pub already_resolved: bool,
}

impl EarningsReport {
    pub fn net_profit(&self, company_id: CompanyId) -> Decimal {
        self.companies
            .iter()
            .find(|c| c.company_id == company_id)
            .map(|c| c.net_profit)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Resolve the earnings call for the current turn.
///
/// Writes one [`FactoryProduction`] per operational factory of an active
/// company and credits each active company with its net profit. Factories of
/// insolvent or inactive owners earn and cost nothing. Calling it again for
/// the same turn returns the stored records and settlements and leaves cash
/// untouched.
pub fn resolve_earnings(
    state: &mut GameEconomyState,
    consumption: &ConsumptionReport,
    pricing: &dyn PricingSource,
) -> Result<EarningsReport, EconError> {
    let turn = state.turn;
    if state.earnings_resolved.contains(&turn) {
        return Ok(stored_report(state, turn));
    }
    if consumption.turn != turn && consumption.total_served() > 0 {
        return Err(EconError::invariant(format!(
            "consumption report for turn {} used in turn {turn}",
            consumption.turn
        )));
    }

    let prices = pricing.resource_prices();
    let salary = pricing.worker_salary();
    let active: BTreeSet<CompanyId> = state.active_companies().map(|c| c.id).collect();
    let mut records = Vec::new();
    for factory in state
        .factories
        .iter()
        .filter(|f| f.is_operational && active.contains(&f.company_id))
    {
        let served = consumption.served_by(factory.id);
        if served > factory.size.max_customers() {
            return Err(EconError::invariant(format!(
                "{} served {served} past its capacity",
                factory.id
            )));
        }
        let e = compute_earnings(factory, served, &prices, salary);
        records.push(FactoryProduction {
            factory_id: factory.id,
            company_id: factory.company_id,
            turn,
            customers_served: served,
            revenue: e.revenue,
            costs: e.costs,
            profit: e.profit,
        });
    }
    for record in &records {
        state.production.record(record.clone());
    }

    let mut companies = Vec::new();
    for company in state.companies.iter_mut().filter(|c| c.is_active()) {
        let factory_profit: Decimal = records
            .iter()
            .filter(|r| r.company_id == company.id)
            .map(|r| r.profit)
            .sum();
        let loan_interest = if company.has_loan { Decimal::from(LOAN_INTEREST) } else { Decimal::ZERO };
        let net_profit = factory_profit - loan_interest;
        let mut cash_after = company.cash_on_hand + net_profit;
        let mut shortfall = Decimal::ZERO;
        if cash_after < Decimal::ZERO {
            shortfall = -cash_after;
            cash_after = Decimal::ZERO;
            warn!(company = %company.id, %shortfall, "company cannot cover its losses");
        }
        company.cash_on_hand = cash_after;
        companies.push(CompanyEarnings {
            company_id: company.id,
            turn,
            factory_profit,
            loan_interest,
            net_profit,
            cash_after,
            shortfall,
        });
    }
    for settlement in &companies {
        state.production.settle(settlement.clone());
    }
    state.earnings_resolved.insert(turn);

    info!(turn, factories = records.len(), companies = companies.len(), "earnings resolved");
    Ok(EarningsReport { turn, records, companies, already_resolved: false })
}

fn stored_report(state: &GameEconomyState, turn: u32) -> EarningsReport {
    EarningsReport {
        turn,
        records: state.production.for_turn(turn).cloned().collect(),
        companies: state.production.settlements_for(turn).cloned().collect(),
        already_resolved: true,
    }
}
