//! Immutable per-turn factory production records and company settlements.

use crate::ids::{CompanyId, FactoryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Earnings of one factory for one turn. Written once, never recomputed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryProduction {
    pub factory_id: FactoryId,
    pub company_id: CompanyId,
    pub turn: u32,
    pub customers_served: u32,
    pub revenue: Decimal,
    pub costs: Decimal,
    pub profit: Decimal,
}

/// Aggregate result of one company's earnings call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEarnings {
    pub company_id: CompanyId,
    pub turn: u32,
    pub factory_profit: Decimal,
    pub loan_interest: Decimal,
    /// Profit that drives the stock step.
    pub net_profit: Decimal,
    pub cash_after: Decimal,
    /// Loss the company could not cover with cash.
    pub shortfall: Decimal,
}

/// Append-only history of production records keyed by `(factory, turn)` and
/// company settlements keyed by `(company, turn)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionLedger {
    records: Vec<FactoryProduction>,
    #[serde(default)]
    settlements: Vec<CompanyEarnings>,
}

impl ProductionLedger {
    pub fn get(&self, factory_id: FactoryId, turn: u32) -> Option<&FactoryProduction> {
        self.records
            .iter()
            .find(|r| r.factory_id == factory_id && r.turn == turn)
    }

    /// Insert `record` unless one already exists for its key; returns the stored record.
    pub fn record(&mut self, record: FactoryProduction) -> &FactoryProduction {
        let pos = self
            .records
            .iter()
            .position(|r| r.factory_id == record.factory_id && r.turn == record.turn);
        let idx = match pos {
            Some(idx) => idx,
            None => {
                self.records.push(record);
                self.records.len() - 1
            }
        };
        &self.records[idx]
    }

    pub fn for_turn(&self, turn: u32) -> impl Iterator<Item = &FactoryProduction> {
        self.records.iter().filter(move |r| r.turn == turn)
    }

    pub fn has_turn(&self, turn: u32) -> bool {
        self.records.iter().any(|r| r.turn == turn)
    }

    /// Sum of one company's profits for `turn`.
    pub fn company_profit(&self, company_id: CompanyId, turn: u32) -> Decimal {
        self.for_turn(turn)
            .filter(|r| r.company_id == company_id)
            .map(|r| r.profit)
            .sum()
    }

    /// Store a company settlement unless one exists for `(company, turn)`.
    pub fn settle(&mut self, settlement: CompanyEarnings) -> &CompanyEarnings {
        let pos = self
            .settlements
            .iter()
            .position(|s| s.company_id == settlement.company_id && s.turn == settlement.turn);
        let idx = match pos {
            Some(idx) => idx,
            None => {
                self.settlements.push(settlement);
                self.settlements.len() - 1
            }
        };
        &self.settlements[idx]
    }

    pub fn settlements_for(&self, turn: u32) -> impl Iterator<Item = &CompanyEarnings> {
        self.settlements.iter().filter(move |s| s.turn == turn)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(factory: u32, turn: u32, profit: i64) -> FactoryProduction {
        FactoryProduction {
            factory_id: FactoryId(factory),
            company_id: CompanyId(1),
            turn,
            customers_served: 2,
            revenue: Decimal::from(profit + 10),
            costs: Decimal::from(10),
            profit: Decimal::from(profit),
        }
    }

    #[test]
    fn first_write_wins() {
        let mut ledger = ProductionLedger::default();
        ledger.record(rec(1, 1, 50));
        let stored = ledger.record(rec(1, 1, 999)).clone();
        assert_eq!(stored.profit, Decimal::from(50));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(FactoryId(1), 1), Some(&stored));
    }

    #[test]
    fn company_profit_sums_one_turn() {
        let mut ledger = ProductionLedger::default();
        ledger.record(rec(1, 1, 50));
        ledger.record(rec(2, 1, -20));
        ledger.record(rec(1, 2, 70));
        assert_eq!(ledger.company_profit(CompanyId(1), 1), Decimal::from(30));
        assert!(ledger.has_turn(2));
        assert!(!ledger.has_turn(3));
    }

    #[test]
    fn settlements_are_written_once_per_company_and_turn() {
        let mut ledger = ProductionLedger::default();
        let settlement = CompanyEarnings {
            company_id: CompanyId(1),
            turn: 2,
            factory_profit: Decimal::from(40),
            loan_interest: Decimal::from(25),
            net_profit: Decimal::from(15),
            cash_after: Decimal::from(515),
            shortfall: Decimal::ZERO,
        };
        ledger.settle(settlement.clone());
        let again = ledger.settle(CompanyEarnings { net_profit: Decimal::ZERO, ..settlement.clone() });
        assert_eq!(again, &settlement);
        assert_eq!(ledger.settlements_for(2).count(), 1);
        assert_eq!(ledger.settlements_for(1).count(), 0);
    }
}
