//! Stock price steps from operating profit.

use crate::EconError;
use rust_decimal::Decimal;
use sectors_core::{Company, CompanyId, CompanyStatus, GameEconomyState, StockGrid};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Grid steps earned by an operating profit.
pub fn profit_steps(profit: Decimal) -> i32 {
    if profit > Decimal::from(500) {
        3
    } else if profit > Decimal::from(200) {
        2
    } else if profit > Decimal::ZERO {
        1
    } else if profit < Decimal::from(-200) {
        -2
    } else if profit < Decimal::ZERO {
        -1
    } else {
        0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMove {
    pub company_id: CompanyId,
    pub from: Decimal,
    pub to: Decimal,
    pub steps: i32,
    /// Set on the adjustment that pushed the company to zero.
    pub became_insolvent: bool,
}

/// Move one company along the grid. Insolvent companies are left alone and yield `None`.
pub fn apply_profit_step(
    company: &mut Company,
    grid: &StockGrid,
    profit: Decimal,
) -> Result<Option<PriceMove>, EconError> {
    if company.status == CompanyStatus::Insolvent {
        return Ok(None);
    }
    let from = company.current_stock_price;
    let index = grid.index_of(from).ok_or_else(|| {
        EconError::invariant(format!("{} priced off the grid at {from}", company.id))
    })?;
    let steps = profit_steps(profit);
    let to = grid
        .price_at(grid.step_from(index, steps))
        .ok_or_else(|| EconError::invariant("stock grid is empty"))?;
    company.current_stock_price = to;

    let became_insolvent = to == grid.min_price();
    if became_insolvent {
        company.status = CompanyStatus::Insolvent;
        warn!(company = %company.id, %from, "stock price hit zero, company insolvent");
    }
    Ok(Some(PriceMove { company_id: company.id, from, to, steps, became_insolvent }))
}

/// Adjust every active company by its profit for the turn.
///
/// `profit_of` returns the net profit of a company; companies it has no
/// figure for move by zero steps.
pub fn resolve_stock_prices(
    state: &mut GameEconomyState,
    profit_of: impl Fn(CompanyId) -> Decimal,
) -> Result<Vec<PriceMove>, EconError> {
    let grid = state.stock_grid.clone();
    let mut moves = Vec::new();
    for company in state.companies.iter_mut().filter(|c| c.is_active()) {
        let profit = profit_of(company.id);
        if let Some(m) = apply_profit_step(company, &grid, profit)? {
            moves.push(m);
        }
    }
    state.refresh_demand_bonus();
    info!(turn = state.turn, adjusted = moves.len(), "stock prices adjusted");
    Ok(moves)
}
