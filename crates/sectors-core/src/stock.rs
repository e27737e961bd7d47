//! Shared stock price grid.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const DEFAULT_GRID: [i64; 53] = [
    0, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 27, 29, 31,
    33, 35, 37, 40, 43, 46, 50, 55, 60, 65, 70, 75, 80, 90, 100, 110, 120, 135, 150, 170, 190,
    210, 235, 260, 290, 320, 350, 400,
];

/// Monotonically increasing price grid starting at zero, shared by all companies in a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockGrid {
    prices: Vec<Decimal>,
}

impl Default for StockGrid {
    fn default() -> Self {
        Self { prices: DEFAULT_GRID.iter().map(|p| Decimal::from(*p)).collect() }
    }
}

impl StockGrid {
    /// Build a grid; returns `None` unless it starts at zero and strictly increases.
    pub fn new(prices: Vec<Decimal>) -> Option<Self> {
        let starts_at_zero = prices.first() == Some(&Decimal::ZERO);
        let increasing = prices.windows(2).all(|w| w[0] < w[1]);
        (starts_at_zero && increasing).then_some(Self { prices })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn min_price(&self) -> Decimal {
        Decimal::ZERO
    }

    pub fn max_price(&self) -> Decimal {
        self.prices.last().copied().unwrap_or(Decimal::ZERO)
    }

    /// Grid position of `price`, if it lies on the grid.
    pub fn index_of(&self, price: Decimal) -> Option<usize> {
        self.prices.binary_search(&price).ok()
    }

    pub fn price_at(&self, index: usize) -> Option<Decimal> {
        self.prices.get(index).copied()
    }

    /// Move `steps` positions from `index`, clamped to the grid ends.
    pub fn step_from(&self, index: usize, steps: i32) -> usize {
        let last = self.prices.len().saturating_sub(1) as i64;
        let target = (index as i64 + i64::from(steps)).clamp(0, last);
        target as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_is_valid() {
        let grid = StockGrid::default();
        assert!(StockGrid::new(grid.prices.clone()).is_some());
        assert_eq!(grid.min_price(), Decimal::ZERO);
        assert_eq!(grid.max_price(), Decimal::from(400));
    }

    #[test]
    fn rejects_grids_not_starting_at_zero() {
        assert!(StockGrid::new(vec![Decimal::ONE, Decimal::TWO]).is_none());
        assert!(StockGrid::new(vec![Decimal::ZERO, Decimal::TWO, Decimal::ONE]).is_none());
    }

    #[test]
    fn steps_clamp_to_ends() {
        let grid = StockGrid::default();
        assert_eq!(grid.step_from(1, -5), 0);
        assert_eq!(grid.step_from(grid.len() - 2, 3), grid.len() - 1);
        assert_eq!(grid.index_of(Decimal::from(20)), Some(16));
        assert_eq!(grid.index_of(Decimal::from(26)), None);
    }
}
