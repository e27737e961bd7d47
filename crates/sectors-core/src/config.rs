//! Per-game configuration.

use crate::error::ValidationError;
use crate::phase::PhaseName;
use crate::stock::StockGrid;
use crate::workforce::DEFAULT_TOTAL_WORKERS;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Game configuration supplied by the phase driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub use_limit_orders: bool,
    pub use_option_orders: bool,
    pub use_short_orders: bool,
    /// Seed for research draws.
    pub rng_seed: u64,
    pub total_workers: u32,
    /// Consumers available for distribution across sectors.
    pub consumer_pool: u32,
    pub starting_cash: Decimal,
    /// Must be a value on the stock grid.
    pub starting_stock_price: Decimal,
    /// Default soft deadline per phase.
    pub phase_time_ms: u64,
    /// Per-phase deadline overrides.
    pub phase_time_overrides: BTreeMap<PhaseName, u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            use_limit_orders: false,
            use_option_orders: false,
            use_short_orders: false,
            rng_seed: 42,
            total_workers: DEFAULT_TOTAL_WORKERS,
            consumer_pool: 75,
            starting_cash: Decimal::from(500),
            starting_stock_price: Decimal::from(20),
            phase_time_ms: 60_000,
            phase_time_overrides: BTreeMap::new(),
        }
    }
}

impl GameConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ValidationError> {
        let cfg: GameConfig =
            serde_yaml::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ValidationError> {
        let cfg: GameConfig =
            serde_json::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_workers == 0 {
            return Err(ValidationError::InvalidConfig("total_workers must be > 0".into()));
        }
        if self.starting_cash < Decimal::ZERO {
            return Err(ValidationError::InvalidConfig("starting_cash must be >= 0".into()));
        }
        let grid = StockGrid::default();
        if self.starting_stock_price <= Decimal::ZERO
            || grid.index_of(self.starting_stock_price).is_none()
        {
            return Err(ValidationError::InvalidConfig(format!(
                "starting_stock_price {} is not a positive grid value",
                self.starting_stock_price
            )));
        }
        if self.phase_time_ms == 0 {
            return Err(ValidationError::InvalidConfig("phase_time_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Soft deadline for `phase`.
    pub fn phase_time_for(&self, phase: PhaseName) -> u64 {
        self.phase_time_overrides
            .get(&phase)
            .copied()
            .unwrap_or(self.phase_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn yaml_overrides_and_defaults() {
        let text = "use_short_orders: true\ntotal_workers: 30\nphase_time_overrides:\n  EARNINGS_CALL: 5000\n";
        let cfg = GameConfig::from_yaml_str(text).unwrap();
        assert!(cfg.use_short_orders);
        assert!(!cfg.use_limit_orders);
        assert_eq!(cfg.total_workers, 30);
        assert_eq!(cfg.phase_time_for(PhaseName::EarningsCall), 5000);
        assert_eq!(cfg.phase_time_for(PhaseName::StartTurn), 60_000);
    }

    #[test]
    fn off_grid_starting_price_rejected() {
        let cfg = GameConfig { starting_stock_price: Decimal::from(26), ..GameConfig::default() };
        assert!(matches!(cfg.validate(), Err(ValidationError::InvalidConfig(_))));
    }

    #[test]
    fn zero_workers_rejected() {
        let err = GameConfig::from_json_str(r#"{"total_workers": 0}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig(_)));
    }
}
