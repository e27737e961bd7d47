//! Companies and their lifecycle status.

use crate::ids::{CompanyId, SectorId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a company.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyStatus {
    /// Operating and taking part in company sub-turns.
    Active,
    /// Not yet floated or withdrawn; skipped by every phase.
    Inactive,
    /// Stock price hit zero. Terminal for the engine; handled by the driver.
    Insolvent,
}

/// A company operating inside one sector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub sector_id: SectorId,
    pub name: String,
    pub cash_on_hand: Decimal,
    pub brand_score: u32,
    pub research_progress: u32,
    /// Always a value on the game's stock price grid.
    pub current_stock_price: Decimal,
    pub status: CompanyStatus,
    pub has_loan: bool,
}

impl Company {
    pub fn is_active(&self) -> bool {
        self.status == CompanyStatus::Active
    }
}
