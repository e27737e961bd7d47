//! Marketing tiers and campaign records.

use crate::ids::{CampaignId, CompanyId};
use crate::resource::ResourceType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Marketing campaign tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketingTier {
    Tier1,
    Tier2,
    Tier3,
}

/// Fixed costs and effects of a tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierSpec {
    pub workers: u32,
    pub cash_cost: i64,
    pub brand_bonus: u32,
    /// Temporary bag markers added; also the number of resources the player must pick.
    pub markers: usize,
}

const TIER_TABLE: [TierSpec; 3] = [
    TierSpec { workers: 1, cash_cost: 100, brand_bonus: 1, markers: 1 },
    TierSpec { workers: 2, cash_cost: 200, brand_bonus: 2, markers: 2 },
    TierSpec { workers: 3, cash_cost: 300, brand_bonus: 3, markers: 3 },
];

/// Extra cash per campaign already running on the company, clamped to the last entry.
pub const CAMPAIGN_SLOT_PENALTY: [i64; 5] = [0, 100, 200, 300, 400];

impl MarketingTier {
    pub fn spec(self) -> TierSpec {
        match self {
            MarketingTier::Tier1 => TIER_TABLE[0],
            MarketingTier::Tier2 => TIER_TABLE[1],
            MarketingTier::Tier3 => TIER_TABLE[2],
        }
    }

    /// Tier from its number (1..=3).
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(MarketingTier::Tier1),
            2 => Some(MarketingTier::Tier2),
            3 => Some(MarketingTier::Tier3),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            MarketingTier::Tier1 => 1,
            MarketingTier::Tier2 => 2,
            MarketingTier::Tier3 => 3,
        }
    }

    /// Base cost plus the concurrent-campaign penalty.
    pub fn cash_cost(self, concurrent_campaigns: usize) -> Decimal {
        let idx = concurrent_campaigns.min(CAMPAIGN_SLOT_PENALTY.len() - 1);
        Decimal::from(self.spec().cash_cost + CAMPAIGN_SLOT_PENALTY[idx])
    }
}

/// Campaign lifecycle: `Active -> Decaying -> Expired`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignLifecycle {
    Active,
    Decaying,
    Expired,
}

impl CampaignLifecycle {
    /// State after one resolution cycle. `Expired` is absorbing.
    pub fn advance(self) -> Self {
        match self {
            CampaignLifecycle::Active => CampaignLifecycle::Decaying,
            CampaignLifecycle::Decaying | CampaignLifecycle::Expired => CampaignLifecycle::Expired,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketingCampaign {
    pub id: CampaignId,
    pub company_id: CompanyId,
    pub tier: MarketingTier,
    pub workers: u32,
    pub brand_bonus: u32,
    pub resource_types: Vec<ResourceType>,
    pub created_turn: u32,
    pub lifecycle: CampaignLifecycle,
}

impl MarketingCampaign {
    pub fn is_running(&self) -> bool {
        self.lifecycle != CampaignLifecycle::Expired
    }
}
