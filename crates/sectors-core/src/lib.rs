#![deny(warnings)]

//! Core domain models and invariants for Sectors.
//!
//! This crate is the resource and sector ledger of the game: serializable
//! entity types, the central constant tables (phase order, factory sizes,
//! marketing tiers, economy and salary tracks, stock grid), the workforce
//! pool and the [`GameEconomyState`] value every resolver operates on.

pub mod company;
pub mod config;
pub mod error;
pub mod factory;
pub mod ids;
pub mod marketing;
pub mod phase;
pub mod production;
pub mod resource;
pub mod sector;
pub mod state;
pub mod stock;
pub mod workforce;

pub use company::{Company, CompanyStatus};
pub use config::GameConfig;
pub use error::ValidationError;
pub use factory::{size_bounds, Factory, FactorySize, SizeBounds, MAX_FACTORY_SLOTS};
pub use ids::{CampaignId, CompanyId, FactoryId, GameId, SectorId};
pub use marketing::{CampaignLifecycle, MarketingCampaign, MarketingTier};
pub use phase::{GameTurn, Phase, PhaseName, RoundType, PHASE_ORDER};
pub use production::{CompanyEarnings, FactoryProduction, ProductionLedger};
pub use resource::{ResourceLedger, ResourceType, SectorKind};
pub use sector::{technology_level_for, ConsumptionBag, ConsumptionMarker, Sector};
pub use state::{validate_state, GameEconomyState, ResearchGrant};
pub use stock::StockGrid;
pub use workforce::{economy_score_for, salary_for, WorkforceError, WorkforcePool};
