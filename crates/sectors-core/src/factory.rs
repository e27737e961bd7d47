//! Factories, the size table and technology-level size bounds.

use crate::ids::{CompanyId, FactoryId, SectorId};
use crate::resource::ResourceType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of factory slots a company may fill.
pub const MAX_FACTORY_SLOTS: u8 = 4;

/// Factory sizes. Ordering is meaningful: `I < II < III < IV`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FactorySize {
    I,
    II,
    III,
    IV,
}

/// Static properties of one factory size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeSpec {
    /// Workers required to staff the factory.
    pub workers: u32,
    /// Maximum consumers served per turn.
    pub max_customers: u32,
    /// Construction cost before resource prices are added.
    pub base_cost: i64,
    /// Number of distinct resources the factory consumes.
    pub resource_count: usize,
}

const SIZE_TABLE: [SizeSpec; 4] = [
    SizeSpec { workers: 1, max_customers: 3, base_cost: 100, resource_count: 1 },
    SizeSpec { workers: 2, max_customers: 4, base_cost: 200, resource_count: 2 },
    SizeSpec { workers: 3, max_customers: 5, base_cost: 300, resource_count: 3 },
    SizeSpec { workers: 4, max_customers: 6, base_cost: 400, resource_count: 4 },
];

impl FactorySize {
    pub const ALL: [FactorySize; 4] =
        [FactorySize::I, FactorySize::II, FactorySize::III, FactorySize::IV];

    fn index(self) -> usize {
        match self {
            FactorySize::I => 0,
            FactorySize::II => 1,
            FactorySize::III => 2,
            FactorySize::IV => 3,
        }
    }

    pub fn spec(self) -> SizeSpec {
        SIZE_TABLE[self.index()]
    }

    pub fn workers(self) -> u32 {
        self.spec().workers
    }

    pub fn max_customers(self) -> u32 {
        self.spec().max_customers
    }

    pub fn base_cost(self) -> Decimal {
        Decimal::from(self.spec().base_cost)
    }

    pub fn resource_count(self) -> usize {
        self.spec().resource_count
    }
}

impl fmt::Display for FactorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Factory {self:?}")
    }
}

/// Inclusive size range permitted at a sector technology level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min: FactorySize,
    pub max: FactorySize,
}

impl SizeBounds {
    pub fn contains(&self, size: FactorySize) -> bool {
        self.min <= size && size <= self.max
    }
}

const TECH_BOUNDS: [SizeBounds; 5] = [
    SizeBounds { min: FactorySize::I, max: FactorySize::II },
    SizeBounds { min: FactorySize::I, max: FactorySize::III },
    SizeBounds { min: FactorySize::I, max: FactorySize::IV },
    SizeBounds { min: FactorySize::II, max: FactorySize::IV },
    SizeBounds { min: FactorySize::III, max: FactorySize::IV },
];

/// Highest technology level a sector can reach.
pub const MAX_TECHNOLOGY_LEVEL: u8 = 4;

/// Size bounds for a technology level; levels past the table use the last row.
pub fn size_bounds(technology_level: u8) -> SizeBounds {
    let idx = usize::from(technology_level.min(MAX_TECHNOLOGY_LEVEL));
    TECH_BOUNDS[idx]
}

/// A factory owned by a company inside its sector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub id: FactoryId,
    pub company_id: CompanyId,
    pub sector_id: SectorId,
    pub size: FactorySize,
    /// Slot index within the company, `0..MAX_FACTORY_SLOTS`.
    pub slot: u8,
    pub workers: u32,
    pub resource_types: Vec<ResourceType>,
    /// False while under construction; such factories earn nothing.
    pub is_operational: bool,
    pub is_rusted: bool,
    pub original_construction_cost: Decimal,
    pub built_turn: u32,
}

impl Factory {
    /// Complexity used as the final attraction tie-break.
    pub fn complexity(&self) -> usize {
        self.resource_types.len()
    }

    /// Whether the factory can take consumers this turn.
    pub fn can_produce(&self) -> bool {
        self.is_operational && !self.is_rusted
    }
}
