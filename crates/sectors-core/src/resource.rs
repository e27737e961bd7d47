//! Resource types, sector kinds and per-game resource price tracks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of market sectors. Each kind owns exactly one sector-specific resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectorKind {
    Materials,
    Industrials,
    ConsumerDiscretionary,
    ConsumerStaples,
    Healthcare,
    Technology,
    Energy,
}

impl SectorKind {
    /// All sector kinds in canonical order.
    pub const ALL: [SectorKind; 7] = [
        SectorKind::Materials,
        SectorKind::Industrials,
        SectorKind::ConsumerDiscretionary,
        SectorKind::ConsumerStaples,
        SectorKind::Healthcare,
        SectorKind::Technology,
        SectorKind::Energy,
    ];

    /// The sector-specific resource produced by factories of this sector.
    pub fn resource(self) -> ResourceType {
        match self {
            SectorKind::Materials => ResourceType::Materials,
            SectorKind::Industrials => ResourceType::Industrials,
            SectorKind::ConsumerDiscretionary => ResourceType::ConsumerDiscretionary,
            SectorKind::ConsumerStaples => ResourceType::ConsumerStaples,
            SectorKind::Healthcare => ResourceType::Healthcare,
            SectorKind::Technology => ResourceType::Technology,
            SectorKind::Energy => ResourceType::Energy,
        }
    }
}

/// Closed set of resources a factory can consume and a consumer can demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Triangle,
    Square,
    Circle,
    Materials,
    Industrials,
    ConsumerDiscretionary,
    ConsumerStaples,
    Healthcare,
    Technology,
    Energy,
}

impl ResourceType {
    /// Shapes usable by every sector.
    pub const UNIVERSAL: [ResourceType; 3] =
        [ResourceType::Triangle, ResourceType::Square, ResourceType::Circle];

    /// Whether this resource is one of the three universal shapes.
    pub fn is_universal(self) -> bool {
        Self::UNIVERSAL.contains(&self)
    }

    /// Whether a company operating in `kind` may use this resource.
    pub fn allowed_in(self, kind: SectorKind) -> bool {
        self.is_universal() || kind.resource() == self
    }

    /// Default price track for the resource; prices fall as the resource is used.
    pub fn default_track(self) -> Vec<Decimal> {
        let raw: &[i64] = match self {
            ResourceType::Triangle => &[10, 9, 8, 7, 6, 5, 4, 3],
            ResourceType::Square => &[15, 14, 13, 12, 11, 10, 9, 8],
            ResourceType::Circle => &[20, 18, 16, 14, 12, 10, 8, 6],
            _ => &[30, 27, 24, 21, 18, 15, 12, 10],
        };
        raw.iter().map(|v| Decimal::from(*v)).collect()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A fixed price track with a cursor advanced each time the resource is used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceTrack {
    /// Prices by position; never empty.
    pub prices: Vec<Decimal>,
    /// Number of uses so far.
    pub cursor: usize,
}

impl ResourceTrack {
    pub fn new(prices: Vec<Decimal>) -> Self {
        Self { prices, cursor: 0 }
    }

    /// Current unit price. The last position is sticky once the track is exhausted.
    pub fn price(&self) -> Decimal {
        let idx = self.cursor.min(self.prices.len().saturating_sub(1));
        self.prices.get(idx).copied().unwrap_or(Decimal::ZERO)
    }

    /// Record one use of the resource.
    pub fn consume(&mut self) {
        self.cursor = self.cursor.saturating_add(1);
    }
}

/// Per-game price tracks for every resource type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceLedger {
    tracks: BTreeMap<ResourceType, ResourceTrack>,
}

impl Default for ResourceLedger {
    fn default() -> Self {
        let universal = ResourceType::UNIVERSAL.into_iter();
        let sector = SectorKind::ALL.into_iter().map(SectorKind::resource);
        let tracks = universal
            .chain(sector)
            .map(|r| (r, ResourceTrack::new(r.default_track())))
            .collect();
        Self { tracks }
    }
}

impl ResourceLedger {
    /// Current price of `resource`; zero if the game has no track for it.
    pub fn price(&self, resource: ResourceType) -> Decimal {
        self.tracks
            .get(&resource)
            .map(ResourceTrack::price)
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of current prices over `resources`.
    pub fn price_sum(&self, resources: &[ResourceType]) -> Decimal {
        resources.iter().map(|r| self.price(*r)).sum()
    }

    /// Advance the track of every resource in `resources` by one use.
    pub fn consume_all(&mut self, resources: &[ResourceType]) {
        for r in resources {
            if let Some(track) = self.tracks.get_mut(r) {
                track.consume();
            }
        }
    }

    /// Snapshot of all current prices.
    pub fn price_map(&self) -> BTreeMap<ResourceType, Decimal> {
        self.tracks.iter().map(|(r, t)| (*r, t.price())).collect()
    }

    pub fn track(&self, resource: ResourceType) -> Option<&ResourceTrack> {
        self.tracks.get(&resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sector_resource_is_allowed_only_in_its_sector() {
        assert!(ResourceType::Energy.allowed_in(SectorKind::Energy));
        assert!(!ResourceType::Energy.allowed_in(SectorKind::Healthcare));
        assert!(ResourceType::Circle.allowed_in(SectorKind::Healthcare));
    }

    #[test]
    fn track_price_moves_on_use_and_sticks_at_end() {
        let mut t = ResourceTrack::new(vec![Decimal::from(3), Decimal::from(2)]);
        assert_eq!(t.price(), Decimal::from(3));
        t.consume();
        assert_eq!(t.price(), Decimal::from(2));
        t.consume();
        t.consume();
        assert_eq!(t.price(), Decimal::from(2));
    }

    #[test]
    fn default_ledger_prices() {
        let ledger = ResourceLedger::default();
        assert_eq!(ledger.price(ResourceType::Triangle), Decimal::from(10));
        assert_eq!(ledger.price(ResourceType::Square), Decimal::from(15));
        assert_eq!(
            ledger.price_sum(&[ResourceType::Triangle, ResourceType::Square]),
            Decimal::from(25)
        );
        assert_eq!(ledger.price_map().len(), 10);
    }

    #[test]
    fn consume_all_advances_each_track_once() {
        let mut ledger = ResourceLedger::default();
        ledger.consume_all(&[ResourceType::Circle, ResourceType::Technology]);
        assert_eq!(ledger.price(ResourceType::Circle), Decimal::from(18));
        assert_eq!(ledger.price(ResourceType::Technology), Decimal::from(27));
        assert_eq!(ledger.price(ResourceType::Triangle), Decimal::from(10));
    }
}
