//! Sectors, their demand inputs and consumption bags.

use crate::factory::MAX_TECHNOLOGY_LEVEL;
use crate::ids::{CampaignId, SectorId};
use crate::resource::{ResourceType, SectorKind};
use serde::{Deserialize, Serialize};

/// Last space on the shared research track.
pub const MAX_RESEARCH_MARKER: u8 = 12;

/// Marker spaces per technology level.
pub const RESEARCH_SPACES_PER_LEVEL: u8 = 3;

/// Technology level reached at a research marker position.
pub fn technology_level_for(research_marker: u8) -> u8 {
    (research_marker.min(MAX_RESEARCH_MARKER) / RESEARCH_SPACES_PER_LEVEL).min(MAX_TECHNOLOGY_LEVEL)
}

/// A market sector and its demand inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    pub kind: SectorKind,
    /// Consumers waiting in the sector (carried over when unserved).
    pub consumers: u32,
    /// `base_demand` plus the research bonus.
    pub demand: i32,
    /// Sum of active company brand scores in the sector.
    pub demand_bonus: i32,
    pub base_demand: i32,
    pub research_marker: u8,
    pub technology_level: u8,
}

impl Sector {
    pub fn new(id: SectorId, name: impl Into<String>, kind: SectorKind, base_demand: i32) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            consumers: 0,
            demand: base_demand,
            demand_bonus: 0,
            base_demand,
            research_marker: 0,
            technology_level: 0,
        }
    }

    /// Ranking key used by consumer distribution.
    pub fn total_demand(&self) -> i32 {
        self.demand.saturating_add(self.demand_bonus)
    }

    /// Recompute `demand` from the base and the current technology level.
    pub fn refresh_demand(&mut self) {
        self.demand = self.base_demand.saturating_add(i32::from(self.technology_level));
    }
}

/// One draw in a sector's consumption bag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionMarker {
    pub resource_type: ResourceType,
    pub is_permanent: bool,
    /// Campaign that added a temporary marker.
    pub campaign_id: Option<CampaignId>,
}

impl ConsumptionMarker {
    pub fn permanent(resource_type: ResourceType) -> Self {
        Self { resource_type, is_permanent: true, campaign_id: None }
    }

    pub fn temporary(resource_type: ResourceType, campaign_id: CampaignId) -> Self {
        Self { resource_type, is_permanent: false, campaign_id: Some(campaign_id) }
    }
}

/// Ordered multiset of markers for one sector. Order is the draw order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionBag {
    pub sector_id: SectorId,
    pub markers: Vec<ConsumptionMarker>,
    /// Where the next turn's walk starts.
    #[serde(default)]
    pub cursor: usize,
}

impl ConsumptionBag {
    pub fn empty(sector_id: SectorId) -> Self {
        Self { sector_id, markers: Vec::new(), cursor: 0 }
    }

    /// Starting bag: the sector resource twice plus each universal shape once.
    pub fn starting(sector_id: SectorId, kind: SectorKind) -> Self {
        let mut markers = vec![
            ConsumptionMarker::permanent(kind.resource()),
            ConsumptionMarker::permanent(kind.resource()),
        ];
        markers.extend(ResourceType::UNIVERSAL.into_iter().map(ConsumptionMarker::permanent));
        Self { sector_id, markers, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Marker for draw number `draw` of this walk, cycling from the cursor.
    pub fn draw(&self, draw: usize) -> Option<&ConsumptionMarker> {
        if self.markers.is_empty() {
            return None;
        }
        self.markers.get(self.cursor.wrapping_add(draw) % self.markers.len())
    }

    /// Move the cursor past `draws` markers so the next walk picks up where this one stopped.
    pub fn advance(&mut self, draws: usize) {
        self.cursor = match self.markers.len() {
            0 => 0,
            len => (self.cursor % len + draws % len) % len,
        };
    }

    pub fn add_temporary(&mut self, resource_type: ResourceType, campaign_id: CampaignId) {
        self.markers.push(ConsumptionMarker::temporary(resource_type, campaign_id));
    }

    /// Remove every temporary marker contributed by `campaign_id`. Returns how many were removed.
    pub fn purge_campaign(&mut self, campaign_id: CampaignId) -> usize {
        let before = self.markers.len();
        self.markers
            .retain(|m| m.is_permanent || m.campaign_id != Some(campaign_id));
        before - self.markers.len()
    }

    pub fn temporary_count(&self) -> usize {
        self.markers.iter().filter(|m| !m.is_permanent).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technology_level_every_three_spaces() {
        assert_eq!(technology_level_for(0), 0);
        assert_eq!(technology_level_for(2), 0);
        assert_eq!(technology_level_for(3), 1);
        assert_eq!(technology_level_for(11), 3);
        assert_eq!(technology_level_for(12), 4);
        assert_eq!(technology_level_for(40), 4);
    }

    #[test]
    fn draws_wrap_around() {
        let bag = ConsumptionBag::starting(SectorId(1), SectorKind::Energy);
        assert_eq!(bag.len(), 5);
        assert_eq!(bag.draw(0), bag.draw(5));
        assert_eq!(ConsumptionBag::empty(SectorId(2)).draw(3), None);
    }

    #[test]
    fn cursor_carries_the_walk_across_turns() {
        let mut bag = ConsumptionBag::starting(SectorId(1), SectorKind::Energy);
        bag.add_temporary(ResourceType::Circle, CampaignId(1));
        assert_eq!(bag.draw(5).map(|m| m.is_permanent), Some(false));

        // Two short walks reach the temporary marker at the end of the bag.
        bag.advance(3);
        assert_eq!(bag.draw(2).map(|m| m.campaign_id), Some(Some(CampaignId(1))));
        bag.advance(4);
        assert_eq!(bag.cursor, 1);

        // A purge can shrink the bag under the cursor; draws still wrap.
        bag.cursor = 5;
        bag.purge_campaign(CampaignId(1));
        assert_eq!(bag.draw(0), bag.draw(5));
        bag.advance(1);
        assert_eq!(bag.cursor, 1);
        let mut empty = ConsumptionBag::empty(SectorId(2));
        empty.advance(7);
        assert_eq!(empty.cursor, 0);
    }

    #[test]
    fn purge_only_touches_one_campaign() {
        let mut bag = ConsumptionBag::starting(SectorId(1), SectorKind::Energy);
        bag.add_temporary(ResourceType::Circle, CampaignId(1));
        bag.add_temporary(ResourceType::Square, CampaignId(2));
        assert_eq!(bag.purge_campaign(CampaignId(1)), 1);
        assert_eq!(bag.temporary_count(), 1);
        assert_eq!(bag.len(), 6);
    }
}
