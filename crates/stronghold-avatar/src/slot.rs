//! Slots: the small `(data id, value)` entries that make up most of an
//! avatar's game state.
//!
//! Order inside a collection carries no meaning, but it is preserved
//! exactly through save and load so that what the client sent is what it
//! gets back.

use serde::{Deserialize, Serialize};

/// One entry in a slot collection.
///
/// `id` refers to a row in the static game definitions (a unit type, a
/// resource, an achievement). What `value` means depends on the
/// collection: an amount, a level, a health value or a progress counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: i32,
    pub value: i32,
}

impl Slot {
    pub fn new(id: i32, value: i32) -> Self {
        Self { id, value }
    }
}

/// A unit donated by a clan mate. Unlike other slots it also records the
/// level the unit was donated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceUnitSlot {
    pub id: i32,
    pub count: i32,
    pub level: i32,
}

/// Every slot collection an avatar owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarSlots {
    pub resources_capacity: Vec<Slot>,
    pub resources_amount: Vec<Slot>,
    pub units: Vec<Slot>,
    pub spells: Vec<Slot>,
    pub unit_upgrades: Vec<Slot>,
    pub spell_upgrades: Vec<Slot>,
    pub hero_upgrades: Vec<Slot>,
    pub hero_healths: Vec<Slot>,
    pub hero_states: Vec<Slot>,
    pub alliance_units: Vec<AllianceUnitSlot>,
    pub tutorial_progress: Vec<Slot>,
    pub achievements: Vec<Slot>,
    pub achievement_progress: Vec<Slot>,
    pub npc_stars: Vec<Slot>,
    pub npc_gold: Vec<Slot>,
    pub npc_elixir: Vec<Slot>,
}

impl AvatarSlots {
    /// Total number of entries across every collection.
    pub fn len(&self) -> usize {
        let plain = [
            &self.resources_capacity,
            &self.resources_amount,
            &self.units,
            &self.spells,
            &self.unit_upgrades,
            &self.spell_upgrades,
            &self.hero_upgrades,
            &self.hero_healths,
            &self.hero_states,
            &self.tutorial_progress,
            &self.achievements,
            &self.achievement_progress,
            &self.npc_stars,
            &self.npc_gold,
            &self.npc_elixir,
        ];
        plain.iter().map(|v| v.len()).sum::<usize>() + self.alliance_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slots_are_empty() {
        let slots = AvatarSlots::default();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_len_counts_every_collection() {
        let slots = AvatarSlots {
            units: vec![Slot::new(4_000_000, 20), Slot::new(4_000_001, 5)],
            alliance_units: vec![AllianceUnitSlot {
                id: 4_000_002,
                count: 1,
                level: 3,
            }],
            npc_stars: vec![Slot::new(17_000_000, 3)],
            ..AvatarSlots::default()
        };
        assert_eq!(slots.len(), 4);
    }

    #[test]
    fn test_missing_collections_deserialize_as_empty() {
        // `#[serde(default)]` lets older records that predate a
        // collection still load.
        let json = r#"{ "units": [ { "id": 1, "value": 2 } ] }"#;
        let slots: AvatarSlots = serde_json::from_str(json).unwrap();
        assert_eq!(slots.units, vec![Slot::new(1, 2)]);
        assert!(slots.spells.is_empty());
    }

    #[test]
    fn test_order_is_preserved_through_json() {
        let slots = AvatarSlots {
            resources_amount: vec![Slot::new(3, 0), Slot::new(1, 9), Slot::new(2, 4)],
            ..AvatarSlots::default()
        };
        let json = serde_json::to_string(&slots).unwrap();
        let back: AvatarSlots = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slots);
    }
}
