//! Attachment links driven by the source feed (vehicles and their
//! passengers). Shoulder decorations are linked by the synthesizer and never
//! appear here.

use std::collections::HashMap;

use gateway_entity::TargetId;
use gateway_protocol::{EntityLink, LinkType};

/// Result of replacing a vehicle's passenger list.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LinkChanges {
    /// Links that no longer exist, already turned into removals.
    pub removed: Vec<EntityLink>,
    /// Links that are new or whose type changed.
    pub added: Vec<EntityLink>,
}

/// Current passenger lists keyed by vehicle.
#[derive(Debug, Default)]
pub struct LinkTable {
    passengers: HashMap<TargetId, Vec<TargetId>>,
}

impl LinkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the passengers of `vehicle`. The first passenger drives.
    pub fn set_passengers(&mut self, vehicle: TargetId, passengers: Vec<TargetId>) -> LinkChanges {
        let previous = if passengers.is_empty() {
            self.passengers.remove(&vehicle).unwrap_or_default()
        } else {
            self.passengers
                .insert(vehicle, passengers.clone())
                .unwrap_or_default()
        };
        let old_links = links_for(vehicle, &previous);
        let new_links = links_for(vehicle, &passengers);

        let removed = old_links
            .iter()
            .filter(|old| !new_links.iter().any(|new| new.child == old.child))
            .map(|old| old.removal())
            .collect();
        let added = new_links
            .into_iter()
            .filter(|new| !old_links.contains(new))
            .collect();
        LinkChanges { removed, added }
    }

    /// Every link that has `target_id` at either end.
    #[must_use]
    pub fn involving(&self, target_id: TargetId) -> Vec<EntityLink> {
        self.passengers
            .iter()
            .flat_map(|(vehicle, passengers)| links_for(*vehicle, passengers))
            .filter(|link| link.involves(target_id))
            .collect()
    }

    /// Drop every link that has `target_id` at either end.
    pub fn remove_involving(&mut self, target_id: TargetId) {
        self.passengers.remove(&target_id);
        self.passengers.retain(|_, passengers| {
            passengers.retain(|passenger| *passenger != target_id);
            !passengers.is_empty()
        });
    }

    #[must_use]
    pub fn passengers(&self, vehicle: TargetId) -> &[TargetId] {
        self.passengers.get(&vehicle).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.passengers.clear();
    }
}

fn links_for(vehicle: TargetId, passengers: &[TargetId]) -> Vec<EntityLink> {
    passengers
        .iter()
        .enumerate()
        .map(|(seat, passenger)| {
            let link_type = if seat == 0 {
                LinkType::Rider
            } else {
                LinkType::Passenger
            };
            EntityLink::new(vehicle, *passenger, link_type)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOAT: TargetId = TargetId(10);
    const A: TargetId = TargetId(11);
    const B: TargetId = TargetId(12);

    #[test]
    fn test_first_passenger_rides() {
        let mut table = LinkTable::new();
        let changes = table.set_passengers(BOAT, vec![A, B]);
        assert!(changes.removed.is_empty());
        assert_eq!(
            changes.added,
            vec![
                EntityLink::new(BOAT, A, LinkType::Rider),
                EntityLink::new(BOAT, B, LinkType::Passenger),
            ]
        );
    }

    #[test]
    fn test_dropped_passenger_is_removed_and_promoted_one_relinked() {
        let mut table = LinkTable::new();
        table.set_passengers(BOAT, vec![A, B]);

        let changes = table.set_passengers(BOAT, vec![B]);
        assert_eq!(
            changes.removed,
            vec![EntityLink::new(BOAT, A, LinkType::Rider).removal()]
        );
        assert_eq!(changes.added, vec![EntityLink::new(BOAT, B, LinkType::Rider)]);
        assert_eq!(table.passengers(BOAT), &[B]);
    }

    #[test]
    fn test_unchanged_list_emits_nothing() {
        let mut table = LinkTable::new();
        table.set_passengers(BOAT, vec![A]);
        assert_eq!(table.set_passengers(BOAT, vec![A]), LinkChanges::default());
    }

    #[test]
    fn test_remove_involving() {
        let mut table = LinkTable::new();
        table.set_passengers(BOAT, vec![A, B]);
        table.set_passengers(A, vec![B]);
        assert_eq!(table.involving(B).len(), 2);

        table.remove_involving(A);
        assert_eq!(table.passengers(BOAT), &[B]);
        assert!(table.passengers(A).is_empty());
        assert_eq!(table.involving(B), vec![EntityLink::new(BOAT, B, LinkType::Rider)]);
    }
}
