// Board - fixed slots, each holding at most one card plus per-agent markers

use crate::model::{AgentId, Card, Slot};
use crate::sink::Sink;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Slot {slot} is outside the board (size {size})")]
    SlotOutOfRange { slot: Slot, size: usize },
    #[error("Slot {slot} already holds {card}")]
    SlotOccupied { slot: Slot, card: Card },
}

/// Slot grid with a bidirectional slot/card mapping.
///
/// Markers are tracked twice: per slot (who marked it) and per agent (which
/// slots, in marking order). Both views change together in every operation.
/// The board itself is not synchronized; it lives inside the table mutex.
pub struct Board {
    slot_to_card: Vec<Option<Card>>,
    card_to_slot: HashMap<Card, Slot>,
    slot_markers: Vec<BTreeSet<AgentId>>,
    agent_markers: Vec<Vec<Slot>>,
    group_size: usize,
    sink: Arc<dyn Sink>,
}

impl Board {
    pub fn new(slots: usize, group_size: usize, agents: usize, sink: Arc<dyn Sink>) -> Self {
        Self {
            slot_to_card: vec![None; slots],
            card_to_slot: HashMap::with_capacity(slots),
            slot_markers: vec![BTreeSet::new(); slots],
            agent_markers: vec![Vec::with_capacity(group_size); agents],
            group_size,
            sink,
        }
    }

    pub fn slots(&self) -> usize {
        self.slot_to_card.len()
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn agents(&self) -> usize {
        self.agent_markers.len()
    }

    /// Put `card` on an empty slot.
    pub fn place_card(&mut self, card: Card, slot: Slot) -> Result<(), BoardError> {
        match self.slot_to_card.get(slot) {
            None => {
                return Err(BoardError::SlotOutOfRange {
                    slot,
                    size: self.slots(),
                })
            }
            Some(Some(existing)) => {
                return Err(BoardError::SlotOccupied {
                    slot,
                    card: *existing,
                })
            }
            Some(None) => {}
        }

        self.slot_to_card[slot] = Some(card);
        self.card_to_slot.insert(card, slot);
        self.sink.on_card_placed(card, slot);
        Ok(())
    }

    /// Take the card off `slot`, stripping every marker placed there.
    /// Returns `None` when the slot was already empty.
    pub fn remove_card(&mut self, slot: Slot) -> Option<Card> {
        let card = self.slot_to_card.get_mut(slot)?.take()?;
        self.card_to_slot.remove(&card);

        let holders = std::mem::take(&mut self.slot_markers[slot]);
        for agent in holders {
            if let Some(markers) = self.agent_markers.get_mut(agent.index()) {
                markers.retain(|marked| *marked != slot);
            }
            self.sink.on_marker_removed(agent, slot);
        }

        self.sink.on_card_removed(slot);
        Some(card)
    }

    /// Mark `slot` for `agent`. Only succeeds when the slot holds a card, the
    /// agent has not marked it yet and is still below the group size.
    pub fn place_marker(&mut self, agent: AgentId, slot: Slot) -> bool {
        if self.card_at(slot).is_none() {
            return false;
        }
        let Some(markers) = self.agent_markers.get_mut(agent.index()) else {
            return false;
        };
        if markers.len() >= self.group_size || markers.contains(&slot) {
            return false;
        }

        markers.push(slot);
        self.slot_markers[slot].insert(agent);
        self.sink.on_marker_placed(agent, slot);
        true
    }

    /// Idempotent. Returns whether a marker existed and was removed.
    pub fn remove_marker(&mut self, agent: AgentId, slot: Slot) -> bool {
        let Some(holders) = self.slot_markers.get_mut(slot) else {
            return false;
        };
        if !holders.remove(&agent) {
            return false;
        }
        if let Some(markers) = self.agent_markers.get_mut(agent.index()) {
            markers.retain(|marked| *marked != slot);
        }
        self.sink.on_marker_removed(agent, slot);
        true
    }

    /// Drop every marker `agent` holds. Returns how many were removed.
    pub fn clear_markers(&mut self, agent: AgentId) -> usize {
        let Some(markers) = self.agent_markers.get_mut(agent.index()) else {
            return 0;
        };
        let cleared = std::mem::take(markers);
        for slot in &cleared {
            self.slot_markers[*slot].remove(&agent);
            self.sink.on_marker_removed(agent, *slot);
        }
        cleared.len()
    }

    pub fn count_cards(&self) -> usize {
        self.card_to_slot.len()
    }

    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        self.slot_to_card.get(slot).copied().flatten()
    }

    pub fn slot_of(&self, card: Card) -> Option<Slot> {
        self.card_to_slot.get(&card).copied()
    }

    /// Slots marked by `agent`, in marking order
    pub fn markers_of(&self, agent: AgentId) -> &[Slot] {
        self.agent_markers
            .get(agent.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn marker_count(&self, agent: AgentId) -> usize {
        self.markers_of(agent).len()
    }

    pub fn markers_at(&self, slot: Slot) -> impl Iterator<Item = AgentId> + '_ {
        self.slot_markers.get(slot).into_iter().flatten().copied()
    }

    pub fn occupied_slots(&self) -> impl Iterator<Item = (Slot, Card)> + '_ {
        self.slot_to_card
            .iter()
            .enumerate()
            .filter_map(|(slot, card)| card.map(|card| (slot, card)))
    }

    pub fn empty_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.slot_to_card
            .iter()
            .enumerate()
            .filter(|(_, card)| card.is_none())
            .map(|(slot, _)| slot)
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("slot_to_card", &self.slot_to_card)
            .field("agent_markers", &self.agent_markers)
            .field("group_size", &self.group_size)
            .finish()
    }
}
