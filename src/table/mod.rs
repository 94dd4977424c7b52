// Table - the board and the deck behind a single lock
//
// The deck is only reachable through `Table`, so every deck mutation happens
// with the board lock held.

pub mod board;
pub mod deck;

pub use board::{Board, BoardError};
pub use deck::Deck;

use crate::model::{Card, Slot};
use crate::sink::Sink;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The only resource shared by every task.
pub type SharedTable = Arc<Mutex<Table>>;

#[derive(Debug)]
pub struct Table {
    pub board: Board,
    pub deck: Deck,
    consumed: Vec<Card>,
}

impl Table {
    pub fn new(
        slots: usize,
        group_size: usize,
        deck_size: u32,
        agents: usize,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            board: Board::new(slots, group_size, agents, sink),
            deck: Deck::new(deck_size),
            consumed: Vec::new(),
        }
    }

    pub fn with_deck(board: Board, deck: Deck) -> Self {
        Self {
            board,
            deck,
            consumed: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedTable {
        Arc::new(Mutex::new(self))
    }

    /// Fill every empty slot from the deck, but only when the board is empty.
    /// Returns the number of cards placed.
    pub fn populate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        if self.board.count_cards() != 0 {
            return 0;
        }
        let empty: Vec<Slot> = self.board.empty_slots().collect();
        let mut placed = 0;
        for slot in empty {
            let Some(card) = self.deck.draw(rng) else {
                break;
            };
            if self.board.place_card(card, slot).is_ok() {
                placed += 1;
            }
        }
        placed
    }

    /// Retire the card on `slot` permanently and refill the slot from the
    /// deck. The slot stays empty once the deck is exhausted.
    pub fn replace_card<R: Rng + ?Sized>(&mut self, slot: Slot, rng: &mut R) -> Option<Card> {
        let removed = self.board.remove_card(slot)?;
        self.consumed.push(removed);
        if let Some(card) = self.deck.draw(rng) {
            if let Err(e) = self.board.place_card(card, slot) {
                tracing::warn!(error = %e, "Replacement placement failed, returning card to deck");
                self.deck.put_back(card);
            }
        }
        Some(removed)
    }

    /// Move every card on the board back into the deck. Markers go with them.
    pub fn return_all_to_deck(&mut self) -> usize {
        let occupied: Vec<Slot> = self.board.occupied_slots().map(|(slot, _)| slot).collect();
        let mut returned = 0;
        for slot in occupied {
            if let Some(card) = self.board.remove_card(slot) {
                self.deck.put_back(card);
                returned += 1;
            }
        }
        for agent in 0..self.board.agents() {
            self.board.clear_markers(crate::model::AgentId(agent));
        }
        returned
    }

    pub fn consumed(&self) -> &[Card] {
        &self.consumed
    }

    /// Cards on the board + in the deck + permanently removed
    pub fn total_cards(&self) -> usize {
        self.board.count_cards() + self.deck.len() + self.consumed.len()
    }
}
