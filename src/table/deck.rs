// Deck - the pool of cards not currently on the board

use crate::model::Card;
use rand::Rng;

/// Unordered pool of remaining cards.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Full deck holding cards `0..size`
    pub fn new(size: u32) -> Self {
        Self {
            cards: (0..size).map(Card).collect(),
        }
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Remove and return a uniformly random card. `None` once exhausted.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        if self.cards.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.cards.len());
        Some(self.cards.swap_remove(index))
    }

    pub fn put_back(&mut self, card: Card) {
        debug_assert!(!self.cards.contains(&card), "{card} returned twice");
        self.cards.push(card);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_draw_without_replacement() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut deck = Deck::new(10);

        let mut drawn: Vec<Card> = std::iter::from_fn(|| deck.draw(&mut rng)).collect();
        drawn.sort();

        assert_eq!(drawn, (0..10).map(Card).collect::<Vec<_>>());
        assert!(deck.is_empty());
        assert_eq!(deck.draw(&mut rng), None);
    }

    #[test]
    fn test_same_seed_same_order() {
        let order = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut deck = Deck::new(20);
            std::iter::from_fn(move || deck.draw(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(order(7), order(7));
    }

    #[test]
    fn test_put_back_grows_deck() {
        let mut deck = Deck::from_cards(vec![Card(3)]);
        deck.put_back(Card(9));
        assert_eq!(deck.len(), 2);
        assert!(deck.contains(Card(9)));
    }
}
