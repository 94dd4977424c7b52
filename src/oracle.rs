// Matching rule collaborator - consumed as a black box

use crate::model::Card;

/// Legality predicate for candidate groups.
///
/// Both calls must be pure. `is_qualifying_group` runs while the board lock is
/// held, so implementations should return quickly.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Oracle: Send + Sync {
    /// Whether exactly these cards form a qualifying group
    fn is_qualifying_group(&self, cards: &[Card]) -> bool;

    /// Whether any qualifying group can still be formed from `pool`
    fn any_qualifying_group_exists(&self, pool: &[Card]) -> bool;
}

/// Stand-in rule: a group qualifies when its card ids sum to a multiple of
/// the group size.
#[derive(Debug, Clone, Copy)]
pub struct ResidueOracle {
    group_size: usize,
}

impl ResidueOracle {
    pub fn new(group_size: usize) -> Self {
        Self {
            group_size: group_size.max(1),
        }
    }
}

impl Oracle for ResidueOracle {
    fn is_qualifying_group(&self, cards: &[Card]) -> bool {
        let sum: u64 = cards.iter().map(|card| u64::from(card.0)).sum();
        cards.len() == self.group_size && sum % self.group_size as u64 == 0
    }

    fn any_qualifying_group_exists(&self, pool: &[Card]) -> bool {
        let g = self.group_size;
        if pool.len() < g {
            return false;
        }

        let mut counts = vec![0usize; g];
        for card in pool {
            counts[card.0 as usize % g] += 1;
        }

        // reachable[k][s]: k cards can be picked with a sum of s modulo g
        let mut reachable = vec![vec![false; g]; g + 1];
        reachable[0][0] = true;
        for (residue, &count) in counts.iter().enumerate() {
            let mut next = reachable.clone();
            for picked in 0..g {
                for sum in 0..g {
                    if !reachable[picked][sum] {
                        continue;
                    }
                    for take in 1..=count.min(g - picked) {
                        next[picked + take][(sum + take * residue) % g] = true;
                    }
                }
            }
            reachable = next;
        }
        reachable[g][0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(ids: &[u32]) -> Vec<Card> {
        ids.iter().copied().map(Card).collect()
    }

    #[test]
    fn test_residue_group() {
        let oracle = ResidueOracle::new(3);
        assert!(oracle.is_qualifying_group(&cards(&[0, 1, 2])));
        assert!(oracle.is_qualifying_group(&cards(&[1, 4, 7])));
        assert!(!oracle.is_qualifying_group(&cards(&[0, 1, 3])));
        assert!(!oracle.is_qualifying_group(&cards(&[0, 3])), "wrong group size");
    }

    #[test]
    fn test_residue_group_exists() {
        let oracle = ResidueOracle::new(3);
        assert!(oracle.any_qualifying_group_exists(&cards(&[5, 9, 0, 1])));
        assert!(!oracle.any_qualifying_group_exists(&cards(&[1, 2, 4, 5])));
        assert!(!oracle.any_qualifying_group_exists(&cards(&[0, 3])));
        assert!(!oracle.any_qualifying_group_exists(&[]));
    }

    #[test]
    fn test_group_exists_agrees_with_brute_force() {
        let oracle = ResidueOracle::new(3);
        for mask in 0u32..(1 << 9) {
            let pool: Vec<Card> = (0..9).filter(|i| mask & (1 << i) != 0).map(Card).collect();
            let mut brute = false;
            for a in 0..pool.len() {
                for b in a + 1..pool.len() {
                    for c in b + 1..pool.len() {
                        brute |= oracle.is_qualifying_group(&[pool[a], pool[b], pool[c]]);
                    }
                }
            }
            assert_eq!(oracle.any_qualifying_group_exists(&pool), brute, "pool {pool:?}");
        }
    }
}
