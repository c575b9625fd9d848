//! Islands and ring migration.

use log::debug;

use crate::schema::{Candidate, IslandParams, IslandSummary, Provenance, SearchConfig};
use crate::search::population::Population;

/// One independently evolving sub-population.
#[derive(Debug, Clone)]
pub struct Island {
    pub id: usize,
    pub params: IslandParams,
    pub population: Population,
}

/// Owns all islands. Islands never share candidates; migration clones.
pub struct IslandManager {
    islands: Vec<Island>,
}

impl IslandManager {
    pub fn from_config(config: &SearchConfig) -> Self {
        let islands = (0..config.num_islands)
            .map(|id| Island {
                id,
                params: config.island_params(id),
                population: Population::new(config.population_size),
            })
            .collect();
        Self { islands }
    }

    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// Panics on an out-of-range id: migration or admission addressed a
    /// non-existent island, which is an orchestrator bug.
    pub fn island(&self, id: usize) -> &Island {
        &self.islands[id]
    }

    pub fn island_mut(&mut self, id: usize) -> &mut Island {
        &mut self.islands[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Island> {
        self.islands.iter()
    }

    pub fn summaries(&self) -> Vec<IslandSummary> {
        self.islands.iter().map(|i| i.population.summary()).collect()
    }

    /// Best candidate across all islands.
    pub fn best(&self) -> Option<&Candidate> {
        self.islands
            .iter()
            .filter_map(|i| i.population.best())
            .min_by(|a, b| crate::search::population::rank_cmp(a, b))
    }

    /// Ring migration: each island offers clones of its top `size` members
    /// to the next island. Clones get fresh identities with the original as
    /// parent; sources keep their members. Returns how many clones were
    /// admitted.
    pub fn migrate(&mut self, size: usize, next_id: &mut impl FnMut() -> u64) -> usize {
        let n = self.islands.len();
        if n < 2 || size == 0 {
            return 0;
        }
        // Snapshot donors first so migration sees pre-migration populations.
        let mut offers: Vec<(usize, Vec<Candidate>)> = Vec::with_capacity(n);
        for (i, island) in self.islands.iter().enumerate() {
            let clones = island
                .population
                .top_k(size)
                .into_iter()
                .cloned()
                .collect();
            offers.push(((i + 1) % n, clones));
        }
        let mut admitted = 0;
        for (target, clones) in offers {
            for original in clones {
                let parent = original.id;
                let mut migrant = original;
                migrant.id = next_id();
                migrant.parent = Some(parent);
                migrant.island = target;
                migrant.provenance = Provenance::Migrated;
                if self.islands[target].population.add(migrant) {
                    admitted += 1;
                }
            }
        }
        debug!("migration admitted {admitted} clones across {n} islands");
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Provenance, ScoreOrFailure};

    fn manager(num_islands: usize, population_size: usize) -> IslandManager {
        IslandManager::from_config(&SearchConfig {
            num_islands,
            population_size,
            ..SearchConfig::default()
        })
    }

    fn scored(id: u64, island: usize, cheap: f64) -> Candidate {
        let mut candidate =
            Candidate::new(id, format!("src {id}"), 0, island, None, Provenance::Generated);
        candidate.cheap = Some(ScoreOrFailure::Score(cheap));
        candidate
    }

    #[test]
    fn test_ring_migration_clones_from_previous_island() {
        let mut manager = manager(3, 4);
        for island in 0..3 {
            let base = island as u64 * 10;
            manager
                .island_mut(island)
                .population
                .add(scored(base + 1, island, island as f64 + 1.0));
        }
        let mut next = 100u64;
        let admitted = manager.migrate(1, &mut || {
            next += 1;
            next
        });
        assert_eq!(admitted, 3);
        for island in 0..3 {
            let members = manager.island(island).population.members();
            assert_eq!(members.len(), 2);
            let migrant = members
                .iter()
                .find(|c| c.provenance == Provenance::Migrated)
                .unwrap();
            // Clone of the previous island's top member in ring order.
            let source = (island + 2) % 3;
            assert_eq!(migrant.parent, Some(source as u64 * 10 + 1));
            assert_eq!(migrant.island, island);
            // Originals stayed put.
            assert!(members
                .iter()
                .any(|c| c.provenance == Provenance::Generated));
        }
    }

    #[test]
    fn test_single_island_never_migrates() {
        let mut manager = manager(1, 2);
        manager.island_mut(0).population.add(scored(1, 0, 1.0));
        assert_eq!(manager.migrate(1, &mut || 99), 0);
    }

    #[test]
    fn test_best_spans_islands() {
        let mut manager = manager(2, 2);
        manager.island_mut(0).population.add(scored(1, 0, 1.0));
        manager.island_mut(1).population.add(scored(2, 1, 5.0));
        assert_eq!(manager.best().map(|c| c.id), Some(2));
    }
}
