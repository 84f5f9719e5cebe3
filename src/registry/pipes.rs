//! Pipe → farm lookup built from the registry.

use super::farm::FarmRecord;
use crate::stats::DuplicatePipe;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct PipeRegistry {
    owner: HashMap<String, String>,
    duplicates: Vec<DuplicatePipe>,
}

impl PipeRegistry {
    /// Builds the inverse index. When a pipe appears under several farms the
    /// first farm in registry order keeps it and the rest are recorded.
    pub fn build(farms: &[FarmRecord]) -> Self {
        let mut registry = PipeRegistry::default();

        for farm in farms {
            for pipe_id in &farm.pipe_ids {
                match registry.owner.get(pipe_id) {
                    Some(kept) if kept != &farm.farm_id => {
                        warn!(
                            pipe_id = %pipe_id,
                            kept_farm = %kept,
                            dropped_farm = %farm.farm_id,
                            "Pipe assigned to more than one farm"
                        );
                        registry.duplicates.push(DuplicatePipe {
                            pipe_id: pipe_id.clone(),
                            kept_farm: kept.clone(),
                            dropped_farm: farm.farm_id.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        registry.owner.insert(pipe_id.clone(), farm.farm_id.clone());
                    }
                }
            }
        }

        registry
    }

    pub fn owner_of(&self, pipe_id: &str) -> Option<&str> {
        self.owner.get(pipe_id).map(String::as_str)
    }

    pub fn contains(&self, pipe_id: &str) -> bool {
        self.owner.contains_key(pipe_id)
    }

    /// The farm's pipes that it actually owns, in registry order.
    pub fn owned_pipes<'a>(&'a self, farm: &'a FarmRecord) -> impl Iterator<Item = &'a str> + 'a {
        farm.pipe_ids
            .iter()
            .map(String::as_str)
            .filter(move |p| self.owner_of(p) == Some(farm.farm_id.as_str()))
    }

    pub fn duplicates(&self) -> &[DuplicatePipe] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.owner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::farm::tests::farm;

    #[test]
    fn test_first_farm_wins() {
        let farms = vec![
            farm("F1", &["P1", "P2"]),
            farm("F2", &["P2", "P3"]),
        ];
        let registry = PipeRegistry::build(&farms);

        assert_eq!(registry.owner_of("P2"), Some("F1"));
        assert_eq!(registry.owner_of("P3"), Some("F2"));
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.duplicates(),
            &[DuplicatePipe {
                pipe_id: "P2".into(),
                kept_farm: "F1".into(),
                dropped_farm: "F2".into(),
            }]
        );

        let f2_pipes: Vec<&str> = registry.owned_pipes(&farms[1]).collect();
        assert_eq!(f2_pipes, vec!["P3"]);
    }

    #[test]
    fn test_unknown_pipe() {
        let registry = PipeRegistry::build(&[farm("F1", &["P1"])]);
        assert!(!registry.contains("P9"));
        assert_eq!(registry.owner_of("P9"), None);
    }
}
