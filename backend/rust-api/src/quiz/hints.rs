use std::collections::BTreeSet;

use crate::models::{HintCategory, HintValue, Pokemon};

/// Hint categories revealed for the question currently on screen.
#[derive(Debug, Clone, Default)]
pub struct HintTracker {
    revealed: BTreeSet<HintCategory>,
}

impl HintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `category` as revealed. The caller owns the budget and must
    /// decrement it when this returns `true`.
    pub fn reveal(&mut self, category: HintCategory, hints_remaining: u32) -> bool {
        if hints_remaining == 0 {
            return false;
        }
        self.revealed.insert(category)
    }

    pub fn value_for(&self, category: HintCategory, pokemon: &Pokemon) -> Option<HintValue> {
        if !self.revealed.contains(&category) {
            return None;
        }

        match category {
            HintCategory::Types => Some(HintValue::Text(pokemon.types.join(" / "))),
            HintCategory::FirstLetter => pokemon
                .name
                .chars()
                .next()
                .map(|c| HintValue::Text(c.to_string())),
            HintCategory::EvolutionStage => Some(HintValue::NotYetImplemented),
        }
    }

    pub fn is_revealed(&self, category: HintCategory) -> bool {
        self.revealed.contains(&category)
    }

    pub fn revealed(&self) -> Vec<HintCategory> {
        self.revealed.iter().copied().collect()
    }

    pub fn can_reveal_more(&self, hints_remaining: u32) -> bool {
        hints_remaining > 0 && self.revealed.len() < HintCategory::ALL.len()
    }

    pub fn clear(&mut self) {
        self.revealed.clear();
    }
}
