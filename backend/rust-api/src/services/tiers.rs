use crate::models::{Generation, PokemonRange, TierId};

pub const DEFAULT_TIER: TierId = 1;

const TIERS: [(TierId, &str, u32, u32); 3] = [
    (1, "Generation I", 1, 151),
    (2, "Generation I-III", 1, 386),
    (3, "All Generations", 1, 1025),
];

/// Difficulty tiers in ascending order.
pub fn all_tiers() -> Vec<Generation> {
    TIERS
        .iter()
        .map(|&(id, name, start, end)| Generation {
            id,
            name: name.to_string(),
            pokemon_range: PokemonRange { start, end },
        })
        .collect()
}

/// Id range for a tier. Unknown or missing tiers fall back to tier 1.
pub fn range_for(tier: Option<TierId>) -> PokemonRange {
    let wanted = tier.unwrap_or(DEFAULT_TIER);
    let (_, _, start, end) = TIERS
        .iter()
        .find(|(id, ..)| *id == wanted)
        .copied()
        .unwrap_or(TIERS[0]);
    PokemonRange { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_three_tiers() {
        let tiers = all_tiers();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].name, "Generation I");
        assert_eq!(tiers[2].pokemon_range, PokemonRange { start: 1, end: 1025 });
    }

    #[test]
    fn unknown_tier_falls_back_to_first() {
        assert_eq!(range_for(Some(2)), PokemonRange { start: 1, end: 386 });
        assert_eq!(range_for(None), PokemonRange { start: 1, end: 151 });
        assert_eq!(range_for(Some(9)), PokemonRange { start: 1, end: 151 });
    }
}
