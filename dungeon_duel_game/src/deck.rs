// Card dealing: opening hands, replacement draws and the simulated
// opponent's improvised cards.
//
// Opening hands are biased rather than uniform: two cards of each base
// variant plus one random special card, so nobody starts with seven attacks.
// Replacement draws are uniform over every variant. Names come from
// per-category flavour pools.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::card::{Card, CardCategory, CardVariant};

/// Number of copies of each base variant in an opening hand.
const BASIC_COPIES: usize = 2;

const OFFENSIVE_NAMES: [&str; 7] = [
    "Fireball",
    "Ice Arrow",
    "Lightning",
    "Shadow Strike",
    "Piercing Lunge",
    "Thunder Blow",
    "Venom Bite",
];

const DEFENSIVE_NAMES: [&str; 5] = [
    "Iron Shield",
    "Magic Barrier",
    "Dragon Armor",
    "Aegis",
    "Crystal Ward",
];

const RESTORATIVE_NAMES: [&str; 5] = [
    "Healing Potion",
    "Elixir of Life",
    "Health Nectar",
    "Restoring Balm",
    "Divine Mending",
];

/// Names the simulated opponent gives to cards it improvises.
const SHADOW_NAMES: [&str; 6] = [
    "Dark Strike",
    "Shadow Shield",
    "Dark Potion",
    "Ghost Strike",
    "Shadow Barrier",
    "Necrotic Draught",
];

/// Fixed name for each special variant in an opening hand.
fn special_name(variant: CardVariant) -> &'static str {
    match variant {
        CardVariant::DoubleAttack => "Twin Strike",
        CardVariant::SuperShield => "Bulwark",
        CardVariant::UltimateHeal => "Greater Restoration",
        CardVariant::Berserk => "Berserker Rage",
        CardVariant::HolyLight => "Holy Light",
        CardVariant::Backstab => "Backstab",
        CardVariant::Fireball => "Inferno",
        CardVariant::Attack | CardVariant::Defend | CardVariant::Heal => "Relic",
    }
}

fn name_pool(category: CardCategory) -> &'static [&'static str] {
    match category {
        CardCategory::Offensive => &OFFENSIVE_NAMES,
        CardCategory::Defensive => &DEFENSIVE_NAMES,
        CardCategory::Restorative => &RESTORATIVE_NAMES,
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, pool: &'a [&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or("Relic")
}

/// A card of `variant` with a name drawn from its category's pool.
pub fn named_card<R: Rng + ?Sized>(rng: &mut R, variant: CardVariant) -> Card {
    Card::new(variant, pick(rng, name_pool(variant.category())))
}

/// Two of each base variant followed by one special card.
pub fn opening_hand<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut hand = Vec::with_capacity(CardVariant::BASIC.len() * BASIC_COPIES + 1);
    for variant in CardVariant::BASIC {
        for _ in 0..BASIC_COPIES {
            hand.push(named_card(rng, variant));
        }
    }
    if let Some(&special) = CardVariant::SPECIAL.choose(rng) {
        hand.push(Card::new(special, special_name(special)));
    }
    hand
}

/// A uniformly random variant with a category-appropriate name.
pub fn draw_card<R: Rng + ?Sized>(rng: &mut R) -> Card {
    let variant = CardVariant::ALL
        .choose(rng)
        .copied()
        .unwrap_or(CardVariant::Attack);
    named_card(rng, variant)
}

/// A basic card the simulated opponent plays when its hand runs dry.
pub fn improvised_card<R: Rng + ?Sized>(rng: &mut R) -> Card {
    let variant = CardVariant::BASIC
        .choose(rng)
        .copied()
        .unwrap_or(CardVariant::Attack);
    Card::new(variant, pick(rng, &SHADOW_NAMES))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn opening_hand_has_two_of_each_base_and_one_special() {
        for seed in 0..32 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let hand = opening_hand(&mut rng);
            assert_eq!(hand.len(), 7);
            for variant in CardVariant::BASIC {
                let count = hand.iter().filter(|c| c.variant == variant).count();
                assert_eq!(count, 2, "seed {seed}: {variant}");
            }
            assert!(CardVariant::SPECIAL.contains(&hand[6].variant));
        }
    }

    #[test]
    fn names_follow_category() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..64 {
            let card = draw_card(&mut rng);
            let pool = name_pool(card.variant.category());
            assert!(pool.contains(&card.name.as_str()), "{card}");
        }
    }

    #[test]
    fn improvised_cards_are_basic() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..32 {
            let card = improvised_card(&mut rng);
            assert!(CardVariant::BASIC.contains(&card.variant));
            assert!(SHADOW_NAMES.contains(&card.name.as_str()));
        }
    }

    #[test]
    fn dealing_is_seed_deterministic() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        assert_eq!(opening_hand(&mut a), opening_hand(&mut b));
        assert_eq!(draw_card(&mut a), draw_card(&mut b));
    }
}
