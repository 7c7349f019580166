// Card effect resolution: one exhaustive `match` over `CardVariant`.
//
// `resolve` is the only code that mutates combatant health and shield. It is
// a pure synchronous computation over the two combatants; it never touches
// turn order, the hand, or victory detection (those belong to
// `MatchState::play_card`).
//
// All magnitudes are scaled by the *actor's* archetype before use. Every
// damage source except berserk's self-inflicted damage goes through
// `Combatant::take_damage`, so shield absorption is applied uniformly.

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardVariant};
use crate::combatant::Combatant;

/// Self-inflicted damage from a berserk card. Bypasses shield.
pub const BERSERK_SELF_DAMAGE: u32 = 2;

/// Flat shield bonus granted by holy light on top of its heal.
pub const HOLY_LIGHT_SHIELD: u32 = 2;

/// Numbers describing what a card did, for logs and action descriptions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSummary {
    /// Damage aimed at the opponent, after multipliers, before shield.
    pub damage: u32,
    /// Health the opponent actually lost.
    pub opponent_health_lost: u32,
    /// Shield the opponent lost to backstab's halving.
    pub shield_broken: u32,
    pub shield_gained: u32,
    pub healed: u32,
    pub self_damage: u32,
}

/// Apply `card`'s effect. `actor` played it; `target` is the opponent.
pub fn resolve(card: &Card, actor: &mut Combatant, target: &mut Combatant) -> EffectSummary {
    let magnitude = f64::from(card.magnitude);
    let mut summary = EffectSummary::default();

    let profile = actor.archetype.clone();

    match card.variant {
        CardVariant::Attack | CardVariant::Fireball => {
            strike(&mut summary, target, profile.scale_attack(magnitude));
        }
        CardVariant::Defend => {
            shield(&mut summary, actor, profile.scale_defense(magnitude));
        }
        CardVariant::Heal => {
            heal(&mut summary, actor, profile.scale_heal(magnitude));
        }
        CardVariant::DoubleAttack => {
            strike(&mut summary, target, profile.scale_attack(magnitude));
            strike(&mut summary, target, profile.scale_attack(magnitude / 2.0));
        }
        CardVariant::SuperShield => {
            shield(&mut summary, actor, profile.scale_defense(magnitude * 2.0));
        }
        CardVariant::UltimateHeal => {
            heal(&mut summary, actor, profile.scale_heal(magnitude * 2.0));
        }
        CardVariant::Berserk => {
            strike(&mut summary, target, profile.scale_attack(magnitude * 2.0));
            // Resolved on the actor last.
            summary.self_damage = actor.lose_health(BERSERK_SELF_DAMAGE);
        }
        CardVariant::HolyLight => {
            heal(&mut summary, actor, profile.scale_heal(magnitude));
            shield(&mut summary, actor, HOLY_LIGHT_SHIELD);
        }
        CardVariant::Backstab => {
            let before = target.shield();
            target.set_shield(before / 2);
            summary.shield_broken = before - target.shield();
            strike(&mut summary, target, profile.scale_attack(magnitude));
        }
    }

    summary
}

fn strike(summary: &mut EffectSummary, target: &mut Combatant, damage: u32) {
    summary.damage += damage;
    summary.opponent_health_lost += target.take_damage(damage);
}

fn shield(summary: &mut EffectSummary, actor: &mut Combatant, amount: u32) {
    actor.add_shield(amount);
    summary.shield_gained += amount;
}

fn heal(summary: &mut EffectSummary, actor: &mut Combatant, amount: u32) {
    summary.healed += actor.heal(amount);
}

/// One-line, human-readable account of a resolved card.
pub fn describe(actor: &Combatant, card: &Card, summary: &EffectSummary) -> String {
    let who = format!("{} ({})", actor.name, actor.archetype.name);
    match card.variant {
        CardVariant::Attack => format!("{who} attacks with {}: {} damage.", card.name, summary.damage),
        CardVariant::Fireball => format!("{who} hurls {}: {} damage.", card.name, summary.damage),
        CardVariant::DoubleAttack => {
            format!("{who} strikes twice with {}: {} damage.", card.name, summary.damage)
        }
        CardVariant::Backstab => format!(
            "{who} backstabs with {}, breaking {} shield: {} damage.",
            card.name, summary.shield_broken, summary.damage
        ),
        CardVariant::Berserk => format!(
            "{who} flies into a rage with {}: {} damage, {} to self.",
            card.name, summary.damage, summary.self_damage
        ),
        CardVariant::Defend | CardVariant::SuperShield => {
            format!("{who} raises {}: +{} shield.", card.name, summary.shield_gained)
        }
        CardVariant::Heal | CardVariant::UltimateHeal => {
            format!("{who} uses {}: +{} health.", card.name, summary.healed)
        }
        CardVariant::HolyLight => format!(
            "{who} calls {}: +{} health, +{} shield.",
            card.name, summary.healed, summary.shield_gained
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;

    fn pair(health: u32) -> (Combatant, Combatant) {
        (
            Combatant::new("A", Archetype::balanced(health)),
            Combatant::new("B", Archetype::balanced(health)),
        )
    }

    fn card(variant: CardVariant) -> Card {
        Card::new(variant, "Test")
    }

    #[test]
    fn attack_hits_opponent() {
        let (mut a, mut b) = pair(10);
        let s = resolve(&card(CardVariant::Attack), &mut a, &mut b);
        assert_eq!(b.health(), 8);
        assert_eq!(s.damage, 2);
        assert_eq!(s.opponent_health_lost, 2);
        assert_eq!(a.health(), 10);
    }

    #[test]
    fn attack_uses_actor_multiplier() {
        let mut rogue = Combatant::new("R", Archetype::rogue());
        let mut target = Combatant::new("T", Archetype::balanced(30));
        // 2 * 1.8 = 3.6 -> 4
        resolve(&card(CardVariant::Attack), &mut rogue, &mut target);
        assert_eq!(target.health(), 26);
    }

    #[test]
    fn defend_and_super_shield() {
        let (mut a, mut b) = pair(10);
        resolve(&card(CardVariant::Defend), &mut a, &mut b);
        assert_eq!(a.shield(), 1);
        resolve(&card(CardVariant::SuperShield), &mut a, &mut b);
        assert_eq!(a.shield(), 7);
        assert_eq!(b.shield(), 0);
    }

    #[test]
    fn heal_and_ultimate_heal_cap_at_max() {
        let (a, mut b) = pair(20);
        let mut a = a.with_health(10);
        resolve(&card(CardVariant::Heal), &mut a, &mut b);
        assert_eq!(a.health(), 11);
        resolve(&card(CardVariant::UltimateHeal), &mut a, &mut b);
        assert_eq!(a.health(), 17);
        let s = resolve(&card(CardVariant::UltimateHeal), &mut a, &mut b);
        assert_eq!(a.health(), 20);
        assert_eq!(s.healed, 3);
    }

    #[test]
    fn double_attack_hits_full_then_half() {
        let (mut a, mut b) = pair(20);
        // 3 then round(1.5) = 2
        let s = resolve(&card(CardVariant::DoubleAttack), &mut a, &mut b);
        assert_eq!(s.damage, 5);
        assert_eq!(b.health(), 15);
    }

    #[test]
    fn double_attack_absorbs_each_hit() {
        let (mut a, b) = pair(20);
        let mut b = b.with_shield(4);
        resolve(&card(CardVariant::DoubleAttack), &mut a, &mut b);
        // 3 absorbed (shield 1), then 2 -> 1 absorbed, 1 to health.
        assert_eq!(b.shield(), 0);
        assert_eq!(b.health(), 19);
    }

    #[test]
    fn berserk_self_damage_bypasses_shield() {
        let (a, mut b) = pair(20);
        let mut a = a.with_shield(10);
        let s = resolve(&card(CardVariant::Berserk), &mut a, &mut b);
        assert_eq!(b.health(), 12);
        assert_eq!(a.health(), 18);
        assert_eq!(a.shield(), 10);
        assert_eq!(s.self_damage, 2);
    }

    #[test]
    fn holy_light_heals_and_shields() {
        let (a, mut b) = pair(20);
        let mut a = a.with_health(10);
        resolve(&card(CardVariant::HolyLight), &mut a, &mut b);
        assert_eq!(a.health(), 13);
        assert_eq!(a.shield(), HOLY_LIGHT_SHIELD);
    }

    #[test]
    fn backstab_halves_shield_before_damage() {
        let (mut a, b) = pair(20);
        let mut b = b.with_shield(7);
        let s = resolve(&card(CardVariant::Backstab), &mut a, &mut b);
        // shield 7 -> 3, then 5 damage: 3 absorbed, 2 to health.
        assert_eq!(s.shield_broken, 4);
        assert_eq!(b.shield(), 0);
        assert_eq!(b.health(), 18);
    }

    #[test]
    fn fireball_is_a_plain_attack() {
        let (mut a, mut b) = pair(20);
        resolve(&card(CardVariant::Fireball), &mut a, &mut b);
        assert_eq!(b.health(), 16);
    }

    #[test]
    fn description_names_actor_and_amount() {
        let (mut a, mut b) = pair(10);
        let c = card(CardVariant::Attack);
        let s = resolve(&c, &mut a, &mut b);
        let text = describe(&a, &c, &s);
        assert!(text.contains("A (Adventurer)"), "{text}");
        assert!(text.contains("2 damage"), "{text}");
    }
}
