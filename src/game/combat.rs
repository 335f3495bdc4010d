//! Combat system for MTG
//!
//! Handles declaring attackers, declaring blockers, and combat damage

use crate::core::{CardId, CardInstance, Keyword, PlayerId, TargetRef, TriggerEvent};
use crate::game::replacement::Capability;
use crate::game::triggers::TriggerOccurrence;
use crate::game::{GameState, Step};
use crate::{MtgError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One attacking creature and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub attacker: CardId,
    pub defender: PlayerId,
    /// Blockers in damage assignment order
    pub blockers: SmallVec<[CardId; 2]>,
    /// Stays true after its blockers leave combat
    pub blocked: bool,
}

/// Combat state for the current combat phase
///
/// Attacks are kept in declaration order so damage is dealt
/// deterministically. It's reset at the end of the turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatState {
    pub attackers_declared: bool,
    /// Defending players who have declared blockers
    pub blockers_declared: Vec<PlayerId>,
    pub attacks: Vec<Attack>,
}

impl CombatState {
    pub fn is_attacking(&self, card: CardId) -> bool {
        self.attacks.iter().any(|a| a.attacker == card)
    }

    pub fn is_blocking(&self, card: CardId) -> bool {
        self.attacks.iter().any(|a| a.blockers.contains(&card))
    }

    pub fn attack(&self, attacker: CardId) -> Option<&Attack> {
        self.attacks.iter().find(|a| a.attacker == attacker)
    }

    /// Take a creature out of combat
    pub fn remove(mut self, card: CardId) -> Self {
        self.attacks.retain(|a| a.attacker != card);
        for attack in &mut self.attacks {
            attack.blockers.retain(|b| *b != card);
        }
        self
    }
}

/// Can this creature deal damage in the given damage step?
fn deals_damage_in(card: &CardInstance, first_strike_step: bool) -> bool {
    let double = card.has_keyword(&Keyword::DoubleStrike);
    let first = card.has_keyword(&Keyword::FirstStrike);
    if first_strike_step {
        first || double
    } else {
        !first || double
    }
}

impl GameState {
    pub(crate) fn do_declare_attackers(
        &mut self,
        player: PlayerId,
        attacks: &[(CardId, PlayerId)],
    ) -> Result<String> {
        self.require_priority(player)?;
        if self.turn.step != Step::DeclareAttackers {
            return Err(MtgError::invalid(format!(
                "Attackers are declared in the declare attackers step, not the {}",
                self.turn.step
            )));
        }
        if !self.is_active_player(player) {
            return Err(MtgError::invalid("Only the active player declares attackers"));
        }
        if self.combat.attackers_declared {
            return Err(MtgError::invalid("Attackers have already been declared this combat"));
        }

        for (i, (attacker, defender)) in attacks.iter().enumerate() {
            if attacks[..i].iter().any(|(a, _)| a == attacker) {
                return Err(MtgError::invalid("A creature can only attack once"));
            }
            self.check_attacker(player, *attacker)?;
            if *defender == player || self.player(*defender)?.has_lost {
                return Err(MtgError::invalid(
                    "Attacks must be aimed at an opponent still in the game",
                ));
            }
        }

        let mut names = Vec::new();
        for (attacker, defender) in attacks {
            let instance = self.card(*attacker)?;
            names.push(instance.card_name().to_string());
            if !instance.has_keyword(&Keyword::Vigilance) {
                self.cards.update(*attacker, |c| c.tap())?;
            }
            self.combat.attacks.push(Attack {
                attacker: *attacker,
                defender: *defender,
                blockers: SmallVec::new(),
                blocked: false,
            });
            let occurrence = TriggerOccurrence::card_event(self, TriggerEvent::Attacks, *attacker)?;
            self.queue_triggers(occurrence);
        }
        self.combat.attackers_declared = true;

        let name = &self.player(player)?.name;
        if names.is_empty() {
            Ok(format!("{name} declares no attackers"))
        } else {
            Ok(format!("{name} attacks with {}", names.join(", ")))
        }
    }

    fn check_attacker(&self, player: PlayerId, attacker: CardId) -> Result<()> {
        if !self.is_on_battlefield(attacker) {
            return Err(MtgError::invalid("Attackers must be on the battlefield"));
        }
        let card = self.card(attacker)?;
        let name = card.card_name();
        if card.controller != player || !card.is_creature() {
            return Err(MtgError::invalid(format!("{name} can't attack for that player")));
        }
        if card.tapped {
            return Err(MtgError::invalid(format!("{name} is tapped")));
        }
        if card.has_keyword(&Keyword::Defender) {
            return Err(MtgError::invalid(format!("{name} has defender")));
        }
        if card.summoning_sick
            && !card.has_keyword(&Keyword::Haste)
            && !self
                .effects
                .has_capability(player, Capability::IgnoreSummoningSickness, self)
        {
            return Err(MtgError::invalid(format!("{name} has summoning sickness")));
        }
        Ok(())
    }

    pub(crate) fn do_declare_blockers(
        &mut self,
        player: PlayerId,
        blocks: &[(CardId, CardId)],
    ) -> Result<String> {
        self.require_priority(player)?;
        if self.turn.step != Step::DeclareBlockers {
            return Err(MtgError::invalid(format!(
                "Blockers are declared in the declare blockers step, not the {}",
                self.turn.step
            )));
        }
        if !self.combat.attacks.iter().any(|a| a.defender == player) {
            return Err(MtgError::invalid("That player is not being attacked"));
        }
        if self.combat.blockers_declared.contains(&player) {
            return Err(MtgError::invalid("Blockers have already been declared"));
        }

        for (i, (blocker, attacker)) in blocks.iter().enumerate() {
            if blocks[..i].iter().any(|(b, _)| b == blocker) {
                return Err(MtgError::invalid("A creature can only block one attacker"));
            }
            self.check_block(player, *blocker, *attacker)?;
        }

        let mut combat = self.combat.clone();
        for (blocker, attacker) in blocks {
            if let Some(attack) = combat.attacks.iter_mut().find(|a| a.attacker == *attacker) {
                attack.blockers.push(*blocker);
                attack.blocked = true;
            }
        }
        let menace_violation = combat.attacks.iter().find(|a| {
            a.blockers.len() == 1
                && self
                    .card(a.attacker)
                    .map(|c| c.has_keyword(&Keyword::Menace))
                    .unwrap_or(false)
        });
        if let Some(attack) = menace_violation {
            let name = self.card(attack.attacker)?.card_name().to_string();
            return Err(MtgError::invalid(format!(
                "{name} has menace and can't be blocked by just one creature"
            )));
        }
        combat.blockers_declared.push(player);
        self.combat = combat;

        let name = &self.player(player)?.name;
        Ok(format!("{name} declares {} blocker(s)", blocks.len()))
    }

    fn check_block(&self, player: PlayerId, blocker: CardId, attacker: CardId) -> Result<()> {
        if !self.is_on_battlefield(blocker) {
            return Err(MtgError::invalid("Blockers must be on the battlefield"));
        }
        let card = self.card(blocker)?;
        let name = card.card_name();
        if card.controller != player || !card.is_creature() {
            return Err(MtgError::invalid(format!("{name} can't block for that player")));
        }
        if card.tapped {
            return Err(MtgError::invalid(format!("{name} is tapped")));
        }
        match self.combat.attack(attacker) {
            Some(attack) if attack.defender == player => {}
            _ => return Err(MtgError::invalid("That creature is not attacking you")),
        }
        let attacking = self.card(attacker)?;
        if attacking.has_keyword(&Keyword::Flying)
            && !card.has_keyword(&Keyword::Flying)
            && !card.has_keyword(&Keyword::Reach)
        {
            return Err(MtgError::invalid(format!(
                "{name} can't block {}, which has flying",
                attacking.card_name()
            )));
        }
        Ok(())
    }

    /// Deal combat damage for one of the two damage steps
    ///
    /// All assignments are worked out first and then dealt, so creatures
    /// killed in this step still deal their damage.
    pub(crate) fn combat_damage_step(&mut self, first_strike_step: bool) -> Result<()> {
        let mut assignments: Vec<(CardId, TargetRef, u32)> = Vec::new();

        for attack in &self.combat.attacks {
            if !self.is_on_battlefield(attack.attacker) {
                continue;
            }
            let attacker = self.card(attack.attacker)?;
            if deals_damage_in(attacker, first_strike_step) {
                assignments.extend(self.assign_attacker_damage(attacker, attack)?);
            }
            for blocker in &attack.blockers {
                let card = self.card(*blocker)?;
                if self.is_on_battlefield(*blocker)
                    && deals_damage_in(card, first_strike_step)
                    && card.power() > 0
                {
                    let damage = card.power() as u32;
                    assignments.push((*blocker, TargetRef::Card(attack.attacker), damage));
                }
            }
        }

        for (source, target, amount) in assignments {
            self.deal_damage(Some(source), target, amount, true)?;
        }
        Ok(())
    }

    /// Split an attacker's damage among its blockers in order
    ///
    /// Each blocker must be assigned lethal damage before the next one gets
    /// any; with trample the rest goes to the defending player.
    fn assign_attacker_damage(
        &self,
        attacker: &CardInstance,
        attack: &Attack,
    ) -> Result<Vec<(CardId, TargetRef, u32)>> {
        let power = attacker.power();
        if power <= 0 {
            return Ok(Vec::new());
        }
        let mut remaining = power as u32;
        let source = attacker.id;
        let trample = attacker.has_keyword(&Keyword::Trample);
        let defender = TargetRef::Player(attack.defender);

        if !attack.blocked {
            return Ok(vec![(source, defender, remaining)]);
        }

        let blockers: Vec<CardId> = attack
            .blockers
            .iter()
            .copied()
            .filter(|b| self.is_on_battlefield(*b))
            .collect();
        if blockers.is_empty() {
            return Ok(if trample {
                vec![(source, defender, remaining)]
            } else {
                Vec::new()
            });
        }

        let deathtouch = attacker.has_keyword(&Keyword::Deathtouch);
        let mut assignments = Vec::new();
        for (i, blocker) in blockers.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let card = self.card(*blocker)?;
            let lethal = if deathtouch {
                1
            } else {
                (card.toughness() - card.damage as i32).max(0) as u32
            };
            let is_last = i + 1 == blockers.len();
            let amount = if is_last && !trample {
                remaining
            } else {
                lethal.min(remaining)
            };
            if amount > 0 {
                assignments.push((source, TargetRef::Card(*blocker), amount));
            }
            remaining -= amount;
        }
        if remaining > 0 && trample {
            assignments.push((source, defender, remaining));
        }
        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardDefinition, CardFace, ManaCost, PtValue, TypeLine};
    use crate::game::GameStatus;
    use crate::zones::Zone;
    use crate::GameConfig;
    use std::sync::Arc;

    fn creature(power: i32, toughness: i32, keywords: &[Keyword]) -> Arc<CardDefinition> {
        let mut face = CardFace::new(
            "Soldier",
            TypeLine::parse("Creature — Soldier").unwrap(),
            ManaCost::generic(2),
        );
        face.power = Some(PtValue::Fixed(power));
        face.toughness = Some(PtValue::Fixed(toughness));
        face.abilities.keywords = keywords.to_vec();
        Arc::new(CardDefinition::single(face))
    }

    fn combat_game() -> GameState {
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default());
        game.status = GameStatus::InProgress;
        game.turn.step = Step::DeclareAttackers;
        game.priority_player = Some(game.players[0].id);
        game
    }

    fn ready(game: &mut GameState, owner: PlayerId, def: Arc<CardDefinition>) -> CardId {
        let id = game.create_card(def, owner, Zone::Battlefield).unwrap();
        game.cards
            .update(id, |mut c| {
                c.summoning_sick = false;
                c
            })
            .unwrap();
        id
    }

    #[test]
    fn test_remove_from_combat() {
        let attacker = CardId::new(1);
        let blocker = CardId::new(2);
        let combat = CombatState {
            attackers_declared: true,
            blockers_declared: vec![],
            attacks: vec![Attack {
                attacker,
                defender: PlayerId::new(9),
                blockers: SmallVec::from_slice(&[blocker]),
                blocked: true,
            }],
        };
        assert!(combat.is_blocking(blocker));

        let combat = combat.remove(blocker);
        assert!(!combat.is_blocking(blocker));
        assert!(combat.attack(attacker).unwrap().blocked);

        let combat = combat.remove(attacker);
        assert!(!combat.is_attacking(attacker));
    }

    #[test]
    fn test_declare_attackers_taps_without_vigilance() {
        let mut game = combat_game();
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        let bear = ready(&mut game, alice, creature(2, 2, &[]));
        let knight = ready(&mut game, alice, creature(2, 2, &[Keyword::Vigilance]));

        game.do_declare_attackers(alice, &[(bear, bob), (knight, bob)])
            .unwrap();
        assert!(game.card(bear).unwrap().tapped);
        assert!(!game.card(knight).unwrap().tapped);
        assert!(game.combat.is_attacking(bear));
        assert!(game.do_declare_attackers(alice, &[]).is_err());
    }

    #[test]
    fn test_summoning_sick_and_defender_cannot_attack() {
        let mut game = combat_game();
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        let fresh = game
            .create_card(creature(2, 2, &[]), alice, Zone::Battlefield)
            .unwrap();
        let wall = ready(&mut game, alice, creature(0, 4, &[Keyword::Defender]));

        assert!(game.do_declare_attackers(alice, &[(fresh, bob)]).is_err());
        assert!(game.do_declare_attackers(alice, &[(wall, bob)]).is_err());
    }

    #[test]
    fn test_flying_needs_flying_or_reach_to_block() {
        let mut game = combat_game();
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        let bird = ready(&mut game, alice, creature(1, 1, &[Keyword::Flying]));
        let bear = ready(&mut game, bob, creature(2, 2, &[]));
        let spider = ready(&mut game, bob, creature(1, 3, &[Keyword::Reach]));
        game.do_declare_attackers(alice, &[(bird, bob)]).unwrap();

        game.turn.step = Step::DeclareBlockers;
        game.priority_player = Some(bob);
        assert!(game.do_declare_blockers(bob, &[(bear, bird)]).is_err());
        game.do_declare_blockers(bob, &[(spider, bird)]).unwrap();
        assert!(game.combat.attack(bird).unwrap().blocked);
    }

    #[test]
    fn test_menace_needs_two_blockers() {
        let mut game = combat_game();
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        let brute = ready(&mut game, alice, creature(3, 3, &[Keyword::Menace]));
        let a = ready(&mut game, bob, creature(1, 1, &[]));
        let b = ready(&mut game, bob, creature(1, 1, &[]));
        game.do_declare_attackers(alice, &[(brute, bob)]).unwrap();

        game.turn.step = Step::DeclareBlockers;
        game.priority_player = Some(bob);
        assert!(game.do_declare_blockers(bob, &[(a, brute)]).is_err());
        game.do_declare_blockers(bob, &[(a, brute), (b, brute)]).unwrap();
    }

    #[test]
    fn test_unblocked_damage_and_trample() {
        let mut game = combat_game();
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        let bear = ready(&mut game, alice, creature(2, 2, &[]));
        let rhino = ready(&mut game, alice, creature(4, 4, &[Keyword::Trample]));
        let wall = ready(&mut game, bob, creature(0, 3, &[]));
        game.do_declare_attackers(alice, &[(bear, bob), (rhino, bob)])
            .unwrap();
        game.turn.step = Step::DeclareBlockers;
        game.priority_player = Some(bob);
        game.do_declare_blockers(bob, &[(wall, rhino)]).unwrap();

        game.combat_damage_step(true).unwrap();
        assert_eq!(game.player(bob).unwrap().life, 20);

        game.combat_damage_step(false).unwrap();
        // 2 from the bear, 1 trampling over the wall
        assert_eq!(game.player(bob).unwrap().life, 17);
        assert_eq!(game.card(wall).unwrap().damage, 3);
    }

    #[test]
    fn test_first_strike_kills_before_regular_damage() {
        let mut game = combat_game();
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        let duelist = ready(&mut game, alice, creature(2, 1, &[Keyword::FirstStrike]));
        let bear = ready(&mut game, bob, creature(2, 2, &[]));
        game.do_declare_attackers(alice, &[(duelist, bob)]).unwrap();
        game.turn.step = Step::DeclareBlockers;
        game.priority_player = Some(bob);
        game.do_declare_blockers(bob, &[(bear, duelist)]).unwrap();

        game.combat_damage_step(true).unwrap();
        game.check_state_based_actions().unwrap();
        assert!(!game.is_on_battlefield(bear));

        game.combat_damage_step(false).unwrap();
        assert_eq!(game.card(duelist).unwrap().damage, 0);
    }
}
