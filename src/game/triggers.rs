//! Triggered abilities
//!
//! Whenever something happens, every permanent on the battlefield is
//! scanned for triggered abilities listening for it. Matches wait in
//! `pending_triggers` until the next time a player would receive priority,
//! then go on the stack in APNAP order. Targets are chosen on resolution.

use crate::core::{CardId, EffectDescriptor, PlayerId, TriggerEvent, TriggerSubject};
use crate::game::stack::{StackObject, StackObjectKind};
use crate::game::{GameState, Step};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Something that happened, with the facts trigger conditions look at
///
/// Card facts are captured when the event happens so a creature that died
/// can still be matched against "whenever a creature you control dies".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOccurrence {
    pub event: TriggerEvent,
    pub card: Option<CardId>,
    pub player: Option<PlayerId>,
    pub is_creature: bool,
    pub controller: Option<PlayerId>,
}

impl TriggerOccurrence {
    /// An event that happened to a card
    pub fn card_event(state: &GameState, event: TriggerEvent, card: CardId) -> Result<Self> {
        let instance = state.card(card)?;
        Ok(TriggerOccurrence {
            event,
            card: Some(card),
            player: Some(instance.controller),
            is_creature: instance.is_creature(),
            controller: Some(instance.controller),
        })
    }

    /// An event that happened to a player
    pub fn player_event(event: TriggerEvent, player: PlayerId) -> Self {
        TriggerOccurrence {
            event,
            card: None,
            player: Some(player),
            is_creature: false,
            controller: None,
        }
    }

    /// The beginning of a step
    pub fn step_begins(step: Step, active_player: PlayerId) -> Self {
        TriggerOccurrence {
            event: TriggerEvent::StepBegins {
                step,
                yours_only: false,
            },
            card: None,
            player: Some(active_player),
            is_creature: false,
            controller: None,
        }
    }

    fn matches_event(&self, listening: &TriggerEvent, controller: PlayerId) -> bool {
        match (listening, &self.event) {
            (
                TriggerEvent::StepBegins { step, yours_only },
                TriggerEvent::StepBegins { step: happened, .. },
            ) => step == happened && (!yours_only || self.player == Some(controller)),
            (listening, happened) => listening == happened,
        }
    }

    fn matches_subject(
        &self,
        subject: TriggerSubject,
        source: CardId,
        controller: PlayerId,
    ) -> bool {
        match subject {
            TriggerSubject::This => self.card == Some(source),
            TriggerSubject::AnyCreature => self.is_creature,
            TriggerSubject::AnotherCreature => self.is_creature && self.card != Some(source),
            TriggerSubject::CreatureYouControl => {
                self.is_creature && self.controller == Some(controller)
            }
            TriggerSubject::You => self.card.is_none() && self.player == Some(controller),
            TriggerSubject::Opponent => {
                self.card.is_none() && matches!(self.player, Some(p) if p != controller)
            }
            TriggerSubject::Game => true,
        }
    }
}

/// A triggered ability waiting to be put on the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTrigger {
    pub source: CardId,
    pub controller: PlayerId,
    /// Index into the source's triggered abilities
    pub index: usize,
    pub event: TriggerEvent,
    /// Copied so the ability survives its source leaving the game
    pub effects: Vec<EffectDescriptor>,
    pub text: String,
}

impl GameState {
    /// Queue every triggered ability on the battlefield that `occurrence` sets off
    pub fn queue_triggers(&mut self, occurrence: TriggerOccurrence) {
        let mut found = Vec::new();
        for &permanent in self.battlefield() {
            let Ok(card) = self.card(permanent) else {
                continue;
            };
            for (index, ability) in card.abilities().triggered.iter().enumerate() {
                if occurrence.matches_event(&ability.event, card.controller)
                    && occurrence.matches_subject(ability.subject, permanent, card.controller)
                {
                    found.push(PendingTrigger {
                        source: permanent,
                        controller: card.controller,
                        index,
                        event: occurrence.event,
                        effects: ability.effects.clone(),
                        text: format!("{}: {}", card.card_name(), ability.text),
                    });
                }
            }
        }
        self.pending_triggers.extend(found);
    }

    /// Put pending triggers on the stack, active player's first
    ///
    /// Each player's triggers keep the order they happened in; the last one
    /// pushed resolves first. Returns how many were put on the stack.
    pub fn flush_triggers(&mut self) -> usize {
        if self.pending_triggers.is_empty() {
            return 0;
        }
        let pending = std::mem::take(&mut self.pending_triggers);
        let order = self.apnap_order();
        let mut count = 0;

        for player in order {
            for trigger in pending.iter().filter(|t| t.controller == player) {
                let id = self.next_id();
                let timestamp = self.next_timestamp();
                self.stack.push(StackObject {
                    id,
                    kind: StackObjectKind::TriggeredAbility {
                        source: trigger.source,
                        index: trigger.index,
                        event: trigger.event,
                    },
                    controller: trigger.controller,
                    targets: Default::default(),
                    modes: Default::default(),
                    x_value: 0,
                    chosen_color: None,
                    countered: false,
                    timestamp,
                    effects: trigger.effects.clone(),
                    description: trigger.text.clone(),
                });
                count += 1;
            }
        }

        if count > 0 {
            self.reset_priority_passes();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        CardDefinition, CardFace, EffectKind, ManaCost, PtValue, Recipient, TriggeredAbility,
        TypeLine,
    };
    use crate::zones::Zone;
    use crate::GameConfig;
    use std::sync::Arc;

    fn watcher(event: TriggerEvent, subject: TriggerSubject) -> Arc<CardDefinition> {
        let mut face = CardFace::new(
            "Watcher",
            TypeLine::parse("Creature — Spirit").unwrap(),
            ManaCost::generic(1),
        );
        face.power = Some(PtValue::Fixed(1));
        face.toughness = Some(PtValue::Fixed(1));
        face.abilities.triggered.push(TriggeredAbility {
            event,
            subject,
            effects: vec![EffectDescriptor::new(
                EffectKind::GainLife,
                Recipient::You,
                "you gain 1 life.",
            )],
            optional: false,
            text: "you gain 1 life.".to_string(),
        });
        Arc::new(CardDefinition::single(face))
    }

    #[test]
    fn test_dies_trigger_looks_back() {
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default());
        let alice = game.players[0].id;
        let card = game
            .create_card(
                watcher(TriggerEvent::Dies, TriggerSubject::This),
                alice,
                Zone::Battlefield,
            )
            .unwrap();

        game.remove_from_battlefield(card, Zone::Graveyard).unwrap();
        assert_eq!(game.pending_triggers.len(), 1);
        assert_eq!(game.pending_triggers[0].source, card);
    }

    #[test]
    fn test_upkeep_trigger_only_on_your_turn() {
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default());
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        game.create_card(
            watcher(
                TriggerEvent::StepBegins {
                    step: Step::Upkeep,
                    yours_only: true,
                },
                TriggerSubject::Game,
            ),
            alice,
            Zone::Battlefield,
        )
        .unwrap();

        game.queue_triggers(TriggerOccurrence::step_begins(Step::Upkeep, bob));
        assert!(game.pending_triggers.is_empty());
        game.queue_triggers(TriggerOccurrence::step_begins(Step::Draw, alice));
        assert!(game.pending_triggers.is_empty());
        game.queue_triggers(TriggerOccurrence::step_begins(Step::Upkeep, alice));
        assert_eq!(game.pending_triggers.len(), 1);
    }

    #[test]
    fn test_flush_orders_active_player_first() {
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default());
        let (alice, bob) = (game.players[0].id, game.players[1].id);
        for owner in [bob, alice] {
            game.create_card(
                watcher(TriggerEvent::Draw, TriggerSubject::Opponent),
                owner,
                Zone::Battlefield,
            )
            .unwrap();
        }
        game.queue_triggers(TriggerOccurrence::player_event(TriggerEvent::Draw, alice));
        game.queue_triggers(TriggerOccurrence::player_event(TriggerEvent::Draw, bob));
        game.consecutive_passes = 1;

        assert_eq!(game.flush_triggers(), 2);
        assert_eq!(game.stack[0].controller, alice);
        assert_eq!(game.stack[1].controller, bob);
        assert_eq!(game.consecutive_passes, 0);
        assert!(game.pending_triggers.is_empty());
    }
}
