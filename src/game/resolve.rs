//! Stack resolution and effect execution

use crate::core::{
    CardDefinition, CardFace, CardId, CardType, CounterType, EffectDescriptor, EffectKind,
    ManaCost, PlayerId, PreventionAmount, PtValue, Recipient, Subtype, Supertype, TargetRef,
    TargetSpec, TokenSpec, TypeLine,
};
use crate::game::replacement::{
    EffectDuration, EventFilter, EventTransform, GameEvent, PreventionShield, ReplacementEffect,
    PREVENTION_LAYER,
};
use crate::game::stack::{StackObject, StackObjectKind};
use crate::game::GameState;
use crate::zones::Zone;
use crate::{MtgError, Result};
use std::sync::Arc;

impl GameState {
    /// Pop the top of the stack and carry it out
    ///
    /// A countered object just leaves. If every target has become illegal
    /// the object does nothing; otherwise effects whose own target is gone
    /// are skipped and the rest happen in order.
    pub(crate) fn resolve_top(&mut self) -> Result<String> {
        let object = self
            .stack
            .pop()
            .ok_or_else(|| MtgError::InvariantViolation("resolving an empty stack".to_string()))?;

        if object.countered {
            self.finish_spell(&object, false)?;
            return Ok(format!("{} is countered", object.description));
        }

        if let StackObjectKind::LoyaltyAbility { source, change, .. } = object.kind {
            self.adjust_loyalty(source, change)?;
        }

        let planned = self.plan_targets(&object);
        let enchant = self.enchant_target(&object);
        let legal: Vec<bool> = object
            .effects
            .iter()
            .zip(&planned)
            .map(|(effect, target)| match (effect.target_spec(), target) {
                (Some(spec), Some(t)) => {
                    self.is_legal_target(spec, *t, object.controller, Some(object.source_card()))
                }
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();
        let enchant_legal = enchant.as_ref().map(|(spec, t)| {
            self.is_legal_target(spec, *t, object.controller, Some(object.source_card()))
        });

        let mut targeted = object
            .effects
            .iter()
            .zip(&legal)
            .filter(|(effect, _)| effect.target_spec().is_some())
            .map(|(_, ok)| *ok)
            .chain(enchant_legal)
            .peekable();
        if targeted.peek().is_some() && !targeted.any(|ok| ok) {
            self.finish_spell(&object, false)?;
            return Ok(format!("{} fizzles", object.description));
        }

        for ((effect, target), ok) in object.effects.iter().zip(&planned).zip(&legal) {
            if !ok {
                continue;
            }
            self.execute_effect(&object, effect, *target)?;
        }

        self.finish_spell(&object, enchant_legal != Some(false))?;
        Ok(format!("{} resolves", object.description))
    }

    /// One planned target per effect, `None` for untargeted effects
    ///
    /// Triggered abilities pick theirs now.
    fn plan_targets(&self, object: &StackObject) -> Vec<Option<TargetRef>> {
        let mut chosen = object.targets.iter().copied();
        object
            .effects
            .iter()
            .map(|effect| {
                effect.target_spec()?;
                if object.defers_targets() {
                    self.auto_target(effect, object.controller, Some(object.source_card()))
                } else {
                    chosen.next()
                }
            })
            .collect()
    }

    /// The aura's enchant target, which follows the effect targets
    fn enchant_target(&self, object: &StackObject) -> Option<(TargetSpec, TargetRef)> {
        let StackObjectKind::Spell { card } = object.kind else {
            return None;
        };
        let spec = self.card(card).ok()?.abilities().enchant.clone()?;
        let effect_targets = object
            .effects
            .iter()
            .filter(|e| e.target_spec().is_some())
            .count();
        object.targets.get(effect_targets).map(|t| (spec, *t))
    }

    fn adjust_loyalty(&mut self, planeswalker: CardId, change: i32) -> Result<()> {
        if !self.is_on_battlefield(planeswalker) {
            return Ok(());
        }
        let amount = change.unsigned_abs();
        if change >= 0 {
            self.cards
                .update(planeswalker, |c| c.add_counters(CounterType::Loyalty, amount))
        } else {
            self.cards
                .update(planeswalker, |c| c.remove_counters(&CounterType::Loyalty, amount))
        }
    }

    /// Move a resolved (or countered) spell's card where it belongs
    ///
    /// Abilities have no card to move. A permanent spell enters the
    /// battlefield unless it was countered or its aura target is gone.
    fn finish_spell(&mut self, object: &StackObject, resolved: bool) -> Result<()> {
        let StackObjectKind::Spell { card } = object.kind else {
            return Ok(());
        };
        let instance = self.card(card)?;
        if !resolved || !instance.is_permanent() {
            return self.relocate(card, Zone::Graveyard, object.controller);
        }

        self.put_onto_battlefield(card, object.controller)?;
        if let Some((_, TargetRef::Card(host))) = self.enchant_target(object) {
            self.cards.update(card, |c| c.attach_to(host))?;
            self.cards.update(host, |h| h.add_attachment(card))?;
        }
        Ok(())
    }

    /// Everyone and everything an effect applies to
    fn recipients(
        &self,
        recipient: &Recipient,
        target: Option<TargetRef>,
        controller: PlayerId,
        source: CardId,
    ) -> Vec<TargetRef> {
        match recipient {
            Recipient::You => vec![TargetRef::Player(controller)],
            Recipient::This => vec![TargetRef::Card(source)],
            Recipient::Target(_) => target.into_iter().collect(),
            Recipient::EachPlayer => self
                .remaining_players()
                .into_iter()
                .map(TargetRef::Player)
                .collect(),
            Recipient::EachOpponent => self
                .opponents_of(controller)
                .into_iter()
                .map(TargetRef::Player)
                .collect(),
            Recipient::EachCreature => self.creatures_where(|_| true),
            Recipient::EachCreatureYouControl => self.creatures_where(|p| p == controller),
            Recipient::EachCreatureOpponentsControl => self.creatures_where(|p| p != controller),
        }
    }

    fn creatures_where(&self, controlled_by: impl Fn(PlayerId) -> bool) -> Vec<TargetRef> {
        self.battlefield()
            .iter()
            .copied()
            .filter(|id| {
                self.card(*id)
                    .map(|c| c.is_creature() && controlled_by(c.controller))
                    .unwrap_or(false)
            })
            .map(TargetRef::Card)
            .collect()
    }

    fn execute_effect(
        &mut self,
        object: &StackObject,
        effect: &EffectDescriptor,
        target: Option<TargetRef>,
    ) -> Result<()> {
        let controller = object.controller;
        let source = object.source_card();
        let amount = effect.amount_value(object.x_value);
        let recipients = self.recipients(&effect.recipient, target, controller, source);
        let end_of_turn = EffectDuration::EndOfTurn {
            turn: self.turn.turn_number,
        };

        match effect.kind {
            EffectKind::Damage => {
                for r in recipients {
                    if !matches!(r, TargetRef::StackObject(_)) {
                        self.deal_damage(Some(source), r, amount, false)?;
                    }
                }
            }
            EffectKind::Destroy => {
                for card in cards(&recipients) {
                    self.destroy(card)?;
                }
            }
            EffectKind::Exile => {
                for card in cards(&recipients) {
                    self.relocate(card, Zone::Exile, controller)?;
                }
            }
            EffectKind::Draw => {
                for player in players(&recipients) {
                    self.draw_cards(player, amount)?;
                }
            }
            EffectKind::GainLife => {
                for player in players(&recipients) {
                    self.apply_event(GameEvent::LifeGain { player, amount })?;
                }
            }
            EffectKind::LoseLife => {
                for player in players(&recipients) {
                    self.apply_event(GameEvent::LifeLoss { player, amount })?;
                }
            }
            EffectKind::CreateToken => {
                if let Some(spec) = &effect.token {
                    let definition = Arc::new(token_definition(spec));
                    for player in players(&recipients) {
                        for _ in 0..amount {
                            self.create_token(definition.clone(), player)?;
                        }
                    }
                }
            }
            EffectKind::CounterSpell => {
                for r in &recipients {
                    if let TargetRef::StackObject(id) = r {
                        if let Some(countered) = self.stack.iter_mut().find(|o| o.id == *id) {
                            countered.countered = true;
                        }
                    }
                }
            }
            EffectKind::Tap | EffectKind::Untap => {
                for card in cards(&recipients) {
                    if self.is_on_battlefield(card) {
                        if effect.kind == EffectKind::Tap {
                            self.cards.update(card, |c| c.tap())?;
                        } else {
                            self.cards.update(card, |c| c.untap())?;
                        }
                    }
                }
            }
            EffectKind::PlusOneCounters => {
                for card in cards(&recipients) {
                    if self.is_on_battlefield(card) {
                        self.cards.update(card, |c| {
                            c.add_counters(CounterType::PlusOne, amount)
                        })?;
                    }
                }
            }
            EffectKind::Return => {
                let destination = effect.destination.unwrap_or(Zone::Hand);
                for card in cards(&recipients) {
                    self.relocate(card, destination, controller)?;
                }
            }
            EffectKind::Search => {
                for player in players(&recipients) {
                    self.search_library(player, effect)?;
                }
            }
            EffectKind::GainControl => {
                for card in cards(&recipients) {
                    self.gain_control(card, controller)?;
                }
            }
            EffectKind::AddMana => {
                for player in players(&recipients) {
                    self.produce_mana(
                        player,
                        std::slice::from_ref(effect),
                        object.x_value,
                        object.chosen_color,
                    )?;
                }
            }
            EffectKind::PreventDamage => {
                let prevention = effect.prevention.unwrap_or(PreventionAmount::Up(amount));
                let protected = match &effect.recipient {
                    Recipient::Target(_) | Recipient::You | Recipient::This => recipients,
                    _ => Vec::new(),
                };
                match prevention {
                    PreventionAmount::Up(n) => {
                        for r in protected {
                            self.effects.add_shield(PreventionShield::new(
                                Some(source),
                                controller,
                                r,
                                n,
                                end_of_turn,
                            ));
                        }
                    }
                    PreventionAmount::All | PreventionAmount::AllCombat => {
                        let filters = if prevention == PreventionAmount::AllCombat {
                            vec![EventFilter::CombatDamage]
                        } else if protected.is_empty() {
                            vec![EventFilter::AnyDamage]
                        } else {
                            protected.into_iter().map(EventFilter::DamageTo).collect()
                        };
                        for filter in filters {
                            self.effects.register(
                                ReplacementEffect::new(
                                    Some(source),
                                    controller,
                                    PREVENTION_LAYER,
                                    filter,
                                    EventTransform::PreventAll,
                                    end_of_turn,
                                )
                                .with_description(effect.text.clone()),
                            );
                        }
                    }
                }
            }
            EffectKind::Generic => {}
        }
        Ok(())
    }

    /// Put the first matching card of a library into the effect's destination
    fn search_library(&mut self, player: PlayerId, effect: &EffectDescriptor) -> Result<()> {
        let filter = effect.search.clone();
        let found = self.library(player).iter().rev().copied().find(|id| {
            let Ok(card) = self.card(*id) else {
                return false;
            };
            match &filter {
                Some(f) => {
                    f.card_type.map(|t| card.is_type(t)).unwrap_or(true)
                        && (!f.basic || card.type_line().has_supertype(Supertype::Basic))
                }
                None => true,
            }
        });
        if let Some(card) = found {
            let destination = effect.destination.unwrap_or(Zone::Hand);
            self.relocate(card, destination, player)?;
        }
        self.shuffle_library(player)
    }

    /// Create a token and put it onto the battlefield
    pub fn create_token(
        &mut self,
        definition: Arc<CardDefinition>,
        controller: PlayerId,
    ) -> Result<CardId> {
        let id = self.create_card(definition, controller, Zone::Exile)?;
        self.cards.update(id, |mut c| {
            c.is_token = true;
            c
        })?;
        self.put_onto_battlefield(id, controller)?;
        Ok(id)
    }
}

fn cards(recipients: &[TargetRef]) -> Vec<CardId> {
    recipients
        .iter()
        .filter_map(|r| match r {
            TargetRef::Card(c) => Some(*c),
            _ => None,
        })
        .collect()
}

fn players(recipients: &[TargetRef]) -> Vec<PlayerId> {
    recipients
        .iter()
        .filter_map(|r| match r {
            TargetRef::Player(p) => Some(*p),
            _ => None,
        })
        .collect()
}

/// The printed card of a token
pub fn token_definition(spec: &TokenSpec) -> CardDefinition {
    let mut types = spec.types.clone();
    if types.is_empty() {
        types.push(CardType::Creature);
    }
    let type_line = TypeLine {
        supertypes: Default::default(),
        types,
        subtypes: spec.subtypes.iter().map(|s| Subtype::new(s.as_str())).collect(),
    };
    let mut face = CardFace::new(spec.name.as_str(), type_line, ManaCost::new());
    face.colors = spec.colors.clone();
    if face.type_line.is(CardType::Creature) {
        face.power = Some(PtValue::Fixed(spec.power));
        face.toughness = Some(PtValue::Fixed(spec.toughness));
    }
    face.abilities.keywords = spec.keywords.to_vec();
    CardDefinition::single(face)
}
