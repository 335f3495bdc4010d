//! Event application and battlefield entry/exit
//!
//! Every damage, life, draw and destroy event goes through the effect store
//! before it happens. The surviving event is then performed here.

use crate::core::{
    CardId, CounterType, DamageScope, Keyword, PlayerId, PreventionAmount, StaticAbility,
    TargetRef, TriggerEvent,
};
use crate::game::replacement::{
    AsThoughGrant, Capability, EffectDuration, EventFilter, EventTransform, GameEvent,
    ReplacementEffect, MODIFICATION_LAYER, PREVENTION_LAYER,
};
use crate::game::triggers::TriggerOccurrence;
use crate::game::GameState;
use crate::zones::Zone;
use crate::Result;

impl GameState {
    /// Run an event through the replacement pipeline and perform the result
    ///
    /// Returns the event that actually happened, or `None` if it was
    /// replaced by nothing.
    pub fn apply_event(&mut self, event: GameEvent) -> Result<Option<GameEvent>> {
        let mut effects = std::mem::take(&mut self.effects);
        let outcome = effects.apply(event, self);
        self.effects = effects;

        match outcome.event {
            Some(event) => {
                self.perform_event(&event)?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    fn perform_event(&mut self, event: &GameEvent) -> Result<()> {
        match event {
            GameEvent::Damage {
                source,
                target,
                amount,
                ..
            } => self.perform_damage(*source, *target, *amount),
            GameEvent::LifeGain { player, amount } => {
                self.player_mut(*player)?.gain_life(*amount);
                Ok(())
            }
            GameEvent::LifeLoss { player, amount } => {
                self.player_mut(*player)?.lose_life(*amount);
                Ok(())
            }
            GameEvent::Draw { player, count } => {
                for _ in 0..*count {
                    self.draw_one(*player)?;
                }
                Ok(())
            }
            GameEvent::Destroy { card, destination } => {
                if !self.is_on_battlefield(*card) {
                    return Ok(());
                }
                if *destination == Zone::Graveyard
                    && self.card(*card)?.has_keyword(&Keyword::Indestructible)
                {
                    return Ok(());
                }
                self.remove_from_battlefield(*card, *destination)
            }
        }
    }

    fn perform_damage(
        &mut self,
        source: Option<CardId>,
        target: TargetRef,
        amount: u32,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }

        let source_card = source.and_then(|s| self.card(s).ok());
        let (deathtouch, lifelink, source_controller) = match source_card {
            Some(card) => (
                card.has_keyword(&Keyword::Deathtouch),
                card.has_keyword(&Keyword::Lifelink),
                Some(card.controller),
            ),
            None => (false, false, None),
        };

        match target {
            TargetRef::Player(player) => self.player_mut(player)?.lose_life(amount),
            TargetRef::Card(card) => {
                if !self.is_on_battlefield(card) {
                    return Ok(());
                }
                let instance = self.card(card)?;
                let is_creature = instance.is_creature();
                let is_planeswalker = instance.is_planeswalker();
                if is_creature {
                    self.cards.update(card, |c| c.mark_damage(amount, deathtouch))?;
                } else if is_planeswalker {
                    self.cards
                        .update(card, |c| c.remove_counters(&CounterType::Loyalty, amount))?;
                }
            }
            TargetRef::StackObject(_) => return Ok(()),
        }

        if let (Some(source), Some(controller)) = (source, source_controller) {
            let occurrence =
                TriggerOccurrence::card_event(self, TriggerEvent::DealsDamage, source)?;
            self.queue_triggers(occurrence);
            if lifelink {
                self.apply_event(GameEvent::LifeGain {
                    player: controller,
                    amount,
                })?;
            }
        }
        Ok(())
    }

    /// Move the top card of a library to its owner's hand
    fn draw_one(&mut self, player: PlayerId) -> Result<()> {
        match self.library(player).last().copied() {
            Some(card) => {
                self.move_card(card, Zone::Hand)?;
                self.queue_triggers(TriggerOccurrence::player_event(TriggerEvent::Draw, player));
            }
            None => self.player_mut(player)?.drew_from_empty_library = true,
        }
        Ok(())
    }

    /// Draw through the replacement pipeline
    pub fn draw_cards(&mut self, player: PlayerId, count: u32) -> Result<()> {
        self.apply_event(GameEvent::Draw { player, count })?;
        Ok(())
    }

    /// Deal damage through the replacement pipeline
    pub fn deal_damage(
        &mut self,
        source: Option<CardId>,
        target: TargetRef,
        amount: u32,
        combat: bool,
    ) -> Result<Option<GameEvent>> {
        self.apply_event(GameEvent::Damage {
            source,
            target,
            amount,
            combat,
        })
    }

    pub fn destroy(&mut self, card: CardId) -> Result<()> {
        self.apply_event(GameEvent::Destroy {
            card,
            destination: Zone::Graveyard,
        })?;
        Ok(())
    }

    /// Put a card onto the battlefield under `controller`'s control
    ///
    /// The card arrives untapped and summoning sick; its statics are
    /// registered and its enters-the-battlefield triggers queued.
    pub fn put_onto_battlefield(&mut self, card: CardId, controller: PlayerId) -> Result<()> {
        if self.is_on_battlefield(card) {
            return Ok(());
        }
        self.cards.update(card, |c| {
            let mut c = c.reset_for_zone_change();
            c.controller = controller;
            c
        })?;
        self.move_card(card, Zone::Battlefield)?;
        self.register_permanent(card)?;
        let occurrence =
            TriggerOccurrence::card_event(self, TriggerEvent::EntersBattlefield, card)?;
        self.queue_triggers(occurrence);
        Ok(())
    }

    /// Set up what a permanent brings with it: statics and starting loyalty
    pub(crate) fn register_permanent(&mut self, card: CardId) -> Result<()> {
        let instance = self.card(card)?;
        let controller = instance.controller;
        let statics = instance.abilities().statics.clone();
        let printed_loyalty = instance.current_face().loyalty;
        let needs_loyalty = instance.is_planeswalker() && instance.loyalty() == 0;

        if needs_loyalty {
            if let Some(loyalty) = printed_loyalty {
                self.cards
                    .update(card, |c| c.add_counters(CounterType::Loyalty, loyalty))?;
            }
        }

        for ability in statics {
            self.register_static(card, controller, &ability);
        }
        self.recompute_land_limits()
    }

    fn register_static(&mut self, card: CardId, controller: PlayerId, ability: &StaticAbility) {
        let name = self
            .card(card)
            .map(|c| c.card_name().to_string())
            .unwrap_or_default();
        let duration = EffectDuration::WhileSourceOnBattlefield;
        let replacement = |layer, filter, transform| {
            ReplacementEffect::new(Some(card), controller, layer, filter, transform, duration)
                .with_description(name.clone())
        };

        match ability {
            StaticAbility::DamageMultiplier { factor, scope } => {
                let effect = replacement(
                    MODIFICATION_LAYER,
                    damage_filter(*scope, controller),
                    EventTransform::Multiply(*factor),
                );
                self.effects.register(effect);
            }
            StaticAbility::PreventDamage { amount, scope } => {
                let (filter, transform) = match amount {
                    PreventionAmount::Up(n) => {
                        (damage_filter(*scope, controller), EventTransform::Prevent(*n))
                    }
                    PreventionAmount::All => {
                        (damage_filter(*scope, controller), EventTransform::PreventAll)
                    }
                    PreventionAmount::AllCombat => {
                        (EventFilter::CombatDamage, EventTransform::PreventAll)
                    }
                };
                self.effects.register(replacement(PREVENTION_LAYER, filter, transform));
            }
            StaticAbility::DrawReplacement { count } => {
                let effect = replacement(
                    MODIFICATION_LAYER,
                    EventFilter::DrawBy(controller),
                    EventTransform::Multiply(*count),
                );
                self.effects.register(effect);
            }
            StaticAbility::LifeGainMultiplier { factor } => {
                let effect = replacement(
                    MODIFICATION_LAYER,
                    EventFilter::LifeGainBy(controller),
                    EventTransform::Multiply(*factor),
                );
                self.effects.register(effect);
            }
            StaticAbility::CastAsThoughFlash => {
                self.effects.grant(AsThoughGrant::new(
                    controller,
                    Capability::CastWithFlash,
                    duration,
                    Some(card),
                ));
            }
            // Read directly by recompute_land_limits
            StaticAbility::AdditionalLand { .. } => {}
        }
    }

    /// Land limits are the configured base plus every "additional land" static
    pub(crate) fn recompute_land_limits(&mut self) -> Result<()> {
        let base = self.config.lands_per_turn;
        let bonuses: Vec<(PlayerId, u32)> = self
            .battlefield()
            .iter()
            .filter_map(|id| self.card(*id).ok())
            .map(|card| {
                let extra = card
                    .abilities()
                    .statics
                    .iter()
                    .map(|s| match s {
                        StaticAbility::AdditionalLand { count } => *count,
                        _ => 0,
                    })
                    .sum::<u32>();
                (card.controller, extra)
            })
            .collect();

        for player in &mut self.players {
            let extra: u32 = bonuses
                .iter()
                .filter(|(p, _)| *p == player.id)
                .map(|(_, n)| n)
                .sum();
            player.max_lands_per_turn = base + extra;
        }
        Ok(())
    }

    /// Take a permanent off the battlefield and put it in `destination`
    ///
    /// Leave-the-battlefield triggers look back at the permanent as it last
    /// existed. Effects tied to it end, attachments fall off, and a token
    /// ceases to exist.
    pub fn remove_from_battlefield(&mut self, card: CardId, destination: Zone) -> Result<()> {
        if !self.is_on_battlefield(card) {
            return Ok(());
        }

        let instance = self.card(card)?.clone();
        if destination == Zone::Graveyard && instance.is_creature() {
            let occurrence = TriggerOccurrence::card_event(self, TriggerEvent::Dies, card)?;
            self.queue_triggers(occurrence);
        }
        let occurrence =
            TriggerOccurrence::card_event(self, TriggerEvent::LeavesBattlefield, card)?;
        self.queue_triggers(occurrence);

        self.effects.remove_from_source(card);

        if let Some(host) = instance.attached_to {
            if self.cards.contains(host) {
                self.cards.update(host, |h| h.remove_attachment(card))?;
            }
        }
        for attachment in &instance.attachments {
            if self.cards.contains(*attachment) {
                self.cards.update(*attachment, |a| a.detach())?;
            }
        }
        self.combat = std::mem::take(&mut self.combat).remove(card);

        if instance.is_token {
            self.remove_card(card)?;
        } else {
            self.cards.update(card, |c| c.reset_for_zone_change())?;
            self.move_card(card, destination)?;
        }
        self.recompute_land_limits()
    }

    /// Move a card from wherever it is to `destination`
    ///
    /// Permanents go through `remove_from_battlefield`; a card arriving on the
    /// battlefield enters under `controller`.
    pub fn relocate(
        &mut self,
        card: CardId,
        destination: Zone,
        controller: PlayerId,
    ) -> Result<()> {
        if destination == Zone::Battlefield {
            return self.put_onto_battlefield(card, controller);
        }
        if self.is_on_battlefield(card) {
            return self.remove_from_battlefield(card, destination);
        }
        self.cards.update(card, |c| c.reset_for_zone_change())?;
        self.move_card(card, destination)
    }

    /// Give control of a permanent to another player
    pub fn gain_control(&mut self, card: CardId, controller: PlayerId) -> Result<()> {
        if !self.is_on_battlefield(card) || self.card(card)?.controller == controller {
            return Ok(());
        }
        self.effects.remove_from_source(card);
        self.combat = std::mem::take(&mut self.combat).remove(card);
        self.cards.update(card, |c| c.change_controller(controller))?;
        let statics = self.card(card)?.abilities().statics.clone();
        for ability in statics {
            self.register_static(card, controller, &ability);
        }
        self.recompute_land_limits()
    }
}

/// Translate a static's damage scope into an event filter for `controller`
fn damage_filter(scope: DamageScope, controller: PlayerId) -> EventFilter {
    match scope {
        DamageScope::FromYourSources => EventFilter::DamageFromSourcesControlledBy(controller),
        DamageScope::ToYou => EventFilter::DamageTo(TargetRef::Player(controller)),
        DamageScope::ToYourCreatures => EventFilter::DamageToCreaturesControlledBy(controller),
        DamageScope::ToOpponents => EventFilter::DamageToOpponentsOf(controller),
        DamageScope::Any => EventFilter::AnyDamage,
    }
}
