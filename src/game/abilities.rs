//! Activated and loyalty abilities
//!
//! Costs are paid in a fixed order: tap, mana, life, sacrifice, discard.
//! Mana abilities resolve on the spot; everything else goes on the stack.

use crate::core::{
    CardId, Color, EffectDescriptor, EffectKind, Keyword, ManaType, PlayerId, SacrificeCost,
    TargetSpec,
};
use crate::game::actions::{ActivateOptions, ChoiceKind, ChoiceOption, WaitingChoice};
use crate::game::replacement::Capability;
use crate::game::stack::{StackObject, StackObjectKind};
use crate::game::GameState;
use crate::zones::Zone;
use crate::{MtgError, Result};

impl GameState {
    pub(crate) fn do_activate_ability(
        &mut self,
        player: PlayerId,
        card: CardId,
        index: usize,
        options: &ActivateOptions,
    ) -> Result<String> {
        self.require_priority(player)?;
        let instance = self.controlled_permanent(player, card)?.clone();
        let ability = instance
            .abilities()
            .activated
            .get(index)
            .cloned()
            .ok_or_else(|| {
                MtgError::invalid(format!("{} has no ability #{index}", instance.card_name()))
            })?;

        if ability.once_per_turn && instance.activations_this_turn(index) > 0 {
            return Err(MtgError::invalid(format!(
                "That ability of {} was already activated this turn",
                instance.card_name()
            )));
        }
        if ability.sorcery_speed && !self.is_sorcery_timing(player) {
            return Err(MtgError::invalid("That ability can only be activated as a sorcery"));
        }

        let cost = &ability.cost;
        if cost.tap {
            if instance.tapped {
                return Err(MtgError::invalid(format!(
                    "{} is already tapped",
                    instance.card_name()
                )));
            }
            if instance.is_creature()
                && instance.summoning_sick
                && !instance.has_keyword(&Keyword::Haste)
                && !self
                    .effects
                    .has_capability(player, Capability::IgnoreSummoningSickness, self)
            {
                return Err(MtgError::invalid(format!(
                    "{} has summoning sickness",
                    instance.card_name()
                )));
            }
        }

        let x_value = match cost.mana_cost() {
            Some(mana) => self.choose_x(player, mana, options.x_value)?,
            None => 0,
        };
        let specs: Vec<TargetSpec> = ability
            .effects
            .iter()
            .filter_map(|e| e.target_spec().cloned())
            .collect();
        let targets = self.check_targets(player, Some(card), &specs, &options.targets)?;
        let color = choose_color(player, &ability.effects, options.color)?;
        let sacrifice =
            self.choose_sacrifice(player, card, cost.sacrifice.as_ref(), &options.sacrifice)?;
        let discard = self.choose_discard(player, cost.discard, &options.discard)?;

        // Pay costs
        if cost.tap {
            self.cards.update(card, |c| c.tap())?;
        }
        if let Some(mana) = cost.mana_cost() {
            self.pay_mana_cost(player, mana, x_value)?;
        }
        if cost.life > 0 {
            let p = self.player_mut(player)?;
            if p.life < cost.life as i32 {
                return Err(MtgError::invalid(format!("Not enough life to pay {}", cost.life)));
            }
            p.lose_life(cost.life);
        }
        self.cards.update(card, |c| c.record_activation(index))?;
        for permanent in sacrifice {
            self.remove_from_battlefield(permanent, Zone::Graveyard)?;
        }
        for discarded in discard {
            self.relocate(discarded, Zone::Graveyard, player)?;
        }

        let name = self.player(player)?.name.clone();
        if ability.is_mana_ability {
            self.produce_mana(player, &ability.effects, x_value, color)?;
            self.player_mut(player)?.activated_mana_ability = true;
            return Ok(format!(
                "{name} activates {}: {}",
                instance.card_name(),
                ability.text
            ));
        }

        let id = self.next_id();
        let timestamp = self.next_timestamp();
        self.stack.push(StackObject {
            id,
            kind: StackObjectKind::ActivatedAbility {
                source: card,
                index,
            },
            controller: player,
            targets,
            modes: Default::default(),
            x_value,
            chosen_color: color,
            countered: false,
            timestamp,
            effects: ability.effects.clone(),
            description: format!("{}: {}", instance.card_name(), ability.text),
        });
        self.pass_priority_after_stack_change(player)?;
        Ok(format!(
            "{name} activates {}: {}",
            instance.card_name(),
            ability.text
        ))
    }

    pub(crate) fn do_activate_loyalty_ability(
        &mut self,
        player: PlayerId,
        card: CardId,
        index: usize,
        options: &ActivateOptions,
    ) -> Result<String> {
        self.require_priority(player)?;
        let instance = self.controlled_permanent(player, card)?.clone();
        if !instance.is_planeswalker() {
            return Err(MtgError::invalid(format!(
                "{} is not a planeswalker",
                instance.card_name()
            )));
        }
        if !self.is_sorcery_timing(player) {
            return Err(MtgError::invalid(
                "Loyalty abilities can only be activated in your main phase with an empty stack",
            ));
        }
        if instance.loyalty_activated {
            return Err(MtgError::invalid(format!(
                "A loyalty ability of {} was already activated this turn",
                instance.card_name()
            )));
        }
        let ability = instance
            .abilities()
            .loyalty
            .get(index)
            .cloned()
            .ok_or_else(|| {
                MtgError::invalid(format!(
                    "{} has no loyalty ability #{index}",
                    instance.card_name()
                ))
            })?;
        if ability.change < 0 && instance.loyalty() < ability.change.unsigned_abs() {
            return Err(MtgError::invalid(format!(
                "{} has only {} loyalty",
                instance.card_name(),
                instance.loyalty()
            )));
        }

        let specs: Vec<TargetSpec> = ability
            .effects
            .iter()
            .filter_map(|e| e.target_spec().cloned())
            .collect();
        let targets = self.check_targets(player, Some(card), &specs, &options.targets)?;

        self.cards.update(card, |c| c.record_loyalty_activation())?;
        let id = self.next_id();
        let timestamp = self.next_timestamp();
        self.stack.push(StackObject {
            id,
            kind: StackObjectKind::LoyaltyAbility {
                source: card,
                index,
                change: ability.change,
            },
            controller: player,
            targets,
            modes: Default::default(),
            x_value: options.x_value.unwrap_or(0),
            chosen_color: options.color,
            countered: false,
            timestamp,
            effects: ability.effects.clone(),
            description: format!("{} {:+}: {}", instance.card_name(), ability.change, ability.text),
        });
        self.pass_priority_after_stack_change(player)?;
        Ok(format!(
            "{} activates {} {:+}",
            self.player(player)?.name,
            instance.card_name(),
            ability.change
        ))
    }

    /// A permanent on the battlefield controlled by `player`
    fn controlled_permanent(
        &self,
        player: PlayerId,
        card: CardId,
    ) -> Result<&crate::core::CardInstance> {
        if !self.is_on_battlefield(card) {
            return Err(MtgError::invalid("That card is not on the battlefield"));
        }
        let instance = self.card(card)?;
        if instance.controller != player {
            return Err(MtgError::invalid(format!(
                "{} is not controlled by that player",
                instance.card_name()
            )));
        }
        Ok(instance)
    }

    fn choose_sacrifice(
        &self,
        player: PlayerId,
        source: CardId,
        cost: Option<&SacrificeCost>,
        chosen: &[CardId],
    ) -> Result<Vec<CardId>> {
        let card_type = match cost {
            None => return Ok(Vec::new()),
            Some(SacrificeCost::This) => return Ok(vec![source]),
            Some(SacrificeCost::Permanent(card_type)) => *card_type,
        };
        let candidates: Vec<CardId> = self
            .battlefield_of(player)
            .into_iter()
            .filter(|id| {
                self.card(*id)
                    .map(|c| card_type.map(|t| c.is_type(t)).unwrap_or(true))
                    .unwrap_or(false)
            })
            .collect();

        if let Some(choice) = chosen.first() {
            if !candidates.contains(choice) {
                return Err(MtgError::invalid("That permanent can't be sacrificed for this cost"));
            }
            return Ok(vec![*choice]);
        }
        match candidates.len() {
            0 => Err(MtgError::invalid("Nothing to sacrifice")),
            1 => Ok(candidates),
            _ => Err(WaitingChoice::new(
                player,
                ChoiceKind::Sacrifice,
                "Choose a permanent to sacrifice",
                candidates.into_iter().map(ChoiceOption::Card).collect(),
            )
            .into_error()),
        }
    }

    fn choose_discard(
        &self,
        player: PlayerId,
        count: u32,
        chosen: &[CardId],
    ) -> Result<Vec<CardId>> {
        let hand = self.hand(player);
        if count == 0 {
            return Ok(Vec::new());
        }
        if count == u32::MAX {
            return Ok(hand.to_vec());
        }
        let count = count as usize;
        if hand.len() < count {
            return Err(MtgError::invalid(format!("Not enough cards in hand to discard {count}")));
        }
        if !chosen.is_empty() {
            let distinct = chosen.iter().enumerate().all(|(i, c)| !chosen[..i].contains(c));
            if chosen.len() != count || !distinct || !chosen.iter().all(|c| hand.contains(c)) {
                return Err(MtgError::invalid(format!(
                    "Choose exactly {count} different card(s) from your hand"
                )));
            }
            return Ok(chosen.to_vec());
        }
        if hand.len() == count {
            return Ok(hand.to_vec());
        }
        Err(WaitingChoice::new(
            player,
            ChoiceKind::Discard,
            format!("Choose {count} card(s) to discard"),
            hand.iter().copied().map(ChoiceOption::Card).collect(),
        )
        .choose(count as u32)
        .into_error())
    }

    /// Add the mana described by `AddMana` effects to a pool
    pub(crate) fn produce_mana(
        &mut self,
        player: PlayerId,
        effects: &[EffectDescriptor],
        x: u32,
        color: Option<Color>,
    ) -> Result<()> {
        let p = self.player_mut(player)?;
        for effect in effects.iter().filter(|e| e.kind == EffectKind::AddMana) {
            let times = effect.amount.map(|a| a.value(x)).unwrap_or(1);
            if let Some(mana) = &effect.mana {
                p.mana_pool = p.mana_pool.add_produced_times(mana, times);
            }
            if effect.any_color > 0 {
                if let Some(c) = color {
                    let amount = effect.any_color.saturating_mul(times);
                    p.mana_pool = p.mana_pool.add(ManaType::from(c), amount);
                }
            }
        }
        Ok(())
    }
}

/// "Add one mana of any color" needs a color from the caller
fn choose_color(
    player: PlayerId,
    effects: &[EffectDescriptor],
    chosen: Option<Color>,
) -> Result<Option<Color>> {
    let needs_color = effects.iter().any(|e| e.any_color > 0);
    if !needs_color || chosen.is_some() {
        return Ok(chosen);
    }
    Err(WaitingChoice::new(
        player,
        ChoiceKind::ManaColor,
        "Choose a color of mana",
        Color::ALL.into_iter().map(ChoiceOption::Color).collect(),
    )
    .into_error())
}
