//! Casting spells and playing lands

use crate::core::{
    AbilitySet, CardId, CardInstance, CardType, EffectDescriptor, Keyword, ManaCost, PlayerId,
    TargetRef, TargetSpec,
};
use crate::game::actions::{CastOptions, ChoiceKind, ChoiceOption, WaitingChoice};
use crate::game::replacement::Capability;
use crate::game::stack::{StackObject, StackObjectKind};
use crate::game::{GameState, GameStatus};
use crate::zones::Zone;
use crate::{MtgError, Result};
use smallvec::SmallVec;

impl GameState {
    /// Sorcery timing: empty stack, a main phase, and the player's own turn
    pub fn is_sorcery_timing(&self, player: PlayerId) -> bool {
        self.stack.is_empty() && self.turn.step.is_main() && self.is_active_player(player)
    }

    /// Can `player` play a land right now?
    pub fn can_play_land(&self, player: PlayerId) -> bool {
        self.check_land_play(player).is_ok()
    }

    fn check_land_play(&self, player: PlayerId) -> Result<()> {
        if self.status != GameStatus::InProgress {
            return Err(MtgError::invalid("The game is not in progress"));
        }
        self.require_priority(player)?;
        if !self.turn.step.is_main() {
            return Err(MtgError::invalid(format!(
                "Lands can only be played in a main phase, not the {}",
                self.turn.step
            )));
        }
        if !self.stack.is_empty() {
            return Err(MtgError::invalid("Lands can only be played while the stack is empty"));
        }
        if !self.is_active_player(player) {
            return Err(MtgError::invalid("Lands can only be played on your own turn"));
        }
        let p = self.player(player)?;
        if !p.has_land_play() {
            return Err(MtgError::invalid(format!(
                "{} has already played {} land(s) this turn",
                p.name, p.lands_played_this_turn
            )));
        }
        Ok(())
    }

    pub(crate) fn do_play_land(&mut self, player: PlayerId, card: CardId) -> Result<String> {
        self.check_land_play(player)?;
        if !self.hand(player).contains(&card) {
            return Err(MtgError::invalid("That card is not in your hand"));
        }
        let instance = self.card(card)?;
        if !instance.is_land() {
            return Err(MtgError::invalid(format!("{} is not a land", instance.card_name())));
        }
        let name = instance.card_name().to_string();

        self.player_mut(player)?.play_land();
        self.put_onto_battlefield(card, player)?;
        Ok(format!("{} plays {name}", self.player(player)?.name))
    }

    /// Instants, flash and "as though it had flash" ignore sorcery timing
    fn check_cast_timing(&self, player: PlayerId, instance: &CardInstance) -> Result<()> {
        if instance.is_type(CardType::Instant)
            || instance.has_keyword(&Keyword::Flash)
            || self
                .effects
                .has_capability(player, Capability::CastWithFlash, self)
        {
            return Ok(());
        }
        if !self.stack.is_empty() {
            return Err(MtgError::invalid(format!(
                "{} can only be cast while the stack is empty",
                instance.card_name()
            )));
        }
        if !self.turn.step.is_main() {
            return Err(MtgError::invalid(format!(
                "{} can only be cast in a main phase",
                instance.card_name()
            )));
        }
        if !self.is_active_player(player) && !self.turn.is_first_turn {
            return Err(MtgError::invalid(format!(
                "{} can only be cast on your own turn",
                instance.card_name()
            )));
        }
        Ok(())
    }

    pub(crate) fn do_cast_spell(
        &mut self,
        player: PlayerId,
        card: CardId,
        options: &CastOptions,
    ) -> Result<String> {
        self.require_priority(player)?;
        if !self.hand(player).contains(&card) {
            return Err(MtgError::invalid("That card is not in your hand"));
        }
        let instance = self.card(card)?.clone();
        if instance.is_land() {
            return Err(MtgError::invalid("Lands are played, not cast"));
        }
        self.check_cast_timing(player, &instance)?;

        let abilities = instance.abilities();
        let modes = choose_modes(player, abilities, &options.modes)?;

        let cost = instance.mana_cost().clone();
        let x_value = self.choose_x(player, &cost, options.x_value)?;

        let effects = if instance.is_permanent() {
            Vec::new()
        } else {
            spell_effects(abilities, &modes)
        };
        let mut specs: Vec<TargetSpec> = effects
            .iter()
            .filter_map(|e| e.target_spec().cloned())
            .collect();
        if let Some(enchant) = abilities.enchant.as_ref().filter(|_| instance.is_permanent()) {
            specs.push(enchant.clone());
        }
        let targets = self.check_targets(player, Some(card), &specs, &options.targets)?;

        self.pay_mana_cost(player, &cost, x_value)?;
        self.move_card(card, Zone::Stack)?;

        let description = format!(
            "{} casts {}",
            self.player(player)?.name,
            instance.card_name()
        );
        let id = self.next_id();
        let timestamp = self.next_timestamp();
        self.stack.push(StackObject {
            id,
            kind: StackObjectKind::Spell { card },
            controller: player,
            targets,
            modes: modes.into_iter().collect(),
            x_value,
            chosen_color: options.color,
            countered: false,
            timestamp,
            effects,
            description: instance.card_name().to_string(),
        });

        self.pass_priority_after_stack_change(player)?;
        Ok(description)
    }

    /// After putting something on the stack the next player gets priority
    pub(crate) fn pass_priority_after_stack_change(&mut self, player: PlayerId) -> Result<()> {
        self.player_mut(player)?.passed_priority = false;
        self.priority_player = Some(self.next_player_after(player));
        self.consecutive_passes = 0;
        Ok(())
    }

    /// Resolve X: a cost with X needs a value from the caller
    ///
    /// X can't exceed what the pool could pay once the rest of the cost is
    /// covered.
    pub(crate) fn choose_x(
        &self,
        player: PlayerId,
        cost: &ManaCost,
        x: Option<u32>,
    ) -> Result<u32> {
        if cost.x_count == 0 {
            return Ok(0);
        }
        let pool = self.player(player)?.mana_pool;
        let fixed = cost.resolve(&pool, 0).mana.total();
        let max = pool.total().saturating_sub(fixed) / cost.x_count;
        match x {
            Some(x) if x <= max => Ok(x),
            Some(x) => Err(MtgError::invalid(format!(
                "X = {x} is more than the mana pool can pay (at most {max})"
            ))),
            None => Err(WaitingChoice::new(
                player,
                ChoiceKind::XValue,
                "Choose a value for X",
                vec![ChoiceOption::Range { min: 0, max }],
            )
            .into_error()),
        }
    }

    /// Validate chosen targets against the required target specs
    ///
    /// Missing targets suspend the action with the legal options for the
    /// first unfilled slot.
    pub(crate) fn check_targets(
        &self,
        chooser: PlayerId,
        source: Option<CardId>,
        specs: &[TargetSpec],
        chosen: &[TargetRef],
    ) -> Result<SmallVec<[TargetRef; 2]>> {
        if chosen.len() > specs.len() {
            return Err(MtgError::invalid(format!(
                "Too many targets: expected {}, got {}",
                specs.len(),
                chosen.len()
            )));
        }
        if let Some(spec) = specs.get(chosen.len()) {
            let legal = self.legal_targets(spec, chooser, source);
            if legal.is_empty() {
                return Err(MtgError::invalid(format!("No legal targets for {spec:?}")));
            }
            return Err(WaitingChoice::new(
                chooser,
                ChoiceKind::Targets,
                format!("Choose target {} of {} ({spec:?})", chosen.len() + 1, specs.len()),
                legal.into_iter().map(ChoiceOption::Target).collect(),
            )
            .into_error());
        }
        for (spec, target) in specs.iter().zip(chosen) {
            if !self.is_legal_target(spec, *target, chooser, source) {
                return Err(MtgError::invalid(format!(
                    "{target:?} is not a legal target for {spec:?}"
                )));
            }
        }
        Ok(chosen.iter().copied().collect())
    }

    /// Pay a mana cost (hybrid, Phyrexian and X included) from the pool
    pub(crate) fn pay_mana_cost(
        &mut self,
        player: PlayerId,
        cost: &ManaCost,
        x: u32,
    ) -> Result<()> {
        let p = self.player(player)?;
        let resolved = cost.resolve(&p.mana_pool, x);
        if resolved.life > 0 && p.life < resolved.life as i32 {
            return Err(MtgError::invalid(format!(
                "Not enough life to pay {} life",
                resolved.life
            )));
        }
        let pool = p.mana_pool.spend(&resolved.mana)?;
        let p = self.player_mut(player)?;
        p.mana_pool = pool;
        p.lose_life(resolved.life);
        Ok(())
    }
}

/// Validate chosen modes of a modal spell
fn choose_modes(player: PlayerId, abilities: &AbilitySet, chosen: &[usize]) -> Result<Vec<usize>> {
    if !abilities.is_modal() {
        if !chosen.is_empty() {
            return Err(MtgError::invalid("That spell has no modes"));
        }
        return Ok(Vec::new());
    }
    let required = abilities.modes_to_choose.max(1) as usize;
    if chosen.is_empty() {
        let options = abilities
            .modes
            .iter()
            .enumerate()
            .map(|(index, mode)| ChoiceOption::Mode {
                index,
                text: mode.text.clone(),
            })
            .collect();
        return Err(WaitingChoice::new(player, ChoiceKind::Modes, "Choose a mode", options)
            .choose(required as u32)
            .into_error());
    }
    if chosen.len() != required {
        return Err(MtgError::invalid(format!(
            "Choose exactly {required} mode(s)"
        )));
    }
    for (i, mode) in chosen.iter().enumerate() {
        if *mode >= abilities.modes.len() {
            return Err(MtgError::invalid(format!("There is no mode {mode}")));
        }
        if chosen[..i].contains(mode) {
            return Err(MtgError::invalid("The same mode can't be chosen twice"));
        }
    }
    Ok(chosen.to_vec())
}

/// The effects a spell will carry onto the stack
fn spell_effects(abilities: &AbilitySet, modes: &[usize]) -> Vec<EffectDescriptor> {
    if modes.is_empty() {
        return abilities.spell_effects.clone();
    }
    modes
        .iter()
        .filter_map(|m| abilities.modes.get(*m))
        .flat_map(|mode| mode.effects.iter().cloned())
        .collect()
}
