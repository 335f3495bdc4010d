//! Priority, step transitions and turn-based actions
//!
//! When every remaining player passes in succession the top of the stack
//! resolves, or with an empty stack the game moves to the next step. Steps
//! in which nobody gets priority are run straight through.

use crate::core::{LossReason, PlayerId};
use crate::game::combat::CombatState;
use crate::game::phase::Turn;
use crate::game::triggers::TriggerOccurrence;
use crate::game::{GameState, GameStatus, Step};
use crate::zones::Zone;
use crate::{MtgError, Result};

impl GameState {
    pub(crate) fn require_priority(&self, player: PlayerId) -> Result<()> {
        if self.holds_priority(player) {
            return Ok(());
        }
        Err(MtgError::invalid(format!(
            "{} does not have priority",
            self.player(player)?.name
        )))
    }

    /// Forget every pass; a new round of priority starts
    pub(crate) fn reset_priority_passes(&mut self) {
        for player in &mut self.players {
            player.passed_priority = false;
        }
        self.consecutive_passes = 0;
    }

    pub(crate) fn do_pass_priority(&mut self, player: PlayerId) -> Result<String> {
        self.require_priority(player)?;
        self.player_mut(player)?.passed_priority = true;
        self.consecutive_passes += 1;
        let name = self.player(player)?.name.clone();

        if (self.consecutive_passes as usize) < self.remaining_players().len() {
            self.priority_player = Some(self.next_player_after(player));
            return Ok(format!("{name} passes priority"));
        }

        if !self.stack.is_empty() {
            let description = self.resolve_top()?;
            self.reset_priority_passes();
            self.settle()?;
            if !self.is_over() {
                self.priority_player = Some(self.turn.active_player);
            }
            return Ok(description);
        }

        self.advance_step()?;
        Ok(format!("{name} passes priority; {}", self.turn.step))
    }

    /// Move to the next step in which a player gets priority
    ///
    /// Mana empties at every step boundary. Untap always runs straight
    /// through; cleanup does too unless something went on the stack.
    pub(crate) fn advance_step(&mut self) -> Result<()> {
        loop {
            for player in &mut self.players {
                player.empty_mana_pool();
            }
            self.turn = if self.turn.step == Step::Cleanup {
                self.combat = CombatState::default();
                self.turn.start_next_turn(&self.players)
            } else {
                self.turn.advance_phase()
            };
            self.begin_step()?;
            self.settle()?;
            if self.is_over() {
                return Ok(());
            }

            let step = self.turn.step;
            if step.players_get_priority() || (step == Step::Cleanup && !self.stack.is_empty()) {
                break;
            }
        }
        self.priority_player = Some(self.turn.active_player);
        self.reset_priority_passes();
        Ok(())
    }

    /// Turn-based actions at the start of a step, then "at the beginning of" triggers
    pub(crate) fn begin_step(&mut self) -> Result<()> {
        let active = self.turn.active_player;
        let step = self.turn.step;
        match step {
            Step::Untap => self.untap_step(active)?,
            Step::Draw => {
                if !(self.turn.is_first_turn && self.config.skip_first_draw) {
                    self.draw_cards(active, 1)?;
                }
            }
            Step::CombatDamageFirstStrike => self.combat_damage_step(true)?,
            Step::CombatDamage => self.combat_damage_step(false)?,
            Step::Cleanup => self.cleanup_step(active)?,
            _ => {}
        }
        self.queue_triggers(TriggerOccurrence::step_begins(step, active));
        Ok(())
    }

    fn untap_step(&mut self, active: PlayerId) -> Result<()> {
        for card in self.battlefield().to_vec() {
            let controlled = self.card(card)?.controller == active;
            self.cards.update(card, |c| {
                let c = c.reset_turn_limits();
                if controlled {
                    let mut c = c.untap();
                    c.summoning_sick = false;
                    c
                } else {
                    c
                }
            })?;
        }
        for player in &mut self.players {
            player.reset_lands_played();
            player.activated_mana_ability = false;
        }
        Ok(())
    }

    fn cleanup_step(&mut self, active: PlayerId) -> Result<()> {
        let max = self.config.max_hand_size as usize;
        while self.hand(active).len() > max {
            let Some(&card) = self.hand(active).last() else {
                break;
            };
            self.relocate(card, Zone::Graveyard, active)?;
        }
        for card in self.battlefield().to_vec() {
            self.cards.update(card, |c| c.clear_damage())?;
        }
        self.effects.expire_end_of_turn(self.turn.turn_number);
        self.combat = CombatState::default();
        Ok(())
    }

    /// Shuffle, deal opening hands and begin the first turn
    ///
    /// The first player in seat order starts. Opening hands are dealt
    /// straight from the library and are not draws.
    pub fn start_game(&self) -> Result<GameState> {
        if self.status != GameStatus::NotStarted {
            return Err(MtgError::invalid("The game has already started"));
        }
        let first = self
            .players
            .first()
            .map(|p| p.id)
            .ok_or_else(|| MtgError::InvariantViolation("a game needs players".to_string()))?;

        let mut state = self.clone();
        state.status = GameStatus::InProgress;
        let players: Vec<PlayerId> = state.players.iter().map(|p| p.id).collect();
        for player in players {
            state.shuffle_library(player)?;
            for _ in 0..state.config.opening_hand_size {
                let Some(&card) = state.library(player).last() else {
                    break;
                };
                state.move_card(card, Zone::Hand)?;
            }
        }

        state.turn = Turn::new(first);
        state.begin_step()?;
        state.advance_step()?;
        Ok(state)
    }

    /// Clean up after a player leaves the game
    ///
    /// Their spells, abilities and pending triggers vanish and the cards
    /// they own leave the battlefield. If it was their turn the next turn
    /// begins; if they held priority it moves on.
    pub(crate) fn player_left(&mut self, player: PlayerId) -> Result<()> {
        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.stack)
            .into_iter()
            .partition(|o| o.controller == player);
        self.stack = kept;
        for object in gone.into_iter().filter(|o| o.is_spell()) {
            self.relocate(object.source_card(), Zone::Exile, player)?;
        }
        self.pending_triggers.retain(|t| t.controller != player);

        for card in self.battlefield().to_vec() {
            let instance = self.card(card)?;
            if instance.owner == player {
                self.remove_from_battlefield(card, Zone::Exile)?;
            } else if instance.controller == player {
                let owner = instance.owner;
                self.gain_control(card, owner)?;
            }
        }
        self.combat.attacks.retain(|a| a.defender != player);
        // Passes made with them still in the game no longer count
        self.reset_priority_passes();

        self.check_game_over();
        if self.is_over() {
            return Ok(());
        }
        if self.is_active_player(player) {
            self.turn.extra_turns = 0;
            self.turn.step = Step::Cleanup;
            self.advance_step()?;
        } else if self.priority_player == Some(player) {
            self.priority_player = Some(self.next_player_after(player));
        }
        Ok(())
    }

    pub(crate) fn do_concede(&mut self, player: PlayerId) -> Result<String> {
        self.player_mut(player)?.lose(LossReason::Conceded);
        self.player_left(player)?;
        Ok(format!("{} concedes", self.player(player)?.name))
    }

    pub(crate) fn do_offer_draw(&mut self, player: PlayerId) -> Result<String> {
        if self.player(player)?.offered_draw {
            return Err(MtgError::invalid("A draw has already been offered"));
        }
        self.player_mut(player)?.offered_draw = true;
        let name = self.player(player)?.name.clone();
        if self.everyone_agreed_to_draw() {
            self.end_in_draw();
            return Ok(format!("{name} offers a draw; the game is drawn"));
        }
        Ok(format!("{name} offers a draw"))
    }

    pub(crate) fn do_accept_draw(&mut self, player: PlayerId) -> Result<String> {
        if !self.draw_offered_by_another(player) {
            return Err(MtgError::invalid("There is no draw offer to accept"));
        }
        self.player_mut(player)?.offered_draw = true;
        let name = self.player(player)?.name.clone();
        if self.everyone_agreed_to_draw() {
            self.end_in_draw();
            return Ok(format!("{name} accepts the draw; the game is drawn"));
        }
        Ok(format!("{name} accepts the draw"))
    }

    pub(crate) fn do_decline_draw(&mut self, player: PlayerId) -> Result<String> {
        if !self.draw_offered_by_another(player) {
            return Err(MtgError::invalid("There is no draw offer to decline"));
        }
        for p in &mut self.players {
            p.offered_draw = false;
        }
        Ok(format!("{} declines the draw", self.player(player)?.name))
    }

    fn draw_offered_by_another(&self, player: PlayerId) -> bool {
        self.players
            .iter()
            .any(|p| p.id != player && !p.has_lost && p.offered_draw)
    }

    fn everyone_agreed_to_draw(&self) -> bool {
        self.players
            .iter()
            .filter(|p| !p.has_lost)
            .all(|p| p.offered_draw)
    }

    fn end_in_draw(&mut self) {
        self.status = GameStatus::Completed;
        self.winners.clear();
        self.priority_player = None;
    }
}
