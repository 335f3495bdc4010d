//! State-based actions and game-over detection

use crate::core::{CardId, CardType, LossReason, PlayerId};
use crate::game::{GameState, GameStatus};
use crate::zones::Zone;
use crate::Result;

impl GameState {
    /// Check state-based actions until none apply
    ///
    /// Players who lose do so simultaneously, so two players dropping to
    /// zero life together draw a two-player game. Returns whether anything
    /// happened.
    pub fn check_state_based_actions(&mut self) -> Result<bool> {
        let mut any = false;
        loop {
            if self.status != GameStatus::InProgress {
                return Ok(any);
            }
            let losers = self.losing_players();
            let permanents = self.doomed_permanents()?;
            if losers.is_empty() && permanents.is_empty() {
                return Ok(any);
            }
            any = true;

            for (player, reason) in &losers {
                self.player_mut(*player)?.lose(*reason);
            }
            for (player, _) in losers {
                self.player_left(player)?;
            }

            let mut changed = false;
            for (card, destroy) in permanents {
                if !self.is_on_battlefield(card) {
                    continue;
                }
                if destroy {
                    self.destroy(card)?;
                } else {
                    self.remove_from_battlefield(card, Zone::Graveyard)?;
                }
                changed |= !self.is_on_battlefield(card);
            }
            // An indestructible creature with lethal damage stays put
            if !changed && self.losing_players().is_empty() {
                return Ok(any);
            }
        }
    }

    fn losing_players(&self) -> Vec<(PlayerId, LossReason)> {
        self.players
            .iter()
            .filter(|p| !p.has_lost)
            .filter_map(|p| {
                let reason = if p.life <= 0 {
                    LossReason::LifeTotal
                } else if p.poison >= self.config.poison_threshold {
                    LossReason::Poison
                } else if p.drew_from_empty_library {
                    LossReason::EmptyLibrary
                } else {
                    return None;
                };
                Some((p.id, reason))
            })
            .collect()
    }

    /// Permanents that must leave, and whether they are destroyed or just put away
    fn doomed_permanents(&self) -> Result<Vec<(CardId, bool)>> {
        let mut doomed = Vec::new();
        for &id in self.battlefield() {
            let card = self.card(id)?;
            if card.is_creature() {
                let toughness = card.toughness();
                if toughness <= 0 {
                    doomed.push((id, false));
                } else if card.damage as i32 >= toughness
                    || (card.deathtouch_damage && card.damage > 0)
                {
                    doomed.push((id, true));
                }
            } else if card.is_planeswalker() && card.loyalty() == 0 {
                doomed.push((id, false));
            } else if card.is_type(CardType::Enchantment)
                && card.abilities().enchant.is_some()
                && !card
                    .attached_to
                    .map(|host| self.is_on_battlefield(host))
                    .unwrap_or(false)
            {
                doomed.push((id, false));
            }
        }
        Ok(doomed)
    }

    /// End the game once at most one player remains
    ///
    /// A one-player game only ends when that player is gone too.
    pub fn check_game_over(&mut self) {
        if self.status != GameStatus::InProgress {
            return;
        }
        let remaining = self.remaining_players();
        let ended = if self.players.len() > 1 {
            remaining.len() <= 1
        } else {
            remaining.is_empty()
        };
        if ended {
            self.status = GameStatus::Completed;
            self.winners = remaining;
            self.priority_player = None;
        }
    }

    /// Bring the state to rest before anyone gets priority
    ///
    /// State-based actions first, then waiting triggers go on the stack.
    pub(crate) fn settle(&mut self) -> Result<()> {
        self.check_state_based_actions()?;
        self.check_game_over();
        if self.is_over() {
            self.priority_player = None;
            return Ok(());
        }
        self.flush_triggers();
        Ok(())
    }
}
