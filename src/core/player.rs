//! Player representation

use crate::core::{GameEntity, ManaPool, PlayerId, PlayerName};
use serde::{Deserialize, Serialize};

/// Why a player left the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    LifeTotal,
    Poison,
    EmptyLibrary,
    Conceded,
}

/// Represents a player in the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique ID for this player
    pub id: PlayerId,

    /// Player name
    pub name: PlayerName,

    /// Life total
    pub life: i32,

    pub poison: u32,

    /// Mana pool
    pub mana_pool: ManaPool,

    /// Lands played this turn
    pub lands_played_this_turn: u32,

    /// Maximum lands per turn (usually 1, raised by effects)
    pub max_lands_per_turn: u32,

    /// Passed priority since the last stack change
    pub passed_priority: bool,

    /// Activated a mana ability while holding priority
    pub activated_mana_ability: bool,

    pub offered_draw: bool,

    /// Tried to draw from an empty library since the last state check
    pub drew_from_empty_library: bool,

    /// Has the player lost?
    pub has_lost: bool,

    pub loss_reason: Option<LossReason>,
}

/// Life totals are `i32`; amounts past its range clamp
fn life_delta(amount: u32) -> i32 {
    i32::try_from(amount).unwrap_or(i32::MAX)
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<PlayerName>, starting_life: i32) -> Self {
        Player {
            id,
            name: name.into(),
            life: starting_life,
            poison: 0,
            mana_pool: ManaPool::new(),
            lands_played_this_turn: 0,
            max_lands_per_turn: 1,
            passed_priority: false,
            activated_mana_ability: false,
            offered_draw: false,
            drew_from_empty_library: false,
            has_lost: false,
            loss_reason: None,
        }
    }

    pub fn gain_life(&mut self, amount: u32) {
        self.life = self.life.saturating_add(life_delta(amount));
    }

    /// Losing life never ends the game by itself; state-based actions do
    pub fn lose_life(&mut self, amount: u32) {
        self.life = self.life.saturating_sub(life_delta(amount));
    }

    pub fn add_poison(&mut self, amount: u32) {
        self.poison = self.poison.saturating_add(amount);
    }

    pub fn has_land_play(&self) -> bool {
        self.lands_played_this_turn < self.max_lands_per_turn
    }

    pub fn play_land(&mut self) {
        self.lands_played_this_turn += 1;
    }

    pub fn reset_lands_played(&mut self) {
        self.lands_played_this_turn = 0;
    }

    pub fn empty_mana_pool(&mut self) {
        self.mana_pool = self.mana_pool.emptied();
    }

    /// Mark the player as out of the game; the first reason sticks
    pub fn lose(&mut self, reason: LossReason) {
        if !self.has_lost {
            self.has_lost = true;
            self.loss_reason = Some(reason);
        }
    }
}

impl GameEntity<Player> for Player {
    fn id(&self) -> PlayerId {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManaType;

    #[test]
    fn test_player_creation() {
        let id = PlayerId::new(1);
        let player = Player::new(id, "Alice", 20);

        assert_eq!(player.id, id);
        assert_eq!(player.name.as_str(), "Alice");
        assert_eq!(player.life, 20);
        assert!(!player.has_lost);
    }

    #[test]
    fn test_player_life() {
        let mut player = Player::new(PlayerId::new(1), "Bob", 20);

        player.lose_life(25);
        assert_eq!(player.life, -5);
        assert!(!player.has_lost);

        player.gain_life(10);
        assert_eq!(player.life, 5);
    }

    #[test]
    fn test_huge_life_changes_clamp() {
        let mut player = Player::new(PlayerId::new(1), "Cleo", 20);
        player.lose_life(u32::MAX);
        assert!(player.life < 0);

        let mut player = Player::new(PlayerId::new(2), "Dev", 20);
        player.gain_life(u32::MAX);
        assert_eq!(player.life, i32::MAX);
    }

    #[test]
    fn test_loss_reason_is_sticky() {
        let mut player = Player::new(PlayerId::new(1), "Dana", 20);
        player.lose(LossReason::Poison);
        player.lose(LossReason::Conceded);
        assert_eq!(player.loss_reason, Some(LossReason::Poison));
    }

    #[test]
    fn test_land_playing() {
        let mut player = Player::new(PlayerId::new(1), "Charlie", 20);

        assert!(player.has_land_play());
        player.play_land();
        assert!(!player.has_land_play());

        player.max_lands_per_turn = 2;
        assert!(player.has_land_play());

        player.reset_lands_played();
        assert_eq!(player.lands_played_this_turn, 0);
    }

    #[test]
    fn test_empty_mana_pool() {
        let mut player = Player::new(PlayerId::new(1), "Eve", 20);
        player.mana_pool = player.mana_pool.add(ManaType::Red, 3);
        player.empty_mana_pool();
        assert!(player.mana_pool.is_empty());
        player.empty_mana_pool();
        assert!(player.mana_pool.is_empty());
    }
}
