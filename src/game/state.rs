//! Main game state structure
//!
//! `GameState` is a plain value: the public action API clones it and applies
//! the action to the clone, so a caller's state is never modified. The
//! `&mut self` methods here are the building blocks those actions use.

use crate::core::{
    CardDefinition, CardId, CardInstance, EntityId, EntityStore, Player, PlayerId, PlayerName,
};
use crate::game::combat::CombatState;
use crate::game::phase::{next_player_in_order, Turn};
use crate::game::replacement::{EffectStore, RulesContext};
use crate::game::stack::StackObject;
use crate::game::triggers::PendingTrigger;
use crate::zones::{CardZone, Zone, ZoneKey};
use crate::{GameConfig, MtgError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lifecycle of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Complete game state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// All players in turn order (Vec for stable ordering, small count)
    pub players: Vec<Player>,

    /// All cards in the game
    pub cards: EntityStore<CardInstance>,

    /// Every zone, looked up by key
    zones: Vec<CardZone>,

    /// Spells and abilities waiting to resolve; the top is the last element
    pub stack: Vec<StackObject>,

    pub turn: Turn,

    /// Player who may act now, if anyone
    pub priority_player: Option<PlayerId>,

    /// Passes in a row since the last stack change or other action
    pub consecutive_passes: u32,

    pub status: GameStatus,

    /// Remaining players once the game is over; empty for a draw
    pub winners: Vec<PlayerId>,

    /// Replacement effects, prevention shields and "as though" grants
    pub effects: EffectStore,

    pub combat: CombatState,

    /// Triggered abilities waiting to be put on the stack
    pub pending_triggers: Vec<PendingTrigger>,

    pub config: GameConfig,

    /// Shuffle RNG; serialized so replays are deterministic
    rng: ChaCha12Rng,

    /// Unified entity ID generator (shared across all entity types)
    next_entity_id: u32,

    next_timestamp: u64,
}

impl GameState {
    /// Create a game for the named players, seated in the given order
    pub fn new<N: Into<PlayerName>>(
        names: impl IntoIterator<Item = N>,
        config: GameConfig,
    ) -> Self {
        let mut state = GameState {
            players: Vec::new(),
            cards: EntityStore::new(),
            zones: vec![
                CardZone::new(ZoneKey::shared(Zone::Battlefield)),
                CardZone::new(ZoneKey::shared(Zone::Stack)),
            ],
            stack: Vec::new(),
            turn: Turn::new(PlayerId::new(0)),
            priority_player: None,
            consecutive_passes: 0,
            status: GameStatus::NotStarted,
            winners: Vec::new(),
            effects: EffectStore::new(),
            combat: CombatState::default(),
            pending_triggers: Vec::new(),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            config,
            next_entity_id: 0,
            next_timestamp: 0,
        };

        for name in names {
            let id = state.next_id();
            let mut player = Player::new(id, name, state.config.starting_life);
            player.max_lands_per_turn = state.config.lands_per_turn;
            state.players.push(player);
            for zone in [Zone::Library, Zone::Hand, Zone::Graveyard, Zone::Exile, Zone::Command] {
                state.zones.push(CardZone::new(ZoneKey::player(zone, id)));
            }
        }
        if let Some(first) = state.players.first() {
            state.turn = Turn::new(first.id);
        }
        state
    }

    /// Get next entity ID (unified across all entity types)
    pub fn next_id<T>(&mut self) -> EntityId<T> {
        let id = EntityId::new(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn next_timestamp(&mut self) -> u64 {
        self.next_timestamp += 1;
        self.next_timestamp
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(MtgError::EntityNotFound(id.as_u32()))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(MtgError::EntityNotFound(id.as_u32()))
    }

    /// Look a player up by name
    pub fn player_named(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().find(|p| p.name.as_str() == name).map(|p| p.id)
    }

    pub fn card(&self, id: CardId) -> Result<&CardInstance> {
        self.cards.get(id)
    }

    pub fn zone(&self, key: ZoneKey) -> Result<&CardZone> {
        self.zones
            .iter()
            .find(|z| z.key == key)
            .ok_or_else(|| MtgError::InvariantViolation(format!("no zone {key:?}")))
    }

    fn zone_index(&self, key: ZoneKey) -> Result<usize> {
        self.zones
            .iter()
            .position(|z| z.key == key)
            .ok_or_else(|| MtgError::InvariantViolation(format!("no zone {key:?}")))
    }

    /// Replace a zone with a transformed copy of itself
    pub fn update_zone(
        &mut self,
        key: ZoneKey,
        f: impl FnOnce(CardZone) -> CardZone,
    ) -> Result<()> {
        let index = self.zone_index(key)?;
        let zone = std::mem::replace(&mut self.zones[index], CardZone::new(key));
        self.zones[index] = f(zone);
        Ok(())
    }

    fn cards_in(&self, key: ZoneKey) -> &[CardId] {
        self.zone(key).map(|z| z.cards.as_slice()).unwrap_or(&[])
    }

    pub fn library(&self, player: PlayerId) -> &[CardId] {
        self.cards_in(ZoneKey::player(Zone::Library, player))
    }

    pub fn hand(&self, player: PlayerId) -> &[CardId] {
        self.cards_in(ZoneKey::player(Zone::Hand, player))
    }

    pub fn graveyard(&self, player: PlayerId) -> &[CardId] {
        self.cards_in(ZoneKey::player(Zone::Graveyard, player))
    }

    pub fn exile(&self, player: PlayerId) -> &[CardId] {
        self.cards_in(ZoneKey::player(Zone::Exile, player))
    }

    /// Every permanent, in the order it entered
    pub fn battlefield(&self) -> &[CardId] {
        self.cards_in(ZoneKey::shared(Zone::Battlefield))
    }

    /// Permanents controlled by `player`
    pub fn battlefield_of(&self, player: PlayerId) -> Vec<CardId> {
        self.battlefield()
            .iter()
            .copied()
            .filter(|id| self.cards.get(*id).map(|c| c.controller == player).unwrap_or(false))
            .collect()
    }

    pub fn is_on_battlefield(&self, card: CardId) -> bool {
        self.battlefield().contains(&card)
    }

    /// The zone a card is in
    pub fn zone_of(&self, card: CardId) -> Option<ZoneKey> {
        self.zones.iter().find(|z| z.contains(card)).map(|z| z.key)
    }

    pub fn stack_object(&self, id: crate::core::StackObjectId) -> Option<&StackObject> {
        self.stack.iter().find(|o| o.id == id)
    }

    /// Create a card instance directly in a zone
    ///
    /// Used for deck loading and test setup. A card created on the
    /// battlefield gets its static abilities and starting loyalty but does
    /// not trigger anything.
    pub fn create_card(
        &mut self,
        definition: Arc<CardDefinition>,
        owner: PlayerId,
        zone: Zone,
    ) -> Result<CardId> {
        self.player(owner)?;
        let id: CardId = self.next_id();
        self.cards.insert(id, CardInstance::new(id, definition, owner));
        self.update_zone(ZoneKey::for_card(zone, owner), |z| z.add(id))?;
        if zone == Zone::Battlefield {
            self.register_permanent(id)?;
        }
        Ok(id)
    }

    /// Move a card to `to`, atomically
    ///
    /// The card ends up on top of the destination zone belonging to its
    /// owner (or the shared zone) and is absent from every other zone.
    pub fn move_card(&mut self, card: CardId, to: Zone) -> Result<()> {
        let owner = self.cards.get(card)?.owner;
        let from = self
            .zone_of(card)
            .ok_or_else(|| MtgError::InvariantViolation(format!("card {card} is in no zone")))?;
        let to_key = ZoneKey::for_card(to, owner);
        if from == to_key {
            return Ok(());
        }
        let from_index = self.zone_index(from)?;
        let to_index = self.zone_index(to_key)?;
        let origin = std::mem::replace(&mut self.zones[from_index], CardZone::new(from));
        let destination = std::mem::replace(&mut self.zones[to_index], CardZone::new(to_key));
        let (origin, destination) = CardZone::move_between(origin, destination, card);
        self.zones[from_index] = origin;
        self.zones[to_index] = destination;
        Ok(())
    }

    /// Take a card out of the game entirely (tokens leaving the battlefield)
    pub fn remove_card(&mut self, card: CardId) -> Result<()> {
        if let Some(key) = self.zone_of(card) {
            self.update_zone(key, |z| z.remove(card))?;
        }
        self.cards.remove(card);
        Ok(())
    }

    /// Shuffle a player's library using the game's RNG
    pub fn shuffle_library(&mut self, player: PlayerId) -> Result<()> {
        let key = ZoneKey::player(Zone::Library, player);
        let index = self.zone_index(key)?;
        let library = std::mem::replace(&mut self.zones[index], CardZone::new(key));
        self.zones[index] = library.shuffle(&mut self.rng);
        Ok(())
    }

    /// Put fresh instances of a deck into a player's library
    pub fn load_deck(
        &mut self,
        player: PlayerId,
        cards: impl IntoIterator<Item = Arc<CardDefinition>>,
    ) -> Result<Vec<CardId>> {
        cards
            .into_iter()
            .map(|def| self.create_card(def, player, Zone::Library))
            .collect()
    }

    /// Players still in the game, in seat order
    pub fn remaining_players(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| !p.has_lost).map(|p| p.id).collect()
    }

    /// Remaining players starting from the active player
    pub fn apnap_order(&self) -> Vec<PlayerId> {
        let remaining = self.remaining_players();
        let start = remaining
            .iter()
            .position(|p| *p == self.turn.active_player)
            .unwrap_or(0);
        (0..remaining.len())
            .map(|i| remaining[(start + i) % remaining.len()])
            .collect()
    }

    pub fn next_player_after(&self, player: PlayerId) -> PlayerId {
        next_player_in_order(&self.players, player)
    }

    pub fn opponents_of(&self, player: PlayerId) -> Vec<PlayerId> {
        self.remaining_players().into_iter().filter(|p| *p != player).collect()
    }

    pub fn holds_priority(&self, player: PlayerId) -> bool {
        self.status == GameStatus::InProgress && self.priority_player == Some(player)
    }

    pub fn is_active_player(&self, player: PlayerId) -> bool {
        self.turn.active_player == player
    }

    pub fn is_over(&self) -> bool {
        self.status == GameStatus::Completed
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl RulesContext for GameState {
    fn active_player(&self) -> PlayerId {
        self.turn.active_player
    }

    fn turn_order(&self) -> Vec<PlayerId> {
        self.remaining_players()
    }

    fn controller_of(&self, card: CardId) -> Option<PlayerId> {
        self.cards.get(card).ok().map(|c| c.controller)
    }

    fn turn_number(&self) -> u32 {
        self.turn.turn_number
    }

    fn stack_is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CardFace, ManaCost, TypeLine};

    fn forest() -> Arc<CardDefinition> {
        Arc::new(CardDefinition::single(CardFace::new(
            "Forest",
            TypeLine::parse("Basic Land — Forest").unwrap(),
            ManaCost::new(),
        )))
    }

    #[test]
    fn test_new_game() {
        let game = GameState::new(["Alice", "Bob"], GameConfig::default());
        assert_eq!(game.players.len(), 2);
        assert_eq!(game.players[0].life, 20);
        assert_eq!(game.turn.active_player, game.players[0].id);
        assert_eq!(game.status, GameStatus::NotStarted);
        assert!(game.library(game.players[1].id).is_empty());
    }

    #[test]
    fn test_move_card_is_atomic() {
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default());
        let alice = game.players[0].id;
        let card = game.create_card(forest(), alice, Zone::Hand).unwrap();

        game.move_card(card, Zone::Graveyard).unwrap();
        assert!(!game.hand(alice).contains(&card));
        assert!(game.graveyard(alice).contains(&card));
        assert_eq!(
            game.zones.iter().filter(|z| z.contains(card)).count(),
            1,
            "a card is in exactly one zone"
        );

        game.move_card(card, Zone::Battlefield).unwrap();
        assert!(game.is_on_battlefield(card));
        assert_eq!(game.zone_of(card), Some(ZoneKey::shared(Zone::Battlefield)));
    }

    #[test]
    fn test_load_deck_and_shuffle_deterministic() {
        let mut a = GameState::new(["Alice", "Bob"], GameConfig::default().with_seed(42));
        let mut b = a.clone();
        let alice = a.players[0].id;
        a.load_deck(alice, (0..10).map(|_| forest())).unwrap();
        b.load_deck(alice, (0..10).map(|_| forest())).unwrap();
        a.shuffle_library(alice).unwrap();
        b.shuffle_library(alice).unwrap();
        assert_eq!(a.library(alice), b.library(alice));
        assert_eq!(a.library(alice).len(), 10);
    }

    #[test]
    fn test_json_snapshot() {
        let mut game = GameState::new(["Alice", "Bob"], GameConfig::default());
        let alice = game.players[0].id;
        game.create_card(forest(), alice, Zone::Hand).unwrap();
        let json = game.to_json().unwrap();
        let restored = GameState::from_json(&json).unwrap();
        assert_eq!(restored.hand(alice), game.hand(alice));
        assert_eq!(restored.to_json().unwrap(), json);
    }

    #[test]
    fn test_missing_entities_are_invariant_errors() {
        let game = GameState::new(["Alice"], GameConfig::default());
        assert!(matches!(
            game.card(CardId::new(99)),
            Err(MtgError::EntityNotFound(99))
        ));
        assert!(game.player(PlayerId::new(99)).is_err());
    }
}
