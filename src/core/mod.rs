//! Core game types: entities, cards, players, mana, costs and ability descriptors

pub mod card;
pub mod costs;
pub mod effects;
pub mod entity;
pub mod mana;
pub mod player;
pub mod types;

pub use card::{CardDefinition, CardFace, CardInstance, CardType, PtValue, Supertype, TypeLine};
pub use costs::{ActivationCost, SacrificeCost};
pub use effects::{
    AbilitySet, ActivatedAbility, Amount, DamageScope, EffectDescriptor, EffectKind, Keyword,
    LoyaltyAbility, ModeDescriptor, PreventionAmount, Recipient, SearchFilter, StaticAbility,
    TargetRef, TargetSpec, TokenSpec, TriggerEvent, TriggerSubject, TriggeredAbility,
};
pub use entity::{EntityId, EntityStore, GameEntity};
pub use mana::{Color, HybridSymbol, ManaCost, ManaPool, ManaType, ResolvedCost};
pub use player::{LossReason, Player};
pub use types::{normalize_card_name, CardName, CounterType, PlayerName, Subtype};

/// Id of a card instance
pub type CardId = EntityId<CardInstance>;

/// Id of a player
pub type PlayerId = EntityId<Player>;

/// Id of an object on the stack
pub type StackObjectId = EntityId<crate::game::StackObject>;
