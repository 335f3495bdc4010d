//! Core game state, turn structure and the rules engine

mod abilities;
pub mod actions;
mod casting;
pub mod combat;
mod events;
pub mod logger;
pub mod phase;
mod priority;
pub mod replacement;
mod resolve;
mod sba;
pub mod session;
pub mod stack;
pub mod state;
mod targeting;
pub mod triggers;

pub use actions::{
    ActionResult, ActivateOptions, CastOptions, ChoiceKind, ChoiceOption, GameAction,
    WaitingChoice,
};
pub use combat::{Attack, CombatState};
pub use logger::{GameLogger, LogEntry, LogKind, OutputMode, VerbosityLevel};
pub use phase::{next_player_in_order, Phase, Step, Turn};
pub use replacement::{
    AsThoughGrant, Capability, EffectDuration, EffectStore, EventFilter, EventTransform,
    GameEvent, PreventionShield, ReplacementEffect, ReplacementOutcome, RulesContext,
};
pub use resolve::token_definition;
pub use session::GameSession;
pub use stack::{StackObject, StackObjectKind};
pub use state::{GameState, GameStatus};
pub use triggers::{PendingTrigger, TriggerOccurrence};
