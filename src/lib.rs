//! MTG rules engine
//!
//! A turn-based trading-card-game rules core: timing, priority, the stack,
//! mana payment and layered replacement effects, modelled as pure
//! state transitions over an immutable `GameState`.

pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod loader;
pub mod zones;

pub use config::GameConfig;
pub use error::{MtgError, Result};
