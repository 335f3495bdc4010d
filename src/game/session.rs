//! A running game: the latest snapshot, its history and a logger
//!
//! Actions are applied one at a time against the latest snapshot. The
//! session is the only place that logs; the rules core just describes what
//! happened.

use crate::game::actions::{ActionResult, GameAction};
use crate::game::logger::{GameLogger, LogKind};
use crate::game::GameState;
use crate::{MtgError, Result};
use std::collections::VecDeque;

/// Formatting-heavy log calls compile to nothing without `verbose-logging`
macro_rules! log_if_verbose {
    ($self:expr, $kind:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            let message = format!($($arg)*);
            $self.note($kind, message);
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$self;
        }
    };
}

#[derive(Debug, Clone)]
pub struct GameSession {
    state: GameState,
    /// Earlier snapshots, oldest first
    history: VecDeque<GameState>,
    logger: GameLogger,
}

impl GameSession {
    pub fn new(state: GameState) -> Self {
        Self::with_logger(state, GameLogger::new())
    }

    pub fn with_logger(state: GameState, logger: GameLogger) -> Self {
        GameSession {
            state,
            history: VecDeque::new(),
            logger,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn logger(&self) -> &GameLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut GameLogger {
        &mut self.logger
    }

    /// Snapshots available to `rollback`
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn note(&mut self, kind: LogKind, message: String) {
        let turn = self.state.turn.turn_number;
        self.logger.log(kind, turn, message);
    }

    fn record(&mut self, next: GameState) {
        let previous = std::mem::replace(&mut self.state, next);
        self.history.push_back(previous);
        while self.history.len() > self.state.config.history_limit {
            self.history.pop_front();
        }
    }

    /// Shuffle up and deal
    pub fn start(&mut self) -> Result<()> {
        let started = self.state.start_game()?;
        self.record(started);
        let names: Vec<String> = self
            .state
            .players
            .iter()
            .map(|p| p.name.to_string())
            .collect();
        self.note(LogKind::Setup, format!("Game started: {}", names.join(" vs ")));
        log_if_verbose!(
            self,
            LogKind::Turn,
            "Turn {}: {} ({})",
            self.state.turn.turn_number,
            self.state.player(self.state.turn.active_player)?.name,
            self.state.turn.step
        );
        Ok(())
    }

    /// Apply one action to the latest snapshot
    ///
    /// Accepted actions become the new snapshot; rejected or suspended ones
    /// leave the session untouched.
    pub fn apply(&mut self, action: &GameAction) -> Result<ActionResult> {
        let result = action.apply(&self.state)?;
        if !result.success {
            let reason = result.error.as_deref().unwrap_or("rejected");
            let message = format!("Rejected: {reason}");
            self.note(LogKind::Rejected, message);
            return Ok(result);
        }

        let turn_before = self.state.turn.turn_number;
        self.record(result.state.clone());
        if let Some(description) = &result.description {
            log_if_verbose!(self, LogKind::Action, "{description}");
        }
        if self.state.turn.turn_number != turn_before {
            log_if_verbose!(
                self,
                LogKind::Turn,
                "Turn {}: {}",
                self.state.turn.turn_number,
                self.state.player(self.state.turn.active_player)?.name
            );
        }
        if self.state.is_over() {
            let outcome = self.outcome();
            self.note(LogKind::Outcome, outcome);
        }
        Ok(result)
    }

    /// Undo the last `steps` accepted actions
    pub fn rollback(&mut self, steps: usize) -> Result<()> {
        if steps > self.history.len() {
            return Err(MtgError::invalid(format!(
                "Only {} snapshot(s) are available",
                self.history.len()
            )));
        }
        for _ in 0..steps {
            if let Some(previous) = self.history.pop_back() {
                self.state = previous;
            }
        }
        Ok(())
    }

    /// One line describing how the game ended
    pub fn outcome(&self) -> String {
        if !self.state.is_over() {
            return "Game in progress".to_string();
        }
        let names: Vec<String> = self
            .state
            .winners
            .iter()
            .filter_map(|id| self.state.player(*id).ok())
            .map(|p| p.name.to_string())
            .collect();
        match names.as_slice() {
            [] => format!("Game drawn on turn {}", self.state.turn.turn_number),
            [winner] => format!("{winner} wins on turn {}", self.state.turn.turn_number),
            _ => format!("{} share the win", names.join(", ")),
        }
    }
}
