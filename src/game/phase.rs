//! Turn phases and steps
//!
//! Thirteen steps in a fixed total order. `Turn` is a small value type; every
//! transition returns a new `Turn`.

use crate::core::{Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Major phases of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Beginning,
    PrecombatMain,
    Combat,
    PostcombatMain,
    Ending,
}

/// Specific steps within phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    // Beginning Phase
    Untap,
    Upkeep,
    Draw,

    // Pre-Combat Main Phase
    PrecombatMain,

    // Combat Phase
    BeginCombat,
    DeclareAttackers,
    DeclareBlockers,
    CombatDamageFirstStrike,
    CombatDamage,
    EndCombat,

    // Post-Combat Main Phase
    PostcombatMain,

    // Ending Phase
    End,
    Cleanup,
}

impl Step {
    /// Every step in turn order
    pub const ALL: [Step; 13] = [
        Step::Untap,
        Step::Upkeep,
        Step::Draw,
        Step::PrecombatMain,
        Step::BeginCombat,
        Step::DeclareAttackers,
        Step::DeclareBlockers,
        Step::CombatDamageFirstStrike,
        Step::CombatDamage,
        Step::EndCombat,
        Step::PostcombatMain,
        Step::End,
        Step::Cleanup,
    ];

    /// Get the phase this step belongs to
    pub fn phase(&self) -> Phase {
        match self {
            Step::Untap | Step::Upkeep | Step::Draw => Phase::Beginning,
            Step::PrecombatMain => Phase::PrecombatMain,
            Step::BeginCombat
            | Step::DeclareAttackers
            | Step::DeclareBlockers
            | Step::CombatDamageFirstStrike
            | Step::CombatDamage
            | Step::EndCombat => Phase::Combat,
            Step::PostcombatMain => Phase::PostcombatMain,
            Step::End | Step::Cleanup => Phase::Ending,
        }
    }

    /// Get the next step in turn order; `None` after cleanup
    pub fn next(&self) -> Option<Step> {
        let index = Step::ALL.iter().position(|s| s == self)?;
        Step::ALL.get(index + 1).copied()
    }

    pub fn is_main(&self) -> bool {
        matches!(self, Step::PrecombatMain | Step::PostcombatMain)
    }

    pub fn is_combat(&self) -> bool {
        self.phase() == Phase::Combat
    }

    pub fn is_beginning(&self) -> bool {
        self.phase() == Phase::Beginning
    }

    pub fn is_ending(&self) -> bool {
        self.phase() == Phase::Ending
    }

    /// Players receive priority in every step except untap and cleanup
    pub fn players_get_priority(&self) -> bool {
        !matches!(self, Step::Untap | Step::Cleanup)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Untap => "untap step",
            Step::Upkeep => "upkeep",
            Step::Draw => "draw step",
            Step::PrecombatMain => "precombat main phase",
            Step::BeginCombat => "beginning of combat",
            Step::DeclareAttackers => "declare attackers step",
            Step::DeclareBlockers => "declare blockers step",
            Step::CombatDamageFirstStrike => "first-strike damage step",
            Step::CombatDamage => "combat damage step",
            Step::EndCombat => "end of combat",
            Step::PostcombatMain => "postcombat main phase",
            Step::End => "end step",
            Step::Cleanup => "cleanup step",
        };
        write!(f, "{name}")
    }
}

/// Represents the current turn structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Active player (whose turn it is)
    pub active_player: PlayerId,

    /// Current step
    pub step: Step,

    /// Current turn number (starts at 1)
    pub turn_number: u32,

    /// Extra turns the active player will take after this one
    pub extra_turns: u32,

    /// The game's very first turn
    pub is_first_turn: bool,
}

impl Turn {
    pub fn new(starting_player: PlayerId) -> Self {
        Turn {
            active_player: starting_player,
            step: Step::Untap,
            turn_number: 1,
            extra_turns: 0,
            is_first_turn: true,
        }
    }

    pub fn current_phase(&self) -> Phase {
        self.step.phase()
    }

    /// Advance to the next step, holding at cleanup
    pub fn advance_phase(&self) -> Turn {
        Turn {
            step: self.step.next().unwrap_or(Step::Cleanup),
            ..self.clone()
        }
    }

    /// Begin the following turn at the untap step
    ///
    /// A pending extra turn is consumed first and keeps the active player;
    /// otherwise the turn passes to the next player in `players` who has not
    /// lost.
    pub fn start_next_turn(&self, players: &[Player]) -> Turn {
        let (active_player, extra_turns) = if self.extra_turns > 0 {
            (self.active_player, self.extra_turns - 1)
        } else {
            (next_player_in_order(players, self.active_player), 0)
        };
        Turn {
            active_player,
            step: Step::Untap,
            turn_number: self.turn_number + 1,
            extra_turns,
            is_first_turn: false,
        }
    }

    pub fn add_extra_turns(&self, count: u32) -> Turn {
        Turn {
            extra_turns: self.extra_turns + count,
            ..self.clone()
        }
    }

    pub fn has_extra_turn(&self) -> bool {
        self.extra_turns > 0
    }
}

/// The player after `current` in turn order, skipping players who have lost
///
/// Returns `current` when nobody else remains.
pub fn next_player_in_order(players: &[Player], current: PlayerId) -> PlayerId {
    let Some(start) = players.iter().position(|p| p.id == current) else {
        return current;
    };
    (1..=players.len())
        .map(|offset| &players[(start + offset) % players.len()])
        .find(|p| !p.has_lost)
        .map(|p| p.id)
        .unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players(n: u32) -> Vec<Player> {
        (0..n)
            .map(|i| Player::new(PlayerId::new(i), format!("P{i}"), 20))
            .collect()
    }

    #[test]
    fn test_step_phases() {
        assert_eq!(Step::Untap.phase(), Phase::Beginning);
        assert_eq!(Step::PrecombatMain.phase(), Phase::PrecombatMain);
        assert_eq!(Step::CombatDamageFirstStrike.phase(), Phase::Combat);
        assert_eq!(Step::PostcombatMain.phase(), Phase::PostcombatMain);
        assert_eq!(Step::Cleanup.phase(), Phase::Ending);
    }

    #[test]
    fn test_phase_total_order_holds_at_cleanup() {
        let mut turn = Turn::new(PlayerId::new(0));
        let mut visited = vec![turn.step];
        for _ in 0..13 {
            turn = turn.advance_phase();
            visited.push(turn.step);
        }
        assert_eq!(&visited[..13], &Step::ALL[..]);
        assert_eq!(turn.step, Step::Cleanup);
        assert_eq!(turn.turn_number, 1);
        assert_eq!(turn.current_phase(), Phase::Ending);
        assert_eq!(Step::Cleanup.next(), None);
    }

    #[test]
    fn test_classification() {
        assert!(Step::PrecombatMain.is_main());
        assert!(Step::PostcombatMain.is_main());
        assert!(!Step::Upkeep.is_main());
        assert!(Step::DeclareBlockers.is_combat());
        assert!(Step::Draw.is_beginning());
        assert!(Step::End.is_ending());
        assert!(!Step::Untap.players_get_priority());
        assert!(!Step::Cleanup.players_get_priority());
        assert!(Step::End.players_get_priority());
    }

    #[test]
    fn test_start_next_turn_rotates_players() {
        let players = players(3);
        let turn = Turn::new(PlayerId::new(0));
        let next = turn.start_next_turn(&players);
        assert_eq!(next.active_player, PlayerId::new(1));
        assert_eq!(next.turn_number, 2);
        assert_eq!(next.step, Step::Untap);
        assert!(!next.is_first_turn);
    }

    #[test]
    fn test_start_next_turn_skips_lost_players() {
        let mut players = players(3);
        players[1].has_lost = true;
        let next = Turn::new(PlayerId::new(0)).start_next_turn(&players);
        assert_eq!(next.active_player, PlayerId::new(2));
    }

    #[test]
    fn test_extra_turns_consumed_one_at_a_time() {
        let players = players(2);
        let mut turn = Turn::new(PlayerId::new(0)).add_extra_turns(3);
        assert!(turn.has_extra_turn());

        for expected in [2, 1, 0] {
            assert!(turn.has_extra_turn());
            turn = turn.start_next_turn(&players);
            assert_eq!(turn.extra_turns, expected);
            assert_eq!(turn.active_player, PlayerId::new(0));
        }
        assert!(!turn.has_extra_turn());
        assert_eq!(turn.start_next_turn(&players).active_player, PlayerId::new(1));
    }
}
