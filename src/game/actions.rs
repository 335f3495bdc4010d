//! Player actions
//!
//! Every action takes `&self` and returns an `ActionResult`: the action is
//! applied to a copy of the state, and a rule violation hands back the
//! original state untouched with a reason. Only invariant violations come
//! back as `Err`.

use crate::core::{CardId, Color, PlayerId, TargetRef};
use crate::game::{GameState, GameStatus};
use crate::{MtgError, Result};
use serde::{Deserialize, Serialize};

/// The kind of input an action is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceKind {
    Targets,
    Modes,
    XValue,
    ManaColor,
    Sacrifice,
    Discard,
}

/// One valid answer to a `WaitingChoice`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceOption {
    Target(TargetRef),
    Mode { index: usize, text: String },
    Color(Color),
    Card(CardId),
    Range { min: u32, max: u32 },
}

/// Input the engine needs before it can carry out an action
///
/// The caller resubmits the same action with the choice filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingChoice {
    pub player: PlayerId,
    pub kind: ChoiceKind,
    pub prompt: String,
    pub options: Vec<ChoiceOption>,
    /// How many options to pick
    pub count: u32,
}

impl WaitingChoice {
    pub fn new(
        player: PlayerId,
        kind: ChoiceKind,
        prompt: impl Into<String>,
        options: Vec<ChoiceOption>,
    ) -> Self {
        WaitingChoice {
            player,
            kind,
            prompt: prompt.into(),
            options,
            count: 1,
        }
    }

    pub fn choose(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Suspend the current action with this choice
    pub fn into_error(self) -> MtgError {
        MtgError::ChoiceRequired(Box::new(self))
    }
}

/// Choices made when casting a spell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastOptions {
    /// One per targeted effect in order, then the enchanted object for auras
    pub targets: Vec<TargetRef>,
    pub modes: Vec<usize>,
    pub x_value: Option<u32>,
    pub color: Option<Color>,
}

impl CastOptions {
    pub fn targets(targets: impl IntoIterator<Item = TargetRef>) -> Self {
        CastOptions {
            targets: targets.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_modes(mut self, modes: impl IntoIterator<Item = usize>) -> Self {
        self.modes = modes.into_iter().collect();
        self
    }

    pub fn with_x(mut self, x: u32) -> Self {
        self.x_value = Some(x);
        self
    }
}

/// Choices made when activating an ability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateOptions {
    pub targets: Vec<TargetRef>,
    pub x_value: Option<u32>,
    pub sacrifice: Vec<CardId>,
    pub discard: Vec<CardId>,
    /// Color for "add one mana of any color"
    pub color: Option<Color>,
}

impl ActivateOptions {
    pub fn targets(targets: impl IntoIterator<Item = TargetRef>) -> Self {
        ActivateOptions {
            targets: targets.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn color(color: Color) -> Self {
        ActivateOptions {
            color: Some(color),
            ..Default::default()
        }
    }
}

/// Outcome of one action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    /// The new state on success, the unchanged state otherwise
    pub state: GameState,
    pub error: Option<String>,
    pub description: Option<String>,
    pub pending_choice: Option<WaitingChoice>,
}

impl ActionResult {
    fn accepted(state: GameState, description: String) -> Self {
        ActionResult {
            success: true,
            state,
            error: None,
            description: Some(description),
            pending_choice: None,
        }
    }

    fn rejected(state: &GameState, reason: String) -> Self {
        ActionResult {
            success: false,
            state: state.clone(),
            error: Some(reason),
            description: None,
            pending_choice: None,
        }
    }

    fn waiting(state: &GameState, choice: WaitingChoice) -> Self {
        ActionResult {
            success: false,
            state: state.clone(),
            error: Some(choice.prompt.clone()),
            description: None,
            pending_choice: Some(choice),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending_choice.is_some()
    }
}

/// Types of game actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    CastSpell {
        player: PlayerId,
        card: CardId,
        options: CastOptions,
    },
    ActivateAbility {
        player: PlayerId,
        card: CardId,
        index: usize,
        options: ActivateOptions,
    },
    ActivateLoyaltyAbility {
        player: PlayerId,
        card: CardId,
        index: usize,
        options: ActivateOptions,
    },
    PlayLand {
        player: PlayerId,
        card: CardId,
    },
    PassPriority {
        player: PlayerId,
    },
    DeclareAttackers {
        player: PlayerId,
        /// (attacker, defending player)
        attacks: Vec<(CardId, PlayerId)>,
    },
    DeclareBlockers {
        player: PlayerId,
        /// (blocker, attacker)
        blocks: Vec<(CardId, CardId)>,
    },
    Concede {
        player: PlayerId,
    },
    OfferDraw {
        player: PlayerId,
    },
    AcceptDraw {
        player: PlayerId,
    },
    DeclineDraw {
        player: PlayerId,
    },
}

impl GameAction {
    /// The player taking the action
    pub fn player(&self) -> PlayerId {
        match self {
            GameAction::CastSpell { player, .. }
            | GameAction::ActivateAbility { player, .. }
            | GameAction::ActivateLoyaltyAbility { player, .. }
            | GameAction::PlayLand { player, .. }
            | GameAction::PassPriority { player }
            | GameAction::DeclareAttackers { player, .. }
            | GameAction::DeclareBlockers { player, .. }
            | GameAction::Concede { player }
            | GameAction::OfferDraw { player }
            | GameAction::AcceptDraw { player }
            | GameAction::DeclineDraw { player } => *player,
        }
    }

    /// Apply this action to `state`
    pub fn apply(&self, state: &GameState) -> Result<ActionResult> {
        match self {
            GameAction::CastSpell {
                player,
                card,
                options,
            } => state.cast_spell(*player, *card, options.clone()),
            GameAction::ActivateAbility {
                player,
                card,
                index,
                options,
            } => state.activate_ability(*player, *card, *index, options.clone()),
            GameAction::ActivateLoyaltyAbility {
                player,
                card,
                index,
                options,
            } => state.activate_loyalty_ability(*player, *card, *index, options.clone()),
            GameAction::PlayLand { player, card } => state.play_land(*player, *card),
            GameAction::PassPriority { player } => state.pass_priority(*player),
            GameAction::DeclareAttackers { player, attacks } => {
                state.declare_attackers(*player, attacks.clone())
            }
            GameAction::DeclareBlockers { player, blocks } => {
                state.declare_blockers(*player, blocks.clone())
            }
            GameAction::Concede { player } => state.concede(*player),
            GameAction::OfferDraw { player } => state.offer_draw(*player),
            GameAction::AcceptDraw { player } => state.accept_draw(*player),
            GameAction::DeclineDraw { player } => state.decline_draw(*player),
        }
    }
}

impl GameState {
    /// Run `f` against a copy of the state and package the outcome
    ///
    /// An action taken with priority (cast, activate, land, declare) resets
    /// the pass counter and clears the actor's pass flag. Passing, conceding
    /// and draw offers leave them alone. State-based actions and pending
    /// triggers are handled before the new state is returned.
    fn attempt(
        &self,
        actor: PlayerId,
        restarts_passing: bool,
        f: impl FnOnce(&mut GameState) -> Result<String>,
    ) -> Result<ActionResult> {
        if self.status != GameStatus::InProgress {
            return Ok(ActionResult::rejected(self, "The game is not in progress".to_string()));
        }
        if self.player(actor)?.has_lost {
            return Ok(ActionResult::rejected(
                self,
                "That player has already left the game".to_string(),
            ));
        }

        let mut next = self.clone();
        let outcome = f(&mut next).and_then(|description| {
            if restarts_passing {
                next.consecutive_passes = 0;
                next.player_mut(actor)?.passed_priority = false;
            }
            next.settle()?;
            Ok(description)
        });

        match outcome {
            Ok(description) => Ok(ActionResult::accepted(next, description)),
            Err(MtgError::InvalidAction(reason)) => Ok(ActionResult::rejected(self, reason)),
            Err(MtgError::ChoiceRequired(choice)) => Ok(ActionResult::waiting(self, *choice)),
            Err(err) => Err(err),
        }
    }

    /// Cast a spell from hand
    pub fn cast_spell(
        &self,
        player: PlayerId,
        card: CardId,
        options: CastOptions,
    ) -> Result<ActionResult> {
        self.attempt(player, true, |s| s.do_cast_spell(player, card, &options))
    }

    /// Activate the `index`th activated ability of a permanent
    pub fn activate_ability(
        &self,
        player: PlayerId,
        card: CardId,
        index: usize,
        options: ActivateOptions,
    ) -> Result<ActionResult> {
        self.attempt(player, true, |s| {
            s.do_activate_ability(player, card, index, &options)
        })
    }

    pub fn activate_loyalty_ability(
        &self,
        player: PlayerId,
        card: CardId,
        index: usize,
        options: ActivateOptions,
    ) -> Result<ActionResult> {
        self.attempt(player, true, |s| {
            s.do_activate_loyalty_ability(player, card, index, &options)
        })
    }

    pub fn play_land(&self, player: PlayerId, card: CardId) -> Result<ActionResult> {
        self.attempt(player, true, |s| s.do_play_land(player, card))
    }

    pub fn pass_priority(&self, player: PlayerId) -> Result<ActionResult> {
        self.attempt(player, false, |s| s.do_pass_priority(player))
    }

    pub fn declare_attackers(
        &self,
        player: PlayerId,
        attacks: Vec<(CardId, PlayerId)>,
    ) -> Result<ActionResult> {
        self.attempt(player, true, |s| s.do_declare_attackers(player, &attacks))
    }

    pub fn declare_blockers(
        &self,
        player: PlayerId,
        blocks: Vec<(CardId, CardId)>,
    ) -> Result<ActionResult> {
        self.attempt(player, true, |s| s.do_declare_blockers(player, &blocks))
    }

    pub fn concede(&self, player: PlayerId) -> Result<ActionResult> {
        self.attempt(player, false, |s| s.do_concede(player))
    }

    pub fn offer_draw(&self, player: PlayerId) -> Result<ActionResult> {
        self.attempt(player, false, |s| s.do_offer_draw(player))
    }

    pub fn accept_draw(&self, player: PlayerId) -> Result<ActionResult> {
        self.attempt(player, false, |s| s.do_accept_draw(player))
    }

    pub fn decline_draw(&self, player: PlayerId) -> Result<ActionResult> {
        self.attempt(player, false, |s| s.do_decline_draw(player))
    }
}
