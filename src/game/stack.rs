//! Objects on the stack
//!
//! The stack is a plain `Vec` on `GameState` with the top at the end, so
//! resolution order is strictly last-in-first-out.

use crate::core::{
    CardId, Color, EffectDescriptor, PlayerId, StackObjectId, TargetRef, TriggerEvent,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What put the object on the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackObjectKind {
    Spell {
        card: CardId,
    },
    ActivatedAbility {
        source: CardId,
        index: usize,
    },
    TriggeredAbility {
        source: CardId,
        index: usize,
        event: TriggerEvent,
    },
    LoyaltyAbility {
        source: CardId,
        index: usize,
        change: i32,
    },
}

/// A spell or ability waiting to resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackObject {
    pub id: StackObjectId,
    pub kind: StackObjectKind,
    pub controller: PlayerId,
    /// One entry per targeted effect, in effect order
    pub targets: SmallVec<[TargetRef; 2]>,
    pub modes: SmallVec<[usize; 1]>,
    pub x_value: u32,
    /// Color picked for "mana of any color"
    pub chosen_color: Option<Color>,
    /// A countered object leaves the stack without doing anything
    pub countered: bool,
    pub timestamp: u64,
    pub effects: Vec<EffectDescriptor>,
    pub description: String,
}

impl StackObject {
    /// The card this object came from
    pub fn source_card(&self) -> CardId {
        match &self.kind {
            StackObjectKind::Spell { card } => *card,
            StackObjectKind::ActivatedAbility { source, .. }
            | StackObjectKind::TriggeredAbility { source, .. }
            | StackObjectKind::LoyaltyAbility { source, .. } => *source,
        }
    }

    pub fn is_spell(&self) -> bool {
        matches!(self.kind, StackObjectKind::Spell { .. })
    }

    /// Triggered abilities pick targets when they resolve
    pub fn defers_targets(&self) -> bool {
        matches!(self.kind, StackObjectKind::TriggeredAbility { .. })
    }
}
