//! Game zones (Library, Hand, Graveyard, Battlefield, etc.)
//!
//! Zone operations are pure: each consumes the zone and returns the new
//! one. Callers check existence and ownership before calling.

use crate::core::{CardId, PlayerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Different zones where cards can exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Library,
    Hand,
    Battlefield,
    Graveyard,
    Exile,
    Stack,
    Command,
}

impl Zone {
    /// Battlefield and stack are shared by all players
    pub fn is_shared(&self) -> bool {
        matches!(self, Zone::Battlefield | Zone::Stack)
    }

    pub fn default_visibility(&self) -> Visibility {
        match self {
            Zone::Library => Visibility::Hidden,
            Zone::Hand => Visibility::OwnerOnly,
            _ => Visibility::Public,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Zone::Library => "library",
            Zone::Hand => "hand",
            Zone::Battlefield => "battlefield",
            Zone::Graveyard => "graveyard",
            Zone::Exile => "exile",
            Zone::Stack => "stack",
            Zone::Command => "command zone",
        };
        write!(f, "{name}")
    }
}

/// Who may look at a zone's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    OwnerOnly,
    Hidden,
}

/// Identifies one zone: per-player zones carry their owner, shared zones don't
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneKey {
    pub zone: Zone,
    pub owner: Option<PlayerId>,
}

impl ZoneKey {
    pub fn player(zone: Zone, owner: PlayerId) -> Self {
        ZoneKey {
            zone,
            owner: Some(owner),
        }
    }

    pub fn shared(zone: Zone) -> Self {
        ZoneKey { zone, owner: None }
    }

    /// The key of `zone` for a card owned by `owner`
    pub fn for_card(zone: Zone, owner: PlayerId) -> Self {
        if zone.is_shared() {
            ZoneKey::shared(zone)
        } else {
            ZoneKey::player(zone, owner)
        }
    }
}

/// A zone containing cards (ordered; the top of a library is the last element)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardZone {
    pub key: ZoneKey,
    pub visibility: Visibility,
    pub cards: Vec<CardId>,
}

impl CardZone {
    pub fn new(key: ZoneKey) -> Self {
        CardZone {
            key,
            visibility: key.zone.default_visibility(),
            cards: Vec::new(),
        }
    }

    pub fn zone(&self) -> Zone {
        self.key.zone
    }

    /// Put a card on top
    pub fn add(mut self, card_id: CardId) -> Self {
        self.cards.push(card_id);
        self
    }

    /// Add to bottom (for Library)
    pub fn add_to_bottom(mut self, card_id: CardId) -> Self {
        self.cards.insert(0, card_id);
        self
    }

    pub fn remove(mut self, card_id: CardId) -> Self {
        // Order-preserving remove keeps iteration deterministic
        if let Some(pos) = self.cards.iter().position(|&id| id == card_id) {
            self.cards.remove(pos);
        }
        self
    }

    /// Move a card between two zones
    ///
    /// Afterwards `card_id` is absent from `from` and on top of `to`.
    pub fn move_between(from: CardZone, to: CardZone, card_id: CardId) -> (CardZone, CardZone) {
        (from.remove(card_id), to.add(card_id))
    }

    /// Shuffle the zone (for Library)
    pub fn shuffle(mut self, rng: &mut impl rand::Rng) -> Self {
        use rand::seq::SliceRandom;
        self.cards.shuffle(rng);
        self
    }

    /// Reorder to `order`, which must be a permutation of the current contents
    ///
    /// Any other order leaves the zone unchanged.
    pub fn reorder(mut self, order: &[CardId]) -> Self {
        let mut current = self.cards.clone();
        let mut proposed = order.to_vec();
        current.sort();
        proposed.sort();
        if current == proposed {
            self.cards = order.to_vec();
        }
        self
    }

    pub fn contains(&self, card_id: CardId) -> bool {
        self.cards.contains(&card_id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Look at top card without removing it
    pub fn peek_top(&self) -> Option<CardId> {
        self.cards.last().copied()
    }
}
